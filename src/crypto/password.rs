//! Salted password hashing for account credentials.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with salt and
//! hash in unpadded standard base64. The iteration count travels with the
//! hash, so raising the default never invalidates existing accounts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

pub const SCHEME: &str = "pbkdf2-sha256";
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out[..]);
    out
}

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let hash = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(&hash[..]),
    )
}

/// Check a password against a stored hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };

    if scheme != SCHEME {
        return Err(CryptoError::UnsupportedScheme(scheme.to_string()));
    }

    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 {
        return Err(CryptoError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(hash)
        .map_err(|_| CryptoError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    Ok(actual[..].ct_eq(&expected[..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_password("pw", FAST);
        assert!(verify_password("pw", &stored).unwrap());
    }

    #[test]
    fn wrong_password_rejected() {
        let stored = hash_password("pw", FAST);
        assert!(!verify_password("wrong", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_different_hashes() {
        let h1 = hash_password("pw", FAST);
        let h2 = hash_password("pw", FAST);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_records_scheme_and_iterations() {
        let stored = hash_password("pw", FAST);
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(!stored.contains("pw$"));
    }

    #[test]
    fn plaintext_value_is_malformed() {
        let err = verify_password("123", "123").unwrap_err();
        assert!(matches!(err, CryptoError::MalformedHash));
    }

    #[test]
    fn unknown_scheme_rejected() {
        let err = verify_password("pw", "md5$1$AAAA$BBBB").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedScheme(s) if s == "md5"));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
