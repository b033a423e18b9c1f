use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

/// Application-level constants
pub const APP_NAME: &str = "Clinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// PBKDF2 rounds for stored password hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PUBLIC_DIR: &str = "public";

/// Get the application data directory
/// ~/Clinic/ on all platforms, falling back to the working directory
/// when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the SQLite database file
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinic_lib=info,tower_http=warn"
}

/// Runtime configuration, read from `CLINIC_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub db_path: PathBuf,
    pub public_dir: PathBuf,
    pub password_iterations: u32,
}

impl Config {
    pub fn load() -> Self {
        Self {
            bind: try_load("CLINIC_BIND", DEFAULT_BIND),
            port: try_load("CLINIC_PORT", &DEFAULT_PORT.to_string()),
            db_path: env::var("CLINIC_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_db_path()),
            public_dir: env::var("CLINIC_PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PUBLIC_DIR)),
            // Zero rounds would store hashes that can never verify.
            password_iterations: try_load::<NonZeroU32>(
                "CLINIC_PASSWORD_ITERATIONS",
                &DEFAULT_PASSWORD_ITERATIONS.to_string(),
            )
            .get(),
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// missing or malformed.
fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        tracing::debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            parse_default(default)
        }
    }
}

fn parse_default<T: FromStr>(default: &str) -> T
where
    T::Err: Display,
{
    match default.parse() {
        Ok(value) => value,
        // Defaults are compile-time constants of this module.
        Err(e) => unreachable!("built-in default {default:?} does not parse: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_path_under_app_data() {
        let db = default_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("clinic.db"));
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("Clinic"));
    }

    #[test]
    fn try_load_falls_back_on_missing_key() {
        let port: u16 = try_load("CLINIC_TEST_SURELY_UNSET_PORT", "5000");
        assert_eq!(port, 5000);
    }

    #[test]
    fn try_load_falls_back_on_malformed_value() {
        env::set_var("CLINIC_TEST_MALFORMED_PORT", "not-a-port");
        let port: u16 = try_load("CLINIC_TEST_MALFORMED_PORT", "5000");
        assert_eq!(port, 5000);
        env::remove_var("CLINIC_TEST_MALFORMED_PORT");
    }

    #[test]
    fn try_load_reads_value() {
        env::set_var("CLINIC_TEST_ITERATIONS", "1200");
        let iterations: u32 = try_load("CLINIC_TEST_ITERATIONS", "600000");
        assert_eq!(iterations, 1200);
        env::remove_var("CLINIC_TEST_ITERATIONS");
    }

    #[test]
    fn zero_password_iterations_fall_back_to_default() {
        env::set_var("CLINIC_PASSWORD_ITERATIONS", "0");
        let config = Config::load();
        env::remove_var("CLINIC_PASSWORD_ITERATIONS");
        assert_eq!(config.password_iterations, DEFAULT_PASSWORD_ITERATIONS);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
