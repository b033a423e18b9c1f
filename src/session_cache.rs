//! Server-side session store behind the `clinic_session` cookie.
//!
//! The cookie carries a random token; only its SHA-256 hash is kept here.
//! Each entry holds the signed-in user id (if any) and the visitor's
//! pending flash messages. Entries expire after an idle timeout and are
//! pruned lazily once the map grows. The store never holds more than
//! `max_sessions` entries: at capacity the least recently seen one is
//! evicted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::FlashKind;

/// Idle sessions are dropped after 12 hours.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 12 * 60 * 60;

/// Prune expired entries once the store holds more than this many sessions.
const CLEANUP_THRESHOLD: usize = 1000;

/// Hard cap on live sessions.
const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Hash a session token using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// One-shot notice shown on the next page the visitor loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub category: FlashKind,
    pub message: String,
}

struct SessionEntry {
    user_id: Option<i64>,
    flashes: Vec<Flash>,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self::with_limits(idle_timeout, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start an anonymous session and return its token.
    pub fn issue(&mut self) -> String {
        if self.sessions.len() > CLEANUP_THRESHOLD || self.sessions.len() >= self.max_sessions {
            self.cleanup();
        }
        while self.sessions.len() >= self.max_sessions {
            if !self.evict_oldest() {
                break;
            }
        }

        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                user_id: None,
                flashes: Vec::new(),
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Mark a session as used. Returns `false` (and forgets the session)
    /// if the token is unknown or idle for too long.
    pub fn touch(&mut self, token: &str) -> bool {
        let key = hash_token(token);
        let now = Instant::now();
        match self.sessions.get_mut(&key) {
            Some(entry) if now.duration_since(entry.last_seen) < self.idle_timeout => {
                entry.last_seen = now;
                true
            }
            Some(_) => {
                self.sessions.remove(&key);
                false
            }
            None => false,
        }
    }

    pub fn user_id(&self, token: &str) -> Option<i64> {
        self.sessions.get(&hash_token(token))?.user_id
    }

    /// Bind (or with `None`, unbind) a user to the session.
    pub fn set_user(&mut self, token: &str, user_id: Option<i64>) {
        if let Some(entry) = self.sessions.get_mut(&hash_token(token)) {
            entry.user_id = user_id;
        }
    }

    pub fn push_flash(&mut self, token: &str, category: FlashKind, message: impl Into<String>) {
        if let Some(entry) = self.sessions.get_mut(&hash_token(token)) {
            entry.flashes.push(Flash {
                category,
                message: message.into(),
            });
        }
    }

    /// Remove and return the pending flash messages.
    pub fn take_flashes(&mut self, token: &str) -> Vec<Flash> {
        self.sessions
            .get_mut(&hash_token(token))
            .map(|entry| std::mem::take(&mut entry.flashes))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_seen)
            .map(|(key, _)| *key);
        match oldest {
            Some(key) => {
                self.sessions.remove(&key);
                tracing::debug!("Session store full, evicted least recent session");
                true
            }
            None => false,
        }
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_seen) < timeout);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_session_is_anonymous() {
        let mut store = SessionStore::new();
        let token = store.issue();
        assert!(store.touch(&token));
        assert_eq!(store.user_id(&token), None);
    }

    #[test]
    fn unknown_token_rejected() {
        let mut store = SessionStore::new();
        assert!(!store.touch("forged"));
    }

    #[test]
    fn set_user_then_clear() {
        let mut store = SessionStore::new();
        let token = store.issue();
        store.set_user(&token, Some(7));
        assert_eq!(store.user_id(&token), Some(7));
        store.set_user(&token, None);
        assert_eq!(store.user_id(&token), None);
    }

    #[test]
    fn flashes_are_delivered_once() {
        let mut store = SessionStore::new();
        let token = store.issue();
        store.push_flash(&token, FlashKind::Error, "Passwords do not match!");
        store.push_flash(&token, FlashKind::Success, "second");

        let flashes = store.take_flashes(&token);
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].category, FlashKind::Error);
        assert_eq!(flashes[0].message, "Passwords do not match!");
        assert!(store.take_flashes(&token).is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let mut store = SessionStore::new();
        let a = store.issue();
        let b = store.issue();
        store.set_user(&a, Some(1));
        store.push_flash(&a, FlashKind::Success, "hi");
        assert_eq!(store.user_id(&b), None);
        assert!(store.take_flashes(&b).is_empty());
    }

    #[test]
    fn idle_session_expires() {
        let mut store = SessionStore::with_idle_timeout(Duration::ZERO);
        let token = store.issue();
        assert!(!store.touch(&token));
        assert!(store.is_empty());
    }

    #[test]
    fn store_never_exceeds_capacity() {
        let mut store = SessionStore::with_limits(Duration::from_secs(3600), 3);
        for _ in 0..50 {
            store.issue();
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn capacity_evicts_least_recently_seen() {
        let mut store = SessionStore::with_limits(Duration::from_secs(3600), 2);
        let kept = store.issue();
        store.set_user(&kept, Some(1));
        let stale = store.issue();
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.touch(&kept));

        let fresh = store.issue();
        assert_eq!(store.len(), 2);
        assert!(!store.touch(&stale));
        assert_eq!(store.user_id(&kept), Some(1));
        assert!(store.touch(&fresh));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert!(!t1.is_empty());
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("test"), hash_token("test"));
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }
}
