//! Shared application state handed to every request.
//!
//! Holds the database location and the session store. Handlers open a
//! fresh SQLite connection per request through [`CoreState::open_db`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::config::{self, Config};
use crate::db;
use crate::session_cache::SessionStore;

pub struct CoreState {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// PBKDF2 rounds used when hashing new passwords.
    pub password_iterations: u32,
    sessions: Mutex<SessionStore>,
}

impl CoreState {
    /// Build state from runtime configuration. Creates the database file
    /// and applies migrations up front so startup fails loudly.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        Self::open(&config.db_path, config.password_iterations)
    }

    pub fn open(db_path: &Path, password_iterations: u32) -> Result<Self, CoreError> {
        if password_iterations == 0 {
            return Err(CoreError::InvalidConfig(
                "password iterations must be at least 1".into(),
            ));
        }
        db::open_database(db_path)?;
        tracing::info!(path = %db_path.display(), "Database ready");
        Ok(Self {
            db_path: db_path.to_path_buf(),
            password_iterations,
            sessions: Mutex::new(SessionStore::new()),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_session_store(mut self, store: SessionStore) -> Self {
        self.sessions = Mutex::new(store);
        self
    }

    /// Open a database connection.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// Lock the session store. Guards must not be held across `.await`.
    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionStore>, CoreError> {
        self.sessions.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

impl Default for CoreState {
    /// State over the default database path and hashing cost, without
    /// touching the filesystem.
    fn default() -> Self {
        Self {
            db_path: config::default_db_path(),
            password_iterations: config::DEFAULT_PASSWORD_ITERATIONS,
            sessions: Mutex::new(SessionStore::new()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
