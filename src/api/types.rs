//! Shared types for the HTTP layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::{FlashKind, Role, User};
use crate::session_cache::Flash;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "clinic_session";

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
/// Wraps `CoreState` plus HTTP-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub login_throttle: Arc<Mutex<LoginThrottle>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            login_throttle: Arc::new(Mutex::new(LoginThrottle::new())),
        }
    }

    /// Queue a one-shot message for the visitor's next page.
    pub fn flash(
        &self,
        visitor: &Visitor,
        category: FlashKind,
        message: impl Into<String>,
    ) -> Result<(), ApiError> {
        self.core
            .lock_sessions()?
            .push_flash(&visitor.session_token, category, message);
        Ok(())
    }

    /// Flash a message and redirect.
    pub fn redirect_with(
        &self,
        visitor: &Visitor,
        category: FlashKind,
        message: impl Into<String>,
        to: &str,
    ) -> Result<Response, ApiError> {
        self.flash(visitor, category, message)?;
        Ok(Redirect::to(to).into_response())
    }

    /// Wrap a page payload with the visitor summary and pending flashes.
    pub fn page<T: Serialize>(
        &self,
        visitor: &Visitor,
        page: T,
    ) -> Result<Json<PageView<T>>, ApiError> {
        let flashes = self
            .core
            .lock_sessions()?
            .take_flashes(&visitor.session_token);
        Ok(Json(PageView {
            user: visitor.user.as_ref().map(UserSummary::from),
            flashes,
            page,
        }))
    }
}

// ═══════════════════════════════════════════════════════════
// Visitor / Identity: injected by middleware
// ═══════════════════════════════════════════════════════════

/// Every request's caller, signed in or not. Injected by the session
/// middleware; `user` is loaded from the database on each request.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub session_token: String,
    pub user: Option<User>,
}

/// Authenticated caller, injected by `require_login` for protected routes.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

// ═══════════════════════════════════════════════════════════
// Page views
// ═══════════════════════════════════════════════════════════

/// Signed-in user as shown on every page.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Envelope for every page response.
#[derive(Debug, Serialize)]
pub struct PageView<T> {
    pub user: Option<UserSummary>,
    pub flashes: Vec<Flash>,
    #[serde(flatten)]
    pub page: T,
}

// ═══════════════════════════════════════════════════════════
// Cookie helpers
// ═══════════════════════════════════════════════════════════

/// Session token presented in the request's `Cookie` headers, if any.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value for a freshly issued session token.
pub fn session_cookie(token: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/"
    ))
    .map_err(|e| ApiError::Internal(format!("session cookie: {e}")))
}

/// Percent-encode a value for use as one URL path segment.
pub fn encode_path_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' | b'+' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Login throttle: per-account failure window
// ═══════════════════════════════════════════════════════════

/// Counts failed logins per email and blocks further attempts once
/// `max_failures` land inside `window`.
///
/// Keys are the trimmed email exactly as the account lookup sees it.
/// At most `max_tracked` emails are remembered; expired ones are pruned
/// first, then the one with the oldest latest failure is dropped.
pub struct LoginThrottle {
    failures: HashMap<String, Vec<Instant>>,
    max_failures: usize,
    window: Duration,
    max_tracked: usize,
}

impl LoginThrottle {
    pub fn new() -> Self {
        Self::with_limits(5, Duration::from_secs(15 * 60), 10_000)
    }

    pub fn with_limits(max_failures: usize, window: Duration, max_tracked: usize) -> Self {
        Self {
            failures: HashMap::new(),
            max_failures,
            window,
            max_tracked: max_tracked.max(1),
        }
    }

    pub fn is_locked(&mut self, email: &str) -> bool {
        let now = Instant::now();
        let window = self.window;
        let Some(entries) = self.failures.get_mut(email) else {
            return false;
        };
        entries.retain(|ts| now.duration_since(*ts) < window);
        if entries.is_empty() {
            self.failures.remove(email);
            return false;
        }
        entries.len() >= self.max_failures
    }

    pub fn record_failure(&mut self, email: &str) {
        let now = Instant::now();
        if !self.failures.contains_key(email) && self.failures.len() >= self.max_tracked {
            self.prune(now);
            if self.failures.len() >= self.max_tracked {
                self.evict_stalest();
            }
        }

        let window = self.window;
        let entries = self.failures.entry(email.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < window);
        entries.push(now);
    }

    pub fn clear(&mut self, email: &str) {
        self.failures.remove(email);
    }

    pub fn tracked(&self) -> usize {
        self.failures.len()
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.failures.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < window);
            !entries.is_empty()
        });
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .failures
            .iter()
            .min_by_key(|(_, entries)| entries.last().copied())
            .map(|(email, _)| email.clone());
        if let Some(email) = stalest {
            self.failures.remove(&email);
        }
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new()
    }
}
