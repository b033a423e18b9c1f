//! Request middleware.
//!
//! Execution order (outermost → innermost):
//! 1. Session loader: resolves the cookie, injects `Visitor`
//! 2. Audit logger: logs method, path, status and user
//! 3. Guards (`require_login`, `require_doctor`) on protected routes only

pub mod audit;
pub mod auth;
pub mod session;
