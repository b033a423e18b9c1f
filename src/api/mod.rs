//! HTTP surface of the clinic.
//!
//! `clinic_router()` returns a composable `Router`; `server::serve` binds
//! it to a TCP listener. Every request passes through the session
//! middleware, and protected routes add login and doctor guards.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::clinic_router;
pub use types::ApiContext;
