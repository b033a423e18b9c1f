//! Route handlers.
//!
//! Each module corresponds to a page or form of the clinic site.
//! Handlers reuse the repository and booking logic; page routes answer
//! with a `PageView` and form posts answer with a flash plus redirect.

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod home;
pub mod profile;
