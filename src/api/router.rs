//! Clinic router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Middleware stack (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Cache-Control → 3. Session loader →
//! 4. Audit logger → route guards (protected routes only) → handler

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{appointments, auth, doctors, home, profile};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the clinic router.
///
/// Any path that matches no route is served from `public_dir` when one is
/// given (doctor portraits and other static assets).
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn clinic_router(core: Arc<CoreState>, public_dir: Option<PathBuf>) -> Router {
    build_router(ApiContext::new(core), public_dir)
}

fn build_router(ctx: ApiContext, public_dir: Option<PathBuf>) -> Router {
    // Open to everyone. `/book` checks the session itself so it can flash.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let public = Router::new()
        .route("/", get(home::index))
        .route("/home", get(home::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/doctors", get(doctors::list))
        .route("/doctor/:id", get(doctors::profile))
        .route("/book", post(appointments::book));

    // Any signed-in user
    let signed_in = Router::new()
        .route("/profile", get(profile::show))
        .route("/edit-profile", get(profile::edit_page).post(profile::edit))
        .route("/my-appointments", get(appointments::mine))
        .route("/cancel/:id", get(appointments::cancel))
        .route_layer(from_fn(middleware::auth::require_login));

    // Doctors only. Route layers run bottom-up: login first, then role.
    let doctor_only = Router::new()
        .route("/doctor-dashboard", get(doctors::dashboard))
        .route("/patient-history/:email", get(profile::patient_history))
        .route("/add-history/:email", post(profile::add_history))
        .route_layer(from_fn(middleware::auth::require_doctor))
        .route_layer(from_fn(middleware::auth::require_login));

    let mut router = Router::new()
        .merge(public)
        .merge(signed_in)
        .merge(doctor_only)
        .with_state(ctx.clone());

    if let Some(dir) = public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    // Middleware stack (innermost first, outermost last)
    router
        .layer(from_fn(middleware::audit::log_access))
        .layer(from_fn(middleware::session::load_visitor))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(Extension(ctx))
}
