//! Route guards.
//!
//! `require_login` turns a `Visitor` into an `Identity` or redirects the
//! anonymous caller to `/login`. `require_doctor` runs after it and sends
//! anyone without the doctor role to `/home`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::api::types::{Identity, Visitor};

/// Require a signed-in user.
///
/// Reads `Visitor` from request extensions (injected by the session layer).
/// On success: injects `Identity` for downstream guards and handlers.
pub async fn require_login(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let user = req
        .extensions()
        .get::<Visitor>()
        .and_then(|visitor| visitor.user.clone());

    match user {
        Some(user) => {
            req.extensions_mut().insert(Identity { user });
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

/// Require the doctor role. Must run inside `require_login`.
pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    let is_doctor = req
        .extensions()
        .get::<Identity>()
        .is_some_and(|identity| identity.user.is_doctor());

    if !is_doctor {
        return Redirect::to("/home").into_response();
    }
    next.run(req).await
}
