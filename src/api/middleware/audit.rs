//! Access logging middleware.
//!
//! Logs every request with method, path, response status, the signed-in
//! user (if any) and latency. Runs inside the session layer so `Visitor`
//! is available.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::Visitor;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req
        .extensions()
        .get::<Visitor>()
        .and_then(|v| v.user.as_ref())
        .map(|u| u.id);
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        user_id,
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
