//! Session cookie middleware.
//!
//! Resolves the `clinic_session` cookie against the session store, issues
//! a fresh anonymous session when it is missing or stale, loads the bound
//! user from the database and injects a `Visitor` for downstream handlers.

use axum::http::header::SET_COOKIE;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{session_cookie, session_token_from_headers, ApiContext, Visitor};
use crate::db;

pub async fn load_visitor(req: Request<axum::body::Body>, next: Next) -> Response {
    match load_visitor_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn load_visitor_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let presented = session_token_from_headers(req.headers());

    // 1. Resolve or issue the session token
    let (token, issued, user_id) = {
        let mut sessions = ctx.core.lock_sessions()?;
        match presented {
            Some(token) if sessions.touch(&token) => {
                let user_id = sessions.user_id(&token);
                (token, false, user_id)
            }
            _ => (sessions.issue(), true, None),
        }
    }; // MutexGuard dropped here, before any .await

    // 2. Load the signed-in user; a vanished row means anonymous
    let user = match user_id {
        Some(id) => {
            let conn = ctx.core.open_db()?;
            let user = db::get_user(&conn, id)?;
            if user.is_none() {
                tracing::debug!(user_id = id, "Session user no longer exists");
                ctx.core.lock_sessions()?.set_user(&token, None);
            }
            user
        }
        None => None,
    };

    req.extensions_mut().insert(Visitor {
        session_token: token.clone(),
        user,
    });

    let mut response = next.run(req).await;

    if issued {
        response
            .headers_mut()
            .append(SET_COOKIE, session_cookie(&token)?);
    }

    Ok(response)
}
