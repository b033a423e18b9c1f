//! Account endpoints: registration, login and logout.
//!
//! Password hashing runs on the blocking pool. Failures are reported as
//! flash messages; login failures never reveal whether the email exists.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PageView, Visitor};
use crate::crypto::password;
use crate::db;
use crate::models::FlashKind;

const INVALID_LOGIN: &str = "Invalid Email or Password.";

#[derive(Serialize)]
pub struct FormPage {
    pub form: &'static str,
}

/// Missing fields deserialize as empty. Passwords are wiped on drop.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub fullname: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub conpassword: Zeroizing<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: Zeroizing<String>,
}

/// `GET /register`
pub async fn register_page(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Json<PageView<FormPage>>, ApiError> {
    ctx.page(&visitor, FormPage { form: "register" })
}

/// `POST /register`: create a patient account.
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let RegisterForm {
        fullname,
        email,
        password: secret,
        conpassword,
    } = form;

    if *secret != *conpassword {
        return ctx.redirect_with(
            &visitor,
            FlashKind::Error,
            "Passwords do not match!",
            "/register",
        );
    }

    let fullname = fullname.trim().to_string();
    let email = email.trim().to_string();
    if fullname.is_empty() || email.is_empty() {
        return ctx.redirect_with(
            &visitor,
            FlashKind::Error,
            "All fields are required.",
            "/register",
        );
    }

    if db::email_exists(&ctx.core.open_db()?, &email)? {
        return ctx.redirect_with(
            &visitor,
            FlashKind::Error,
            "Email already registered!",
            "/register",
        );
    }

    let iterations = ctx.core.password_iterations;
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&secret, iterations))
            .await
            .map_err(|e| ApiError::Internal(format!("hash task: {e}")))?;

    let mut conn = ctx.core.open_db()?;
    match db::create_patient(&mut conn, &email, &password_hash, &fullname) {
        Ok(_) => ctx.redirect_with(
            &visitor,
            FlashKind::Success,
            "Account created successfully! Please log in.",
            "/login",
        ),
        // Lost a race with a concurrent registration of the same email
        Err(e) if e.is_unique_violation() => {
            ctx.redirect_with(&visitor, FlashKind::Error, "Email already registered!", "/register")
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /login`
pub async fn login_page(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Json<PageView<FormPage>>, ApiError> {
    ctx.page(&visitor, FormPage { form: "login" })
}

/// `POST /login`: verify credentials and bind the user to the session.
pub async fn login(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let LoginForm {
        email,
        password: secret,
    } = form;
    let email = email.trim().to_string();

    {
        let mut throttle = ctx
            .login_throttle
            .lock()
            .map_err(|_| ApiError::Internal("throttle lock".into()))?;
        if throttle.is_locked(&email) {
            tracing::warn!("Login throttled");
            return ctx.redirect_with(&visitor, FlashKind::Error, INVALID_LOGIN, "/login");
        }
    }

    let user = db::get_user_by_email(&ctx.core.open_db()?, &email)?;

    let verified = match &user {
        Some(user) => {
            let stored = user.password_hash.clone();
            let outcome =
                tokio::task::spawn_blocking(move || password::verify_password(&secret, &stored))
                    .await
                    .map_err(|e| ApiError::Internal(format!("verify task: {e}")))?;
            match outcome {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        error = %e,
                        "Stored password hash unreadable"
                    );
                    false
                }
            }
        }
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            if let Ok(mut throttle) = ctx.login_throttle.lock() {
                throttle.record_failure(&email);
            }
            return ctx.redirect_with(&visitor, FlashKind::Error, INVALID_LOGIN, "/login");
        }
    };

    if let Ok(mut throttle) = ctx.login_throttle.lock() {
        throttle.clear(&email);
    }

    {
        let mut sessions = ctx.core.lock_sessions()?;
        sessions.set_user(&visitor.session_token, Some(user.id));
        sessions.push_flash(
            &visitor.session_token,
            FlashKind::Success,
            format!("Welcome back, {}!", user.fullname),
        );
    }
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User signed in");

    let target = if user.is_doctor() { "/doctor-dashboard" } else { "/home" };
    Ok(Redirect::to(target).into_response())
}

/// `GET /logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Response, ApiError> {
    ctx.core.lock_sessions()?.set_user(&visitor.session_token, None);
    ctx.redirect_with(&visitor, FlashKind::Success, "You have been logged out.", "/home")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Request;

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_form_fills_missing_fields() {
        let Form(form) = Form::<RegisterForm>::from_request(
            form_request("email=a%40x.com&password=pw"),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(form.email, "a@x.com");
        assert_eq!(form.fullname, "");
        assert_eq!(form.password.as_str(), "pw");
        assert_eq!(form.conpassword.as_str(), "");
    }

    #[tokio::test]
    async fn login_form_accepts_empty_body() {
        let Form(form) = Form::<LoginForm>::from_request(form_request(""), &())
            .await
            .unwrap();
        assert!(form.email.is_empty());
        assert!(form.password.is_empty());
    }
}
