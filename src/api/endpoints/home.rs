//! Landing page.

use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PageView, Visitor};
use crate::config;

#[derive(Serialize)]
pub struct HomePage {
    pub clinic: &'static str,
    pub version: &'static str,
}

/// `GET /` and `GET /home`.
pub async fn index(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Json<PageView<HomePage>>, ApiError> {
    ctx.page(
        &visitor,
        HomePage {
            clinic: config::APP_NAME,
            version: config::APP_VERSION,
        },
    )
}
