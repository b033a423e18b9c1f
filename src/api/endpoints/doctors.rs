//! Doctor directory, doctor profile and the doctor's own dashboard.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Local;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity, PageView, Visitor};
use crate::db;
use crate::models::{Doctor, ReservedSlot, ScheduledAppointment};

#[derive(Serialize)]
pub struct DoctorsPage {
    pub doctors: Vec<Doctor>,
}

#[derive(Serialize)]
pub struct DoctorProfilePage {
    pub doctor: Doctor,
    pub doc_id: i64,
    /// Slots already taken from today onward.
    pub reserved: Vec<ReservedSlot>,
}

#[derive(Serialize)]
pub struct DashboardPage {
    pub doctor: Option<Doctor>,
    pub appointments: Vec<ScheduledAppointment>,
}

/// `GET /doctors`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Json<PageView<DoctorsPage>>, ApiError> {
    let doctors = db::list_doctors(&ctx.core.open_db()?)?;
    ctx.page(&visitor, DoctorsPage { doctors })
}

/// `GET /doctor/:id`: 404 for an unknown doctor.
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Path(doc_id): Path<i64>,
) -> Result<Json<PageView<DoctorProfilePage>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = db::get_doctor(&conn, doc_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {doc_id} not found")))?;
    let reserved = db::reserved_slots(&conn, doc_id, Local::now().date_naive())?;
    drop(conn);

    ctx.page(
        &visitor,
        DoctorProfilePage {
            doctor,
            doc_id,
            reserved,
        },
    )
}

/// `GET /doctor-dashboard`: appointments of the doctor linked to the
/// caller's account. Empty when no doctor row is linked.
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PageView<DashboardPage>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = db::get_doctor_by_user(&conn, identity.user_id())?;
    let appointments = match &doctor {
        Some(d) => db::list_doctor_appointments(&conn, d.id)?,
        None => Vec::new(),
    };
    drop(conn);

    ctx.page(&visitor, DashboardPage { doctor, appointments })
}
