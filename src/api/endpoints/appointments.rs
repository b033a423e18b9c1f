//! Booking, listing and cancelling appointments.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity, PageView, Visitor};
use crate::booking::{self, BookingError, SlotRequest};
use crate::db;
use crate::models::{FlashKind, PatientAppointment};

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub doc_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Serialize)]
pub struct AppointmentsPage {
    pub appointments: Vec<PatientAppointment>,
}

/// `POST /book`: reserve a slot for the signed-in visitor.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<BookForm>,
) -> Result<Response, ApiError> {
    let Some(user) = &visitor.user else {
        return ctx.redirect_with(
            &visitor,
            FlashKind::Error,
            "Please log in to book an appointment.",
            "/login",
        );
    };

    let doctor_id: i64 = form
        .doc_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid doctor id".into()))?;

    let conn = ctx.core.open_db()?;
    if db::get_doctor(&conn, doctor_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Doctor {doctor_id} not found")));
    }

    let request = SlotRequest {
        doctor_id,
        date: &form.date,
        time: &form.time,
        user_id: user.id,
    };

    match booking::book_slot(&conn, request, Local::now().date_naive()) {
        Ok(_) => ctx.redirect_with(
            &visitor,
            FlashKind::Success,
            "Appointment Booked Successfully!",
            "/my-appointments",
        ),
        Err(BookingError::Rejected(reason)) => ctx.redirect_with(
            &visitor,
            FlashKind::Error,
            reason.to_string(),
            &format!("/doctor/{doctor_id}"),
        ),
        Err(e) => Err(e.into()),
    }
}

/// `GET /my-appointments`
pub async fn mine(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PageView<AppointmentsPage>>, ApiError> {
    let appointments = db::list_patient_appointments(&ctx.core.open_db()?, identity.user_id())?;
    ctx.page(&visitor, AppointmentsPage { appointments })
}

/// `GET /cancel/:id`: delete the caller's own appointment.
///
/// Another patient's appointment is left untouched without a message.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
    Path(appointment_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if db::get_appointment(&conn, appointment_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Appointment {appointment_id} not found"
        )));
    }

    if db::delete_owned_appointment(&conn, appointment_id, identity.user_id())? {
        tracing::info!(appointment_id, user_id = identity.user_id(), "Appointment cancelled");
        return ctx.redirect_with(
            &visitor,
            FlashKind::Success,
            "Appointment cancelled.",
            "/my-appointments",
        );
    }

    tracing::warn!(
        appointment_id,
        user_id = identity.user_id(),
        "Cancel refused: appointment owned by another user"
    );
    Ok(Redirect::to("/my-appointments").into_response())
}
