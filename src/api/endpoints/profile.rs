//! Patient records: own profile, profile edits and the doctor's view of a
//! patient's history.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{encode_path_segment, ApiContext, Identity, PageView, Visitor};
use crate::db;
use crate::models::{FlashKind, MedicalHistory, ProfileUpdate, User};

/// Timestamp prefix of doctor-added history records, e.g. `Oct 18, 2026`.
const RECORD_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Serialize)]
pub struct PatientPage {
    pub patient: Option<User>,
    pub history: Vec<MedicalHistory>,
    pub view_only: bool,
}

#[derive(Serialize)]
pub struct EditProfilePage {
    pub patient: User,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub gender: String,
    pub age: String,
    pub address: String,
    pub phone: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct HistoryForm {
    pub new_record: String,
}

/// `GET /profile`: the caller's own record.
pub async fn show(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PageView<PatientPage>>, ApiError> {
    let history = db::list_history(&ctx.core.open_db()?, identity.user_id())?;
    ctx.page(
        &visitor,
        PatientPage {
            patient: Some(identity.user),
            history,
            view_only: false,
        },
    )
}

/// `GET /edit-profile`
pub async fn edit_page(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PageView<EditProfilePage>>, ApiError> {
    ctx.page(&visitor, EditProfilePage { patient: identity.user })
}

/// `POST /edit-profile`: overwrite the four editable fields.
pub async fn edit(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    let update = ProfileUpdate {
        gender: form.gender,
        age: form.age,
        address: form.address,
        phone: form.phone,
    };
    db::update_profile(&ctx.core.open_db()?, identity.user_id(), &update)?;
    tracing::info!(user_id = identity.user_id(), "Profile updated");

    ctx.redirect_with(&visitor, FlashKind::Success, "Profile updated successfully!", "/profile")
}

/// `GET /patient-history/:email`: a patient's record as seen by a doctor.
/// An unknown email yields a null patient.
pub async fn patient_history(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Path(email): Path<String>,
) -> Result<Json<PageView<PatientPage>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_user_by_email(&conn, &email)?;
    let history = match &patient {
        Some(p) => db::list_history(&conn, p.id)?,
        None => Vec::new(),
    };
    drop(conn);

    ctx.page(
        &visitor,
        PatientPage {
            patient,
            history,
            view_only: true,
        },
    )
}

/// `POST /add-history/:email`: append a dated note to a patient's history.
///
/// Unknown patients and blank notes are ignored without a message.
pub async fn add_history(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<Visitor>,
    Extension(identity): Extension<Identity>,
    Path(email): Path<String>,
    Form(form): Form<HistoryForm>,
) -> Result<Response, ApiError> {
    let back_to = format!("/patient-history/{}", encode_path_segment(&email));
    let text = form.new_record.trim();

    let conn = ctx.core.open_db()?;
    let patient = db::get_user_by_email(&conn, &email)?;

    match patient {
        Some(patient) if !text.is_empty() => {
            let stamp = Local::now().format(RECORD_DATE_FORMAT);
            let record_id = db::append_history(&conn, patient.id, &format!("{stamp}: {text}"))?;
            tracing::info!(
                record_id,
                patient_id = patient.id,
                doctor_user_id = identity.user_id(),
                "Medical record added"
            );
            ctx.redirect_with(&visitor, FlashKind::Success, "Medical record added!", &back_to)
        }
        _ => Ok(Redirect::to(&back_to).into_response()),
    }
}
