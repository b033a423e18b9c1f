use serde::Serialize;

/// Record written for every new patient account.
pub const REGISTRATION_RECORD: &str = "New Patient Registered";

#[derive(Debug, Clone, Serialize)]
pub struct MedicalHistory {
    pub id: i64,
    pub record: String,
    pub user_id: i64,
    pub recorded_at: String,
}
