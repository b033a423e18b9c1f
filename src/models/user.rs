use serde::Serialize;

use super::enums::Role;

/// A registered account: patient or doctor.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub fullname: String,
    pub role: Role,
    pub gender: String,
    pub age: String,
    pub address: String,
    pub phone: String,
}

impl User {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub fullname: String,
    pub role: Role,
}

/// Editable profile fields. Stored verbatim; `age` stays free text.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub gender: String,
    pub age: String,
    pub address: String,
    pub phone: String,
}
