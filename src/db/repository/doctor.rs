use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, name, specialty, img, dept, user_id";

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        img: row.get(3)?,
        dept: row.get(4)?,
        user_id: row.get(5)?,
    })
}

/// Create a doctor's login account and listing entry in one transaction.
///
/// The listing references the account through `doctors.user_id`, so the
/// dashboard no longer depends on names matching.
pub fn register_doctor(conn: &mut Connection, new: &NewDoctor) -> Result<Doctor, DatabaseError> {
    let tx = conn.transaction()?;
    let user_id = super::insert_user(
        &tx,
        &NewUser {
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            fullname: new.name.clone(),
            role: Role::Doctor,
        },
    )?;
    tx.execute(
        "INSERT INTO doctors (name, specialty, img, dept, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new.name, new.specialty, new.img, new.dept, user_id],
    )?;
    let doctor = Doctor {
        id: tx.last_insert_rowid(),
        name: new.name.clone(),
        specialty: new.specialty.clone(),
        img: new.img.clone(),
        dept: new.dept.clone(),
        user_id: Some(user_id),
    };
    tx.commit()?;

    tracing::info!(doctor_id = doctor.id, user_id, "Doctor registered");
    Ok(doctor)
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY id"))?;
    let rows = stmt.query_map([], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

/// Doctor listing linked to the given login account.
pub fn get_doctor_by_user(conn: &Connection, user_id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1"),
            params![user_id],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}
