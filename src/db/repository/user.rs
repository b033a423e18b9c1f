use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, email, password_hash, fullname, role, gender, age, address, phone";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        fullname: row.get(3)?,
        role: Role::from_str(&role)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        gender: row.get(5)?,
        age: row.get(6)?,
        address: row.get(7)?,
        phone: row.get(8)?,
    })
}

pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (email, password_hash, fullname, role) VALUES (?1, ?2, ?3, ?4)",
        params![user.email, user.password_hash, user.fullname, user.role.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Create a patient account together with its first history record.
///
/// Both rows are written in one transaction. A duplicate email surfaces
/// as a UNIQUE violation (see [`DatabaseError::is_unique_violation`]).
pub fn create_patient(
    conn: &mut Connection,
    email: &str,
    password_hash: &str,
    fullname: &str,
) -> Result<i64, DatabaseError> {
    let tx = conn.transaction()?;
    let user_id = insert_user(
        &tx,
        &NewUser {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            fullname: fullname.to_string(),
            role: Role::Patient,
        },
    )?;
    super::append_history(&tx, user_id, REGISTRATION_RECORD)?;
    tx.commit()?;

    tracing::info!(user_id, "Patient account created");
    Ok(user_id)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Overwrite the editable profile fields of a user.
pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    update: &ProfileUpdate,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET gender = ?1, age = ?2, address = ?3, phone = ?4 WHERE id = ?5",
        params![update.gender, update.age, update.address, update.phone, user_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user_id.to_string(),
        });
    }
    Ok(())
}
