use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::*;

/// Append a history entry. Entries are never edited afterwards.
pub fn append_history(conn: &Connection, user_id: i64, record: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medical_history (record, user_id) VALUES (?1, ?2)",
        params![record, user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// History of a user in the order it was written.
pub fn list_history(conn: &Connection, user_id: i64) -> Result<Vec<MedicalHistory>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, record, user_id, recorded_at FROM medical_history
         WHERE user_id = ?1
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok(MedicalHistory {
            id: row.get(0)?,
            record: row.get(1)?,
            user_id: row.get(2)?,
            recorded_at: row.get(3)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
