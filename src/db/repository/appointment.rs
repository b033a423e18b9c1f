use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

/// Insert an appointment unless the (doctor, date, time) slot is taken.
///
/// Returns `None` when the slot already holds an appointment. The check
/// and the insert are one statement, so concurrent callers cannot both
/// win the same slot.
pub fn insert_appointment_if_free(
    conn: &Connection,
    doctor_id: i64,
    date: NaiveDate,
    time: &str,
    user_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO appointments (date, time, user_id, doctor_id)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (doctor_id, date, time) DO NOTHING",
        params![date, time, user_id, doctor_id],
    )?;
    if inserted == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let appointment = conn
        .query_row(
            "SELECT id, date, time, user_id, doctor_id FROM appointments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Appointment {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    time: row.get(2)?,
                    user_id: row.get(3)?,
                    doctor_id: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(appointment)
}

/// Delete an appointment only if `user_id` owns it. Returns whether a row
/// was removed.
pub fn delete_owned_appointment(
    conn: &Connection,
    id: i64,
    user_id: i64,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(deleted > 0)
}

/// Appointments booked by a patient, soonest first.
pub fn list_patient_appointments(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<PatientAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.date, a.time, d.id, d.name, d.specialty
         FROM appointments a
         JOIN doctors d ON a.doctor_id = d.id
         WHERE a.user_id = ?1
         ORDER BY a.date ASC, a.time ASC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok(PatientAppointment {
            id: row.get(0)?,
            date: row.get(1)?,
            time: row.get(2)?,
            doctor_id: row.get(3)?,
            doctor_name: row.get(4)?,
            doctor_specialty: row.get(5)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// A doctor's schedule with patient contact details, soonest first.
pub fn list_doctor_appointments(
    conn: &Connection,
    doctor_id: i64,
) -> Result<Vec<ScheduledAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.date, a.time, u.id, u.fullname, u.email
         FROM appointments a
         JOIN users u ON a.user_id = u.id
         WHERE a.doctor_id = ?1
         ORDER BY a.date ASC, a.time ASC",
    )?;

    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(ScheduledAppointment {
            id: row.get(0)?,
            date: row.get(1)?,
            time: row.get(2)?,
            patient_id: row.get(3)?,
            patient_name: row.get(4)?,
            patient_email: row.get(5)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Taken slots for a doctor on or after `from`.
pub fn reserved_slots(
    conn: &Connection,
    doctor_id: i64,
    from: NaiveDate,
) -> Result<Vec<ReservedSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT date, time FROM appointments
         WHERE doctor_id = ?1 AND date >= ?2
         ORDER BY date ASC, time ASC",
    )?;

    let rows = stmt.query_map(params![doctor_id, from], |row| {
        Ok(ReservedSlot {
            date: row.get(0)?,
            time: row.get(1)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}
