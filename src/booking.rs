//! Booking rule check.
//!
//! A slot (doctor, date, time) is bookable when the date is today or later
//! and no appointment already occupies it. The occupancy check and the
//! insert happen in one statement against the UNIQUE (doctor_id, date, time)
//! index, so two concurrent requests for the same slot cannot both succeed.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::{self, DatabaseError};

/// Form date format (`<input type="date">`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reasons a booking request is turned away. The display text is the
/// message flashed to the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Error: Cannot book a date in the past!")]
    PastDate,
    #[error("This date and time is already reserved.")]
    AlreadyReserved,
    #[error("Please choose a valid date.")]
    InvalidDate,
    #[error("Please choose a time.")]
    MissingTime,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Rejected(Rejection),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<Rejection> for BookingError {
    fn from(rejection: Rejection) -> Self {
        BookingError::Rejected(rejection)
    }
}

/// A patient's request for one slot, as submitted.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest<'a> {
    pub doctor_id: i64,
    pub date: &'a str,
    pub time: &'a str,
    pub user_id: i64,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Rejection> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| Rejection::InvalidDate)
}

/// Dates strictly before `today` are rejected; today itself is bookable.
pub fn check_date(date: NaiveDate, today: NaiveDate) -> Result<(), Rejection> {
    if date < today {
        return Err(Rejection::PastDate);
    }
    Ok(())
}

/// Validate the request and reserve the slot for the requesting user.
///
/// Returns the new appointment id.
pub fn book_slot(
    conn: &Connection,
    request: SlotRequest<'_>,
    today: NaiveDate,
) -> Result<i64, BookingError> {
    let date = parse_date(request.date)?;
    check_date(date, today)?;

    let time = request.time.trim();
    if time.is_empty() {
        return Err(Rejection::MissingTime.into());
    }

    match db::insert_appointment_if_free(conn, request.doctor_id, date, time, request.user_id)? {
        Some(id) => {
            tracing::info!(
                appointment_id = id,
                doctor_id = request.doctor_id,
                user_id = request.user_id,
                %date,
                time,
                "Appointment booked"
            );
            Ok(id)
        }
        None => {
            tracing::debug!(doctor_id = request.doctor_id, %date, time, "Slot already taken");
            Err(Rejection::AlreadyReserved.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::NewDoctor;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    /// Returns (conn, doctor_id, patient_a, patient_b).
    fn setup() -> (Connection, i64, i64, i64) {
        let mut conn = open_memory_database().unwrap();
        let doctor = db::register_doctor(&mut conn, &NewDoctor {
            email: "doc1@clinic.com".into(),
            password_hash: "hash".into(),
            name: "Dr. Jessica Brown".into(),
            specialty: "Dentist".into(),
            img: "doctor1.jpg".into(),
            dept: "dental".into(),
        })
        .unwrap();
        let a = db::create_patient(&mut conn, "a@x.com", "hash", "A").unwrap();
        let b = db::create_patient(&mut conn, "b@x.com", "hash", "B").unwrap();
        (conn, doctor.id, a, b)
    }

    fn request<'a>(doctor_id: i64, date: &'a str, time: &'a str, user_id: i64) -> SlotRequest<'a> {
        SlotRequest { doctor_id, date, time, user_id }
    }

    #[test]
    fn yesterday_is_rejected() {
        let (conn, doc, a, _) = setup();
        let err = book_slot(&conn, request(doc, "2026-10-17", "10:00", a), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::PastDate)));
        assert!(err.to_string().contains("Cannot book a date in the past!"));
    }

    #[test]
    fn past_date_rejected_even_when_slot_free() {
        let (conn, doc, a, _) = setup();
        let err = book_slot(&conn, request(doc, "1999-01-01", "23:00", a), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::PastDate)));
        assert!(db::list_patient_appointments(&conn, a).unwrap().is_empty());
    }

    #[test]
    fn today_is_bookable() {
        let (conn, doc, a, _) = setup();
        assert!(book_slot(&conn, request(doc, "2026-10-18", "16:00", a), today()).is_ok());
    }

    #[test]
    fn second_booking_of_same_slot_rejected() {
        let (conn, doc, a, b) = setup();
        book_slot(&conn, request(doc, "2026-10-19", "10:00", a), today()).unwrap();
        let err = book_slot(&conn, request(doc, "2026-10-19", "10:00", b), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::AlreadyReserved)));
        assert!(err.to_string().contains("already reserved"));
    }

    #[test]
    fn same_patient_cannot_double_book_either() {
        let (conn, doc, a, _) = setup();
        book_slot(&conn, request(doc, "2026-10-19", "10:00", a), today()).unwrap();
        let err = book_slot(&conn, request(doc, "2026-10-19", "10:00", a), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::AlreadyReserved)));
    }

    #[test]
    fn malformed_date_rejected() {
        let (conn, doc, a, _) = setup();
        let err = book_slot(&conn, request(doc, "19/10/2026", "10:00", a), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::InvalidDate)));
    }

    #[test]
    fn blank_time_rejected() {
        let (conn, doc, a, _) = setup();
        let err = book_slot(&conn, request(doc, "2026-10-19", "  ", a), today()).unwrap_err();
        assert!(matches!(err, BookingError::Rejected(Rejection::MissingTime)));
    }

    #[test]
    fn booking_binds_requesting_user() {
        let (conn, doc, _, b) = setup();
        let id = book_slot(&conn, request(doc, "2026-12-01", "09:30", b), today()).unwrap();
        let appt = db::get_appointment(&conn, id).unwrap().unwrap();
        assert_eq!(appt.user_id, b);
        assert_eq!(appt.doctor_id, doc);
        assert_eq!(appt.time, "09:30");
    }

    #[test]
    fn concurrent_bookings_for_one_slot_yield_one_winner() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("race.db");
        let (doc, patients) = {
            let mut conn = db::open_database(&path).unwrap();
            let doctor = db::register_doctor(&mut conn, &NewDoctor {
                email: "doc@clinic.com".into(),
                password_hash: "hash".into(),
                name: "Dr. Race".into(),
                specialty: "GP".into(),
                img: "x.jpg".into(),
                dept: "general".into(),
            })
            .unwrap();
            let patients: Vec<i64> = (0..8)
                .map(|i| {
                    db::create_patient(&mut conn, &format!("p{i}@x.com"), "hash", "P").unwrap()
                })
                .collect();
            (doctor.id, patients)
        };

        let handles: Vec<_> = patients
            .into_iter()
            .map(|user_id| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let conn = db::open_database(&path).unwrap();
                    book_slot(&conn, request(doc, "2026-11-01", "10:00", user_id), today()).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
