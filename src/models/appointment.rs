use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub user_id: i64,
    pub doctor_id: i64,
}

/// Appointment as seen by the patient who booked it.
#[derive(Debug, Clone, Serialize)]
pub struct PatientAppointment {
    pub id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub doctor_specialty: String,
}

/// Appointment as seen on the doctor's schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledAppointment {
    pub id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_email: String,
}

/// A taken (date, time) pair on a doctor's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedSlot {
    pub date: NaiveDate,
    pub time: String,
}
