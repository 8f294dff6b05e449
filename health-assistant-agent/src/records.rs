//! Appointment and health-record stubs
//!
//! Neither type keeps state; they return fixed-shape data until a real
//! scheduling or records backend exists.

use serde::{Deserialize, Serialize};

/// Status given to every newly requested appointment
pub const PENDING_STATUS: &str = "待确认";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentConfirmation {
    pub success: bool,
    pub appointment_id: String,
    pub doctor: String,
    pub date: String,
    pub time: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentManager;

impl AppointmentManager {
    pub fn new() -> Self {
        Self
    }

    pub fn create_appointment(&self, doctor: &str, date: &str, time: &str) -> AppointmentConfirmation {
        AppointmentConfirmation {
            success: true,
            appointment_id: format!("apt_{}_{}", date, time),
            doctor: doctor.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            status: PENDING_STATUS.to_string(),
        }
    }

    pub fn get_appointments(&self) -> Vec<AppointmentConfirmation> {
        Vec::new()
    }
}

/// A stored record matched by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMatch {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthRecordRetriever;

impl HealthRecordRetriever {
    pub fn new() -> Self {
        Self
    }

    pub fn retrieve(&self, _query: &str) -> Vec<RecordMatch> {
        Vec::new()
    }
}
