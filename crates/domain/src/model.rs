//! Domain model types
//!
//! Records exchanged between the reservation engine and its callers.
//! Field names double as stable wire keys for embedding applications.

use serde::{Deserialize, Serialize};

use crate::date::ScheduleDate;
use crate::error::{DomainError, Result};

/// A vaccine and its remaining dose inventory.
///
/// The name is a unique, case-sensitive key. `doses` never goes
/// negative; the storage layer enforces this on every decrement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vaccine {
    /// Unique vaccine name.
    pub name: String,
    /// Remaining available doses.
    pub doses: u32,
}

/// A caregiver's self-declared openness to administer a vaccine on a
/// specific date. The (date, caregiver) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilitySlot {
    /// Date the caregiver is available.
    pub date: ScheduleDate,
    /// Caregiver username.
    pub caregiver: String,
}

/// A booked appointment.
///
/// This record is the durable source of truth needed to reverse a
/// booking: it retains the date, caregiver, and vaccine name so that
/// cancellation can re-create the availability slot and credit the
/// dose back to inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    /// Globally unique, strictly increasing identifier.
    pub id: i64,
    /// Appointment date.
    pub date: ScheduleDate,
    /// Patient username.
    pub patient: String,
    /// Assigned caregiver username.
    pub caregiver: String,
    /// Vaccine name, one dose of which this appointment consumed.
    pub vaccine: String,
}

/// The identity on whose behalf a core operation runs.
///
/// The core never derives identity from session state; the command
/// layer authenticates and passes one of these explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", content = "username", rename_all = "lowercase")]
pub enum Requester {
    /// An authenticated patient.
    Patient(String),
    /// An authenticated caregiver.
    Caregiver(String),
}

impl Requester {
    /// Username of the requester, regardless of role.
    pub fn username(&self) -> &str {
        match self {
            Requester::Patient(username) | Requester::Caregiver(username) => username,
        }
    }

    /// Whether this requester is a party to the given appointment.
    ///
    /// A patient owns the appointments they booked; a caregiver owns
    /// the appointments assigned to them.
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            Requester::Patient(username) => *username == appointment.patient,
            Requester::Caregiver(username) => *username == appointment.caregiver,
        }
    }
}

/// Read-only view of a single day: who is available, and what the
/// current vaccine inventory looks like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySchedule {
    /// The queried date.
    pub date: ScheduleDate,
    /// Available caregiver usernames, ascending.
    pub caregivers: Vec<String>,
    /// Full vaccine inventory, ordered by name.
    pub vaccines: Vec<Vaccine>,
}

/// Reject empty or whitespace-only usernames before they reach storage.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(DomainError::InvalidUsername(username.to_string()));
    }
    Ok(())
}
