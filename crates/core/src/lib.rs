//! Vaccination appointment reservation and inventory-consistency engine.
//!
//! This crate owns the three stored collections of the scheduler —
//! vaccine inventory, caregiver availability, and the appointment
//! ledger — and the two coordinators that mutate more than one of them
//! at a time:
//!
//! - Reservation: match a patient to the lexicographically first
//!   available caregiver on a date, debit one dose, create the
//!   appointment, and consume the availability slot, atomically.
//! - Cancellation: validate ownership, delete the appointment, credit
//!   the dose back, and re-create the availability slot, atomically.
//!
//! Every coordinator call runs inside a single SQLite transaction; a
//! failed call leaves all three collections exactly as they were. The
//! core is stateless between calls and performs no user-facing output;
//! authentication and command parsing live in the embedding
//! application.

pub mod appointments;
pub mod availability;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod store;

pub use config::{SchedulerConfig, StorageConfig};
pub use error::{Result, SchedulerError};
pub use store::{SchedulerMetrics, SchedulerStore};
pub use vaxsched_domain::{
    Appointment, AvailabilitySlot, DaySchedule, DomainError, Requester, ScheduleDate, Vaccine,
};
