//! Domain model for the vaccination appointment scheduler.
//!
//! This crate provides the pure types shared across the vaxsched
//! ecosystem: vaccines, availability slots, appointments, requester
//! identity, and calendar date validation. It has no storage
//! dependencies.

pub mod date;
pub mod error;
pub mod model;

pub use date::ScheduleDate;
pub use error::{DomainError, Result};
pub use model::{
    validate_username, Appointment, AvailabilitySlot, DaySchedule, Requester, Vaccine,
};
