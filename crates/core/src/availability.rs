//! Availability table: open (date, caregiver) slots.
//!
//! A caregiver offers at most one slot per date; the composite primary
//! key enforces uniqueness. Slots are consumed by reservations and
//! re-created by cancellations.

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{is_constraint_violation, Result, SchedulerError};
use vaxsched_domain::{AvailabilitySlot, ScheduleDate};

/// Insert an availability slot.
///
/// # Returns
/// * `Err(SchedulerError::DuplicateKey)` - The (date, caregiver) pair
///   already exists
pub fn add(conn: &Connection, date: &ScheduleDate, caregiver: &str) -> Result<AvailabilitySlot> {
    let inserted = conn.execute(
        "INSERT INTO availabilities (slot_date, caregiver) VALUES (?1, ?2)",
        params![date.0, caregiver],
    );

    match inserted {
        Ok(_) => {
            debug!(date = %date, caregiver = %caregiver, "Availability slot added");
            Ok(AvailabilitySlot {
                date: *date,
                caregiver: caregiver.to_string(),
            })
        }
        Err(e) if is_constraint_violation(&e) => Err(SchedulerError::DuplicateKey(format!(
            "availability ({date}, {caregiver})"
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Caregivers available on a date, sorted ascending by username.
///
/// The ascending order is the deterministic tie-break the reservation
/// coordinator relies on when assigning a caregiver.
pub fn list_caregivers(conn: &Connection, date: &ScheduleDate) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT caregiver FROM availabilities
        WHERE slot_date = ?1
        ORDER BY caregiver ASC
        "#,
    )?;

    let caregivers = stmt
        .query_map([date.0], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(caregivers)
}

/// Remove a specific availability slot.
///
/// Callers only remove slots they just observed inside the same
/// transaction, so a missing row is an error, not a no-op.
///
/// # Returns
/// * `Err(SchedulerError::SlotNotFound)` - No such (date, caregiver) pair
pub fn remove(conn: &Connection, date: &ScheduleDate, caregiver: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM availabilities WHERE slot_date = ?1 AND caregiver = ?2",
        params![date.0, caregiver],
    )?;

    if deleted == 0 {
        return Err(SchedulerError::SlotNotFound {
            date: *date,
            caregiver: caregiver.to_string(),
        });
    }

    debug!(date = %date, caregiver = %caregiver, "Availability slot removed");
    Ok(())
}
