//! Appointment ledger.
//!
//! Appointments are keyed by a strictly increasing integer assigned as
//! `max(id) + 1` (1 when the ledger is empty). The id is computed with
//! [`next_id`] inside the same transaction as the insert it serves, so
//! two concurrent reservations can never claim the same id.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Result, SchedulerError};
use vaxsched_domain::{Appointment, ScheduleDate};

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        date: ScheduleDate(row.get(1)?),
        patient: row.get(2)?,
        caregiver: row.get(3)?,
        vaccine: row.get(4)?,
    })
}

const APPOINTMENT_COLUMNS: &str = "id, slot_date, patient, caregiver, vaccine";

/// Next free appointment id: `max(id) + 1`, or 1 when the ledger is
/// empty. Only meaningful inside the transaction that performs the
/// matching insert.
pub fn next_id(conn: &Connection) -> Result<i64> {
    let id = conn.query_row(
        "SELECT COALESCE(MAX(id), 0) + 1 FROM appointments",
        [],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Insert an appointment record.
pub fn insert(conn: &Connection, appointment: &Appointment) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO appointments (id, slot_date, patient, caregiver, vaccine)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            appointment.id,
            appointment.date.0,
            appointment.patient,
            appointment.caregiver,
            appointment.vaccine,
        ],
    )?;

    debug!(
        id = appointment.id,
        patient = %appointment.patient,
        caregiver = %appointment.caregiver,
        "Appointment inserted"
    );
    Ok(())
}

/// Look up an appointment by id.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;

    let appointment = stmt.query_row([id], map_appointment).optional()?;
    Ok(appointment)
}

/// All appointments booked by a patient, ordered by id ascending.
pub fn find_by_patient(conn: &Connection, patient: &str) -> Result<Vec<Appointment>> {
    find_by_column(conn, "patient", patient)
}

/// All appointments assigned to a caregiver, ordered by id ascending.
pub fn find_by_caregiver(conn: &Connection, caregiver: &str) -> Result<Vec<Appointment>> {
    find_by_column(conn, "caregiver", caregiver)
}

fn find_by_column(conn: &Connection, column: &str, username: &str) -> Result<Vec<Appointment>> {
    // column is one of two compile-time literals, never user input
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE {column} = ?1 ORDER BY id ASC"
    ))?;

    let appointments = stmt
        .query_map([username], map_appointment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(appointments)
}

/// Delete an appointment record.
///
/// # Returns
/// * `Err(SchedulerError::NotFound)` - No appointment with this id
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", [id])?;

    if deleted == 0 {
        return Err(SchedulerError::NotFound(id));
    }

    debug!(id, "Appointment deleted");
    Ok(())
}
