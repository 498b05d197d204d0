//! Reservation and cancellation coordinators.
//!
//! These are the only writers that touch more than one table per
//! operation. Each call validates its inputs, then runs all dependent
//! reads and writes inside a single immediate transaction; on any
//! failure the transaction rolls back, so a failed call never leaks a
//! dose, orphans a slot, or half-creates an appointment.

use tracing::{debug, info};

use crate::error::{Result, SchedulerError};
use crate::store::SchedulerStore;
use crate::{appointments, availability, inventory};
use vaxsched_domain::{
    validate_username, Appointment, AvailabilitySlot, DaySchedule, Requester, ScheduleDate,
    Vaccine,
};

impl SchedulerStore {
    /// Book an appointment for a patient.
    ///
    /// Assigns the lexicographically first caregiver available on the
    /// date, debits one dose of the vaccine, creates the appointment
    /// under a fresh `max(id) + 1` identifier, and consumes the
    /// caregiver's availability slot. All four mutations commit
    /// together or not at all.
    ///
    /// # Returns
    /// * `Ok(Appointment)` - The created appointment
    /// * `Err(SchedulerError::NoCaregiverAvailable)` - Nobody offers the date
    /// * `Err(SchedulerError::UnknownVaccine)` - No such vaccine
    /// * `Err(SchedulerError::NotEnoughDoses)` - Inventory exhausted
    pub fn reserve(&mut self, date: &str, vaccine_name: &str, patient: &str) -> Result<Appointment> {
        let date = ScheduleDate::parse(date)?;
        validate_username(patient)?;

        let appointment = self.with_write_tx(|tx| {
            let caregivers = availability::list_caregivers(tx, &date)?;
            let caregiver = caregivers
                .first()
                .cloned()
                .ok_or(SchedulerError::NoCaregiverAvailable(date))?;

            let vaccine = inventory::get(tx, vaccine_name)?
                .ok_or_else(|| SchedulerError::UnknownVaccine(vaccine_name.to_string()))?;
            inventory::decrease(tx, &vaccine.name, 1)?;

            let appointment = Appointment {
                id: appointments::next_id(tx)?,
                date,
                patient: patient.to_string(),
                caregiver: caregiver.clone(),
                vaccine: vaccine.name,
            };
            appointments::insert(tx, &appointment)?;
            availability::remove(tx, &date, &caregiver)?;

            Ok(appointment)
        })?;

        self.metrics_mut().reservations_total += 1;
        info!(
            id = appointment.id,
            date = %appointment.date,
            patient = %appointment.patient,
            caregiver = %appointment.caregiver,
            vaccine = %appointment.vaccine,
            "Appointment reserved"
        );
        Ok(appointment)
    }

    /// Cancel an appointment on behalf of one of its parties.
    ///
    /// Deletes the appointment, credits one dose back to its vaccine,
    /// and re-creates the consumed availability slot, atomically. An
    /// appointment that exists but belongs to someone else reports
    /// `NotFound`, identically to a nonexistent id, so callers cannot
    /// probe which ids exist.
    ///
    /// # Returns
    /// * `Err(SchedulerError::NotFound)` - No such appointment, or not
    ///   a party to it
    /// * `Err(SchedulerError::SlotConflict)` - The caregiver re-uploaded
    ///   the same date in the interim; nothing is changed
    pub fn cancel(&mut self, appointment_id: i64, requester: &Requester) -> Result<()> {
        validate_username(requester.username())?;

        self.with_write_tx(|tx| {
            let appointment = appointments::find_by_id(tx, appointment_id)?
                .ok_or(SchedulerError::NotFound(appointment_id))?;

            if !requester.owns(&appointment) {
                return Err(SchedulerError::NotFound(appointment_id));
            }

            appointments::delete(tx, appointment.id)?;
            inventory::increase(tx, &appointment.vaccine, 1)?;

            match availability::add(tx, &appointment.date, &appointment.caregiver) {
                Err(SchedulerError::DuplicateKey(_)) => Err(SchedulerError::SlotConflict {
                    date: appointment.date,
                    caregiver: appointment.caregiver.clone(),
                }),
                Err(e) => Err(e),
                Ok(_) => Ok(()),
            }
        })?;

        self.metrics_mut().cancellations_total += 1;
        info!(
            id = appointment_id,
            requester = %requester.username(),
            "Appointment cancelled"
        );
        Ok(())
    }

    /// Top up a vaccine's inventory, creating the vaccine on first use.
    ///
    /// # Returns
    /// * `Ok(Vaccine)` - The record after the top-up
    /// * `Err(SchedulerError::InvalidAmount)` - `amount` is zero
    pub fn add_doses(&mut self, vaccine_name: &str, amount: u32) -> Result<Vaccine> {
        if amount == 0 {
            return Err(SchedulerError::InvalidAmount(0));
        }

        let vaccine = self.with_write_tx(|tx| match inventory::get(tx, vaccine_name)? {
            Some(existing) => {
                inventory::increase(tx, &existing.name, amount)?;
                Ok(Vaccine {
                    doses: existing.doses + amount,
                    ..existing
                })
            }
            None => inventory::create(tx, vaccine_name, amount),
        })?;

        self.metrics_mut().dose_topups_total += 1;
        debug!(vaccine = %vaccine.name, doses = vaccine.doses, "Doses updated");
        Ok(vaccine)
    }

    /// Declare a caregiver's availability for a date.
    ///
    /// # Returns
    /// * `Err(SchedulerError::DuplicateKey)` - Already uploaded for this date
    pub fn upload_availability(&mut self, date: &str, caregiver: &str) -> Result<AvailabilitySlot> {
        let date = ScheduleDate::parse(date)?;
        validate_username(caregiver)?;

        let slot = self.with_write_tx(|tx| availability::add(tx, &date, caregiver))?;

        debug!(date = %slot.date, caregiver = %slot.caregiver, "Availability uploaded");
        Ok(slot)
    }

    /// Read-only view of a date: available caregivers plus the full
    /// vaccine inventory, both from one consistent snapshot.
    pub fn day_schedule(&mut self, date: &str) -> Result<DaySchedule> {
        let date = ScheduleDate::parse(date)?;

        let tx = self.conn.transaction()?;
        let caregivers = availability::list_caregivers(&tx, &date)?;
        let vaccines = inventory::list(&tx)?;
        tx.commit()?;

        Ok(DaySchedule {
            date,
            caregivers,
            vaccines,
        })
    }

    /// Appointments the requester is a party to, ordered by id
    /// ascending. A patient sees only their own bookings; a caregiver
    /// only the ones assigned to them.
    pub fn appointments_for(&self, requester: &Requester) -> Result<Vec<Appointment>> {
        validate_username(requester.username())?;

        match requester {
            Requester::Patient(username) => appointments::find_by_patient(&self.conn, username),
            Requester::Caregiver(username) => appointments::find_by_caregiver(&self.conn, username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SchedulerStore {
        SchedulerStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_reserve_rejects_malformed_date_before_storage() {
        let mut store = store();
        let err = store.reserve("not-a-date", "pfizer", "bob").unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(vaxsched_domain::DomainError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_reserve_rejects_empty_patient() {
        let mut store = store();
        let err = store.reserve("2024-06-01", "pfizer", "").unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(vaxsched_domain::DomainError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_reserve_with_no_availability() {
        let mut store = store();
        store.add_doses("pfizer", 10).unwrap();

        let err = store.reserve("2024-06-01", "pfizer", "bob").unwrap_err();
        assert!(matches!(err, SchedulerError::NoCaregiverAvailable(_)));
    }

    #[test]
    fn test_reserve_unknown_vaccine_leaves_slot_intact() {
        let mut store = store();
        store.upload_availability("2024-06-01", "alice").unwrap();

        let err = store.reserve("2024-06-01", "mystery", "bob").unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownVaccine(_)));

        // Rolled back: the slot is still there
        let schedule = store.day_schedule("2024-06-01").unwrap();
        assert_eq!(schedule.caregivers, ["alice"]);
    }

    #[test]
    fn test_reserve_out_of_doses_rolls_back() {
        let mut store = store();
        store.upload_availability("2024-06-01", "alice").unwrap();
        store.add_doses("pfizer", 1).unwrap();

        store.reserve("2024-06-01", "pfizer", "bob").unwrap();

        store.upload_availability("2024-06-01", "carol").unwrap();
        let err = store.reserve("2024-06-01", "pfizer", "dave").unwrap_err();
        assert!(matches!(err, SchedulerError::NotEnoughDoses(_)));

        // Carol's slot survives the failed booking
        let schedule = store.day_schedule("2024-06-01").unwrap();
        assert_eq!(schedule.caregivers, ["carol"]);
        assert_eq!(schedule.vaccines[0].doses, 0);
    }

    #[test]
    fn test_add_doses_rejects_zero() {
        let mut store = store();
        let err = store.add_doses("pfizer", 0).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidAmount(0)));
    }

    #[test]
    fn test_cancel_validates_requester_username() {
        let mut store = store();
        let err = store
            .cancel(1, &Requester::Patient(String::new()))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Domain(_)));
    }

    #[test]
    fn test_day_schedule_snapshot() {
        let mut store = store();
        store.upload_availability("2024-07-01", "bob").unwrap();
        store.upload_availability("2024-07-01", "alice").unwrap();
        store.add_doses("pfizer", 5).unwrap();
        store.add_doses("moderna", 3).unwrap();

        let schedule = store.day_schedule("2024-07-01").unwrap();
        assert_eq!(schedule.caregivers, ["alice", "bob"]);
        let names: Vec<&str> = schedule.vaccines.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["moderna", "pfizer"]);
    }
}
