//! Inventory ledger: available doses per vaccine.
//!
//! Operations take a plain connection so they compose inside a
//! coordinator transaction (`rusqlite::Transaction` derefs to
//! `Connection`). The central safety invariant — `doses >= 0` at all
//! times — is enforced by a conditional UPDATE in [`decrease`]; the
//! schema-level CHECK constraint is only a backstop.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{is_constraint_violation, Result, SchedulerError};
use vaxsched_domain::Vaccine;

/// Look up a vaccine by name.
pub fn get(conn: &Connection, name: &str) -> Result<Option<Vaccine>> {
    let mut stmt = conn.prepare("SELECT name, doses FROM vaccines WHERE name = ?1")?;

    let vaccine = stmt
        .query_row([name], |row| {
            Ok(Vaccine {
                name: row.get(0)?,
                doses: row.get(1)?,
            })
        })
        .optional()?;

    Ok(vaccine)
}

/// Create a vaccine with an initial dose count.
///
/// # Returns
/// * `Ok(Vaccine)` - The created record
/// * `Err(SchedulerError::DuplicateKey)` - The name already exists
pub fn create(conn: &Connection, name: &str, doses: u32) -> Result<Vaccine> {
    let inserted = conn.execute(
        "INSERT INTO vaccines (name, doses) VALUES (?1, ?2)",
        params![name, doses],
    );

    match inserted {
        Ok(_) => {
            debug!(vaccine = %name, doses, "Vaccine created");
            Ok(Vaccine {
                name: name.to_string(),
                doses,
            })
        }
        Err(e) if is_constraint_violation(&e) => {
            Err(SchedulerError::DuplicateKey(format!("vaccine {name}")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Add doses to an existing vaccine. There is no upper bound.
///
/// # Returns
/// * `Err(SchedulerError::UnknownVaccine)` - No vaccine with this name
pub fn increase(conn: &Connection, name: &str, amount: u32) -> Result<()> {
    let updated = conn.execute(
        "UPDATE vaccines SET doses = doses + ?1 WHERE name = ?2",
        params![amount, name],
    )?;

    if updated == 0 {
        return Err(SchedulerError::UnknownVaccine(name.to_string()));
    }

    debug!(vaccine = %name, amount, "Inventory increased");
    Ok(())
}

/// Remove doses from an existing vaccine.
///
/// The UPDATE only applies when `doses >= amount`, so the count can
/// never go negative no matter how calls interleave.
///
/// # Returns
/// * `Err(SchedulerError::NotEnoughDoses)` - Fewer than `amount` doses left
/// * `Err(SchedulerError::UnknownVaccine)` - No vaccine with this name
pub fn decrease(conn: &Connection, name: &str, amount: u32) -> Result<()> {
    let updated = conn.execute(
        "UPDATE vaccines SET doses = doses - ?1 WHERE name = ?2 AND doses >= ?1",
        params![amount, name],
    )?;

    if updated == 0 {
        return match get(conn, name)? {
            Some(_) => Err(SchedulerError::NotEnoughDoses(name.to_string())),
            None => Err(SchedulerError::UnknownVaccine(name.to_string())),
        };
    }

    debug!(vaccine = %name, amount, "Inventory decreased");
    Ok(())
}

/// Full inventory listing, ordered by vaccine name.
pub fn list(conn: &Connection) -> Result<Vec<Vaccine>> {
    let mut stmt = conn.prepare("SELECT name, doses FROM vaccines ORDER BY name ASC")?;

    let vaccines = stmt
        .query_map([], |row| {
            Ok(Vaccine {
                name: row.get(0)?,
                doses: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(vaccines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SchedulerStore;

    fn store() -> SchedulerStore {
        SchedulerStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let created = create(&store.conn, "pfizer", 10).unwrap();
        assert_eq!(created.doses, 10);

        let fetched = get(&store.conn, "pfizer").unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(get(&store.conn, "moderna").unwrap().is_none());
    }

    #[test]
    fn test_create_duplicate_fails() {
        let store = store();
        create(&store.conn, "pfizer", 10).unwrap();
        let err = create(&store.conn, "pfizer", 5).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateKey(_)));
    }

    #[test]
    fn test_vaccine_names_are_case_sensitive() {
        let store = store();
        create(&store.conn, "pfizer", 10).unwrap();
        create(&store.conn, "Pfizer", 3).unwrap();
        assert_eq!(get(&store.conn, "pfizer").unwrap().unwrap().doses, 10);
        assert_eq!(get(&store.conn, "Pfizer").unwrap().unwrap().doses, 3);
    }

    #[test]
    fn test_increase_and_decrease() {
        let store = store();
        create(&store.conn, "pfizer", 10).unwrap();

        increase(&store.conn, "pfizer", 5).unwrap();
        assert_eq!(get(&store.conn, "pfizer").unwrap().unwrap().doses, 15);

        decrease(&store.conn, "pfizer", 15).unwrap();
        assert_eq!(get(&store.conn, "pfizer").unwrap().unwrap().doses, 0);
    }

    #[test]
    fn test_increase_unknown_vaccine() {
        let store = store();
        let err = increase(&store.conn, "nope", 1).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownVaccine(_)));
    }

    #[test]
    fn test_decrease_at_zero_fails_and_leaves_zero() {
        let store = store();
        create(&store.conn, "pfizer", 0).unwrap();

        let err = decrease(&store.conn, "pfizer", 1).unwrap_err();
        assert!(matches!(err, SchedulerError::NotEnoughDoses(_)));
        assert_eq!(get(&store.conn, "pfizer").unwrap().unwrap().doses, 0);
    }

    #[test]
    fn test_decrease_more_than_available_fails() {
        let store = store();
        create(&store.conn, "pfizer", 3).unwrap();

        let err = decrease(&store.conn, "pfizer", 4).unwrap_err();
        assert!(matches!(err, SchedulerError::NotEnoughDoses(_)));
        assert_eq!(get(&store.conn, "pfizer").unwrap().unwrap().doses, 3);
    }

    #[test]
    fn test_decrease_unknown_vaccine() {
        let store = store();
        let err = decrease(&store.conn, "nope", 1).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownVaccine(_)));
    }

    #[test]
    fn test_list_orders_by_name() {
        let store = store();
        create(&store.conn, "moderna", 2).unwrap();
        create(&store.conn, "astrazeneca", 1).unwrap();
        create(&store.conn, "pfizer", 3).unwrap();

        let names: Vec<String> = list(&store.conn)
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, ["astrazeneca", "moderna", "pfizer"]);
    }
}
