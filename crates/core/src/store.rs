//! SQLite-backed storage engine for the scheduler.
//!
//! The store owns the database connection and the three tables the
//! coordinators touch: vaccines, availabilities, and appointments.
//! Writers run inside immediate transactions so that competing
//! coordinator calls serialize at the database level; transient
//! busy/locked conflicts are retried up to a configured budget, while
//! business-rule failures surface immediately.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::error::Result;

/// Operational counters for the scheduler.
#[derive(Debug, Default, Clone)]
pub struct SchedulerMetrics {
    /// Total successful reservations.
    pub reservations_total: u64,
    /// Total successful cancellations.
    pub cancellations_total: u64,
    /// Total successful dose top-ups.
    pub dose_topups_total: u64,
    /// Total write transactions retried after a busy/locked conflict.
    pub storage_retries_total: u64,
}

/// Scheduler storage engine with SQLite backend.
pub struct SchedulerStore {
    /// SQLite database connection.
    pub(crate) conn: Connection,
    /// Retry budget for busy/locked write transactions.
    max_write_retries: u32,
    /// Metrics.
    metrics: SchedulerMetrics,
}

impl SchedulerStore {
    /// Create or open a scheduler database at the specified path with
    /// default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = SchedulerConfig::default_config();
        config.storage.path = path.as_ref().to_path_buf();
        Self::open_with_config(&config)
    }

    /// Create or open a scheduler database using the given configuration.
    ///
    /// # Returns
    /// * `Ok(SchedulerStore)` - Successfully opened store
    /// * `Err(SchedulerError)` - Failed to open or initialize database
    pub fn open_with_config(config: &SchedulerConfig) -> Result<Self> {
        let path = &config.storage.path;

        info!(
            path = %path.display(),
            busy_timeout_ms = config.storage.busy_timeout_ms,
            "Opening scheduler store"
        );

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // WAL mode for better concurrency and durability
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::configure(&conn, config)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn,
            max_write_retries: config.storage.max_write_retries,
            metrics: SchedulerMetrics::default(),
        })
    }

    /// Open an in-memory store.
    ///
    /// Useful for tests and for embedding callers that do not need
    /// durability.
    pub fn open_in_memory() -> Result<Self> {
        let config = SchedulerConfig::default_config();
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn, &config)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            max_write_retries: config.storage.max_write_retries,
            metrics: SchedulerMetrics::default(),
        })
    }

    fn configure(conn: &Connection, config: &SchedulerConfig) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_millis(
            config.storage.busy_timeout_ms,
        ))?;
        Ok(())
    }

    /// Initialize database schema.
    ///
    /// `CHECK (doses >= 0)` is the database-level backstop for the
    /// central inventory invariant; the inventory module still enforces
    /// it with a conditional UPDATE so the failure is reported as
    /// `NotEnoughDoses` rather than a constraint violation.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vaccines (
                name  TEXT PRIMARY KEY,
                doses INTEGER NOT NULL CHECK (doses >= 0)
            );

            CREATE TABLE IF NOT EXISTS availabilities (
                slot_date TEXT NOT NULL,
                caregiver TEXT NOT NULL,
                PRIMARY KEY (slot_date, caregiver)
            );

            CREATE TABLE IF NOT EXISTS appointments (
                id        INTEGER PRIMARY KEY,
                slot_date TEXT NOT NULL,
                patient   TEXT NOT NULL,
                caregiver TEXT NOT NULL,
                vaccine   TEXT NOT NULL REFERENCES vaccines(name)
            );

            CREATE INDEX IF NOT EXISTS idx_availabilities_date ON availabilities(slot_date);
            CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient);
            CREATE INDEX IF NOT EXISTS idx_appointments_caregiver ON appointments(caregiver);
            "#,
        )?;

        Ok(())
    }

    /// Run a write transaction with immediate locking and bounded
    /// retry on busy/locked conflicts.
    ///
    /// The closure may run more than once; it must derive everything it
    /// writes from reads made inside the same invocation. On any error
    /// the transaction rolls back, leaving all tables untouched.
    pub(crate) fn with_write_tx<T, F>(&mut self, mut f: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome: Result<T> = (|| {
                let tx = self
                    .conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)?;
                let value = f(&tx)?;
                tx.commit()?;
                Ok(value)
            })();

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.max_write_retries => {
                    attempt += 1;
                    self.metrics.storage_retries_total += 1;
                    warn!(
                        attempt,
                        error = %err,
                        "Transient storage conflict, retrying write transaction"
                    );
                }
                outcome => return outcome,
            }
        }
    }

    /// Get scheduler metrics.
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut SchedulerMetrics {
        &mut self.metrics
    }

    /// Get the database path.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(self.conn.path().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;

    #[test]
    fn test_open_creates_database_file() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("test_store_{}.db", uuid::Uuid::new_v4()));

        let store = SchedulerStore::open(&db_path).unwrap();
        assert_eq!(store.db_path(), db_path);
        assert_eq!(store.metrics().reservations_total, 0);
        drop(store);

        assert!(db_path.exists());
        std::fs::remove_file(&db_path).ok();
    }

    #[test]
    fn test_schema_survives_reopen() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("test_store_{}.db", uuid::Uuid::new_v4()));

        {
            let mut store = SchedulerStore::open(&db_path).unwrap();
            store.add_doses("pfizer", 5).unwrap();
        }
        {
            let mut store = SchedulerStore::open(&db_path).unwrap();
            let vaccine = store.add_doses("pfizer", 1).unwrap();
            assert_eq!(vaccine.doses, 6);
        }

        std::fs::remove_file(db_path).ok();
    }

    #[test]
    fn test_write_tx_rolls_back_on_error() {
        let mut store = SchedulerStore::open_in_memory().unwrap();

        let result: crate::error::Result<()> = store.with_write_tx(|tx| {
            crate::inventory::create(tx, "pfizer", 5)?;
            Err(SchedulerError::InvalidAmount(0))
        });
        assert!(result.is_err());

        // The insert inside the failed transaction must not be visible
        assert!(crate::inventory::get(&store.conn, "pfizer")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_doses_check_constraint_backstop() {
        let store = SchedulerStore::open_in_memory().unwrap();
        let result = store.conn.execute(
            "INSERT INTO vaccines (name, doses) VALUES ('bad', -1)",
            [],
        );
        assert!(result.is_err());
    }
}
