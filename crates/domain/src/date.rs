//! Calendar date validation.
//!
//! The scheduler exchanges dates with its callers as `YYYY-MM-DD`
//! strings. `ScheduleDate` is the validated form; malformed input is
//! rejected here, before any storage is touched.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// A validated calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleDate(pub NaiveDate);

impl ScheduleDate {
    /// Parse a `YYYY-MM-DD` string.
    ///
    /// # Returns
    /// * `Ok(ScheduleDate)` - Valid calendar date
    /// * `Err(DomainError::InvalidDate)` - Malformed or impossible date
    pub fn parse(input: &str) -> Result<Self> {
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DomainError::InvalidDate(input.to_string()))
    }
}

impl fmt::Display for ScheduleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for ScheduleDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for ScheduleDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}
