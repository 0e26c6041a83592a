use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::timestamp;

/// Calendar day an entry is booked against, stored as `[year, zero-based month, day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkDate(pub i32, pub u32, pub u32);

impl WorkDate {
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.year(), date.month0(), date.day())
    }

    pub fn today() -> Self {
        Self::from_naive(chrono::Local::now().date_naive())
    }

    /// Returns `None` when the stored triple is not a real calendar day.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, self.1 + 1, self.2)
    }

    /// Parses `YYYY-MM-DD` (one-based month, as typed by humans).
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(Self::from_naive)
    }
}

impl fmt::Display for WorkDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0, self.1 + 1, self.2)
    }
}

/// A single timed piece of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogEntry {
    #[serde(rename = "key")]
    pub id: Uuid,
    pub project_name: String,
    #[serde(default)]
    pub notes: String,
    pub seconds: u64,
    pub date: WorkDate,
    #[serde(with = "timestamp")]
    pub date_creation: DateTime<Utc>,
    #[serde(default)]
    pub is_paid: bool,
    /// Set on entries loaded as part of a shared view; never hashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_key: Option<Uuid>,
}

impl WorkLogEntry {
    pub fn new(project_name: impl Into<String>, seconds: u64, date: WorkDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_name: project_name.into(),
            notes: String::new(),
            seconds,
            date,
            date_creation: timestamp::now(),
            is_paid: false,
            link_key: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_paid(mut self, is_paid: bool) -> Self {
        self.is_paid = is_paid;
        self
    }

    pub fn with_date_creation(mut self, date_creation: DateTime<Utc>) -> Self {
        self.date_creation = date_creation;
        self
    }
}

impl fmt::Display for WorkLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}s{}",
            self.date,
            self.project_name,
            self.seconds,
            if self.is_paid { " (paid)" } else { "" }
        )?;
        if !self.notes.is_empty() {
            write!(f, " - {}", self.notes)?;
        }
        Ok(())
    }
}
