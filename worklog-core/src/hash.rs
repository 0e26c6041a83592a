//! Content digests of work-log collections.
//!
//! The digest is SHA-256 over the JSON serialization of the entries, in the
//! order given. Callers that need reproducible digests across replicas pass
//! entries through [`canonical_order`] first; the coordinator always does.
//! The link-association field is not part of the hashed form, so a pulled
//! view hashes the same as the log it was published from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{timestamp, WorkDate, WorkLogEntry};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedEntry<'a> {
    key: &'a Uuid,
    project_name: &'a str,
    notes: &'a str,
    seconds: u64,
    date: &'a WorkDate,
    #[serde(with = "timestamp")]
    date_creation: DateTime<Utc>,
    is_paid: bool,
}

impl<'a> From<&'a WorkLogEntry> for HashedEntry<'a> {
    fn from(entry: &'a WorkLogEntry) -> Self {
        Self {
            key: &entry.id,
            project_name: &entry.project_name,
            notes: &entry.notes,
            seconds: entry.seconds,
            date: &entry.date,
            date_creation: entry.date_creation,
            is_paid: entry.is_paid,
        }
    }
}

pub struct ContentHasher;

impl ContentHasher {
    /// Lower-case hex SHA-256 of the entries' canonical serialization.
    pub fn digest(entries: &[WorkLogEntry]) -> String {
        let hashed: Vec<HashedEntry<'_>> = entries.iter().map(HashedEntry::from).collect();
        // Fixed shape of strings and integers; serialization cannot fail.
        let bytes = serde_json::to_vec(&hashed).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Returns the entries stably sorted by id, the order digests are taken in.
pub fn canonical_order(entries: &[WorkLogEntry]) -> Vec<WorkLogEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}

/// Digest of the entries in canonical order.
pub fn canonical_digest(entries: &[WorkLogEntry]) -> String {
    ContentHasher::digest(&canonical_order(entries))
}
