//! Full-log export and import.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::models::WorkLogEntry;
use crate::worklog::WorkLogRepository;

/// Serialized form: `{"entries": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkLogDump {
    pub entries: Vec<WorkLogEntry>,
}

impl WorkLogDump {
    pub fn parse(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::MalformedDump(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string_pretty(self).map_err(|e| SyncError::MalformedDump(e.to_string()))
    }
}

/// Every stored entry, linked or not, in creation order.
pub async fn export(repo: &WorkLogRepository) -> Result<String, SyncError> {
    let dump = WorkLogDump {
        entries: repo.list_all().await?,
    };
    dump.to_json()
}

/// Re-creates each entry under its original id.
///
/// The whole document is parsed before anything is written, so a malformed
/// dump changes nothing. Returns the number of entries written.
pub async fn import(repo: &WorkLogRepository, json: &str) -> Result<usize, SyncError> {
    let dump = WorkLogDump::parse(json)?;
    let written = repo.upsert_all(&dump.entries).await?;
    tracing::info!(entries = written, "Imported work log");
    Ok(written)
}
