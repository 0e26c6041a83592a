use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::WorkLogEntry;
use super::timestamp;

/// A published snapshot of the work log, addressed by an opaque key.
///
/// The same shape is used for the local cache row and for the document
/// returned by `GET /{key}`. Only the local copy is guaranteed to carry
/// `worklog`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableLink {
    pub key: Uuid,
    pub content_hash: String,
    #[serde(default)]
    pub worklog: Vec<WorkLogEntry>,
    #[serde(with = "timestamp")]
    pub date_creation: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub date_modification: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
}

impl ShareableLink {
    pub fn new(key: Uuid, content_hash: impl Into<String>, worklog: Vec<WorkLogEntry>) -> Self {
        Self {
            key,
            content_hash: content_hash.into(),
            worklog,
            date_creation: timestamp::now(),
            date_modification: None,
            view_count: 0,
        }
    }

    pub fn metadata(&self) -> LinkMetadata {
        LinkMetadata {
            key: self.key,
            content_hash: self.content_hash.clone(),
            date_creation: self.date_creation,
            date_modification: self.date_modification,
            view_count: self.view_count,
        }
    }
}

/// Remote-owned fields of a link, as returned by `POST /metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    pub key: Uuid,
    pub content_hash: String,
    #[serde(with = "timestamp")]
    pub date_creation: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub date_modification: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
}

/// Metadata recomputed by the remote after an overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedMetadata {
    pub content_hash: String,
    #[serde(default, with = "timestamp::option")]
    pub date_modification: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_link_has_no_modification() {
        let link = ShareableLink::new(Uuid::new_v4(), "abc", Vec::new());
        assert!(link.date_modification.is_none());
        assert_eq!(link.view_count, 0);
        assert_eq!(link.metadata().content_hash, "abc");
    }

    #[test]
    fn test_remote_document_without_modification() {
        let json = r#"{
            "key": "0b6c3c4e-5f00-4e8b-9df0-5a1d4c0f2e10",
            "contentHash": "abc",
            "worklog": [],
            "dateCreation": "2023-01-01T00:00:00.000Z",
            "viewCount": 4
        }"#;
        let link: ShareableLink = serde_json::from_str(json).unwrap();
        assert!(link.date_modification.is_none());
        assert_eq!(link.view_count, 4);
    }

    #[test]
    fn test_metadata_accepts_null_modification() {
        let json = r#"{
            "key": "0b6c3c4e-5f00-4e8b-9df0-5a1d4c0f2e10",
            "contentHash": "abc",
            "dateCreation": "2023-01-01T00:00:00.000Z",
            "dateModification": null,
            "viewCount": 1
        }"#;
        let meta: LinkMetadata = serde_json::from_str(json).unwrap();
        assert!(meta.date_modification.is_none());
    }
}
