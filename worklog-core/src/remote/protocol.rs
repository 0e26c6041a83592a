//! JSON bodies exchanged with the share server.
//!
//! ```text
//! POST /            {contentHash, worklog, key}  -> 200 LinkMetadata
//!                                                -> 400 {"existing-document": key}
//! GET  /{key}                                    -> 200 ShareableLink
//! PUT  /{key}       {contentHash, worklog, key,
//!                    expectedHash?}              -> 200 LinkMetadata
//! POST /metadata    {urlKeys: [key]}             -> 200 {urlKeys: [LinkMetadata]}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LinkMetadata, WorkLogEntry};

/// Body of `POST /` and `PUT /{key}`.
///
/// `contentHash` is the digest of `worklog`. On `PUT`, `expectedHash` carries
/// the digest the client last saw; the server only logs a mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub content_hash: String,
    pub worklog: Vec<WorkLogEntry>,
    pub key: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
}

/// 400 body returned by `POST /` when the digest is already stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingDocument {
    #[serde(rename = "existing-document")]
    pub existing_document: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub url_keys: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub url_keys: Vec<LinkMetadata>,
}

/// Error body used by the server for every non-dedup failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_document_field_name() {
        let key = Uuid::new_v4();
        let body = format!(r#"{{"existing-document": "{}"}}"#, key);
        let parsed: ExistingDocument = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.existing_document, key);
    }

    #[test]
    fn test_metadata_request_shape() {
        let key = Uuid::nil();
        let json = serde_json::to_value(MetadataRequest { url_keys: vec![key] }).unwrap();
        assert_eq!(json, serde_json::json!({"urlKeys": [key.to_string()]}));
    }

    #[test]
    fn test_document_request_shape() {
        let request = DocumentRequest {
            content_hash: "abc".into(),
            worklog: Vec::new(),
            key: Uuid::nil(),
            expected_hash: None,
        };
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json["contentHash"], "abc");
        assert_eq!(json["worklog"], serde_json::json!([]));
        assert!(json.get("key").is_some());
        assert!(json.get("expectedHash").is_none());
    }

    #[test]
    fn test_document_request_without_expected_hash() {
        let body = format!(
            r#"{{"contentHash": "abc", "worklog": [], "key": "{}"}}"#,
            Uuid::nil()
        );
        let parsed: DocumentRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.expected_hash, None);
    }
}
