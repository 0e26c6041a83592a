use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use uuid::Uuid;

use super::protocol::{DocumentRequest, ExistingDocument, MetadataRequest, MetadataResponse};
use super::{CreateOutcome, ShareService};
use crate::error::SyncError;
use crate::hash::ContentHasher;
use crate::models::{LinkMetadata, ShareableLink, UpdatedMetadata, WorkLogEntry};

/// [`ShareService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpShareClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpShareClient {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::ShareUnavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn unavailable(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::ShareUnavailable("request timed out".to_string())
    } else {
        SyncError::ShareUnavailable(e.to_string())
    }
}

async fn unexpected(what: &str, response: Response) -> SyncError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    SyncError::ShareUnavailable(format!("{} failed ({}): {}", what, status, body))
}

#[async_trait]
impl ShareService for HttpShareClient {
    async fn create_or_fetch(
        &self,
        entries: &[WorkLogEntry],
        digest: &str,
        proposed_key: Uuid,
    ) -> Result<CreateOutcome, SyncError> {
        let request = DocumentRequest {
            content_hash: digest.to_string(),
            worklog: entries.to_vec(),
            key: proposed_key,
            expected_hash: None,
        };
        let response = self
            .http
            .post(self.endpoint(""))
            .json(&request)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let meta: LinkMetadata = response.json().await.map_err(unavailable)?;
                Ok(CreateOutcome {
                    is_newly_created: meta.key == proposed_key,
                    key: meta.key,
                    digest: meta.content_hash,
                })
            }
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.map_err(unavailable)?;
                match serde_json::from_str::<ExistingDocument>(&body) {
                    Ok(existing) => {
                        tracing::debug!(key = %existing.existing_document, "Remote reported existing document");
                        Ok(CreateOutcome {
                            key: existing.existing_document,
                            digest: digest.to_string(),
                            is_newly_created: false,
                        })
                    }
                    Err(_) => Err(SyncError::ShareUnavailable(format!(
                        "publish rejected: {}",
                        body
                    ))),
                }
            }
            _ => Err(unexpected("publish", response).await),
        }
    }

    async fn fetch(&self, key: Uuid) -> Result<ShareableLink, SyncError> {
        let response = self
            .http
            .get(self.endpoint(&key.to_string()))
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(key)),
            status if status.is_success() => response.json().await.map_err(unavailable),
            _ => Err(unexpected("fetch", response).await),
        }
    }

    async fn update(
        &self,
        key: Uuid,
        entries: &[WorkLogEntry],
        expected_digest: &str,
    ) -> Result<UpdatedMetadata, SyncError> {
        let request = DocumentRequest {
            content_hash: ContentHasher::digest(entries),
            worklog: entries.to_vec(),
            key,
            expected_hash: Some(expected_digest.to_string()),
        };
        let response = self
            .http
            .put(self.endpoint(&key.to_string()))
            .json(&request)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(key)),
            status if status.is_success() => response.json().await.map_err(unavailable),
            _ => Err(unexpected("update", response).await),
        }
    }

    async fn fetch_metadata_batch(&self, keys: &[Uuid]) -> Result<Vec<LinkMetadata>, SyncError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let request = MetadataRequest {
            url_keys: keys.to_vec(),
        };
        let response = self
            .http
            .post(self.endpoint("metadata"))
            .json(&request)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(unexpected("metadata", response).await);
        }
        let body: MetadataResponse = response.json().await.map_err(unavailable)?;
        Ok(body.url_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkDate;
    use crate::server::spawn_test_server;

    fn client(base_url: &str) -> HttpShareClient {
        HttpShareClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    fn entries(seconds: u64) -> Vec<WorkLogEntry> {
        vec![WorkLogEntry::new("X", seconds, WorkDate(2023, 0, 1))]
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let c = client("https://share.example.com/");
        assert_eq!(c.base_url(), "https://share.example.com");
        assert_eq!(c.endpoint(""), "https://share.example.com/");
        assert_eq!(c.endpoint("metadata"), "https://share.example.com/metadata");
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let c = client("http://localhost:8080/share");
        let key = Uuid::nil();
        assert_eq!(
            c.endpoint(&key.to_string()),
            format!("http://localhost:8080/share/{}", key)
        );
    }

    #[tokio::test]
    async fn test_create_then_dedup() {
        let server = spawn_test_server().await;
        let c = client(&server.base_url);
        let log = entries(60);
        let digest = ContentHasher::digest(&log);

        let first_key = Uuid::new_v4();
        let first = c.create_or_fetch(&log, &digest, first_key).await.unwrap();
        assert!(first.is_newly_created);
        assert_eq!(first.key, first_key);
        assert_eq!(first.digest, digest);

        let second = c.create_or_fetch(&log, &digest, Uuid::new_v4()).await.unwrap();
        assert!(!second.is_newly_created);
        assert_eq!(second.key, first_key);
    }

    #[tokio::test]
    async fn test_fetch_and_update() {
        let server = spawn_test_server().await;
        let c = client(&server.base_url);
        let log = entries(60);
        let digest = ContentHasher::digest(&log);
        let key = c
            .create_or_fetch(&log, &digest, Uuid::new_v4())
            .await
            .unwrap()
            .key;

        let changed = entries(120);
        let updated = c.update(key, &changed, &digest).await.unwrap();
        assert_eq!(updated.content_hash, ContentHasher::digest(&changed));
        assert!(updated.date_modification.is_some());

        let fetched = c.fetch(key).await.unwrap();
        assert_eq!(fetched.worklog, changed);
        assert_eq!(fetched.view_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_key_maps_to_not_found() {
        let server = spawn_test_server().await;
        let c = client(&server.base_url);
        let key = Uuid::new_v4();

        assert!(matches!(c.fetch(key).await, Err(SyncError::NotFound(k)) if k == key));
        assert!(matches!(
            c.update(key, &entries(1), "x").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_batch() {
        let server = spawn_test_server().await;
        let c = client(&server.base_url);
        let log = entries(60);
        let key = c
            .create_or_fetch(&log, &ContentHasher::digest(&log), Uuid::new_v4())
            .await
            .unwrap()
            .key;

        let batch = c.fetch_metadata_batch(&[key, Uuid::new_v4()]).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].key, key);

        assert!(c.fetch_metadata_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(&format!("http://{}", addr));
        let result = c.fetch(Uuid::new_v4()).await;
        assert!(matches!(result, Err(SyncError::ShareUnavailable(_))));
    }
}
