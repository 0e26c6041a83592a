//! Publish, push, pull and refresh of shareable links.
//!
//! The coordinator is the only caller of [`ShareService`]. Every remote call
//! is bounded by the configured timeout; expiry surfaces as
//! [`SyncError::ShareUnavailable`]. Nothing is retried automatically.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::error::SyncError;
use crate::hash::{canonical_digest, canonical_order, ContentHasher};
use crate::link_cache::LinkCache;
use crate::models::{ShareableLink, WorkLogEntry};
use crate::remote::ShareService;
use crate::report::EntryFilter;

/// Progress of the most recent publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    Publishing,
    Published(Uuid),
    Failed(String),
}

/// Whether local entries still match a link's last synced digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    InSync,
    Diverged,
}

impl SyncStatus {
    /// Compares a link with the canonical digest of the current entries.
    ///
    /// Push is offered only for [`SyncStatus::Diverged`].
    pub fn of(link: &ShareableLink, current_digest: &str) -> Self {
        if link.content_hash == current_digest {
            SyncStatus::InSync
        } else {
            SyncStatus::Diverged
        }
    }

    pub fn can_push(self) -> bool {
        self == SyncStatus::Diverged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Created,
    /// The remote already held this exact content; its key was returned.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub key: Uuid,
    pub status: PublishStatus,
    /// Refreshed link list.
    pub links: Vec<ShareableLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// Entries match the cached digest; no request was made.
    Disabled,
    Pushed {
        link: ShareableLink,
        links: Vec<ShareableLink>,
    },
}

pub struct SyncCoordinator<S: ShareService> {
    remote: S,
    links: Arc<LinkCache>,
    timeout: Duration,
    publish_state: Mutex<PublishState>,
}

impl<S: ShareService> SyncCoordinator<S> {
    pub fn new(remote: S, links: Arc<LinkCache>, timeout: Duration) -> Self {
        Self {
            remote,
            links,
            timeout,
            publish_state: Mutex::new(PublishState::Idle),
        }
    }

    pub fn publish_state(&self) -> PublishState {
        self.publish_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_publish_state(&self, state: PublishState) {
        *self
            .publish_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Publishes `entries` as a shareable link.
    ///
    /// A dedup hit is a successful outcome with [`PublishStatus::AlreadyExists`].
    pub async fn publish(&self, entries: &[WorkLogEntry]) -> Result<PublishOutcome, SyncError> {
        self.set_publish_state(PublishState::Publishing);
        let result = self.try_publish(entries).await;
        match &result {
            Ok(outcome) => self.set_publish_state(PublishState::Published(outcome.key)),
            Err(e) => {
                tracing::warn!("Publish failed: {}", e);
                self.set_publish_state(PublishState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn try_publish(&self, entries: &[WorkLogEntry]) -> Result<PublishOutcome, SyncError> {
        let entries = canonical_order(entries);
        let digest = ContentHasher::digest(&entries);
        let proposed = Uuid::new_v4();

        let created = self
            .guarded(self.remote.create_or_fetch(&entries, &digest, proposed))
            .await?;

        let status = if created.is_newly_created {
            let link = ShareableLink::new(created.key, created.digest, entries);
            self.links.put(&link).await?;
            tracing::info!(key = %link.key, "Published new link");
            PublishStatus::Created
        } else {
            if self.links.get(created.key).await?.is_none() {
                let link = ShareableLink::new(created.key, created.digest, entries);
                self.links.put(&link).await?;
            }
            tracing::info!(key = %created.key, "A link for this exact content already exists");
            PublishStatus::AlreadyExists
        };

        let links = self.refresh_after("publish").await?;
        Ok(PublishOutcome {
            key: created.key,
            status,
            links,
        })
    }

    pub async fn sync_status(
        &self,
        key: Uuid,
        entries: &[WorkLogEntry],
    ) -> Result<SyncStatus, SyncError> {
        let link = self.cached(key).await?;
        Ok(SyncStatus::of(&link, &canonical_digest(entries)))
    }

    /// Whether [`push`](Self::push) would contact the remote.
    pub async fn can_push(&self, key: Uuid, entries: &[WorkLogEntry]) -> Result<bool, SyncError> {
        Ok(self.sync_status(key, entries).await?.can_push())
    }

    /// Overwrites the remote document with `entries` if they diverged.
    pub async fn push(&self, key: Uuid, entries: &[WorkLogEntry]) -> Result<PushOutcome, SyncError> {
        let cached = self.cached(key).await?;
        let entries = canonical_order(entries);
        let digest = ContentHasher::digest(&entries);
        if !SyncStatus::of(&cached, &digest).can_push() {
            tracing::debug!(%key, "Entries unchanged; nothing to push");
            return Ok(PushOutcome::Disabled);
        }

        let updated = self
            .guarded(self.remote.update(key, &entries, &cached.content_hash))
            .await?;
        if updated.content_hash != digest {
            tracing::warn!(
                %key,
                local = %digest,
                remote = %updated.content_hash,
                "Remote digest differs from local digest"
            );
        }

        let stored = self
            .links
            .record_push(key, &entries, &updated)
            .await?
            .ok_or(SyncError::NotFound(key))?;
        tracing::info!(%key, entries = entries.len(), "Pushed link");

        let links = self.refresh_after("push").await?;
        let link = links
            .iter()
            .find(|l| l.key == key)
            .cloned()
            .unwrap_or(stored);
        Ok(PushOutcome::Pushed { link, links })
    }

    /// Fetches a shared document for read-only display.
    ///
    /// The returned snapshot holds only entries in the link's scope, each
    /// tagged with the link key. Nothing is written locally.
    pub async fn pull(&self, key: Uuid) -> Result<ShareableLink, SyncError> {
        self.pull_filtered(key, &EntryFilter::default()).await
    }

    pub async fn pull_filtered(
        &self,
        key: Uuid,
        filter: &EntryFilter,
    ) -> Result<ShareableLink, SyncError> {
        let mut document = self.guarded(self.remote.fetch(key)).await?;
        document.worklog = document
            .worklog
            .into_iter()
            .filter(|e| e.link_key.is_none() || e.link_key == Some(key))
            .filter(|e| filter.matches(e))
            .map(|mut e| {
                e.link_key = Some(key);
                e
            })
            .collect();
        tracing::debug!(%key, entries = document.worklog.len(), "Pulled link");
        Ok(document)
    }

    /// Merges remote metadata into every cached link and returns the list.
    pub async fn refresh_link_list(&self) -> Result<Vec<ShareableLink>, SyncError> {
        let cached = self.links.list().await?;
        if cached.is_empty() {
            return Ok(cached);
        }

        let keys: Vec<Uuid> = cached.iter().map(|l| l.key).collect();
        let batch = self.guarded(self.remote.fetch_metadata_batch(&keys)).await?;
        let merged = self.links.merge_remote_metadata(&batch).await?;
        tracing::debug!(known = keys.len(), merged, "Refreshed link list");

        Ok(self.links.list().await?)
    }

    /// Forgets a link locally. The remote document stays fetchable by key.
    pub async fn delete(&self, key: Uuid) -> Result<Vec<ShareableLink>, SyncError> {
        self.links.delete(key).await?;
        tracing::info!(%key, "Removed link from local cache");
        self.refresh_after("delete").await
    }

    async fn cached(&self, key: Uuid) -> Result<ShareableLink, SyncError> {
        self.links.get(key).await?.ok_or(SyncError::NotFound(key))
    }

    /// Refresh after a completed operation. A remote failure here does not
    /// fail the operation; the local list is returned instead.
    async fn refresh_after(&self, operation: &str) -> Result<Vec<ShareableLink>, SyncError> {
        match self.refresh_link_list().await {
            Ok(links) => Ok(links),
            Err(e) => {
                tracing::warn!("Link refresh after {} failed: {}", operation, e);
                Ok(self.links.list().await?)
            }
        }
    }

    async fn guarded<T>(
        &self,
        call: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::ShareUnavailable(format!(
                "no response within {}s",
                self.timeout.as_secs_f64()
            ))),
        }
    }
}
