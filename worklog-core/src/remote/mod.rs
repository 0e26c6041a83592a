//! Access to the remote authoritative document store.
//!
//! [`ShareService`] is the only seam through which the crate reaches the
//! network. [`HttpShareClient`] speaks the JSON-over-HTTP protocol described
//! in [`protocol`].

mod client;
pub mod protocol;

pub use client::HttpShareClient;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::{LinkMetadata, ShareableLink, UpdatedMetadata, WorkLogEntry};

/// Result of a create-or-dedup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub key: Uuid,
    pub digest: String,
    /// False when the remote already held a document with this digest and
    /// returned its key instead of creating one.
    pub is_newly_created: bool,
}

#[async_trait]
pub trait ShareService: Send + Sync {
    /// Creates a document at `proposed_key`, unless one with `digest` exists
    /// anywhere in the store, in which case that document's key is returned.
    async fn create_or_fetch(
        &self,
        entries: &[WorkLogEntry],
        digest: &str,
        proposed_key: Uuid,
    ) -> Result<CreateOutcome, SyncError>;

    /// Full document, including its entry snapshot.
    async fn fetch(&self, key: Uuid) -> Result<ShareableLink, SyncError>;

    /// Overwrites the document. `expected_digest` is informational only: the
    /// write is last-writer-wins.
    async fn update(
        &self,
        key: Uuid,
        entries: &[WorkLogEntry],
        expected_digest: &str,
    ) -> Result<UpdatedMetadata, SyncError>;

    /// Metadata for the known keys among `keys`; unknown keys are omitted.
    async fn fetch_metadata_batch(&self, keys: &[Uuid]) -> Result<Vec<LinkMetadata>, SyncError>;
}
