//! Errors surfaced by sync, cache and dump operations.
//!
//! None of these is fatal: every failure is reported to the caller and the
//! application stays usable afterwards.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or remote fault. The user may re-trigger the operation.
    #[error("share service unavailable: {0}")]
    ShareUnavailable(String),

    /// The referenced link key is unknown.
    #[error("shared document not found: {0}")]
    NotFound(Uuid),

    /// Local persistence fault.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Import file could not be parsed; nothing was written.
    #[error("malformed dump: {0}")]
    MalformedDump(String),
}

impl SyncError {
    /// Whether re-triggering the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::ShareUnavailable(_) | SyncError::Storage(_))
    }
}
