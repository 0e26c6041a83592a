//! Worklog Core Library
//!
//! Work-log entries, shareable links and the sync logic between a local
//! replica and the share server.

pub mod coordinator;
pub mod dump;
pub mod error;
pub mod hash;
pub mod link_cache;
pub mod models;
pub mod remote;
pub mod report;
pub mod server;
pub mod share_view;
pub mod store;
pub mod worklog;

pub use coordinator::{
    PublishOutcome, PublishState, PublishStatus, PushOutcome, SyncCoordinator, SyncStatus,
};
pub use dump::WorkLogDump;
pub use error::SyncError;
pub use hash::{canonical_digest, canonical_order, ContentHasher};
pub use link_cache::LinkCache;
pub use models::{LinkMetadata, ShareableLink, UpdatedMetadata, WorkDate, WorkLogEntry};
pub use remote::{CreateOutcome, HttpShareClient, ShareService};
pub use report::{project_names, EntryFilter, Summary};
pub use share_view::{share_url, LinkView};
pub use store::{
    MemoryReplicaStore, ReplicaStore, Schema, SqliteReplicaStore, StoreError, TableDef,
};
pub use worklog::{EntryChanges, WorkLogRepository};

/// Tables used by the client, composed for [`SqliteReplicaStore::open`].
pub fn client_schema() -> Schema {
    Schema::new()
        .register(WorkLogRepository::TABLE)
        .register(LinkCache::TABLE)
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_client_schema_tables() {
        let schema = client_schema();
        assert!(schema.table("work_log").is_ok());
        assert!(schema.table("shareable_links").is_ok());
        assert_eq!(schema.tables().len(), 2);
    }
}
