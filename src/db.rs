use std::path::Path;
use std::sync::Arc;

use worklog_core::{client_schema, LinkCache, SqliteReplicaStore, StoreError, WorkLogRepository};

/// Repositories over the local replica.
pub struct Repos {
    pub entries: WorkLogRepository,
    pub links: Arc<LinkCache>,
}

/// Opens the replica at `path` with every client table registered.
pub async fn open_repos(path: &Path) -> Result<Repos, StoreError> {
    let store = Arc::new(SqliteReplicaStore::open(path, &client_schema()).await?);
    Ok(Repos {
        entries: WorkLogRepository::new(store.clone()),
        links: Arc::new(LinkCache::new(store)),
    })
}
