//! Local record of every shareable link this client created or learned about.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{LinkMetadata, ShareableLink, UpdatedMetadata, WorkLogEntry};
use crate::store::{ReplicaStore, StoreError, TableDef, TableQueue};

pub struct LinkCache {
    store: Arc<dyn ReplicaStore>,
    queue: TableQueue,
}

impl LinkCache {
    pub const TABLE: TableDef = TableDef::new("shareable_links", "dateCreation");

    pub fn new(store: Arc<dyn ReplicaStore>) -> Self {
        Self {
            store,
            queue: TableQueue::new(),
        }
    }

    /// Upserts by key.
    pub async fn put(&self, link: &ShareableLink) -> Result<(), StoreError> {
        self.queue.run(self.write(link)).await
    }

    pub async fn get(&self, key: Uuid) -> Result<Option<ShareableLink>, StoreError> {
        self.queue.run(self.read(key.to_string())).await
    }

    /// All cached links in creation order.
    pub async fn list(&self) -> Result<Vec<ShareableLink>, StoreError> {
        self.queue
            .run(async {
                let keys = self
                    .store
                    .get_all_keys(Self::TABLE.name, Self::TABLE.sort_index)
                    .await?;
                let mut links = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(link) = self.read(key).await? {
                        links.push(link);
                    }
                }
                Ok(links)
            })
            .await
    }

    /// Removes the cached row only; the remote document is untouched.
    pub async fn delete(&self, key: Uuid) -> Result<(), StoreError> {
        self.queue
            .run(self.store.delete(Self::TABLE.name, &key.to_string()))
            .await
    }

    /// Overwrites the remote-owned fields of cached links found in `batch`.
    ///
    /// Links absent from the batch, and batch keys absent from the cache, are
    /// left alone. The cached view count never decreases. Returns the number of
    /// rows touched.
    pub async fn merge_remote_metadata(&self, batch: &[LinkMetadata]) -> Result<usize, StoreError> {
        self.queue
            .run(async {
                let mut merged = 0;
                for meta in batch {
                    let Some(mut link) = self.read(meta.key.to_string()).await? else {
                        continue;
                    };
                    if meta.view_count < link.view_count {
                        tracing::warn!(
                            key = %meta.key,
                            cached = link.view_count,
                            remote = meta.view_count,
                            "Remote view count went backwards; keeping cached value"
                        );
                    }
                    link.content_hash = meta.content_hash.clone();
                    link.date_modification = meta.date_modification;
                    link.view_count = link.view_count.max(meta.view_count);
                    self.write(&link).await?;
                    merged += 1;
                }
                Ok(merged)
            })
            .await
    }

    /// Stores a pushed snapshot together with the metadata the remote
    /// returned for it, in one write.
    ///
    /// The cached digest always describes the cached snapshot: if the write
    /// fails, the row is left as it was. Returns the updated link, or `None`
    /// when `key` is not cached.
    pub async fn record_push(
        &self,
        key: Uuid,
        worklog: &[WorkLogEntry],
        updated: &UpdatedMetadata,
    ) -> Result<Option<ShareableLink>, StoreError> {
        self.queue
            .run(async {
                let Some(mut link) = self.read(key.to_string()).await? else {
                    return Ok(None);
                };
                link.worklog = worklog.to_vec();
                link.content_hash = updated.content_hash.clone();
                link.date_modification = updated.date_modification;
                link.view_count = link.view_count.max(updated.view_count);
                self.write(&link).await?;
                Ok(Some(link))
            })
            .await
    }

    async fn write(&self, link: &ShareableLink) -> Result<(), StoreError> {
        let value = serde_json::to_value(link)?;
        self.store
            .put(Self::TABLE.name, &link.key.to_string(), &value)
            .await
    }

    async fn read(&self, key: String) -> Result<Option<ShareableLink>, StoreError> {
        match self.store.get(Self::TABLE.name, &key).await? {
            Some(value) => decode(&key, value).map(Some),
            None => Ok(None),
        }
    }
}

fn decode(key: &str, value: Value) -> Result<ShareableLink, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        table: LinkCache::TABLE.name.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}
