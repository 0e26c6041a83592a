//! Work-log entries over the replica store.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::WorkLogEntry;
use crate::store::{ReplicaStore, StoreError, TableDef, TableQueue};

/// Bulk edit applied by [`WorkLogRepository::update_many`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryChanges {
    pub project_name: Option<String>,
    pub is_paid: Option<bool>,
}

impl EntryChanges {
    pub fn paid(is_paid: bool) -> Self {
        Self {
            is_paid: Some(is_paid),
            ..Self::default()
        }
    }

    fn apply(&self, entry: &mut WorkLogEntry) -> bool {
        let mut changed = false;
        if let Some(project) = &self.project_name {
            if &entry.project_name != project {
                entry.project_name = project.clone();
                changed = true;
            }
        }
        if let Some(is_paid) = self.is_paid {
            if entry.is_paid != is_paid {
                entry.is_paid = is_paid;
                changed = true;
            }
        }
        changed
    }
}

pub struct WorkLogRepository {
    store: Arc<dyn ReplicaStore>,
    queue: TableQueue,
}

impl WorkLogRepository {
    pub const TABLE: TableDef = TableDef::new("work_log", "dateCreation");

    pub fn new(store: Arc<dyn ReplicaStore>) -> Self {
        Self {
            store,
            queue: TableQueue::new(),
        }
    }

    pub async fn create(&self, entry: &WorkLogEntry) -> Result<WorkLogEntry, StoreError> {
        self.queue.run(self.write(entry)).await?;
        tracing::debug!(id = %entry.id, project = %entry.project_name, "Created entry");
        Ok(entry.clone())
    }

    pub async fn update(&self, entry: &WorkLogEntry) -> Result<WorkLogEntry, StoreError> {
        self.queue.run(self.write(entry)).await?;
        Ok(entry.clone())
    }

    /// Writes every entry under its own id, replacing existing rows.
    ///
    /// Either all entries are written or none are.
    pub async fn upsert_all(&self, entries: &[WorkLogEntry]) -> Result<usize, StoreError> {
        let rows = entries
            .iter()
            .map(|entry| -> Result<(String, Value), StoreError> {
                Ok((entry.id.to_string(), serde_json::to_value(entry)?))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.queue
            .run(self.store.put_many(Self::TABLE.name, &rows))
            .await?;
        Ok(rows.len())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<WorkLogEntry>, StoreError> {
        self.queue.run(self.read(id.to_string())).await
    }

    /// The user's own log in creation order.
    pub async fn list(&self) -> Result<Vec<WorkLogEntry>, StoreError> {
        let entries = self.list_all().await?;
        Ok(entries.into_iter().filter(|e| e.link_key.is_none()).collect())
    }

    /// The user's own log plus entries saved against `link_key`.
    pub async fn list_for_link(&self, link_key: Uuid) -> Result<Vec<WorkLogEntry>, StoreError> {
        let entries = self.list_all().await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.link_key.is_none() || e.link_key == Some(link_key))
            .collect())
    }

    /// Every stored entry in creation order.
    pub async fn list_all(&self) -> Result<Vec<WorkLogEntry>, StoreError> {
        self.queue.run(self.read_all()).await
    }

    /// Applies `changes` to each listed entry; unknown ids are skipped.
    ///
    /// Returns the number of entries actually modified.
    pub async fn update_many(
        &self,
        ids: &[Uuid],
        changes: &EntryChanges,
    ) -> Result<usize, StoreError> {
        self.queue
            .run(async {
                let mut updated = 0;
                for id in ids {
                    let Some(mut entry) = self.read(id.to_string()).await? else {
                        tracing::debug!(%id, "Skipping unknown entry");
                        continue;
                    };
                    if changes.apply(&mut entry) {
                        self.write(&entry).await?;
                        updated += 1;
                    }
                }
                Ok(updated)
            })
            .await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.queue
            .run(self.store.clear(Self::TABLE.name))
            .await?;
        tracing::info!("Cleared work log");
        Ok(())
    }

    async fn write(&self, entry: &WorkLogEntry) -> Result<(), StoreError> {
        let value = serde_json::to_value(entry)?;
        self.store
            .put(Self::TABLE.name, &entry.id.to_string(), &value)
            .await
    }

    async fn read(&self, key: String) -> Result<Option<WorkLogEntry>, StoreError> {
        match self.store.get(Self::TABLE.name, &key).await? {
            Some(value) => decode(&key, value).map(Some),
            None => Ok(None),
        }
    }

    async fn read_all(&self) -> Result<Vec<WorkLogEntry>, StoreError> {
        let keys = self
            .store
            .get_all_keys(Self::TABLE.name, Self::TABLE.sort_index)
            .await?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.read(key).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn decode(key: &str, value: Value) -> Result<WorkLogEntry, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        table: WorkLogRepository::TABLE.name.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}
