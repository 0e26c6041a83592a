use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{sort_value, ReplicaStore, Schema, StoreError};

#[derive(Debug, Default)]
struct Table {
    next_seq: u64,
    rows: HashMap<String, Row>,
}

impl Table {
    /// Replacing a row keeps its insertion sequence.
    fn upsert(&mut self, key: &str, sort: String, value: &Value) {
        match self.rows.get_mut(key) {
            Some(row) => {
                row.sort = sort;
                row.value = value.clone();
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.rows.insert(
                    key.to_string(),
                    Row {
                        sort,
                        seq,
                        value: value.clone(),
                    },
                );
            }
        }
    }
}

#[derive(Debug)]
struct Row {
    sort: String,
    seq: u64,
    value: Value,
}

/// Process-local replica store, used for read-only views and tests.
#[derive(Debug)]
pub struct MemoryReplicaStore {
    schema: Schema,
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryReplicaStore {
    pub fn new(schema: &Schema) -> Result<Self, StoreError> {
        schema.validate()?;
        let tables = schema
            .tables()
            .iter()
            .map(|t| (t.name, Table::default()))
            .collect();
        Ok(Self {
            schema: schema.clone(),
            tables: RwLock::new(tables),
        })
    }

    fn poisoned() -> StoreError {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "memory store lock poisoned",
        ))
    }
}

#[async_trait]
impl ReplicaStore for MemoryReplicaStore {
    async fn put(&self, table: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let sort = sort_value(value, def.sort_index);
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let data = tables
            .get_mut(def.name)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        data.upsert(key, sort, value);
        Ok(())
    }

    async fn put_many(&self, table: &str, rows: &[(String, Value)]) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let data = tables
            .get_mut(def.name)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        for (key, value) in rows {
            data.upsert(key, sort_value(value, def.sort_index), value);
        }
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let def = self.schema.table(table)?;
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(def.name)
            .and_then(|t| t.rows.get(key))
            .map(|row| row.value.clone()))
    }

    async fn get_all_keys(&self, table: &str, index: &str) -> Result<Vec<String>, StoreError> {
        let def = self.schema.index(table, index)?;
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let Some(data) = tables.get(def.name) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<(&String, &Row)> = data.rows.iter().collect();
        rows.sort_by(|(_, a), (_, b)| a.sort.cmp(&b.sort).then(a.seq.cmp(&b.seq)));
        Ok(rows.into_iter().map(|(key, _)| key.clone()).collect())
    }

    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        if let Some(data) = tables.get_mut(def.name) {
            data.rows.remove(key);
        }
        Ok(())
    }

    async fn clear(&self, table: &str) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        if let Some(data) = tables.get_mut(def.name) {
            data.rows.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableDef;
    use serde_json::json;

    fn store() -> MemoryReplicaStore {
        MemoryReplicaStore::new(&Schema::new().register(TableDef::new("notes", "dateCreation")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ordering_matches_sqlite_semantics() {
        let store = store();
        store.put("notes", "b", &json!({"dateCreation": "2"})).await.unwrap();
        store.put("notes", "a", &json!({"dateCreation": "1"})).await.unwrap();
        store.put("notes", "c", &json!({"dateCreation": "2"})).await.unwrap();
        store.put("notes", "b", &json!({"dateCreation": "2", "edited": true})).await.unwrap();

        let keys = store.get_all_keys("notes", "dateCreation").await.unwrap();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(
            store.get("notes", "b").await.unwrap().unwrap()["edited"],
            true
        );
    }

    #[tokio::test]
    async fn test_put_many_and_numeric_index() {
        let store = MemoryReplicaStore::new(&Schema::new().register(TableDef::new("seq", "n")))
            .unwrap();
        let rows = vec![
            ("ten".to_string(), json!({"n": 10})),
            ("nine".to_string(), json!({"n": 9})),
            ("hundred".to_string(), json!({"n": 100})),
        ];
        store.put_many("seq", &rows).await.unwrap();

        let keys = store.get_all_keys("seq", "n").await.unwrap();
        assert_eq!(keys, vec!["nine", "ten", "hundred"]);

        assert!(matches!(
            store.put_many("other", &rows).await,
            Err(StoreError::UnknownTable(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_clear_and_unknown_table() {
        let store = store();
        store.put("notes", "a", &json!({"dateCreation": "1"})).await.unwrap();
        store.delete("notes", "a").await.unwrap();
        assert!(store.get("notes", "a").await.unwrap().is_none());

        store.put("notes", "b", &json!({"dateCreation": "1"})).await.unwrap();
        store.clear("notes").await.unwrap();
        assert!(store.get_all_keys("notes", "dateCreation").await.unwrap().is_empty());

        assert!(matches!(
            store.get("links", "a").await,
            Err(StoreError::UnknownTable(_))
        ));
    }
}
