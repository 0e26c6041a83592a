//! Ordered key-value persistence for the local replica.
//!
//! Every table holds JSON values keyed by a string id and carries one sort
//! index: a top-level field of the stored value (creation timestamp for both
//! tables in use). Tables must be declared up front in a [`Schema`] handed to
//! the store when it is opened.

mod memory;
mod queue;
mod sqlite;

pub use memory::MemoryReplicaStore;
pub use queue::TableQueue;
pub use sqlite::SqliteReplicaStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by replica stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no index named {index}")]
    UnknownIndex { table: String, index: String },

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row {key} in {table}: {reason}")]
    Corrupt {
        table: String,
        key: String,
        reason: String,
    },
}

/// Declaration of one table and its sort index.
///
/// The sort index names a top-level field holding a string or a
/// non-negative integer; see [`sort_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub sort_index: &'static str,
}

impl TableDef {
    pub const fn new(name: &'static str, sort_index: &'static str) -> Self {
        Self { name, sort_index }
    }

    fn validate(&self) -> Result<(), StoreError> {
        let valid = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidTableName(self.name.to_string()))
        }
    }
}

/// The set of tables a store is opened with.
///
/// Built by composing each repository's table definition at startup.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<TableDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table. Registering the same name twice keeps the first definition.
    pub fn register(mut self, table: TableDef) -> Self {
        if !self.tables.iter().any(|t| t.name == table.name) {
            self.tables.push(table);
        }
        self
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Result<&TableDef, StoreError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    /// Resolves a table and checks `index` is its sort index.
    pub fn index(&self, name: &str, index: &str) -> Result<&TableDef, StoreError> {
        let table = self.table(name)?;
        if table.sort_index != index {
            return Err(StoreError::UnknownIndex {
                table: name.to_string(),
                index: index.to_string(),
            });
        }
        Ok(table)
    }

    fn validate(&self) -> Result<(), StoreError> {
        self.tables.iter().try_for_each(TableDef::validate)
    }
}

/// Sort value of a row: the indexed field rendered as a string.
///
/// Strings sort as-is. Non-negative integers are zero-padded to 20 digits so
/// they sort numerically. Any other value sorts by its JSON text.
fn sort_value(value: &Value, index: &str) -> String {
    match value.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(n) => format!("{:020}", n),
            None => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Abstract ordered key-value store backing the local replica.
#[async_trait]
pub trait ReplicaStore: Send + Sync {
    async fn put(&self, table: &str, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Upserts every `(key, value)` row or none of them.
    async fn put_many(&self, table: &str, rows: &[(String, Value)]) -> Result<(), StoreError>;

    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// All keys of `table` ordered by the `index` field, ties in insertion order.
    async fn get_all_keys(&self, table: &str, index: &str) -> Result<Vec<String>, StoreError>;

    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError>;

    async fn clear(&self, table: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRIES: TableDef = TableDef::new("work_log", "dateCreation");
    const LINKS: TableDef = TableDef::new("shareable_links", "dateCreation");

    #[test]
    fn test_schema_composition() {
        let schema = Schema::new().register(ENTRIES).register(LINKS).register(ENTRIES);
        assert_eq!(schema.tables().len(), 2);
        assert!(schema.table("work_log").is_ok());
        assert!(matches!(
            schema.table("missing"),
            Err(StoreError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_schema_index_lookup() {
        let schema = Schema::new().register(ENTRIES);
        assert!(schema.index("work_log", "dateCreation").is_ok());
        assert!(matches!(
            schema.index("work_log", "projectName"),
            Err(StoreError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn test_table_name_validation() {
        let schema = Schema::new().register(TableDef::new("bad name;", "x"));
        assert!(matches!(
            schema.validate(),
            Err(StoreError::InvalidTableName(_))
        ));
    }

    #[test]
    fn test_sort_value() {
        let value = serde_json::json!({"dateCreation": "2023-01-01T00:00:00.000Z", "n": 3});
        assert_eq!(sort_value(&value, "dateCreation"), "2023-01-01T00:00:00.000Z");
        assert_eq!(sort_value(&value, "n"), "00000000000000000003");
        assert_eq!(sort_value(&value, "missing"), "");
    }

    #[test]
    fn test_integer_sort_values_order_numerically() {
        let nine = sort_value(&serde_json::json!({"n": 9}), "n");
        let ten = sort_value(&serde_json::json!({"n": 10}), "n");
        let max = sort_value(&serde_json::json!({"n": u64::MAX}), "n");
        assert!(nine < ten);
        assert!(ten < max);
    }
}
