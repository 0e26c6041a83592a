use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use super::{sort_value, ReplicaStore, Schema, StoreError};

/// Replica store backed by a SQLite file.
///
/// Each registered table becomes a SQL table of `(key, sort_value, value)`
/// rows with an index on `sort_value`.
#[derive(Debug, Clone)]
pub struct SqliteReplicaStore {
    pool: SqlitePool,
    schema: Schema,
}

impl SqliteReplicaStore {
    /// Opens (creating if needed) the database at `path` and applies `schema`.
    pub async fn open(path: &Path, schema: &Schema) -> Result<Self, StoreError> {
        schema.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            schema: schema.clone(),
        };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        for table in self.schema.tables() {
            sqlx::query(&format!(
                r#"CREATE TABLE IF NOT EXISTS "{name}" (
                    key TEXT PRIMARY KEY NOT NULL,
                    sort_value TEXT NOT NULL,
                    value TEXT NOT NULL
                )"#,
                name = table.name
            ))
            .execute(&self.pool)
            .await?;

            sqlx::query(&format!(
                r#"CREATE INDEX IF NOT EXISTS "idx_{name}_sort" ON "{name}"(sort_value)"#,
                name = table.name
            ))
            .execute(&self.pool)
            .await?;

            tracing::debug!(table = table.name, index = table.sort_index, "Applied table schema");
        }
        Ok(())
    }
}

#[async_trait]
impl ReplicaStore for SqliteReplicaStore {
    async fn put(&self, table: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let sort = sort_value(value, def.sort_index);
        let body = serde_json::to_string(value)?;

        // ON CONFLICT keeps the original rowid, which orders ties.
        sqlx::query(&format!(
            r#"INSERT INTO "{}" (key, sort_value, value) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET sort_value = excluded.sort_value, value = excluded.value"#,
            def.name
        ))
        .bind(key)
        .bind(&sort)
        .bind(&body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_many(&self, table: &str, rows: &[(String, Value)]) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        let sql = format!(
            r#"INSERT INTO "{}" (key, sort_value, value) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET sort_value = excluded.sort_value, value = excluded.value"#,
            def.name
        );

        // Dropping the transaction on error rolls every row back.
        let mut tx = self.pool.begin().await?;
        for (key, value) in rows {
            let body = serde_json::to_string(value)?;
            sqlx::query(&sql)
                .bind(key)
                .bind(sort_value(value, def.sort_index))
                .bind(&body)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let def = self.schema.table(table)?;
        let row: Option<(String,)> =
            sqlx::query_as(&format!(r#"SELECT value FROM "{}" WHERE key = ?"#, def.name))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((body,)) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    table: table.to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn get_all_keys(&self, table: &str, index: &str) -> Result<Vec<String>, StoreError> {
        let def = self.schema.index(table, index)?;
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            r#"SELECT key FROM "{}" ORDER BY sort_value, rowid"#,
            def.name
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        sqlx::query(&format!(r#"DELETE FROM "{}" WHERE key = ?"#, def.name))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, table: &str) -> Result<(), StoreError> {
        let def = self.schema.table(table)?;
        sqlx::query(&format!(r#"DELETE FROM "{}""#, def.name))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
