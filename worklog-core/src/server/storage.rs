//! SQLite storage for shared documents.
//!
//! One row per document: the entry snapshot as JSON, its digest, and the
//! remote-owned metadata (timestamps, view counter).

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{timestamp, LinkMetadata, ShareableLink, WorkLogEntry};
use crate::store::TableQueue;

#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt document {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Outcome of [`DocumentStore::create`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateResult {
    Created(LinkMetadata),
    /// A document with the same digest already exists under this key.
    Duplicate(Uuid),
    /// The proposed key is in use by a document with different content.
    KeyTaken,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    key: String,
    content_hash: String,
    worklog: String,
    date_creation: String,
    date_modification: Option<String>,
    view_count: i64,
}

impl DocumentRow {
    fn metadata(&self) -> Result<LinkMetadata, DocumentStoreError> {
        let corrupt = |reason: String| DocumentStoreError::Corrupt {
            key: self.key.clone(),
            reason,
        };
        Ok(LinkMetadata {
            key: Uuid::parse_str(&self.key).map_err(|e| corrupt(e.to_string()))?,
            content_hash: self.content_hash.clone(),
            date_creation: timestamp::parse(&self.date_creation)
                .map_err(|e| corrupt(e.to_string()))?,
            date_modification: self
                .date_modification
                .as_deref()
                .map(timestamp::parse)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))?,
            view_count: u64::try_from(self.view_count).unwrap_or(0),
        })
    }

    fn document(&self) -> Result<ShareableLink, DocumentStoreError> {
        let meta = self.metadata()?;
        let worklog: Vec<WorkLogEntry> =
            serde_json::from_str(&self.worklog).map_err(|e| DocumentStoreError::Corrupt {
                key: self.key.clone(),
                reason: e.to_string(),
            })?;
        Ok(ShareableLink {
            key: meta.key,
            content_hash: meta.content_hash,
            worklog,
            date_creation: meta.date_creation,
            date_modification: meta.date_modification,
            view_count: meta.view_count,
        })
    }
}

#[derive(Debug)]
pub struct DocumentStore {
    pool: SqlitePool,
    /// Create is check-then-insert; it must not interleave with itself.
    writes: TableQueue,
}

impl DocumentStore {
    /// Opens the database at `path` and runs migrations.
    pub async fn open(path: &Path) -> Result<Self, DocumentStoreError> {
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

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            writes: TableQueue::new(),
        })
    }

    pub async fn create(
        &self,
        key: Uuid,
        worklog: &[WorkLogEntry],
        digest: &str,
    ) -> Result<CreateResult, DocumentStoreError> {
        self.writes
            .run(async {
                let existing: Option<(String,)> = sqlx::query_as(
                    "SELECT key FROM documents WHERE content_hash = ? ORDER BY date_creation, rowid LIMIT 1",
                )
                .bind(digest)
                .fetch_optional(&self.pool)
                .await?;

                if let Some((existing,)) = existing {
                    let existing =
                        Uuid::parse_str(&existing).map_err(|e| DocumentStoreError::Corrupt {
                            key: existing.clone(),
                            reason: e.to_string(),
                        })?;
                    return Ok(CreateResult::Duplicate(existing));
                }

                if self.find(key).await?.is_some() {
                    return Ok(CreateResult::KeyTaken);
                }

                let body = serde_json::to_string(worklog).map_err(|e| {
                    DocumentStoreError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })?;

                sqlx::query(
                    r#"
                    INSERT INTO documents (key, content_hash, worklog, date_creation, date_modification, view_count)
                    VALUES (?, ?, ?, ?, NULL, 0)
                    "#,
                )
                .bind(key.to_string())
                .bind(digest)
                .bind(&body)
                .bind(timestamp::format(&timestamp::now()))
                .execute(&self.pool)
                .await?;

                let row = self.find(key).await?.ok_or(sqlx::Error::RowNotFound)?;
                Ok(CreateResult::Created(row.metadata()?))
            })
            .await
    }

    /// Returns the document and counts the read as a view.
    pub async fn fetch_and_count(
        &self,
        key: Uuid,
    ) -> Result<Option<ShareableLink>, DocumentStoreError> {
        let result = sqlx::query("UPDATE documents SET view_count = view_count + 1 WHERE key = ?")
            .bind(key.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        match self.find(key).await? {
            Some(row) => row.document().map(Some),
            None => Ok(None),
        }
    }

    /// Current digest of a document, if it exists.
    pub async fn content_hash(&self, key: Uuid) -> Result<Option<String>, DocumentStoreError> {
        Ok(self.find(key).await?.map(|row| row.content_hash))
    }

    /// Overwrites content and stamps the modification time. Last writer wins.
    pub async fn update(
        &self,
        key: Uuid,
        worklog: &[WorkLogEntry],
        digest: &str,
    ) -> Result<Option<LinkMetadata>, DocumentStoreError> {
        let body = serde_json::to_string(worklog).map_err(|e| DocumentStoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let result = sqlx::query(
            "UPDATE documents SET content_hash = ?, worklog = ?, date_modification = ? WHERE key = ?",
        )
        .bind(digest)
        .bind(&body)
        .bind(timestamp::format(&timestamp::now()))
        .bind(key.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        match self.find(key).await? {
            Some(row) => row.metadata().map(Some),
            None => Ok(None),
        }
    }

    /// Metadata for each known key, in request order. Unknown keys are skipped.
    pub async fn metadata(&self, keys: &[Uuid]) -> Result<Vec<LinkMetadata>, DocumentStoreError> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = self.find(*key).await? {
                found.push(row.metadata()?);
            }
        }
        Ok(found)
    }

    async fn find(&self, key: Uuid) -> Result<Option<DocumentRow>, DocumentStoreError> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE key = ?")
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
