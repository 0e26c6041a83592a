use clap::Args;
use std::path::PathBuf;

use worklog_core::{dump, WorkLogRepository};

/// Write the full work log as JSON
#[derive(Args)]
pub struct ExportCommand {
    /// Output file (default: stdout)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn run(&self, repo: &WorkLogRepository) -> Result<(), Box<dyn std::error::Error>> {
        let json = dump::export(repo).await?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, json)?;
                eprintln!("Exported work log to {}", path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }
}

/// Load entries from a JSON dump
#[derive(Args)]
pub struct ImportCommand {
    /// Dump file produced by `export`
    file: PathBuf,
}

impl ImportCommand {
    pub async fn run(&self, repo: &WorkLogRepository) -> Result<(), Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(&self.file)
            .map_err(|e| format!("Failed to read '{}': {}", self.file.display(), e))?;
        let written = dump::import(repo, &json).await?;
        println!("Imported {} entries", written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_repos;
    use tempfile::tempdir;
    use worklog_core::{WorkDate, WorkLogEntry};

    #[tokio::test]
    async fn test_export_to_file_then_import() {
        let temp_dir = tempdir().unwrap();
        let source = open_repos(&temp_dir.path().join("a.db")).await.unwrap();
        let entry = WorkLogEntry::new("X", 120, WorkDate(2023, 0, 1));
        source.entries.create(&entry).await.unwrap();

        let file = temp_dir.path().join("dump.json");
        ExportCommand {
            output: Some(file.clone()),
        }
        .run(&source.entries)
        .await
        .unwrap();

        let target = open_repos(&temp_dir.path().join("b.db")).await.unwrap();
        ImportCommand { file }.run(&target.entries).await.unwrap();
        assert_eq!(target.entries.list().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let temp_dir = tempdir().unwrap();
        let repos = open_repos(&temp_dir.path().join("a.db")).await.unwrap();
        let result = ImportCommand {
            file: temp_dir.path().join("missing.json"),
        }
        .run(&repos.entries)
        .await;
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }
}
