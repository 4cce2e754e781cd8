//! File-backed [`DbConnection`]: appends statement batches to a spool file.
//!
//! Each batch is written with a single buffered write and flushed before
//! `execute` returns. The connection remembers the file length after its last
//! complete batch; a failed write truncates back to it, and so does the next
//! `connect` if the truncate itself failed. Statements are terminated with
//! `";\n"`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::db::{DbConnection, DbError};

/// Spool file connection.
#[derive(Debug)]
pub struct SpoolConnection {
    path: PathBuf,
    file: Option<File>,
    /// File length after the last complete batch.
    committed: Option<u64>,
}

impl SpoolConnection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            committed: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lost(&self, e: std::io::Error) -> DbError {
        DbError::ConnectionLost(format!("{}: {e}", self.path.display()))
    }
}

#[async_trait]
impl DbConnection for SpoolConnection {
    async fn connect(&mut self) -> Result<(), DbError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.lost(e))?;
        let len = file.metadata().await.map_err(|e| self.lost(e))?.len();
        let committed = match self.committed {
            Some(committed) if len > committed => {
                warn!(
                    path = %self.path.display(),
                    dropped = len - committed,
                    "truncating incomplete batch"
                );
                file.set_len(committed).await.map_err(|e| self.lost(e))?;
                committed
            }
            _ => len,
        };
        debug!(path = %self.path.display(), len = committed, "spool file opened");
        self.committed = Some(committed);
        self.file = Some(file);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    async fn execute(&mut self, statements: &[String]) -> Result<(), DbError> {
        if let Some(blank) = statements.iter().position(|s| s.trim().is_empty()) {
            return Err(DbError::Statement(format!("statement {blank} is empty")));
        }
        let Some(file) = self.file.as_mut() else {
            return Err(DbError::ConnectionLost("spool file is not open".to_string()));
        };

        let mut batch = String::with_capacity(statements.iter().map(|s| s.len() + 2).sum());
        for statement in statements {
            batch.push_str(statement);
            batch.push_str(";\n");
        }

        let written = match file.write_all(batch.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "spool write failed; closing file");
            if let Some(committed) = self.committed {
                if let Err(undo) = file.set_len(committed).await {
                    warn!(error = %undo, "could not truncate incomplete batch");
                }
            }
            self.file = None;
            return Err(DbError::ConnectionLost(e.to_string()));
        }
        self.committed = self.committed.map(|len| len + batch.len() as u64);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_spool(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "farm-spool-{}-{name}.sql",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn test_execute_before_connect_reports_connection_lost() {
        let mut conn = SpoolConnection::new(temp_spool("unconnected"));
        assert!(!conn.is_connected());

        let result = conn.execute(&["SELECT 1".to_string()]).await;

        assert!(matches!(result, Err(DbError::ConnectionLost(_))));
    }

    #[tokio::test]
    async fn test_batches_are_appended_with_terminators() {
        // Arrange
        let path = temp_spool("append");
        let mut conn = SpoolConnection::new(&path);
        conn.connect().await.unwrap();

        // Act
        conn.execute(&["UPDATE a".to_string(), "UPDATE b".to_string()])
            .await
            .unwrap();
        conn.execute(&["DELETE c".to_string()]).await.unwrap();

        // Assert
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "UPDATE a;\nUPDATE b;\nDELETE c;\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_keeps_earlier_batches() {
        let path = temp_spool("reconnect");
        let mut first = SpoolConnection::new(&path);
        first.connect().await.unwrap();
        first.execute(&["ONE".to_string()]).await.unwrap();
        drop(first);

        let mut second = SpoolConnection::new(&path);
        second.connect().await.unwrap();
        second.execute(&["TWO".to_string()]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ONE;\nTWO;\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_truncates_incomplete_batch() {
        // Arrange: a committed batch, then a write that broke off mid-batch
        let path = temp_spool("partial");
        let mut conn = SpoolConnection::new(&path);
        conn.connect().await.unwrap();
        conn.execute(&["ONE".to_string()]).await.unwrap();
        conn.file = None;
        {
            use std::io::Write;
            let mut raw = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            raw.write_all(b"TWO;\nTHR").unwrap();
        }

        // Act: the worker reconnects and retries the whole batch
        conn.connect().await.unwrap();
        conn.execute(&["TWO".to_string(), "THREE".to_string()])
            .await
            .unwrap();

        // Assert
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ONE;\nTWO;\nTHREE;\n"
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_unopenable_path_fails_to_connect() {
        let path = std::env::temp_dir()
            .join(format!("farm-missing-dir-{}", std::process::id()))
            .join("nested")
            .join("spool.sql");
        let mut conn = SpoolConnection::new(path);

        assert!(matches!(conn.connect().await, Err(DbError::ConnectionLost(_))));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_blank_statement_is_rejected() {
        let path = temp_spool("blank");
        let mut conn = SpoolConnection::new(&path);
        conn.connect().await.unwrap();

        let result = conn.execute(&["OK".to_string(), "  ".to_string()]).await;

        assert_eq!(result, Err(DbError::Statement("statement 1 is empty".to_string())));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        std::fs::remove_file(&path).unwrap();
    }
}
