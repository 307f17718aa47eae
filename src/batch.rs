//! Batched filesystem mutations
//!
//! Queues directory/write/append operations and applies them as one batch,
//! trading per-operation round-trips for a single flush. The batch is not
//! atomic: a flush that fails midway leaves earlier operations applied.
//! The failing operation and everything after it stay queued, so a caller
//! can repair the cause and call `flush` again.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::OrchestrationError;

/// A queued filesystem mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    MakeDir { path: PathBuf },
    Write { path: PathBuf, contents: String },
    Append { path: PathBuf, contents: String },
}

impl FileOp {
    fn path(&self) -> &Path {
        match self {
            FileOp::MakeDir { path }
            | FileOp::Write { path, .. }
            | FileOp::Append { path, .. } => path,
        }
    }
}

/// Queues filesystem mutations and flushes them in enqueue order
#[derive(Default)]
pub struct BatchFileOperator {
    queue: VecDeque<FileOp>,
}

impl BatchFileOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a recursive directory creation
    pub fn queue_mkdir(&mut self, path: impl Into<PathBuf>) {
        self.queue.push_back(FileOp::MakeDir { path: path.into() });
    }

    /// Queue a whole-file write (create or truncate)
    pub fn queue_write(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.queue.push_back(FileOp::Write {
            path: path.into(),
            contents: contents.into(),
        });
    }

    /// Queue an append (creates the file if missing)
    pub fn queue_append(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.queue.push_back(FileOp::Append {
            path: path.into(),
            contents: contents.into(),
        });
    }

    /// Number of operations waiting to be applied
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Apply every queued operation in enqueue order, then clear the queue
    ///
    /// Returns the number of operations applied. On error the applied
    /// prefix stays applied and the rest of the queue is retained.
    pub async fn flush(&mut self) -> Result<usize, OrchestrationError> {
        let mut applied = 0;
        while let Some(op) = self.queue.front() {
            debug!(path = %op.path().display(), "Applying file op");
            apply(op).await?;
            self.queue.pop_front();
            applied += 1;
        }
        if applied > 0 {
            info!(applied, "Flushed file operation batch");
        }
        Ok(applied)
    }
}

async fn apply(op: &FileOp) -> std::io::Result<()> {
    match op {
        FileOp::MakeDir { path } => tokio::fs::create_dir_all(path).await,
        FileOp::Write { path, contents } => tokio::fs::write(path, contents).await,
        FileOp::Append { path, contents } => {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(contents.as_bytes()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_queue_touches_nothing_until_flush() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("notes.txt");

        let mut operator = BatchFileOperator::new();
        operator.queue_write(&target, "hello");
        assert_eq!(operator.queued(), 1);
        assert!(!target.exists());

        let applied = operator.flush().await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(operator.queued(), 0);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_flush_matches_sequential_application() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let log = nested.join("log.txt");

        let mut operator = BatchFileOperator::new();
        operator.queue_mkdir(&nested);
        operator.queue_write(&log, "one\n");
        operator.queue_append(&log, "two\n");
        operator.queue_append(&log, "three\n");

        operator.flush().await.unwrap();

        // Same final state as running the four operations one by one
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_append_creates_missing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("fresh.txt");

        let mut operator = BatchFileOperator::new();
        operator.queue_append(&target, "first");
        operator.flush().await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first");
    }

    #[tokio::test]
    async fn test_failed_flush_retains_remaining_ops() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        // Writing under a missing parent directory fails
        let bad = dir.path().join("missing-parent/bad.txt");
        let never = dir.path().join("never.txt");

        let mut operator = BatchFileOperator::new();
        operator.queue_write(&good, "applied");
        operator.queue_write(&bad, "fails");
        operator.queue_write(&never, "not reached");

        assert!(operator.flush().await.is_err());

        // The applied prefix stayed applied; the failing op and its
        // successors are still queued
        assert_eq!(std::fs::read_to_string(&good).unwrap(), "applied");
        assert!(!never.exists());
        assert_eq!(operator.queued(), 2);

        // Repair the cause and retry
        std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
        assert_eq!(operator.flush().await.unwrap(), 2);
        assert_eq!(operator.queued(), 0);
        assert!(never.exists());
    }
}
