//! JsonLog — append-only JSON array file with optional retention.
//!
//! Each log is a single pretty-printed JSON array. Appends read the whole
//! array, extend it, apply retention, and rewrite the file. The
//! read-modify-write runs under a per-file async mutex shared by all
//! clones, so two in-process appends cannot drop each other's records.
//! A parse failure aborts the append before anything is written, leaving
//! the previously durable bytes untouched.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A durable, size-bounded JSON array log.
pub struct JsonLog<T> {
    path: PathBuf,
    /// Most-recent-N retention; `None` means unbounded.
    cap: Option<usize>,
    lock: Arc<Mutex<()>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonLog<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            cap: self.cap,
            lock: Arc::clone(&self.lock),
            _record: PhantomData,
        }
    }
}

impl<T> JsonLog<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Create a handle for the log file at `path`.
    ///
    /// `cap` limits the file to the most recent N records; older records
    /// are evicted first. The file itself is created by [`JsonLog::init`].
    pub fn new(path: impl Into<PathBuf>, cap: Option<usize>) -> Self {
        Self {
            path: path.into(),
            cap,
            lock: Arc::new(Mutex::new(())),
            _record: PhantomData,
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the containing directory and the file exist.
    ///
    /// A missing file is created holding an empty array. Idempotent — an
    /// existing file is never touched, so calling this on every process
    /// start is safe.
    pub async fn init(&self) -> StoreResult<()> {
        let _guard = self.lock.lock().await;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.init_err(e))?;
        }

        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => {
                tokio::fs::write(&self.path, b"[]")
                    .await
                    .map_err(|e| self.init_err(e))?;
                debug!(path = %self.path.display(), "log file created");
            }
            Err(e) => return Err(self.init_err(e)),
        }
        Ok(())
    }

    /// Append records, applying retention.
    ///
    /// Reads the full array, extends it with `records`, truncates to the
    /// last `cap` entries when capped, and rewrites the file.
    pub async fn append(&self, records: &[T]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;

        let mut existing = self.read_unlocked().await?;
        existing.extend(records.iter().cloned());

        if let Some(cap) = self.cap {
            if existing.len() > cap {
                existing.drain(..existing.len() - cap);
            }
        }

        self.write_unlocked(&existing).await?;
        debug!(
            path = %self.path.display(),
            appended = records.len(),
            total = existing.len(),
            "log appended"
        );
        Ok(())
    }

    /// Read every record currently in the log.
    pub async fn read_all(&self) -> StoreResult<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    async fn read_unlocked(&self) -> StoreResult<Vec<T>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StoreError::Read {
                path: self.path.display().to_string(),
                source: e,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    async fn write_unlocked(&self, records: &[T]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(records).map_err(|e| StoreError::Serialize {
            path: self.path.display().to_string(),
            source: e,
        })?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    fn init_err(&self, e: std::io::Error) -> StoreError {
        StoreError::Init {
            path: self.path.display().to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(cap: Option<usize>) -> (tempfile::TempDir, JsonLog<u32>) {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonLog::new(dir.path().join("data").join("log.json"), cap);
        (dir, log)
    }

    #[tokio::test]
    async fn init_creates_empty_array() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, "[]");
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();
        log.append(&[1, 2, 3]).await.unwrap();

        // A second init must not clobber existing records.
        log.init().await.unwrap();
        assert_eq!(log.read_all().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn append_preserves_arrival_order() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();

        log.append(&[1]).await.unwrap();
        log.append(&[2, 3]).await.unwrap();
        log.append(&[4]).await.unwrap();

        assert_eq!(log.read_all().await.unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn append_evicts_oldest_beyond_cap() {
        let (_dir, log) = temp_log(Some(5));
        log.init().await.unwrap();

        for i in 0..8u32 {
            log.append(&[i]).await.unwrap();
        }

        // Cap 5: the oldest three are gone, the newest five remain in order.
        assert_eq!(log.read_all().await.unwrap(), vec![3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn single_oversized_batch_is_trimmed() {
        let (_dir, log) = temp_log(Some(3));
        log.init().await.unwrap();

        log.append(&[1, 2, 3, 4, 5]).await.unwrap();
        assert_eq!(log.read_all().await.unwrap(), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_append_is_noop() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();
        log.append(&[]).await.unwrap();
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();

        let mut handles = Vec::new();
        for task in 0..10u32 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..5u32 {
                    log.append(&[task * 100 + i]).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Serialized read-modify-write: all 50 records survive.
        assert_eq!(log.read_all().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn corrupt_file_fails_append_without_writing() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();
        std::fs::write(log.path(), "{not json").unwrap();

        let err = log.append(&[1]).await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialize { .. }));

        // The corrupt bytes are untouched — nothing was rewritten.
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn append_before_init_fails() {
        let (_dir, log) = temp_log(None);
        let err = log.append(&[1]).await.unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }

    #[tokio::test]
    async fn file_is_pretty_printed() {
        let (_dir, log) = temp_log(None);
        log.init().await.unwrap();
        log.append(&[1, 2]).await.unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.contains('\n'), "expected multi-line output: {raw}");
    }
}
