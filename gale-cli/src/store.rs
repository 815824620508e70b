//! Local key-value state
//!
//! A small JSON file mapping keys to epoch-millisecond timestamps. The job
//! view records when each script or flow was last executed here.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised by the local store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode state for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key under which the last execution time of `path` is stored
pub fn last_exec_time_key(path: &str) -> String {
    format!("{}:last_exec_time", path)
}

/// Where the job view records last execution times
#[async_trait]
pub trait ExecTimeStore: Send + Sync {
    async fn set_item(&self, key: &str, value: i64) -> Result<(), StoreError>;

    async fn get_item(&self, key: &str) -> Result<Option<i64>, StoreError>;

    async fn record_last_exec_time(&self, path: &str, epoch_ms: i64) -> Result<(), StoreError> {
        self.set_item(&last_exec_time_key(path), epoch_ms).await
    }

    async fn last_exec_time(&self, path: &str) -> Result<Option<i64>, StoreError> {
        self.get_item(&last_exec_time_key(path)).await
    }
}

/// JSON file backed store
///
/// Writes go through a mutex so concurrent fire-and-forget writers from the
/// same process do not clobber each other.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, items: &BTreeMap<String, i64>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(items).map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, json).await.map_err(io_err)
    }
}

#[async_trait]
impl ExecTimeStore for JsonFileStore {
    async fn set_item(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value);
        self.save(&items).await
    }

    async fn get_item(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(key).copied())
    }
}
