//! Durable key/value storage backing the credential store
//!
//! [`FileStore`] keeps every key in a single JSON object on disk and replaces
//! the file atomically on each write. [`MemoryStore`] lives only as long as
//! the process and backs `--ephemeral` runs and tests.

use std::{
    collections::HashMap,
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Async string key/value storage
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns `None` when the key has never been written
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Overwrites any previous value; resolves once the write is durable
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// JSON object file on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents)
            .map_err(|source| StorageError::Corrupt { path: self.path.clone(), source })
    }

    async fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(map)
            .map_err(|source| StorageError::Corrupt { path: self.path.clone(), source })?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(&body)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        // Contents must reach the disk before the rename makes them visible
        file.sync_all()
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.read_map().await?;
        Ok(map
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_owned(), Value::from(value));
        self.write_map(&map).await?;
        debug!("Storage key written");
        Ok(())
    }
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
