//! Order persistence
//!
//! The registry writes every committed mutation through an `OrderStore`
//! before publishing it in memory, so a restart reloads exactly the states
//! that were acknowledged.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::OrderRecord;
use crate::order::OrderHash;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Durable key-value storage for order records, keyed by order hash.
///
/// Implementations may block; the registry calls them from the blocking pool.
pub trait OrderStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<OrderRecord>, StorageError>;
    fn put(&self, record: &OrderRecord) -> Result<(), StorageError>;
    fn remove(&self, order_hash: &OrderHash) -> Result<(), StorageError>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Non-durable store for tests and local runs.
#[derive(Default)]
pub struct MemoryOrderStore {
    records: Mutex<HashMap<OrderHash, OrderRecord>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn load_all(&self) -> Result<Vec<OrderRecord>, StorageError> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn put(&self, record: &OrderRecord) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.insert(record.order.order_hash, record.clone());
        Ok(())
    }

    fn remove(&self, order_hash: &OrderHash) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.remove(order_hash);
        Ok(())
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// One JSON document per order under a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash never leaves a half-written record.
pub struct FileOrderStore {
    dir: PathBuf,
}

impl FileOrderStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, order_hash: &OrderHash) -> PathBuf {
        self.dir.join(format!("{}.json", order_hash))
    }
}

impl OrderStore for FileOrderStore {
    fn load_all(&self) -> Result<Vec<OrderRecord>, StorageError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path)?;
            match serde_json::from_slice::<OrderRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping unreadable order file {}: {}", path.display(), e);
                }
            }
        }
        debug!("Loaded {} orders from {}", records.len(), self.dir.display());
        Ok(records)
    }

    fn put(&self, record: &OrderRecord) -> Result<(), StorageError> {
        let target = self.path_for(&record.order.order_hash);
        let tmp = target.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(record)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn remove(&self, order_hash: &OrderHash) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(order_hash)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
