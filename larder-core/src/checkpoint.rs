//! Per-collection sync checkpoints.
//!
//! A checkpoint is the `syncTime` of the last round that fully committed
//! for a collection. Absent means "send me everything". The whole map
//! lives in one small JSON file next to the local collection cache:
//!
//! ```json
//! {"products": 1718000000000, "recipes": 1718000004000}
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::store::{write_atomic, StorageError};

const CHECKPOINT_FILE: &str = "checkpoints.json";

/// File-backed checkpoint tracker.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    dir: PathBuf,
    // Serializes read-modify-write of the shared file.
    lock: Mutex<()>,
}

impl CheckpointStore {
    /// Creates a tracker storing `checkpoints.json` in `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let dir = data_dir.into();
        Self {
            path: dir.join(CHECKPOINT_FILE),
            dir,
            lock: Mutex::new(()),
        }
    }

    /// Path of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last committed sync time for `collection`, if any.
    pub fn get(&self, collection: &str) -> Option<i64> {
        self.read_map().get(collection).copied()
    }

    /// Records `timestamp` as the checkpoint for `collection`.
    pub fn set(&self, collection: &str, timestamp: i64) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map();
        map.insert(collection.to_string(), timestamp);
        self.write_map(&map)
    }

    /// Forgets the checkpoint for `collection`, forcing a full download.
    pub fn clear(&self, collection: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map();
        if map.remove(collection).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }

    /// Every stored checkpoint.
    pub fn all(&self) -> BTreeMap<String, i64> {
        self.read_map()
    }

    fn read_map(&self) -> BTreeMap<String, i64> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read checkpoints {}: {}", self.path.display(), e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoints {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, i64>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(map).map_err(|e| StorageError::Serialize {
            path: self.path.clone(),
            source: e,
        })?;
        write_atomic(&self.dir, &self.path, &bytes)
    }
}
