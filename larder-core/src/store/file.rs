//! File-backed collection store.
//!
//! Stores one JSON array per collection:
//! ```text
//! <DATA_DIR>/
//!   products.json
//!   recipes.json
//! ```
//!
//! Writes go to `<name>.json.tmp`, are synced to disk, then renamed over
//! the live file, so readers see either the old or the new content.

use std::fs::{self, File};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{validate_collection_name, CollectionStore, StorageError};
use crate::record::{Payload, Record};

/// Collection store writing JSON files under a data directory.
#[derive(Debug)]
pub struct FileStore<P = Payload> {
    data_dir: PathBuf,
    _payload: PhantomData<fn() -> P>,
}

impl<P> Clone for FileStore<P> {
    fn clone(&self) -> Self {
        Self::new(self.data_dir.clone())
    }
}

impl<P> FileStore<P> {
    /// Creates a store rooted at `data_dir`. Nothing is created until the
    /// first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            _payload: PhantomData,
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the file path for a collection.
    pub fn path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    /// Checks if a collection has ever been written.
    pub fn exists(&self, collection: &str) -> bool {
        validate_collection_name(collection).is_ok() && self.path(collection).exists()
    }
}

impl<P: DeserializeOwned> FileStore<P> {
    /// Strict read: `Ok(None)` if the file doesn't exist, `Err` if it
    /// can't be read or parsed.
    pub fn load(&self, collection: &str) -> Result<Option<Vec<Record<P>>>, LoadError> {
        validate_collection_name(collection).map_err(LoadError::Storage)?;
        let path = self.path(collection);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LoadError::Storage(StorageError::Io { path, source: e })),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| LoadError::Corrupt(path, e))
    }
}

/// Why a strict [`FileStore::load`] failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Storage(StorageError),
    #[error("corrupt collection file {}: {}", .0.display(), .1)]
    Corrupt(PathBuf, #[source] serde_json::Error),
}

impl<P> CollectionStore<P> for FileStore<P>
where
    P: Serialize + DeserializeOwned,
{
    fn read_all(&self, collection: &str) -> Vec<Record<P>> {
        match self.load(collection) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Treating collection '{}' as empty: {}", collection, e);
                Vec::new()
            }
        }
    }

    fn replace_all(&self, collection: &str, records: &[Record<P>]) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        let path = self.path(collection);

        let bytes = serde_json::to_vec(records).map_err(|e| StorageError::Serialize {
            path: path.clone(),
            source: e,
        })?;

        write_atomic(&self.data_dir, &path, &bytes)?;

        tracing::debug!("Wrote {} record(s) to {}", records.len(), path.display());
        Ok(())
    }
}

/// Writes `bytes` to `path` via a synced temp file and a rename.
///
/// Creates `dir` if it doesn't exist.
pub(crate) fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = File::create(&temp_path).map_err(|e| StorageError::Io {
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::Io {
            path: temp_path.clone(),
            source: e,
        })?;
    drop(file);

    // Rename to final path (atomic on most filesystems)
    fs::rename(&temp_path, path).map_err(|e| StorageError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
