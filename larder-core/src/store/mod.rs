//! Durable storage for named record collections.
//!
//! A store keeps one unit per collection name and exposes two operations:
//! read everything, and atomically replace everything. Reads fail open
//! (an unreadable collection is an empty one); writes report failure so
//! callers never advance a checkpoint over a lost write.

mod file;
mod memory;

use std::io;
use std::path::PathBuf;

use crate::record::{Payload, Record};

pub use file::{FileStore, LoadError};
pub(crate) use file::write_atomic;
pub use memory::MemoryStore;

/// Errors that can occur while persisting a collection or checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The records could not be encoded.
    #[error("failed to encode {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Collection name is empty or would escape the data directory.
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
    /// The backend refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// Keyed storage for whole collections.
pub trait CollectionStore<P = Payload>: Send + Sync {
    /// Returns every stored record, tombstones included.
    ///
    /// A collection that was never written, or cannot be read, is empty.
    fn read_all(&self, collection: &str) -> Vec<Record<P>>;

    /// Overwrites the collection with `records`, all-or-nothing.
    fn replace_all(&self, collection: &str, records: &[Record<P>]) -> Result<(), StorageError>;
}

impl<P, S: CollectionStore<P> + ?Sized> CollectionStore<P> for std::sync::Arc<S> {
    fn read_all(&self, collection: &str) -> Vec<Record<P>> {
        (**self).read_all(collection)
    }

    fn replace_all(&self, collection: &str, records: &[Record<P>]) -> Result<(), StorageError> {
        (**self).replace_all(collection, records)
    }
}

/// Rejects names that are empty or could be used for path traversal.
pub fn validate_collection_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
        || name.chars().any(char::is_control)
    {
        return Err(StorageError::InvalidCollection(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_collection_name() {
        // Valid
        assert!(validate_collection_name("products").is_ok());
        assert!(validate_collection_name("stock-items").is_ok());
        assert!(validate_collection_name("recipes_v2").is_ok());

        // Invalid
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("../evil").is_err());
        assert!(validate_collection_name("foo/bar").is_err());
        assert!(validate_collection_name("foo\\bar").is_err());
        assert!(validate_collection_name(".hidden").is_err());
        assert!(validate_collection_name("tab\there").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::InvalidCollection("../x".to_string());
        assert_eq!(err.to_string(), "invalid collection name: \"../x\"");
    }
}
