//! In-process collection store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{validate_collection_name, CollectionStore, StorageError};
use crate::record::{Payload, Record};

/// Collection store kept in memory. Writes can be made to fail on demand.
#[derive(Debug)]
pub struct MemoryStore<P = Payload> {
    collections: Mutex<HashMap<String, Vec<Record<P>>>>,
    fail_writes: AtomicBool,
}

impl<P> Default for MemoryStore<P> {
    fn default() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl<P> MemoryStore<P> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `replace_all` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl<P: Clone + Send> CollectionStore<P> for MemoryStore<P> {
    fn read_all(&self, collection: &str) -> Vec<Record<P>> {
        match self.collections.lock() {
            Ok(map) => map.get(collection).cloned().unwrap_or_default(),
            Err(_) => {
                tracing::warn!("Memory store poisoned, treating '{}' as empty", collection);
                Vec::new()
            }
        }
    }

    fn replace_all(&self, collection: &str, records: &[Record<P>]) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(format!(
                "memory store refused write to '{}'",
                collection
            )));
        }
        let mut map = self
            .collections
            .lock()
            .map_err(|_| StorageError::WriteRejected("memory store poisoned".to_string()))?;
        map.insert(collection.to_string(), records.to_vec());
        Ok(())
    }
}
