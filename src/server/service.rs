//! Server side of a sync round.
//!
//! Each collection is an independent unit of concurrency: a round's
//! read-merge-write runs under that collection's lock, and rounds for
//! different collections run in parallel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::StatusCode;
use larder_core::{
    delta, reconcile, validate_collection_name, Clock, CollectionStore, GetDataRequest, Record,
    StorageError, SyncDataRequest, SyncResponse,
};
use tokio::sync::{Mutex, RwLock};

/// Errors returned to sync callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Collection name is empty or unsafe.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),
    /// Collection is not in the configured allow-list.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
    /// The merged collection could not be persisted.
    #[error("Failed to persist collection '{collection}': {source}")]
    StorageWriteFailed {
        collection: String,
        #[source]
        source: StorageError,
    },
}

impl ServiceError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidCollection(_) => StatusCode::BAD_REQUEST,
            ServiceError::UnknownCollection(_) => StatusCode::NOT_FOUND,
            ServiceError::StorageWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidCollection(_) => "invalid_collection",
            ServiceError::UnknownCollection(_) => "unknown_collection",
            ServiceError::StorageWriteFailed { .. } => "storage_write_failed",
        }
    }
}

/// One lock per collection name, created on first use and dropped once no
/// round holds or waits on it.
#[derive(Debug, Default)]
pub struct CollectionLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl CollectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock guarding `collection`.
    pub async fn get(&self, collection: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(collection) {
            return lock.clone();
        }

        let mut locks = self.locks.write().await;
        locks.entry(collection.to_string()).or_default().clone()
    }

    /// Hands back a lock obtained from [`CollectionLocks::get`], removing the
    /// entry when nobody else holds a handle to it.
    pub async fn release(&self, collection: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.write().await;
        if let Some(entry) = locks.get(collection) {
            // The map's handle plus ours.
            if Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2 {
                locks.remove(collection);
            }
        }
    }

    /// Number of collections with a live lock.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// Returns true if no collection has a live lock.
    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

/// Serves `sync_data` and `get_data` against a collection store.
pub struct SyncService<S, C> {
    store: S,
    clock: C,
    locks: CollectionLocks,
    allowed: Option<HashSet<String>>,
}

impl<S, C> SyncService<S, C>
where
    S: CollectionStore,
    C: Clock,
{
    /// Creates a service accepting any valid collection name.
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            locks: CollectionLocks::new(),
            allowed: None,
        }
    }

    /// Restricts the service to the given collection names. An empty list
    /// keeps every valid name allowed.
    pub fn with_allowed_collections<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        self.allowed = if names.is_empty() { None } else { Some(names) };
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn check_collection(&self, collection: &str) -> Result<(), ServiceError> {
        validate_collection_name(collection)
            .map_err(|_| ServiceError::InvalidCollection(collection.to_string()))?;

        match &self.allowed {
            Some(allowed) if !allowed.contains(collection) => {
                Err(ServiceError::UnknownCollection(collection.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Push-and-pull: merge the client's records into the stored
    /// collection, persist, and return what changed since the client's
    /// checkpoint.
    pub async fn sync_data(&self, request: SyncDataRequest) -> Result<SyncResponse, ServiceError> {
        let SyncDataRequest {
            collection,
            data,
            last_sync_time,
        } = request;
        self.check_collection(&collection)?;

        let lock = self.locks.get(&collection).await;
        let result = {
            let _guard = lock.lock().await;
            self.merge_and_store(&collection, data, last_sync_time)
        };
        self.locks.release(&collection, lock).await;
        result
    }

    fn merge_and_store(
        &self,
        collection: &str,
        data: Vec<Record>,
        last_sync_time: Option<i64>,
    ) -> Result<SyncResponse, ServiceError> {
        let existing = self.store.read_all(collection);
        let pushed = data.len();
        let merged = reconcile(existing, data);

        tracing::debug!(
            "Merged {} pushed record(s) into '{}': {} applied, {} stale",
            pushed,
            collection,
            merged.applied(),
            merged.stale()
        );

        let all = merged.into_all();
        if let Err(e) = self.store.replace_all(collection, &all) {
            tracing::error!("Failed to persist '{}': {}", collection, e);
            return Err(ServiceError::StorageWriteFailed {
                collection: collection.to_string(),
                source: e,
            });
        }

        let data = delta(&all, last_sync_time);
        let sync_time = self.clock.now_millis();

        tracing::info!(
            "sync_data '{}': stored {}, returning {} since {:?}",
            collection,
            all.len(),
            data.len(),
            last_sync_time
        );

        Ok(SyncResponse { data, sync_time })
    }

    /// Pull-only: return what changed since the client's checkpoint.
    pub async fn get_data(&self, request: GetDataRequest) -> Result<SyncResponse, ServiceError> {
        self.check_collection(&request.collection)?;

        let lock = self.locks.get(&request.collection).await;
        let response = {
            let _guard = lock.lock().await;
            let all = self.store.read_all(&request.collection);
            let data = delta(&all, request.last_sync_time);

            tracing::info!(
                "get_data '{}': returning {} of {} since {:?}",
                request.collection,
                data.len(),
                all.len(),
                request.last_sync_time
            );

            SyncResponse {
                data,
                sync_time: self.clock.now_millis(),
            }
        };
        self.locks.release(&request.collection, lock).await;
        Ok(response)
    }
}
