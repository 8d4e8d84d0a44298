//! In-process transport that calls a [`SyncService`] directly.
//!
//! Lets a client reconciler talk to a server without HTTP, for tests and
//! for embedding both sides in one process. Can be switched offline to
//! simulate a lost connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use larder_core::{
    Clock, CollectionStore, GetDataRequest, SyncDataRequest, SyncError, SyncResponse,
    SyncTransport,
};

use super::service::{ServiceError, SyncService};

/// Transport backed by a shared in-process service.
pub struct LoopbackTransport<S, C> {
    service: Arc<SyncService<S, C>>,
    online: AtomicBool,
}

impl<S, C> LoopbackTransport<S, C> {
    pub fn new(service: Arc<SyncService<S, C>>) -> Self {
        Self {
            service,
            online: AtomicBool::new(true),
        }
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), SyncError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Network("loopback transport is offline".to_string()))
        }
    }
}

fn to_sync_error(e: ServiceError) -> SyncError {
    SyncError::Server {
        status: e.status().as_u16(),
        message: e.to_string(),
    }
}

impl<S, C> SyncTransport for LoopbackTransport<S, C>
where
    S: CollectionStore,
    C: Clock,
{
    async fn sync_data(&self, request: SyncDataRequest) -> Result<SyncResponse, SyncError> {
        self.check_online()?;
        self.service.sync_data(request).await.map_err(to_sync_error)
    }

    async fn get_data(&self, request: GetDataRequest) -> Result<SyncResponse, SyncError> {
        self.check_online()?;
        self.service.get_data(request).await.map_err(to_sync_error)
    }
}
