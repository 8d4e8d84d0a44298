//! Sync error types.

use crate::store::StorageError;

/// Errors that can occur during a sync round.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Sync is not configured
    #[error("Sync not configured. Add sync.server_url to config.")]
    NotConfigured,
    /// Could not reach the server
    #[error("Network error: {0}")]
    Network(String),
    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,
    /// Server answered with an error status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },
    /// Response body did not match the protocol
    #[error("Sync protocol error: {0}")]
    Protocol(String),
    /// Local persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// A round for this collection is already running
    #[error("Collection '{0}' is already syncing")]
    AlreadySyncing(String),
}

impl SyncError {
    /// True for failures that mean "no connectivity this round". These are
    /// absorbed by the reconciler instead of being returned.
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::Timeout)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Timeout
        } else if e.is_decode() {
            SyncError::Protocol(e.to_string())
        } else {
            SyncError::Network(e.to_string())
        }
    }
}
