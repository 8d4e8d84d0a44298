//! HTTP sync client built from CLI configuration.

use std::time::Duration;

use larder_core::{FileStore, HttpTransport, Reconciler, SyncError, SyncOutcome};

use crate::config::{Config, SyncConfig};

/// Reconciler over the configured server and the local data directory.
pub struct SyncClient {
    reconciler: Reconciler<HttpTransport, FileStore>,
    collections: Vec<String>,
}

impl SyncClient {
    /// Creates a client from config. Fails with `NotConfigured` when no
    /// server URL is set.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let url = server_url(&config.sync)?;
        let timeout = Duration::from_secs(config.sync.timeout_secs);
        let transport = HttpTransport::new(url, timeout)?;

        Ok(Self {
            reconciler: Reconciler::new(
                transport,
                config.collection_store(),
                config.checkpoint_store(),
            ),
            collections: config.sync.collections.clone(),
        })
    }

    pub fn reconciler(&self) -> &Reconciler<HttpTransport, FileStore> {
        &self.reconciler
    }

    /// Collections listed under `sync.collections`.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Push-and-pull for each configured collection.
    pub async fn sync_all(&self) -> Vec<(String, Result<SyncOutcome, SyncError>)> {
        self.reconciler.sync_all(&self.collections).await
    }
}

fn server_url(sync: &SyncConfig) -> Result<&str, SyncError> {
    sync.server_url.as_deref().ok_or(SyncError::NotConfigured)
}
