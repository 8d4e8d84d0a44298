//! Auto-sync functionality for CLI commands.
//!
//! Provides automatic synchronization before read operations and after write
//! operations when `auto_sync` is enabled in the configuration.

use larder_core::{check_server, RoundStatus};

use super::SyncClient;
use crate::config::Config;

/// Performs auto-sync of `collection` if enabled and the server is reachable.
///
/// Failures are reported on stderr and never fail the calling command, so
/// the CLI keeps working offline.
pub fn try_auto_sync(config: &Config, collection: &str) {
    if !config.sync.auto_sync {
        return;
    }
    let Some(url) = config.sync.server_url.as_deref() else {
        return;
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    rt.block_on(async {
        // Check server reachability first (fast fail)
        if !check_server(url).await {
            eprintln!("Auto-sync: server unreachable, skipping");
            return;
        }

        let client = match SyncClient::from_config(config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Auto-sync: {}", e);
                return;
            }
        };

        match client.reconciler().sync(collection).await {
            Ok(outcome) => match outcome.status {
                RoundStatus::Synced { received, .. } => {
                    tracing::debug!("Auto-sync of '{}' received {} records", collection, received);
                }
                RoundStatus::Offline { reason } => {
                    eprintln!("Auto-sync: offline ({})", reason);
                }
            },
            Err(e) => {
                eprintln!("Auto-sync: {}", e);
            }
        }
    });
}
