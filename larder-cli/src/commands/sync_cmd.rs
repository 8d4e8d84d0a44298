//! Sync CLI commands for synchronizing with the server.

use clap::Args;
use larder_core::{check_server, PullMode, RoundStatus, SyncError, SyncOutcome};

use super::format_millis;
use crate::config::Config;
use crate::sync::SyncClient;

/// Push local changes and pull remote ones
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Collections to sync (defaults to sync.collections)
    pub collections: Vec<String>,
}

/// Pull remote changes without pushing
#[derive(Debug, Args)]
pub struct PullCommand {
    /// Collection name
    pub collection: String,

    /// Discard local data and download the full collection
    #[arg(long)]
    pub force: bool,
}

/// Show sync configuration, checkpoints and server status
#[derive(Debug)]
pub struct StatusCommand;

fn runtime() -> Result<tokio::runtime::Runtime, SyncCommandError> {
    tokio::runtime::Runtime::new().map_err(SyncCommandError::Runtime)
}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        runtime()?.block_on(self.sync(config))
    }

    async fn sync(&self, config: &Config) -> Result<(), SyncCommandError> {
        let client = SyncClient::from_config(config)?;
        let collections: &[String] = if self.collections.is_empty() {
            client.collections()
        } else {
            &self.collections
        };
        if collections.is_empty() {
            return Err(SyncCommandError::NoCollections);
        }

        println!("Syncing with server...");
        println!();

        let results = client.reconciler().sync_all(collections).await;
        let mut failed = 0;
        for (collection, result) in &results {
            if result.is_err() {
                failed += 1;
            }
            print_result(collection, result);
        }

        println!();
        if failed == 0 {
            println!("Sync complete.");
            Ok(())
        } else {
            Err(SyncCommandError::Failed(failed))
        }
    }
}

impl PullCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        runtime()?.block_on(self.pull(config))
    }

    async fn pull(&self, config: &Config) -> Result<(), SyncCommandError> {
        let client = SyncClient::from_config(config)?;
        let result = if self.force {
            client.reconciler().force_full_resync(&self.collection).await
        } else {
            client
                .reconciler()
                .pull(&self.collection, PullMode::Incremental)
                .await
        };
        print_result(&self.collection, &result);
        result?;
        Ok(())
    }
}

impl StatusCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(server_url) = config.sync.server_url.as_deref() else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!();
            println!("Or set environment variable:");
            println!("  LARDER_SYNC_URL");
            return Ok(());
        };

        println!("Server:    {}", server_url);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Timeout:   {}s", config.sync.timeout_secs);
        println!();

        let checkpoints = config.checkpoint_store().all();
        if checkpoints.is_empty() {
            println!("Checkpoints: none (next sync is a full download)");
        } else {
            println!("Checkpoints:");
            for (collection, at) in &checkpoints {
                println!("  {:<20} {}", collection, format_millis(*at));
            }
        }
        println!();

        let reachable = runtime()?.block_on(check_server(server_url));
        if reachable {
            println!("Server status: ✓ connected");
        } else {
            println!("Server status: ✗ unreachable");
        }
        Ok(())
    }
}

fn print_result(collection: &str, result: &Result<SyncOutcome, SyncError>) {
    match result {
        Ok(outcome) => match &outcome.status {
            RoundStatus::Synced { received, .. } => println!(
                "  ✓ {} ({} record{}, {} received)",
                collection,
                outcome.records.len(),
                if outcome.records.len() == 1 { "" } else { "s" },
                received
            ),
            RoundStatus::Offline { reason } => {
                println!("  ⚠ {} - offline, kept local data ({})", collection, reason)
            }
        },
        Err(e) => println!("  ✗ {} - {}", collection, e),
    }
}

/// Errors from sync commands
#[derive(Debug, thiserror::Error)]
pub enum SyncCommandError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("No collections to sync. Name them or set sync.collections.")]
    NoCollections,
    #[error("{0} collection(s) failed to sync")]
    Failed(usize),
}
