//! Sync wiring for the CLI.

mod auto_sync;
mod client;

pub use auto_sync::try_auto_sync;
pub use client::SyncClient;
