//! Larder sync server.
//!
//! Stores one collection of records per name and reconciles client pushes
//! against it with last-write-wins, one round at a time per collection.

pub mod config;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use server::{router, LoopbackTransport, ServiceError, SyncService};
