//! Sync protocol and client-side reconciler.
//!
//! ## Protocol
//!
//! Two request/response calls, both keyed by collection name:
//! 1. `sync_data`: push local records, get back records newer than the checkpoint
//! 2. `get_data`: pull records newer than the checkpoint without pushing
//!
//! Both return a `syncTime` that becomes the next checkpoint once the
//! client has persisted the merged result.

mod client;
mod error;
mod protocol;
mod reconciler;
mod transport;

pub use client::{check_server, HttpTransport, DEFAULT_TIMEOUT};
pub use error::SyncError;
pub use protocol::{ErrorBody, GetDataRequest, HealthResponse, SyncDataRequest, SyncResponse};
pub use reconciler::{PullMode, Reconciler, RoundStatus, SyncOutcome, SyncPhase};
pub use transport::SyncTransport;
