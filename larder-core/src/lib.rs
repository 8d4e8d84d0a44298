//! Larder Core Library
//!
//! Offline-first record synchronization: a last-write-wins merge engine,
//! collection stores, per-collection checkpoints and the client reconciler
//! shared by the Larder server and CLI.

pub mod checkpoint;
pub mod clock;
pub mod local;
pub mod merge;
pub mod record;
pub mod store;
pub mod sync;

pub use checkpoint::CheckpointStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use local::LocalRepository;
pub use merge::{delta, live_only, merge, reconcile, MergeSet};
pub use record::{Payload, Record};
pub use store::{validate_collection_name, CollectionStore, FileStore, MemoryStore, StorageError};
pub use sync::{
    check_server, GetDataRequest, HttpTransport, PullMode, Reconciler, RoundStatus,
    SyncDataRequest, SyncError, SyncOutcome, SyncPhase, SyncResponse, SyncTransport,
    DEFAULT_TIMEOUT,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
