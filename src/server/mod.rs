//! Server-side modules for the Larder sync server.

pub mod loopback;
pub mod routes;
pub mod service;

pub use loopback::LoopbackTransport;
pub use routes::router;
pub use service::{CollectionLocks, ServiceError, SyncService};
