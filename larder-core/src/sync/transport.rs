//! Transport abstraction for the two sync calls.

use std::future::Future;

use super::error::SyncError;
use super::protocol::{GetDataRequest, SyncDataRequest, SyncResponse};
use crate::record::Payload;

/// Carries sync requests to a server and brings back its answer.
///
/// Implementations: [`HttpTransport`](super::HttpTransport) over REST/JSON,
/// and an in-process loopback in the server crate.
pub trait SyncTransport<P = Payload>: Send + Sync {
    /// Push local records and pull everything newer than the checkpoint.
    fn sync_data(
        &self,
        request: SyncDataRequest<P>,
    ) -> impl Future<Output = Result<SyncResponse<P>, SyncError>> + Send;

    /// Pull everything newer than the checkpoint without pushing.
    fn get_data(
        &self,
        request: GetDataRequest,
    ) -> impl Future<Output = Result<SyncResponse<P>, SyncError>> + Send;
}
