//! Client side of a sync round.
//!
//! One round for one collection goes `Idle -> Syncing -> Succeeded | Failed`.
//! A round commits in a fixed order: the server persists, the client
//! persists the merged records, and only then does the checkpoint move.
//! Any failure before the local write leaves records and checkpoint as
//! they were, so retrying is always safe.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;

use super::error::SyncError;
use super::protocol::{GetDataRequest, SyncDataRequest, SyncResponse};
use super::transport::SyncTransport;
use crate::checkpoint::CheckpointStore;
use crate::merge::{live_only, reconcile};
use crate::record::{Payload, Record};
use crate::store::{validate_collection_name, CollectionStore};

/// Where a collection is in its sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Never synced through this reconciler.
    Idle,
    /// A round is in flight.
    Syncing,
    /// The last round committed.
    Succeeded,
    /// The last round did not advance the checkpoint (offline or error).
    Failed,
}

impl SyncPhase {
    /// Returns true if a round is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncPhase::Syncing)
    }

    /// Returns true if a new round may start.
    pub fn can_start(&self) -> bool {
        !self.is_active()
    }
}

/// How a pull-only round treats local data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    /// Merge records newer than the checkpoint into local data.
    Incremental,
    /// Discard local data and take the server's full set.
    Force,
}

/// What a round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    /// The round committed; `received` records came back from the server.
    Synced { sync_time: i64, received: usize },
    /// The server was unreachable; nothing changed.
    Offline { reason: String },
}

/// Result of one round: the collection's live records afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome<P = Payload> {
    pub collection: String,
    pub records: Vec<Record<P>>,
    pub status: RoundStatus,
}

impl<P> SyncOutcome<P> {
    /// Returns true if the round fell back to local data.
    pub fn is_offline(&self) -> bool {
        matches!(self.status, RoundStatus::Offline { .. })
    }
}

/// Drives sync rounds for one client.
pub struct Reconciler<T, S, P = Payload> {
    transport: T,
    store: S,
    checkpoints: CheckpointStore,
    phases: Mutex<HashMap<String, SyncPhase>>,
    _payload: PhantomData<fn() -> P>,
}

impl<T, S, P> Reconciler<T, S, P>
where
    T: SyncTransport<P>,
    S: CollectionStore<P>,
    P: Clone + PartialEq + Send + Sync,
{
    /// Creates a reconciler over a transport, a local store and a
    /// checkpoint tracker.
    pub fn new(transport: T, store: S, checkpoints: CheckpointStore) -> Self {
        Self {
            transport,
            store,
            checkpoints,
            phases: Mutex::new(HashMap::new()),
            _payload: PhantomData,
        }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the checkpoint tracker.
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Current phase for a collection.
    pub fn phase(&self, collection: &str) -> SyncPhase {
        self.lock_phases()
            .get(collection)
            .copied()
            .unwrap_or(SyncPhase::Idle)
    }

    /// Live local records, without contacting the server.
    pub fn local_records(&self, collection: &str) -> Vec<Record<P>> {
        live_only(self.store.read_all(collection))
    }

    /// Push-and-pull round.
    ///
    /// Sends every local record with the current checkpoint, merges the
    /// returned delta into local data, persists, then advances the
    /// checkpoint. When the server can't be reached the local records are
    /// returned untouched with [`RoundStatus::Offline`].
    pub async fn sync(&self, collection: &str) -> Result<SyncOutcome<P>, SyncError> {
        validate_collection_name(collection)?;
        let round = self.begin(collection)?;

        let local = self.store.read_all(collection);
        let last_sync_time = self.checkpoints.get(collection);

        tracing::debug!(
            "Syncing '{}': pushing {} record(s), lastSyncTime={:?}",
            collection,
            local.len(),
            last_sync_time
        );

        let request = SyncDataRequest {
            collection: collection.to_string(),
            data: local,
            last_sync_time,
        };

        let response = match self.transport.sync_data(request).await {
            Ok(response) => response,
            Err(e) if e.is_offline() => {
                let local = self.store.read_all(collection);
                return Ok(round.offline(live_only(local), e));
            }
            Err(e) => return Err(e),
        };

        // Edits committed while the request was in flight are merged here
        // and pushed on the next round.
        let received = response.data.len();
        let merged = reconcile(self.store.read_all(collection), response.data);
        let records = merged.live();
        self.commit(collection, &merged.into_all(), response.sync_time)?;

        tracing::info!(
            "Synced '{}': received {} record(s), {} live",
            collection,
            received,
            records.len()
        );
        Ok(round.succeed(records, response.sync_time, received))
    }

    /// Pull-only round.
    ///
    /// [`PullMode::Incremental`] merges the server's delta into local data.
    /// [`PullMode::Force`] asks for full history and replaces local data
    /// with the server's set verbatim.
    pub async fn pull(
        &self,
        collection: &str,
        mode: PullMode,
    ) -> Result<SyncOutcome<P>, SyncError> {
        validate_collection_name(collection)?;
        let round = self.begin(collection)?;

        let last_sync_time = match mode {
            PullMode::Incremental => self.checkpoints.get(collection),
            PullMode::Force => None,
        };

        let request = GetDataRequest {
            collection: collection.to_string(),
            last_sync_time,
        };

        let response: SyncResponse<P> = match self.transport.get_data(request).await {
            Ok(response) => response,
            Err(e) if e.is_offline() => {
                let local = self.store.read_all(collection);
                return Ok(round.offline(live_only(local), e));
            }
            Err(e) => return Err(e),
        };

        let received = response.data.len();
        let all = match mode {
            PullMode::Incremental => reconcile(self.store.read_all(collection), response.data),
            PullMode::Force => reconcile(Vec::new(), response.data),
        };
        let records = all.live();
        self.commit(collection, &all.into_all(), response.sync_time)?;

        tracing::info!(
            "Pulled '{}' ({:?}): received {} record(s)",
            collection,
            mode,
            received
        );
        Ok(round.succeed(records, response.sync_time, received))
    }

    /// Forgets the checkpoint and downloads the server's full set.
    pub async fn force_full_resync(&self, collection: &str) -> Result<SyncOutcome<P>, SyncError> {
        validate_collection_name(collection)?;
        self.checkpoints.clear(collection)?;
        self.pull(collection, PullMode::Force).await
    }

    /// Runs a push-and-pull round for each collection in turn.
    pub async fn sync_all<I>(
        &self,
        collections: I,
    ) -> Vec<(String, Result<SyncOutcome<P>, SyncError>)>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut results = Vec::new();
        for collection in collections {
            let collection = collection.as_ref();
            let result = self.sync(collection).await;
            if let Err(e) = &result {
                tracing::warn!("Sync of '{}' failed: {}", collection, e);
            }
            results.push((collection.to_string(), result));
        }
        results
    }

    /// Persists merged records, then moves the checkpoint.
    fn commit(
        &self,
        collection: &str,
        records: &[Record<P>],
        sync_time: i64,
    ) -> Result<(), SyncError> {
        if let Err(e) = self.store.replace_all(collection, records) {
            tracing::error!("Failed to persist '{}' locally: {}", collection, e);
            return Err(e.into());
        }
        if let Err(e) = self.checkpoints.set(collection, sync_time) {
            // Records are saved; the next round re-fetches a larger delta.
            tracing::error!("Failed to advance checkpoint for '{}': {}", collection, e);
            return Err(e.into());
        }
        Ok(())
    }

    fn begin(&self, collection: &str) -> Result<Round<'_>, SyncError> {
        let mut phases = self.lock_phases();
        let phase = phases.entry(collection.to_string()).or_insert(SyncPhase::Idle);
        if !phase.can_start() {
            return Err(SyncError::AlreadySyncing(collection.to_string()));
        }
        *phase = SyncPhase::Syncing;

        Ok(Round {
            phases: &self.phases,
            collection: collection.to_string(),
            finished: false,
        })
    }

    fn lock_phases(&self) -> std::sync::MutexGuard<'_, HashMap<String, SyncPhase>> {
        self.phases.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An in-flight round. Dropping it without finishing marks it failed, which
/// covers early returns and cancelled futures.
struct Round<'a> {
    phases: &'a Mutex<HashMap<String, SyncPhase>>,
    collection: String,
    finished: bool,
}

impl Round<'_> {
    fn set(&mut self, phase: SyncPhase) {
        let mut phases = self.phases.lock().unwrap_or_else(|e| e.into_inner());
        phases.insert(self.collection.clone(), phase);
        self.finished = true;
    }

    fn succeed<P>(
        mut self,
        records: Vec<Record<P>>,
        sync_time: i64,
        received: usize,
    ) -> SyncOutcome<P> {
        self.set(SyncPhase::Succeeded);
        SyncOutcome {
            collection: self.collection.clone(),
            records,
            status: RoundStatus::Synced {
                sync_time,
                received,
            },
        }
    }

    fn offline<P>(mut self, records: Vec<Record<P>>, reason: SyncError) -> SyncOutcome<P> {
        tracing::warn!(
            "Server unreachable, using local data for '{}': {}",
            self.collection,
            reason
        );
        self.set(SyncPhase::Failed);
        SyncOutcome {
            collection: self.collection.clone(),
            records,
            status: RoundStatus::Offline {
                reason: reason.to_string(),
            },
        }
    }
}

impl Drop for Round<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.set(SyncPhase::Failed);
        }
    }
}
