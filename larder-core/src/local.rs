//! Local edits against a client-side collection store.
//!
//! Every mutation stamps `updatedAt` from the clock. Deletes write a
//! tombstone instead of removing the id.

use crate::clock::Clock;
use crate::merge::live_only;
use crate::record::{Payload, Record};
use crate::store::{CollectionStore, StorageError};

/// Create, update and delete records in a local store.
pub struct LocalRepository<S, C> {
    store: S,
    clock: C,
}

impl<S, C> LocalRepository<S, C>
where
    S: CollectionStore<Payload>,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Live records in a collection.
    pub fn list(&self, collection: &str) -> Vec<Record> {
        live_only(self.store.read_all(collection))
    }

    /// Every record in a collection, tombstones included.
    pub fn list_all(&self, collection: &str) -> Vec<Record> {
        self.store.read_all(collection)
    }

    /// A live record by id.
    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.store
            .read_all(collection)
            .into_iter()
            .find(|r| r.id == id && r.is_live())
    }

    /// Creates or replaces the record with `id`.
    ///
    /// The new timestamp is never lower than the one already stored for the
    /// id, so a local edit always wins over the local version it replaces.
    pub fn put(
        &self,
        collection: &str,
        id: &str,
        payload: Payload,
    ) -> Result<Record, StorageError> {
        let mut records = self.store.read_all(collection);
        let now = self.clock.now_millis();

        let record = match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                let at = now.max(existing.updated_at.saturating_add(1));
                existing.update(payload, at);
                existing.clone()
            }
            None => {
                let record = Record::new(id, payload, now);
                records.push(record.clone());
                record
            }
        };

        self.store.replace_all(collection, &records)?;
        tracing::debug!("Put '{}' in '{}' at {}", id, collection, record.updated_at);
        Ok(record)
    }

    /// Tombstones the record with `id`.
    ///
    /// Returns `Ok(false)` if there is no live record with that id.
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
        let mut records = self.store.read_all(collection);
        let now = self.clock.now_millis();

        let Some(existing) = records.iter_mut().find(|r| r.id == id && r.is_live()) else {
            return Ok(false);
        };
        let at = now.max(existing.updated_at.saturating_add(1));
        existing.tombstone(at);

        self.store.replace_all(collection, &records)?;
        tracing::debug!("Deleted '{}' from '{}' at {}", id, collection, at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn payload(name: &str) -> Payload {
        let mut map = Payload::new();
        map.insert("name".to_string(), json!(name));
        map
    }

    fn setup() -> (LocalRepository<Arc<MemoryStore>, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1000));
        let repo = LocalRepository::new(Arc::new(MemoryStore::new()), clock.clone());
        (repo, clock)
    }

    #[test]
    fn test_put_creates_with_clock_time() {
        let (repo, _clock) = setup();
        let record = repo.put("products", "p1", payload("Flour")).unwrap();

        assert_eq!(record.updated_at, 1000);
        assert_eq!(repo.list("products"), vec![record]);
    }

    #[test]
    fn test_put_updates_in_place() {
        let (repo, clock) = setup();
        repo.put("products", "p1", payload("Flour")).unwrap();
        clock.set(2000);
        let updated = repo.put("products", "p1", payload("Rye")).unwrap();

        assert_eq!(updated.updated_at, 2000);
        let all = repo.list_all("products");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload["name"], json!("Rye"));
    }

    #[test]
    fn test_put_never_moves_timestamp_backwards() {
        let (repo, clock) = setup();
        repo.put("products", "p1", payload("Flour")).unwrap();
        clock.set(500);
        let updated = repo.put("products", "p1", payload("Rye")).unwrap();
        assert_eq!(updated.updated_at, 1001);
    }

    #[test]
    fn test_edit_at_max_timestamp_saturates() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        store
            .replace_all("products", &[Record::new("p1", payload("Flour"), i64::MAX)])
            .unwrap();
        let repo = LocalRepository::new(store, Arc::new(ManualClock::new(1000)));

        let updated = repo.put("products", "p1", payload("Rye")).unwrap();
        assert_eq!(updated.updated_at, i64::MAX);
        assert_eq!(updated.payload["name"], json!("Rye"));

        assert!(repo.delete("products", "p1").unwrap());
        assert_eq!(repo.list_all("products")[0].updated_at, i64::MAX);
    }

    #[test]
    fn test_delete_writes_tombstone() {
        let (repo, clock) = setup();
        repo.put("products", "p1", payload("Flour")).unwrap();
        clock.set(3000);

        assert!(repo.delete("products", "p1").unwrap());
        assert!(repo.list("products").is_empty());
        assert!(repo.get("products", "p1").is_none());

        let all = repo.list_all("products");
        assert!(all[0].deleted);
        assert_eq!(all[0].updated_at, 3000);
    }

    #[test]
    fn test_delete_unknown_or_deleted_is_false() {
        let (repo, _clock) = setup();
        assert!(!repo.delete("products", "missing").unwrap());

        repo.put("products", "p1", payload("Flour")).unwrap();
        assert!(repo.delete("products", "p1").unwrap());
        assert!(!repo.delete("products", "p1").unwrap());
    }

    #[test]
    fn test_put_revives_tombstone() {
        let (repo, clock) = setup();
        repo.put("products", "p1", payload("Flour")).unwrap();
        clock.set(2000);
        repo.delete("products", "p1").unwrap();
        clock.set(3000);
        repo.put("products", "p1", payload("Flour again")).unwrap();

        assert_eq!(repo.get("products", "p1").unwrap().updated_at, 3000);
    }
}
