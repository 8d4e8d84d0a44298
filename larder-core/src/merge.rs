//! Last-write-wins merge engine.
//!
//! Reconciles two record sequences of the same collection into one. The
//! working set keeps tombstones so a later round can still arbitrate
//! against a deleted id; only [`MergeSet::live`] filters them out.

use std::collections::HashMap;

use crate::record::{Payload, Record};

/// The full result of a merge: every winning record, tombstones included,
/// in first-seen id order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSet<P = Payload> {
    records: Vec<Record<P>>,
    index: HashMap<String, usize>,
    applied: usize,
    stale: usize,
}

impl<P: Clone + PartialEq> MergeSet<P> {
    /// Builds a set seeded from `existing`.
    ///
    /// Duplicate ids inside `existing` are resolved with the same rule as
    /// incoming records, so the set never holds two entries per id.
    pub fn from_existing(existing: impl IntoIterator<Item = Record<P>>) -> Self {
        let mut set = Self {
            records: Vec::new(),
            index: HashMap::new(),
            applied: 0,
            stale: 0,
        };
        for record in existing {
            set.insert(record);
        }
        set.applied = 0;
        set.stale = 0;
        set
    }

    /// Offers one incoming record. Returns true if it changed the set.
    pub fn apply(&mut self, incoming: Record<P>) -> bool {
        self.insert(incoming)
    }

    fn insert(&mut self, incoming: Record<P>) -> bool {
        match self.index.get(&incoming.id) {
            Some(&slot) => {
                let current = &self.records[slot];
                if !incoming.supersedes(current) {
                    self.stale += 1;
                    return false;
                }
                if *current == incoming {
                    return false;
                }
                self.records[slot] = incoming;
                self.applied += 1;
                true
            }
            None => {
                self.index.insert(incoming.id.clone(), self.records.len());
                self.records.push(incoming);
                self.applied += 1;
                true
            }
        }
    }

    /// Looks up the winning record for an id, tombstone or not.
    pub fn get(&self, id: &str) -> Option<&Record<P>> {
        self.index.get(id).map(|&slot| &self.records[slot])
    }

    /// Number of incoming records that changed the set.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Number of incoming records rejected because they were older.
    pub fn stale(&self) -> usize {
        self.stale
    }

    /// Number of ids in the set, tombstones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set holds no ids at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-deleted records, cloned.
    pub fn live(&self) -> Vec<Record<P>> {
        self.records.iter().filter(|r| r.is_live()).cloned().collect()
    }

    /// Every record, tombstones included. This is what gets persisted.
    pub fn into_all(self) -> Vec<Record<P>> {
        self.records
    }
}

/// Merges `incoming` into `existing` and returns the full working set.
pub fn reconcile<P: Clone + PartialEq>(
    existing: impl IntoIterator<Item = Record<P>>,
    incoming: impl IntoIterator<Item = Record<P>>,
) -> MergeSet<P> {
    let mut set = MergeSet::from_existing(existing);
    for record in incoming {
        set.apply(record);
    }
    set
}

/// Merges `incoming` into `existing` and returns only the live records.
pub fn merge<P: Clone + PartialEq>(
    existing: impl IntoIterator<Item = Record<P>>,
    incoming: impl IntoIterator<Item = Record<P>>,
) -> Vec<Record<P>> {
    reconcile(existing, incoming).live()
}

/// Drops tombstones from a record sequence.
pub fn live_only<P>(records: impl IntoIterator<Item = Record<P>>) -> Vec<Record<P>> {
    records.into_iter().filter(|r| r.is_live()).collect()
}

/// Records strictly newer than `since`, or everything when `since` is absent.
///
/// Tombstones are kept so deletions reach clients that hold the id.
pub fn delta<P: Clone>(records: &[Record<P>], since: Option<i64>) -> Vec<Record<P>> {
    match since {
        Some(since) => records
            .iter()
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect(),
        None => records.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rec(id: &str, at: i64, name: &str) -> Record {
        let mut payload = Payload::new();
        payload.insert("name".to_string(), json!(name));
        Record::new(id, payload, at)
    }

    fn tomb(id: &str, at: i64) -> Record {
        let mut r = rec(id, at, "");
        r.deleted = true;
        r
    }

    fn by_id(records: Vec<Record>) -> BTreeMap<String, Record> {
        records.into_iter().map(|r| (r.id.clone(), r)).collect()
    }

    #[test]
    fn test_merge_disjoint_sets() {
        let merged = merge(vec![rec("a", 1, "A")], vec![rec("b", 2, "B")]);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_tombstone_precedence() {
        let merged = merge(vec![rec("x", 10, "live")], vec![tomb("x", 20)]);
        assert!(merged.iter().all(|r| r.id != "x"));
    }

    #[test]
    fn test_newer_live_record_beats_older_tombstone() {
        let merged = merge(vec![tomb("x", 10)], vec![rec("x", 20, "back")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].payload["name"], json!("back"));
    }

    #[test]
    fn test_stale_write_rejected() {
        let set = reconcile(vec![rec("x", 20, "fresh")], vec![rec("x", 5, "old")]);
        assert_eq!(set.stale(), 1);
        assert_eq!(set.applied(), 0);
        assert_eq!(set.get("x").unwrap().payload["name"], json!("fresh"));
    }

    #[test]
    fn test_incoming_wins_exact_tie() {
        let merged = merge(vec![rec("x", 50, "local")], vec![rec("x", 50, "server")]);
        assert_eq!(merged[0].payload["name"], json!("server"));
    }

    #[test]
    fn test_incoming_tombstone_wins_tie_with_live() {
        let set = reconcile(vec![rec("x", 50, "local")], vec![tomb("x", 50)]);
        assert_eq!(set.applied(), 1);
        assert!(set.get("x").unwrap().deleted);
        assert!(set.live().is_empty());
    }

    #[test]
    fn test_incoming_live_wins_tie_with_tombstone() {
        let set = reconcile(vec![tomb("x", 50)], vec![rec("x", 50, "revived")]);
        assert_eq!(set.applied(), 1);
        let live = set.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].payload["name"], json!("revived"));
    }

    #[test]
    fn test_identical_tie_is_not_counted() {
        let set = reconcile(vec![rec("x", 50, "same")], vec![rec("x", 50, "same")]);
        assert_eq!(set.applied(), 0);
        assert_eq!(set.stale(), 0);
    }

    #[test]
    fn test_tombstones_retained_in_working_set() {
        let set = reconcile(vec![rec("x", 10, "live")], vec![tomb("x", 20)]);
        assert_eq!(set.len(), 1);
        assert!(set.live().is_empty());

        // A later round still sees the tombstone's timestamp.
        let all = set.into_all();
        let next = merge(all, vec![rec("x", 15, "late")]);
        assert!(next.is_empty());
    }

    #[test]
    fn test_duplicate_ids_in_existing_collapse() {
        let set = MergeSet::from_existing(vec![rec("x", 1, "first"), rec("x", 3, "second")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("x").unwrap().updated_at, 3);
    }

    #[test]
    fn test_delta_filters_by_checkpoint() {
        let records = vec![rec("a", 5, "A"), rec("b", 10, "B"), tomb("c", 15)];

        let ids: Vec<_> = delta(&records, Some(10)).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c"]);

        assert_eq!(delta(&records, None).len(), 3);
        assert!(delta(&records, Some(15)).is_empty());
    }

    #[test]
    fn test_live_only() {
        let live = live_only(vec![rec("a", 1, "A"), tomb("b", 2)]);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "a");
    }

    /// Records with a small id space so collisions happen, and a timestamp
    /// derived from (id, stamp) so two records for the same id never tie
    /// unless they are identical.
    fn record_strategy() -> impl Strategy<Value = Record> {
        (0u8..6, 0i64..50).prop_map(|(id, stamp)| {
            let id = format!("r{}", id);
            let mut r = rec(&id, stamp * 10, &format!("{}@{}", id, stamp));
            r.deleted = stamp % 3 == 0;
            r
        })
    }

    fn set_strategy() -> impl Strategy<Value = Vec<Record>> {
        prop::collection::vec(record_strategy(), 0..12)
    }

    /// One record per id over a tiny timestamp range, so the two sides of a
    /// merge tie often and a tie may pit a tombstone against a live record.
    fn tie_heavy_set() -> impl Strategy<Value = Vec<Record>> {
        prop::collection::btree_map(0u8..6, (0i64..3, any::<bool>(), 0u8..3), 0..6).prop_map(
            |entries| {
                entries
                    .into_iter()
                    .map(|(id, (at, deleted, name))| {
                        let mut r = rec(&format!("r{}", id), at, &format!("v{}", name));
                        r.deleted = deleted;
                        r
                    })
                    .collect()
            },
        )
    }

    /// Winner per id when `incoming` takes exact ties.
    fn expected_winners(existing: &[Record], incoming: &[Record]) -> BTreeMap<String, Record> {
        let mut winners = by_id(existing.to_vec());
        for r in incoming {
            match winners.get(&r.id) {
                Some(current) if current.updated_at > r.updated_at => {}
                _ => {
                    winners.insert(r.id.clone(), r.clone());
                }
            }
        }
        winners
    }

    proptest! {
        #[test]
        fn prop_merge_commutative(a in set_strategy(), b in set_strategy()) {
            let ab = by_id(merge(a.clone(), b.clone()));
            let ba = by_id(merge(b, a));
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn prop_merge_idempotent(a in set_strategy(), b in set_strategy()) {
            let once = reconcile(a, b.clone());
            let live_once = by_id(once.live());
            let twice = by_id(merge(once.into_all(), b));
            prop_assert_eq!(live_once, twice);
        }

        #[test]
        fn prop_self_merge_is_noop(a in set_strategy()) {
            let base = reconcile(Vec::new(), a).into_all();
            let again = reconcile(base.clone(), base.clone());
            prop_assert_eq!(again.applied(), 0);
            prop_assert_eq!(again.into_all(), base);
        }

        #[test]
        fn prop_ties_go_to_incoming(a in tie_heavy_set(), b in tie_heavy_set()) {
            let expected = expected_winners(&a, &b);
            let set = reconcile(a.clone(), b.clone());
            let all = by_id(set.clone().into_all());
            prop_assert_eq!(&all, &expected);

            let live: BTreeMap<_, _> = expected
                .into_iter()
                .filter(|(_, r)| r.is_live())
                .collect();
            prop_assert_eq!(by_id(set.live()), live);
        }

        #[test]
        fn prop_merge_commutative_with_ties_normalized(
            a in tie_heavy_set(),
            b in tie_heavy_set(),
        ) {
            let ab = by_id(merge(a.clone(), b.clone()));
            let ba = by_id(merge(b.clone(), a.clone()));
            let tied: BTreeMap<&str, (&Record, &Record)> = a
                .iter()
                .filter_map(|r| {
                    b.iter()
                        .find(|o| o.id == r.id && o.updated_at == r.updated_at)
                        .map(|o| (r.id.as_str(), (r, o)))
                })
                .collect();

            for id in ab.keys().chain(ba.keys()) {
                if !tied.contains_key(id.as_str()) {
                    prop_assert_eq!(ab.get(id), ba.get(id));
                }
            }
            // On a tie each direction keeps the side merged in second.
            for (id, (from_a, from_b)) in tied {
                prop_assert_eq!(ab.get(id), Some(from_b).filter(|r| r.is_live()));
                prop_assert_eq!(ba.get(id), Some(from_a).filter(|r| r.is_live()));
            }
        }

        #[test]
        fn prop_winner_has_max_timestamp(a in set_strategy(), b in set_strategy()) {
            let set = reconcile(a.clone(), b.clone());
            for r in a.iter().chain(b.iter()) {
                prop_assert!(set.get(&r.id).unwrap().updated_at >= r.updated_at);
            }
        }
    }
}
