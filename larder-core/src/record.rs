//! The record shape every synchronized item satisfies.
//!
//! A record is an opaque payload plus three fields the sync core reads:
//! `id`, `updatedAt` and `deleted`. On the wire and on disk the payload's
//! fields sit next to the core fields in a single JSON object:
//!
//! ```json
//! {"id": "p1", "updatedAt": 100, "deleted": false, "name": "Flour"}
//! ```

use serde::{Deserialize, Serialize};

/// Default payload type: whatever JSON fields the caller attached.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A timestamped, soft-deletable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<P = Payload> {
    /// Unique within its collection, assigned by the creator.
    pub id: String,
    /// Milliseconds since the Unix epoch of the last mutation.
    pub updated_at: i64,
    /// Tombstone flag.
    #[serde(default)]
    pub deleted: bool,
    /// Business fields, opaque to the sync core.
    #[serde(flatten)]
    pub payload: P,
}

impl<P> Record<P> {
    /// Creates a live record stamped at `at`.
    pub fn new(id: impl Into<String>, payload: P, at: i64) -> Self {
        Self {
            id: id.into(),
            updated_at: at,
            deleted: false,
            payload,
        }
    }

    /// Replaces the payload and bumps the timestamp.
    ///
    /// Updating a tombstoned record revives it.
    pub fn update(&mut self, payload: P, at: i64) {
        self.payload = payload;
        self.deleted = false;
        self.updated_at = at;
    }

    /// Marks the record deleted and bumps the timestamp.
    pub fn tombstone(&mut self, at: i64) {
        self.deleted = true;
        self.updated_at = at;
    }

    /// Returns true unless the record is a tombstone.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Last-write-wins comparison: true when `self`, arriving as the
    /// incoming side, should replace `current`.
    ///
    /// Equal timestamps go to the incoming record.
    pub fn supersedes(&self, current: &Record<P>) -> bool {
        self.updated_at >= current.updated_at
    }
}
