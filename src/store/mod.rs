//! Snapshot storage.
//!
//! Key-value persistence keyed by vehicle identifier:
//! - `parking:{vehicle_id}` holds the current snapshot as JSON
//! - `parking:history:{vehicle_id}` holds change history, newest first,
//!   capped at `HISTORY_LIMIT` entries
//!
//! Only the snapshot key is authoritative. History is advisory.

pub mod diff;
pub mod sqlite;

use crate::snapshot::{HistoryEntry, Snapshot};

pub use sqlite::SqliteStore;

/// Number of history entries kept per vehicle.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the connection.
    #[error("store connection failed: {0}")]
    Connectivity(String),

    #[error("store backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn snapshot_key(vehicle_id: &str) -> String {
    format!("parking:{vehicle_id}")
}

pub fn history_key(vehicle_id: &str) -> String {
    format!("parking:history:{vehicle_id}")
}

/// Backing store for current snapshots and their change history.
///
/// Every `get` must see the latest committed `put`; implementations do
/// not cache.
pub trait SnapshotStore {
    /// Absence is `Ok(None)`, never an error.
    fn get(&self, vehicle_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Overwrite the current snapshot in one write.
    fn put(&self, vehicle_id: &str, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Insert at the head of the history list and trim it to `HISTORY_LIMIT`.
    fn append_history(&self, vehicle_id: &str, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Newest first, at most `limit` entries.
    fn list_history(&self, vehicle_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Liveness probe that touches no keys.
    fn ping(&self) -> Result<(), StoreError>;
}
