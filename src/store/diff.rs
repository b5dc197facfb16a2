//! Snapshot comparison engine.
//!
//! Compares a freshly acquired snapshot with the stored one:
//! - Only `status`, `details` and `error_message` take part
//! - Fields are checked in that order and the first difference wins
//! - `captured_at` and `artifact_ref` change every cycle and are ignored

use super::{SnapshotStore, StoreError};
use crate::snapshot::{ChangeKind, Snapshot};

pub const INITIAL_SUMMARY: &str = "initial record";

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeResult {
    pub changed: bool,
    pub summary: String,
    pub previous: Option<Snapshot>,
}

impl ChangeResult {
    /// Used when there is no previous state to compare with, either because
    /// no store is configured or because it could not be read.
    pub fn untracked(reason: &str) -> Self {
        ChangeResult {
            changed: true,
            summary: reason.to_string(),
            previous: None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        if self.previous.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Create
        }
    }
}

/// Compared fields, in priority order.
fn compared_fields(snapshot: &Snapshot) -> [(&'static str, &str); 3] {
    [
        ("status", snapshot.status.as_str()),
        ("details", snapshot.details.as_str()),
        ("error_message", snapshot.error_message.as_str()),
    ]
}

/// Compare a new snapshot with the previous one, if any.
pub fn compare(previous: Option<&Snapshot>, new: &Snapshot) -> ChangeResult {
    let Some(previous) = previous else {
        return ChangeResult {
            changed: true,
            summary: INITIAL_SUMMARY.to_string(),
            previous: None,
        };
    };

    let first_difference = compared_fields(previous)
        .into_iter()
        .zip(compared_fields(new))
        .find(|((_, old), (_, new))| old != new);

    let summary = match first_difference {
        Some(((field, old), (_, new))) => format!("{field}: '{old}' -> '{new}'"),
        None => String::new(),
    };

    ChangeResult {
        changed: first_difference.is_some(),
        summary,
        previous: Some(previous.clone()),
    }
}

pub struct ChangeDetector<'a, S: SnapshotStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SnapshotStore + ?Sized> ChangeDetector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        ChangeDetector { store }
    }

    /// Read errors are returned as-is; whether to carry on is the caller's call.
    pub fn detect(&self, vehicle_id: &str, new: &Snapshot) -> Result<ChangeResult, StoreError> {
        let previous = self.store.get(vehicle_id)?;
        Ok(compare(previous.as_ref(), new))
    }
}
