//! One lookup cycle.
//!
//! extract -> detect (reads store) -> put + history -> gate -> notify
//!
//! The cycle always ends with a snapshot. Store failures degrade it to
//! "treat as changed" so the result still reaches the channel; delivery
//! failures are recorded and otherwise ignored. Only the acquisition
//! outcome decides the exit status.

use serde::Serialize;

use crate::config::Config;
use crate::extract::PageExtractor;
use crate::notify::{should_notify, Notifier};
use crate::snapshot::{now_in_offset, HistoryEntry, Snapshot};
use crate::store::diff::{ChangeDetector, ChangeResult};
use crate::store::SnapshotStore;

pub const NO_STORE_SUMMARY: &str = "no store configured";
pub const STORE_UNAVAILABLE_SUMMARY: &str = "previous state unavailable";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Suppressed,
    NoNotifier,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub snapshot: Snapshot,
    pub changed: bool,
    pub summary: String,
    /// A store read or write failed during this cycle.
    pub degraded: bool,
    pub store_errors: Vec<String>,
    pub notify: bool,
    pub delivery: Delivery,
}

impl CycleOutcome {
    /// Exit status follows the acquisition, nothing else.
    pub fn succeeded(&self) -> bool {
        !self.snapshot.is_error()
    }
}

pub fn run_cycle(
    vehicle_id: &str,
    extractor: &dyn PageExtractor,
    store: Option<&dyn SnapshotStore>,
    notifier: Option<&dyn Notifier>,
    config: &Config,
) -> CycleOutcome {
    let acquisition = extractor.extract(vehicle_id);
    let snapshot = Snapshot::from_acquisition(
        vehicle_id,
        acquisition,
        now_in_offset(config.utc_offset_hours),
    );

    if config.verbose {
        if snapshot.is_error() {
            eprintln!("lookup failed: {}", snapshot.error_message);
        } else {
            eprintln!("lookup succeeded ({} chars)", snapshot.details.chars().count());
        }
    }

    let mut store_errors = Vec::new();
    let change = match store {
        Some(store) => record(store, vehicle_id, &snapshot, &mut store_errors, config.verbose),
        None => {
            if config.verbose {
                eprintln!("no store configured, every result is treated as new");
            }
            ChangeResult::untracked(NO_STORE_SUMMARY)
        }
    };

    let degraded = !store_errors.is_empty();
    let notify = should_notify(&change, snapshot.status) || degraded;

    let delivery = if !notify {
        if config.verbose {
            eprintln!("no change since last lookup, notification suppressed");
        }
        Delivery::Suppressed
    } else {
        match notifier {
            None => {
                if config.verbose {
                    eprintln!("no webhook configured, notification not sent");
                }
                Delivery::NoNotifier
            }
            Some(notifier) => match notifier.notify(&snapshot) {
                Ok(()) => {
                    if config.verbose {
                        eprintln!("notification sent");
                    }
                    Delivery::Sent
                }
                Err(e) => {
                    eprintln!("warning: failed to send notification: {e}");
                    Delivery::Failed { error: e.to_string() }
                }
            },
        }
    };

    CycleOutcome {
        snapshot,
        changed: change.changed,
        summary: change.summary,
        degraded,
        store_errors,
        notify,
        delivery,
    }
}

/// Detect, overwrite the current snapshot and log the change.
///
/// Errors are collected rather than returned: a failed read is treated as a
/// change, a failed write skips the history entry.
fn record(
    store: &dyn SnapshotStore,
    vehicle_id: &str,
    snapshot: &Snapshot,
    errors: &mut Vec<String>,
    verbose: bool,
) -> ChangeResult {
    let change = match ChangeDetector::new(store).detect(vehicle_id, snapshot) {
        Ok(change) => change,
        Err(e) => {
            eprintln!("warning: failed to read stored snapshot: {e}");
            errors.push(e.to_string());
            ChangeResult::untracked(STORE_UNAVAILABLE_SUMMARY)
        }
    };

    if let Err(e) = store.put(vehicle_id, snapshot) {
        eprintln!("warning: failed to save snapshot: {e}");
        errors.push(e.to_string());
        return change;
    }

    if verbose {
        eprintln!("snapshot saved for {vehicle_id}");
    }

    if change.changed {
        let entry = HistoryEntry::new(change.kind(), &change.summary, snapshot);
        match store.append_history(vehicle_id, &entry) {
            Ok(()) => {
                if verbose {
                    eprintln!("history recorded: {}", change.summary);
                }
            }
            Err(e) => {
                eprintln!("warning: failed to record history: {e}");
                errors.push(e.to_string());
            }
        }
    }

    change
}
