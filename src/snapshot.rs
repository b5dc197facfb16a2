//! Snapshot and history records.
//!
//! A `Snapshot` is the single current answer for one vehicle. A
//! `HistoryEntry` records one detected change and carries the snapshot
//! that caused it. Both are stored as JSON, so field names here are the
//! wire format.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::Acquisition;

/// Page bodies are cut to this many characters before they are stored.
pub const DETAILS_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Found,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Found => "found",
            Status::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub vehicle_id: String,
    pub status: Status,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub error_message: String,
    pub captured_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
}

impl Snapshot {
    pub fn found(vehicle_id: &str, details: &str, captured_at: DateTime<FixedOffset>) -> Self {
        Snapshot {
            vehicle_id: vehicle_id.to_string(),
            status: Status::Found,
            details: truncate_chars(details, DETAILS_MAX_CHARS),
            error_message: String::new(),
            captured_at,
            artifact_ref: None,
        }
    }

    pub fn error(
        vehicle_id: &str,
        reason: &str,
        artifact_ref: Option<String>,
        captured_at: DateTime<FixedOffset>,
    ) -> Self {
        Snapshot {
            vehicle_id: vehicle_id.to_string(),
            status: Status::Error,
            details: String::new(),
            error_message: reason.to_string(),
            captured_at,
            artifact_ref,
        }
    }

    /// Turn whatever the extractor produced into the record we store.
    pub fn from_acquisition(
        vehicle_id: &str,
        acquisition: Acquisition,
        captured_at: DateTime<FixedOffset>,
    ) -> Self {
        match acquisition {
            Acquisition::Found { details } => Snapshot::found(vehicle_id, &details, captured_at),
            Acquisition::Error { reason, artifact_ref } => {
                Snapshot::error(vehicle_id, &reason, artifact_ref, captured_at)
            }
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<FixedOffset>,
    pub vehicle_id: String,
    pub change_kind: ChangeKind,
    pub change_summary: String,
    pub snapshot: Snapshot,
}

impl HistoryEntry {
    pub fn new(change_kind: ChangeKind, change_summary: &str, snapshot: &Snapshot) -> Self {
        HistoryEntry {
            timestamp: snapshot.captured_at,
            vehicle_id: snapshot.vehicle_id.clone(),
            change_kind,
            change_summary: change_summary.to_string(),
            snapshot: snapshot.clone(),
        }
    }
}

/// Current time in the configured zone. Hours outside +-23 fall back to UTC.
pub fn now_in_offset(utc_offset_hours: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600))
        .unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// Char-boundary safe truncation; page text is mostly Hangul.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-03-04T08:30:00+09:00").unwrap()
    }

    #[test]
    fn found_snapshot_truncates_details() {
        let body = "가".repeat(DETAILS_MAX_CHARS + 40);
        let snapshot = Snapshot::found("1234", &body, at());
        assert_eq!(snapshot.details.chars().count(), DETAILS_MAX_CHARS);
        assert_eq!(snapshot.status, Status::Found);
        assert!(snapshot.error_message.is_empty());
    }

    #[test]
    fn error_acquisition_keeps_reason_and_artifact() {
        let acquisition = Acquisition::Error {
            reason: "search button not found".to_string(),
            artifact_ref: Some("/tmp/parking_debug.png".to_string()),
        };
        let snapshot = Snapshot::from_acquisition("1234", acquisition, at());
        assert!(snapshot.is_error());
        assert_eq!(snapshot.error_message, "search button not found");
        assert_eq!(snapshot.artifact_ref.as_deref(), Some("/tmp/parking_debug.png"));
        assert!(snapshot.details.is_empty());
    }

    #[test]
    fn snapshot_json_uses_lowercase_status() {
        let snapshot = Snapshot::found("1234", "주차층 B2", at());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "found");
        assert_eq!(json["vehicle_id"], "1234");
        assert_eq!(json["captured_at"], "2025-03-04T08:30:00+09:00");
        assert!(json.get("artifact_ref").is_none());
    }

    #[test]
    fn history_entry_copies_snapshot_time() {
        let snapshot = Snapshot::found("1234", "주차층 B2", at());
        let entry = HistoryEntry::new(ChangeKind::Create, "initial record", &snapshot);
        assert_eq!(entry.timestamp, at());
        assert_eq!(entry.vehicle_id, "1234");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["change_kind"], "create");
    }

    #[test]
    fn now_in_offset_uses_requested_zone() {
        let now = now_in_offset(9);
        assert_eq!(now.offset().local_minus_utc(), 9 * 3600);
    }
}
