//! Plain-text rendering for snapshots, history and cycle outcomes.

use crate::cycle::{CycleOutcome, Delivery};
use crate::notify::message::{format_timestamp, ParkingDetails};
use crate::snapshot::{ChangeKind, HistoryEntry, Snapshot, Status};

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    output.push_str(&format!("vehicle:  {}\n", snapshot.vehicle_id));
    output.push_str(&format!("status:   {}\n", snapshot.status.as_str()));
    output.push_str(&format!("captured: {}\n", format_timestamp(&snapshot.captured_at)));

    match snapshot.status {
        Status::Found => {
            let details = ParkingDetails::parse(&snapshot.details);
            if let Some(entry_time) = &details.entry_time {
                output.push_str(&format!("entered:  {entry_time}\n"));
            }
            output.push_str(&format!(
                "floor:    {}\n",
                details.floor.as_deref().unwrap_or("N/A")
            ));
            output.push_str(&format!(
                "location: {}\n",
                details.location.as_deref().unwrap_or("N/A")
            ));
        }
        Status::Error => {
            output.push_str(&format!("error:    {}\n", snapshot.error_message));
        }
    }

    if let Some(artifact) = &snapshot.artifact_ref {
        output.push_str(&format!("artifact: {artifact}\n"));
    }

    output
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return String::from("No changes recorded.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("{:<25} {:<8} {:<7} {}\n", "Time", "Kind", "Status", "Change"));
    output.push_str(&"-".repeat(72));
    output.push('\n');

    for entry in entries {
        let kind = match entry.change_kind {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
        };
        output.push_str(&format!(
            "{:<25} {:<8} {:<7} {}\n",
            format_timestamp(&entry.timestamp),
            kind,
            entry.snapshot.status.as_str(),
            truncate(&single_line(&entry.change_summary), 60)
        ));
    }

    output
}

pub fn render_outcome(outcome: &CycleOutcome) -> String {
    let mut output = render_snapshot(&outcome.snapshot);

    if outcome.changed {
        output.push_str(&format!("change:   {}\n", single_line(&outcome.summary)));
    } else {
        output.push_str("change:   none\n");
    }

    let delivery = match &outcome.delivery {
        Delivery::Sent => "sent".to_string(),
        Delivery::Suppressed => "suppressed (unchanged)".to_string(),
        Delivery::NoNotifier => "not sent (no webhook configured)".to_string(),
        Delivery::Failed { error } => format!("failed ({error})"),
    };
    output.push_str(&format!("notify:   {delivery}\n"));

    if outcome.degraded {
        output.push_str("store:    degraded\n");
    }

    output
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
