pub mod json;
pub mod table;

use crate::cycle::CycleOutcome;
use crate::snapshot::{HistoryEntry, Snapshot};

pub fn print_outcome(outcome: &CycleOutcome, as_json: bool) {
    if as_json {
        println!("{}", json::render(outcome));
    } else {
        print!("{}", table::render_outcome(outcome));
        print_store_errors(&outcome.store_errors);
    }
}

pub fn print_snapshot(snapshot: Option<&Snapshot>, as_json: bool) {
    match (snapshot, as_json) {
        (Some(snapshot), true) => println!("{}", json::render(snapshot)),
        (Some(snapshot), false) => print!("{}", table::render_snapshot(snapshot)),
        (None, true) => println!("null"),
        (None, false) => println!("No snapshot stored. Run 'parkwatch check' to create one."),
    }
}

pub fn print_history(entries: &[HistoryEntry], as_json: bool) {
    if as_json {
        println!("{}", json::render(entries));
    } else {
        print!("{}", table::render_history(entries));
    }
}

fn print_store_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }

    println!();
    for error in errors {
        println!("[store] {error}");
    }
}
