//! Notification gating and delivery.
//!
//! `should_notify` is the whole policy: errors always go out, found results
//! only when they changed. Delivery sits behind `Notifier` so the cycle can
//! be exercised without a webhook.

pub mod message;
pub mod webhook;

use crate::snapshot::{Snapshot, Status};
use crate::store::diff::ChangeResult;

pub use webhook::WebhookNotifier;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("webhook request timed out")]
    Timeout,

    #[error("webhook request failed: {0}")]
    Transport(String),
}

/// Repeated errors still notify: each one is a sign the lookup is broken.
pub fn should_notify(change: &ChangeResult, status: Status) -> bool {
    match status {
        Status::Error => true,
        Status::Found => change.changed,
    }
}

pub trait Notifier {
    fn notify(&self, snapshot: &Snapshot) -> Result<(), DeliveryError>;
}
