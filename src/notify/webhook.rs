use serde::Serialize;
use std::time::Duration;

use super::{message, DeliveryError, Notifier};
use crate::config::Config;
use crate::snapshot::{now_in_offset, Snapshot};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct Payload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to an incoming webhook (Mattermost, Slack-compatible).
pub struct WebhookNotifier {
    url: String,
    agent: ureq::Agent,
    utc_offset_hours: i32,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration, utc_offset_hours: i32) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        WebhookNotifier {
            url: url.to_string(),
            agent: config.into(),
            utc_offset_hours,
        }
    }

    /// `None` when no webhook is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .webhook_url
            .as_deref()
            .map(|url| WebhookNotifier::new(url, config.notify_timeout, config.utc_offset_hours))
    }

    /// Any 2xx answer counts as delivered, not only 200.
    pub fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        let mut response = self
            .agent
            .post(&self.url)
            .send_json(&Payload { text })
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

fn classify(err: ureq::Error) -> DeliveryError {
    match err {
        ureq::Error::Timeout(_) => DeliveryError::Timeout,
        other => DeliveryError::Transport(other.to_string()),
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, snapshot: &Snapshot) -> Result<(), DeliveryError> {
        let text = message::render(snapshot, &now_in_offset(self.utc_offset_hours));
        self.send_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Instant;

    fn snapshot() -> Snapshot {
        Snapshot::found(
            "1234",
            "차량번호 1234\n주차층 B2\n차량위치 15",
            DateTime::parse_from_rfc3339("2025-03-04T08:30:00+09:00").unwrap(),
        )
    }

    #[test]
    fn posts_text_payload() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST)
                .path("/hooks/abc")
                .json_body(json!({ "text": "hello" }));
            then.status(200).body("ok");
        });

        let notifier = WebhookNotifier::new(&server.url("/hooks/abc"), DEFAULT_TIMEOUT, 9);
        notifier.send_text("hello").unwrap();

        hook.assert();
    }

    #[test]
    fn notify_sends_rendered_message() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST).path("/hooks/abc");
            then.status(200);
        });

        let notifier = WebhookNotifier::new(&server.url("/hooks/abc"), DEFAULT_TIMEOUT, 9);
        notifier.notify(&snapshot()).unwrap();

        hook.assert();
    }

    #[test]
    fn non_success_status_is_delivery_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hooks/abc");
            then.status(500).body("boom");
        });

        let notifier = WebhookNotifier::new(&server.url("/hooks/abc"), DEFAULT_TIMEOUT, 9);
        match notifier.send_text("hello") {
            Err(DeliveryError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn accepted_status_counts_as_delivered() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hooks/abc");
            then.status(202);
        });

        let notifier = WebhookNotifier::new(&server.url("/hooks/abc"), DEFAULT_TIMEOUT, 9);
        assert!(notifier.send_text("hello").is_ok());
    }

    #[test]
    fn slow_endpoint_times_out_at_configured_bound() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hooks/abc");
            then.status(200).delay(Duration::from_secs(3));
        });

        let notifier = WebhookNotifier::new(&server.url("/hooks/abc"), Duration::from_secs(1), 9);
        let started = Instant::now();
        let result = notifier.send_text("hello");
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(DeliveryError::Timeout)), "got {result:?}");
        assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2500), "returned after {elapsed:?}");
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        // port 9 (discard) is closed on test machines
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_secs(2), 9);
        assert!(matches!(
            notifier.send_text("hello"),
            Err(DeliveryError::Transport(_)) | Err(DeliveryError::Timeout)
        ));
    }
}
