//! Minimal W3C WebDriver client.
//!
//! Talks JSON over HTTP to chromedriver (or any W3C driver) and exposes
//! just the page operations the keypad lookup needs. Driver errors come
//! back as `{"value": {"error": ..., "message": ...}}` with a non-2xx
//! status; those are turned into plain messages.

use base64::Engine;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use super::{PageSession, SessionLauncher};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

const CHROME_ARGS: &[&str] = &[
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
];

pub struct WebDriverLauncher {
    endpoint: String,
    request_timeout: Duration,
}

impl WebDriverLauncher {
    pub fn new(endpoint: &str) -> Self {
        WebDriverLauncher {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionLauncher for WebDriverLauncher {
    fn launch(&self) -> Result<Box<dyn PageSession>, String> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.request_timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": CHROME_ARGS }
                }
            }
        });

        let value = send(agent.post(&format!("{}/session", self.endpoint)).send_json(&capabilities))?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| format!("driver returned no session id: {value}"))?
            .to_string();

        Ok(Box::new(WebDriverSession {
            agent,
            base: format!("{}/session/{session_id}", self.endpoint),
            input: None,
            closed: false,
        }))
    }
}

pub struct WebDriverSession {
    agent: ureq::Agent,
    base: String,
    input: Option<String>,
    closed: bool,
}

/// Unwrap the `value` member of a driver response, or its error message.
fn send(result: Result<ureq::http::Response<ureq::Body>, ureq::Error>) -> Result<Value, String> {
    let mut response = result.map_err(|e| format!("webdriver request failed: {e}"))?;
    let status = response.status();
    let body: Value = response
        .body_mut()
        .read_json()
        .map_err(|e| format!("webdriver response unreadable ({status}): {e}"))?;

    if status.is_success() {
        return Ok(body.get("value").cloned().unwrap_or(Value::Null));
    }

    let error = body["value"]["error"].as_str().unwrap_or("unknown error");
    let message = body["value"]["message"].as_str().unwrap_or("");
    if message.is_empty() {
        Err(format!("{error} ({status})"))
    } else {
        Err(format!("{error}: {message}"))
    }
}

fn element_id(value: &Value) -> Result<String, String> {
    value[ELEMENT_KEY]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("driver returned no element reference: {value}"))
}

/// XPath string literal; falls back to concat() when both quote kinds appear.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

impl WebDriverSession {
    fn post(&self, path: &str, body: &Value) -> Result<Value, String> {
        send(self.agent.post(&format!("{}{path}", self.base)).send_json(body))
    }

    fn get(&self, path: &str) -> Result<Value, String> {
        send(self.agent.get(&format!("{}{path}", self.base)).call())
    }

    fn find(&self, using: &str, selector: &str) -> Result<String, String> {
        let value = self.post("/element", &json!({ "using": using, "value": selector }))?;
        element_id(&value)
    }

    fn click(&self, element: &str) -> Result<(), String> {
        self.post(&format!("/element/{element}/click"), &json!({}))?;
        Ok(())
    }
}

impl PageSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), String> {
        self.post("/url", &json!({ "url": url }))?;
        Ok(())
    }

    fn title(&mut self) -> Result<String, String> {
        let value = self.get("/title")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn find_input(&mut self, element_id: &str) -> Result<(), String> {
        let element = self.find("css selector", &format!("#{element_id}"))?;
        self.input = Some(element);
        Ok(())
    }

    fn click_input(&mut self) -> Result<(), String> {
        let element = self.input.clone().ok_or("input field was not located")?;
        self.click(&element)
    }

    fn click_link_exact(&mut self, text: &str) -> Result<(), String> {
        let element = self.find("xpath", &format!("//a[text()={}]", xpath_literal(text)))?;
        self.click(&element)
    }

    fn click_link_containing(&mut self, text: &str) -> Result<(), String> {
        let element = self.find("xpath", &format!("//a[contains(text(), {})]", xpath_literal(text)))?;
        self.click(&element)
    }

    fn body_text(&mut self) -> Result<String, String> {
        let body = self.find("tag name", "body")?;
        let value = self.get(&format!("/element/{body}/text"))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("driver returned non-text body: {value}"))
    }

    fn save_screenshot(&mut self, path: &Path) -> Result<(), String> {
        let value = self.get("/screenshot")?;
        let encoded = value.as_str().ok_or("driver returned no screenshot data")?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| format!("screenshot is not base64: {e}"))?;
        std::fs::write(path, png).map_err(|e| format!("failed to write {}: {e}", path.display()))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = send(self.agent.delete(&self.base).call()) {
            eprintln!("warning: failed to close browser session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn xpath_literal_quotes() {
        assert_eq!(xpath_literal("검색"), "'검색'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn element_reference_is_extracted() {
        let value = json!({ ELEMENT_KEY: "abc-123" });
        assert_eq!(element_id(&value).unwrap(), "abc-123");
        assert!(element_id(&json!({})).is_err());
    }

    #[test]
    fn launch_creates_session_and_close_deletes_it() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/session");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "value": { "sessionId": "s1", "capabilities": {} } }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/session/s1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "value": null }));
        });

        let launcher = WebDriverLauncher::new(&server.base_url());
        let mut session = launcher.launch().unwrap();
        session.close();
        session.close();

        create.assert();
        delete.assert();
    }

    #[test]
    fn driver_error_message_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/session");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "value": { "sessionId": "s1" } }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/element");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({
                    "value": { "error": "no such element", "message": "Unable to locate #car-number" }
                }));
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/session/s1");
            then.status(200).json_body(json!({ "value": null }));
        });

        let mut session = WebDriverLauncher::new(&server.base_url()).launch().unwrap();
        let err = session.find_input("car-number").unwrap_err();
        assert_eq!(err, "no such element: Unable to locate #car-number");
        session.close();
    }
}
