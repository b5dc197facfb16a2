//! Parking page extraction.
//!
//! The lookup page has no form to post to: the car number has to be typed
//! on an on-screen keypad, one digit link at a time, before the search link
//! is clicked. `KeypadExtractor` runs that sequence against any
//! `PageSession`, so the browser driver stays behind a trait.
//!
//! Every call yields exactly one `Acquisition`. Failures at any stage come
//! back as `Acquisition::Error`, never as a Rust error, and the browser
//! session is closed on every path.

pub mod webdriver;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;

pub use webdriver::WebDriverLauncher;

/// Element id of the car number input.
pub const INPUT_ELEMENT_ID: &str = "car-number";

/// Text of the search link.
pub const SEARCH_LINK_TEXT: &str = "검색";

/// Where the screenshot goes when the search link cannot be clicked.
pub const DEBUG_SCREENSHOT_PATH: &str = "/tmp/parking_debug.png";

/// What one extraction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Found { details: String },
    Error { reason: String, artifact_ref: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Launch,
    Navigate,
    FindInput,
    EnterDigits,
    Search,
    ReadResult,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionError {
    #[error("page locator not configured")]
    MissingLocator,

    #[error("browser session failed to start: {0}")]
    Launch(String),

    #[error("page failed to load: {0}")]
    Navigate(String),

    #[error("input field not found: {0}")]
    InputNotFound(String),

    #[error("vehicle number entry failed: {0}")]
    DigitEntry(String),

    #[error("search button not found: {0}")]
    SearchNotFound(String),

    #[error("result parsing failed: {0}")]
    ReadResult(String),
}

impl AcquisitionError {
    pub fn stage(&self) -> Stage {
        match self {
            AcquisitionError::MissingLocator | AcquisitionError::Navigate(_) => Stage::Navigate,
            AcquisitionError::Launch(_) => Stage::Launch,
            AcquisitionError::InputNotFound(_) => Stage::FindInput,
            AcquisitionError::DigitEntry(_) => Stage::EnterDigits,
            AcquisitionError::SearchNotFound(_) => Stage::Search,
            AcquisitionError::ReadResult(_) => Stage::ReadResult,
        }
    }
}

/// Fixed waits between page interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimings {
    pub page_load: Duration,
    pub after_focus: Duration,
    pub per_digit: Duration,
    pub result_load: Duration,
}

impl Default for PageTimings {
    fn default() -> Self {
        PageTimings {
            page_load: Duration::from_secs(3),
            after_focus: Duration::from_millis(500),
            per_digit: Duration::from_millis(300),
            result_load: Duration::from_secs(3),
        }
    }
}

impl PageTimings {
    pub fn none() -> Self {
        PageTimings {
            page_load: Duration::ZERO,
            after_focus: Duration::ZERO,
            per_digit: Duration::ZERO,
            result_load: Duration::ZERO,
        }
    }
}

/// One open browser page. Errors are driver messages.
pub trait PageSession {
    fn navigate(&mut self, url: &str) -> Result<(), String>;
    fn title(&mut self) -> Result<String, String>;
    fn find_input(&mut self, element_id: &str) -> Result<(), String>;
    fn click_input(&mut self) -> Result<(), String>;
    /// Click the link whose text is exactly `text`.
    fn click_link_exact(&mut self, text: &str) -> Result<(), String>;
    /// Click the first link whose text contains `text`.
    fn click_link_containing(&mut self, text: &str) -> Result<(), String>;
    fn body_text(&mut self) -> Result<String, String>;
    fn save_screenshot(&mut self, path: &Path) -> Result<(), String>;
    fn close(&mut self);
}

pub trait SessionLauncher {
    fn launch(&self) -> Result<Box<dyn PageSession>, String>;
}

/// Anything that can turn a vehicle identifier into an `Acquisition`.
pub trait PageExtractor {
    fn extract(&self, vehicle_id: &str) -> Acquisition;
}

/// Closes the session when dropped, so early returns cannot leak a browser.
struct SessionGuard(Box<dyn PageSession>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub struct KeypadExtractor<L: SessionLauncher> {
    launcher: L,
    page_url: Option<String>,
    timings: PageTimings,
    debug_screenshot: PathBuf,
    verbose: bool,
}

impl<L: SessionLauncher> KeypadExtractor<L> {
    pub fn new(launcher: L, page_url: Option<String>, timings: PageTimings) -> Self {
        KeypadExtractor {
            launcher,
            page_url,
            timings,
            debug_screenshot: PathBuf::from(DEBUG_SCREENSHOT_PATH),
            verbose: false,
        }
    }

    pub fn from_config(launcher: L, config: &Config) -> Self {
        let mut extractor = KeypadExtractor::new(launcher, config.page_url.clone(), config.timings);
        extractor.verbose = config.verbose;
        extractor
    }

    pub fn with_debug_screenshot(mut self, path: PathBuf) -> Self {
        self.debug_screenshot = path;
        self
    }

    fn run(&self, vehicle_id: &str) -> Result<String, (AcquisitionError, Option<String>)> {
        let url = self
            .page_url
            .as_deref()
            .ok_or((AcquisitionError::MissingLocator, None))?;

        let session = self
            .launcher
            .launch()
            .map_err(|e| (AcquisitionError::Launch(e), None))?;
        let mut guard = SessionGuard(session);
        let page = guard.0.as_mut();

        if self.verbose {
            eprintln!("looking up parking location for {vehicle_id}");
        }

        page.navigate(url)
            .map_err(|e| (AcquisitionError::Navigate(e), None))?;
        std::thread::sleep(self.timings.page_load);

        if self.verbose {
            if let Ok(title) = page.title() {
                eprintln!("page title: {title}");
            }
        }

        page.find_input(INPUT_ELEMENT_ID)
            .map_err(|e| (AcquisitionError::InputNotFound(e), None))?;

        self.enter_digits(&mut *page, vehicle_id)
            .map_err(|e| (AcquisitionError::DigitEntry(e), None))?;

        if let Err(e) = page.click_link_containing(SEARCH_LINK_TEXT) {
            let artifact = match page.save_screenshot(&self.debug_screenshot) {
                Ok(()) => {
                    if self.verbose {
                        eprintln!("debug screenshot saved: {}", self.debug_screenshot.display());
                    }
                    Some(self.debug_screenshot.display().to_string())
                }
                Err(shot_err) => {
                    eprintln!("warning: failed to save debug screenshot: {shot_err}");
                    None
                }
            };
            return Err((AcquisitionError::SearchNotFound(e), artifact));
        }
        std::thread::sleep(self.timings.result_load);

        page.body_text()
            .map_err(|e| (AcquisitionError::ReadResult(e), None))
    }

    fn enter_digits(&self, page: &mut dyn PageSession, vehicle_id: &str) -> Result<(), String> {
        page.click_input()?;
        std::thread::sleep(self.timings.after_focus);

        for digit in vehicle_id.chars() {
            page.click_link_exact(&digit.to_string())
                .map_err(|e| format!("digit '{digit}': {e}"))?;
            std::thread::sleep(self.timings.per_digit);
        }

        if self.verbose {
            eprintln!("entered vehicle number {vehicle_id}");
        }
        Ok(())
    }
}

impl<L: SessionLauncher> PageExtractor for KeypadExtractor<L> {
    fn extract(&self, vehicle_id: &str) -> Acquisition {
        match self.run(vehicle_id) {
            Ok(details) => Acquisition::Found { details },
            Err((err, artifact_ref)) => {
                if self.verbose {
                    eprintln!("lookup failed at {:?}: {err}", err.stage());
                }
                Acquisition::Error {
                    reason: err.to_string(),
                    artifact_ref,
                }
            }
        }
    }
}
