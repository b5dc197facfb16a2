//! Runtime configuration.
//!
//! Built once in `main` and passed by reference. Sources, highest first:
//! - command line flags and their environment variables
//! - the TOML file (`--config`, or `<config dir>/parkwatch/config.toml`)
//! - built-in defaults
//!
//! ```toml
//! vehicle_id = "1234"
//! page_url = "https://parking.example/lookup"
//! webdriver_url = "http://localhost:9515"
//! store_path = "/var/lib/parkwatch/parkwatch.db"
//! webhook_url = "https://chat.example/hooks/abc"
//! notify_timeout = "10s"
//! utc_offset_hours = 9
//!
//! [timings]
//! page_load = "3s"
//! after_focus = "500ms"
//! per_digit = "300ms"
//! result_load = "3s"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::webdriver::DEFAULT_WEBDRIVER_URL;
use crate::extract::PageTimings;
use crate::notify::webhook::DEFAULT_TIMEOUT;

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {key}: {source}")]
    Duration {
        key: &'static str,
        source: humantime::DurationError,
    },

    #[error("utc_offset_hours must be between -23 and 23, got {0}")]
    UtcOffset(i32),

    #[error("no vehicle number configured (set --vehicle, CAR_NUMBER or vehicle_id)")]
    MissingVehicle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    vehicle_id: Option<String>,
    page_url: Option<String>,
    webdriver_url: Option<String>,
    store_path: Option<PathBuf>,
    webhook_url: Option<String>,
    notify_timeout: Option<String>,
    utc_offset_hours: Option<i32>,
    #[serde(default)]
    timings: FileTimings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileTimings {
    page_load: Option<String>,
    after_focus: Option<String>,
    per_digit: Option<String>,
    result_load: Option<String>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub vehicle_id: Option<String>,
    pub page_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub store_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub vehicle_id: Option<String>,
    pub page_url: Option<String>,
    pub webdriver_url: String,
    /// No path means acquisition-only: nothing cached, every result notifies.
    pub store_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub notify_timeout: Duration,
    pub utc_offset_hours: i32,
    pub timings: PageTimings,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vehicle_id: None,
            page_url: None,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            store_path: None,
            webhook_url: None,
            notify_timeout: DEFAULT_TIMEOUT,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            timings: PageTimings::default(),
            verbose: false,
        }
    }
}

/// `<config dir>/parkwatch/config.toml`, e.g. ~/.config/parkwatch/config.toml on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parkwatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_duration(key: &'static str, value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(text) => humantime::parse_duration(text.trim())
            .map_err(|source| ConfigError::Duration { key, source }),
        None => Ok(default),
    }
}

/// Empty strings from the environment count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// An explicit `config_path` must exist; the default location is optional.
    pub fn load(config_path: Option<&Path>, overrides: Overrides, verbose: bool) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => FileConfig::default(),
            },
        };

        Config::merge(file, overrides, verbose)
    }

    pub fn from_toml(text: &str, overrides: Overrides, verbose: bool) -> Result<Self, ConfigError> {
        Config::merge(toml::from_str(text)?, overrides, verbose)
    }

    fn merge(file: FileConfig, overrides: Overrides, verbose: bool) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let default_timings = defaults.timings;

        let utc_offset_hours = file.utc_offset_hours.unwrap_or(defaults.utc_offset_hours);
        if !(-23..=23).contains(&utc_offset_hours) {
            return Err(ConfigError::UtcOffset(utc_offset_hours));
        }

        let timings = PageTimings {
            page_load: parse_duration("timings.page_load", file.timings.page_load.as_deref(), default_timings.page_load)?,
            after_focus: parse_duration("timings.after_focus", file.timings.after_focus.as_deref(), default_timings.after_focus)?,
            per_digit: parse_duration("timings.per_digit", file.timings.per_digit.as_deref(), default_timings.per_digit)?,
            result_load: parse_duration("timings.result_load", file.timings.result_load.as_deref(), default_timings.result_load)?,
        };

        Ok(Config {
            vehicle_id: non_empty(overrides.vehicle_id).or(non_empty(file.vehicle_id)),
            page_url: non_empty(overrides.page_url).or(non_empty(file.page_url)),
            webdriver_url: non_empty(overrides.webdriver_url)
                .or(non_empty(file.webdriver_url))
                .unwrap_or(defaults.webdriver_url),
            store_path: overrides
                .store_path
                .or(file.store_path)
                .filter(|p| !p.as_os_str().is_empty()),
            webhook_url: non_empty(overrides.webhook_url).or(non_empty(file.webhook_url)),
            notify_timeout: parse_duration("notify_timeout", file.notify_timeout.as_deref(), defaults.notify_timeout)?,
            utc_offset_hours,
            timings,
            verbose,
        })
    }

    pub fn vehicle_id(&self) -> Result<&str, ConfigError> {
        self.vehicle_id.as_deref().ok_or(ConfigError::MissingVehicle)
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}
