//! Crawler configuration.
//!
//! Settings come from an optional YAML file; every key may be omitted and
//! falls back to the defaults below. Command-line flags override the file for
//! the values an operator typically changes between runs.
//!
//! ```yaml
//! start_url: https://www.hrw.org/news?page=2671
//! store_path: data/hrw_news.csv
//! html_dir: data/html_files
//! headless: true
//! timing:
//!   wait_timeout_ms: 45000
//! retry:
//!   max_attempts: 10
//!   delay_ms: 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::scrapers::hrw;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Origin used to resolve relative article links.
    pub base_url: String,
    /// First list page of the walk.
    pub start_url: String,
    /// Record store CSV file.
    pub store_path: PathBuf,
    /// Directory for archived raw pages.
    pub html_dir: PathBuf,
    /// WebDriver server address.
    pub webdriver_url: String,
    pub headless: bool,
    /// Browser window size as `width,height`.
    pub window_size: String,
    pub selectors: Selectors,
    pub timing: Timing,
    pub retry: RetrySettings,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.hrw.org".to_string(),
            start_url: "https://www.hrw.org/news".to_string(),
            store_path: PathBuf::from("hrw_news.csv"),
            html_dir: PathBuf::from("html_files"),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            window_size: "1920,1080".to_string(),
            selectors: Selectors::default(),
            timing: Timing::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// CSS selectors for readiness signals and pagination.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Selectors {
    /// Present and visible once a list page has rendered its cards.
    pub list_ready: String,
    /// Present and visible once a detail page has rendered its body.
    pub article_ready: String,
    /// The "next page" control; its absence ends the walk.
    pub next_page: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            list_ready: hrw::LIST_ITEM.to_string(),
            article_ready: "div[class*='article-body']".to_string(),
            next_page: "a[title*='next page'][rel='next']".to_string(),
        }
    }
}

/// Bounded waits and settle delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timing {
    /// Upper bound for every readiness wait.
    pub wait_timeout_ms: u64,
    /// Poll granularity while waiting inside an article batch.
    pub poll_interval_ms: u64,
    /// Poll granularity while waiting for a freshly loaded list page.
    pub page_poll_interval_ms: u64,
    /// Upper bound for locating an article link on the list page.
    pub link_timeout_ms: u64,
    /// Pause after each list/detail transition.
    pub settle_ms: u64,
    /// Pause after clicking the next-page control.
    pub page_turn_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 30_000,
            poll_interval_ms: 100,
            page_poll_interval_ms: 500,
            link_timeout_ms: 10_000,
            settle_ms: 500,
            page_turn_ms: 1_000,
        }
    }
}

impl Timing {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn page_poll_interval(&self) -> Duration {
        Duration::from_millis(self.page_poll_interval_ms)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn page_turn(&self) -> Duration {
        Duration::from_millis(self.page_turn_ms)
    }

    /// No pauses and near-instant waits, for tests against scripted drivers.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            wait_timeout_ms: 5,
            poll_interval_ms: 1,
            page_poll_interval_ms: 1,
            link_timeout_ms: 1,
            settle_ms: 0,
            page_turn_ms: 0,
        }
    }
}

/// Attempt ceiling and fixed delay shared by both retried stages.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl CrawlerConfig {
    /// Load from `path`, or return the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is not valid YAML
    /// for this schema.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(config_path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}
