//! Error types for every stage of the crawl.
//!
//! Each stage owns a small error enum; [`CrawlError`] aggregates them for the
//! pagination walker and decides which failures the retry policy may re-attempt.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::Retryable;

/// Failures reported by the browser session.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The WebDriver session could not be created.
    #[error("failed to start browser session: {0}")]
    Session(String),

    /// A single WebDriver command failed.
    #[error("browser command `{command}` failed: {message}")]
    Command {
        /// Short name of the command that failed.
        command: &'static str,
        /// Error text reported by the driver.
        message: String,
    },
}

impl DriverError {
    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

/// A driver that refuses a session may still be starting up.
impl Retryable for DriverError {}

/// Failures while mapping a detail page into an article record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The URL carries no `/YYYY/MM/DD/` segment, so no publish date exists.
    #[error("no /YYYY/MM/DD/ date segment in {url}")]
    MissingDate { url: String },

    /// The URL carries a date segment that is not a calendar date.
    #[error("invalid date segment `{segment}` in {url}")]
    InvalidDate { url: String, segment: String },

    /// The title element is absent or empty; the page may not have rendered yet.
    #[error("no title found on {url}")]
    MissingTitle { url: String },
}

/// Failures of the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The existing store has a header row without the `URL` column.
    #[error("store {path} has no `URL` column in its header")]
    MissingUrlColumn { path: PathBuf },
}

/// Errors surfaced by the crawl loop.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A required element did not show up within the bounded wait.
    #[error("selector `{selector}` not ready after {waited:?}")]
    SelectorTimeout { selector: String, waited: Duration },

    /// The list page rendered without any article entries.
    #[error("no articles found on {url}")]
    EmptyListPage { url: String },

    #[error("invalid URL `{input}`: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// Writing the archived raw page failed.
    #[error("failed to archive raw page to {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Retryable for CrawlError {
    /// Filesystem failures need an operator; everything else may be a slow render.
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Archive { .. })
    }
}

/// Errors of the downstream partition and export steps.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("spreadsheet error on {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored row carries a `Date` that is not `MM/DD/YYYY`.
    #[error("row {url} has unparseable date `{date}`")]
    BadDate { url: String, date: String },
}

/// Errors while loading the YAML configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
