// src/error.rs

//! Unified error handling for the watcher.
//!
//! `AppError` covers startup, configuration and transport failures. The
//! detection cycle has its own narrower taxonomy (`FetchError`, `StoreError`,
//! `DetectError`) so callers can tell failure classes apart.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Item;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Notifier transport rejected a call
    #[error("Notifier error: {0}")]
    Notify(String),

    /// Snapshot store failed outside a detection cycle
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A detection cycle failed
    #[error(transparent)]
    Detect(#[from] DetectError),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a notifier error.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify(message.into())
    }
}

/// Content source failure.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network failure, timeout, or unreadable body
    #[error("{url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Page loaded but the expected item markers were missing
    #[error("no items matching '{selector}' at {url}")]
    MarkersAbsent { url: String, selector: String },
}

/// Item store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file operation failed
    #[error("store I/O on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing state could not be parsed
    #[error("store {path:?} is corrupt at record {record}: {message}")]
    Corrupt {
        path: PathBuf,
        record: usize,
        message: String,
    },

    /// An item cannot be represented in the record format
    #[error("cannot encode item '{title}': {message}")]
    Unencodable { title: String, message: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(
        path: impl Into<PathBuf>,
        record: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Corrupt {
            path: path.into(),
            record,
            message: message.into(),
        }
    }
}

/// Failure of one detection cycle.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Source unreachable or unparseable; the store was not touched
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// Persisted state unreadable; the cycle was aborted
    #[error("store corrupt: {0}")]
    StoreCorrupt(#[source] StoreError),

    /// New items were found but persisting the snapshot failed.
    ///
    /// The next cycle recomputes from the stale state and will report
    /// `new_items` again.
    #[error("store write failed after finding {} new item(s): {source}", .new_items.len())]
    StoreWriteFailed {
        new_items: Vec<Item>,
        #[source]
        source: StoreError,
    },
}
