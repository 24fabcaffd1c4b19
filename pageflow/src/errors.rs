//! Error types for pageflow sessions.
//!
//! The taxonomy separates the one session-fatal condition (the target page
//! was never reached) from failures that are recovered locally: a page whose
//! extraction failed is skipped, a sink that failed is reported while the
//! other sinks still receive their records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for pageflow operations.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Arrival at the target page was not detected within the bound.
    #[error("Navigation timeout: target page not reached within {timeout_secs}s")]
    NavigationTimeout {
        /// The configured bound in seconds.
        timeout_secs: f64,
    },

    /// A pagination control was activated but the selected page never
    /// matched the requested one.
    #[error("Page verification mismatch: wanted page {target}, observed {}", fmt_observed(.observed))]
    PageVerificationMismatch {
        /// The page that was requested.
        target: u32,
        /// The last page the indicator reported, if any.
        observed: Option<u32>,
    },

    /// A storage sink failed.
    #[error("{0}")]
    SinkWrite(#[from] SinkWriteError),

    /// The external extractor failed on a page.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// The browser collaborator failed.
    #[error("{0}")]
    Browser(#[from] BrowserError),

    /// Configuration was invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_observed(observed: &Option<u32>) -> String {
    observed.map_or_else(|| "nothing".to_string(), |p| p.to_string())
}

impl CrawlError {
    /// Creates a navigation timeout error.
    #[must_use]
    pub fn navigation_timeout(timeout_secs: f64) -> Self {
        Self::NavigationTimeout { timeout_secs }
    }

    /// Creates a page verification mismatch error.
    #[must_use]
    pub fn verification_mismatch(target: u32, observed: Option<u32>) -> Self {
        Self::PageVerificationMismatch { target, observed }
    }

    /// Returns the stable taxonomy name of this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NavigationTimeout { .. } => "NavigationTimeout",
            Self::PageVerificationMismatch { .. } => "PageVerificationMismatch",
            Self::SinkWrite(_) => "SinkWriteFailure",
            Self::Extraction(_) => "ExternalExtractionFailure",
            Self::Browser(_) => "BrowserFailure",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }

    /// Returns true if this error must abort the whole session.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. } | Self::Browser(_) | Self::Config(_))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::NavigationTimeout { timeout_secs } => {
                map.insert("timeout_secs".to_string(), serde_json::json!(timeout_secs));
            }
            Self::PageVerificationMismatch { target, observed } => {
                map.insert("target".to_string(), serde_json::json!(target));
                map.insert("observed".to_string(), serde_json::json!(observed));
            }
            Self::SinkWrite(err) => {
                map.insert("sink".to_string(), serde_json::json!(err.sink));
            }
            Self::Extraction(err) => {
                map.insert("page".to_string(), serde_json::json!(err.page));
            }
            _ => {}
        }

        map
    }
}

/// Error raised when one storage sink fails to write.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Sink '{sink}' write failed: {reason}")]
pub struct SinkWriteError {
    /// The sink name.
    pub sink: String,
    /// Why the write failed.
    pub reason: String,
}

impl SinkWriteError {
    /// Creates a new sink write error.
    #[must_use]
    pub fn new(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an IO error raised by a sink.
    #[must_use]
    pub fn io(sink: impl Into<String>, err: &std::io::Error) -> Self {
        Self::new(sink, err.to_string())
    }
}

/// Error raised by the external extractor for a single page.
#[derive(Debug, Clone, Error)]
#[error("Extraction failed on page {page}: {reason}")]
pub struct ExtractionError {
    /// The page being extracted.
    pub page: u32,
    /// Why the extraction failed.
    pub reason: String,
}

impl ExtractionError {
    /// Creates a new extraction error.
    #[must_use]
    pub fn new(page: u32, reason: impl Into<String>) -> Self {
        Self {
            page,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the browser collaborator.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// A tab could not be opened.
    #[error("Failed to open tab for {url}: {reason}")]
    OpenTab {
        /// The URL that was requested.
        url: String,
        /// The reason for failure.
        reason: String,
    },

    /// The tab is gone (closed or crashed).
    #[error("Tab {tab_id} is no longer available")]
    TabClosed {
        /// The tab identifier.
        tab_id: u64,
    },

    /// Any other protocol-level failure.
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl BrowserError {
    /// Creates an open-tab error.
    #[must_use]
    pub fn open_tab(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OpenTab {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("Invalid config field '{field}': {reason}")]
    InvalidField {
        /// The offending field path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying reason.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_timeout_is_fatal() {
        let err = CrawlError::navigation_timeout(120.0);
        assert!(err.is_session_fatal());
        assert_eq!(err.kind(), "NavigationTimeout");
        assert!(err.to_string().contains("120"));
    }

    #[test]
    fn test_recoverable_errors_are_not_fatal() {
        let sink: CrawlError = SinkWriteError::new("remote", "connection refused").into();
        let extraction: CrawlError = ExtractionError::new(4, "selector missing").into();
        let mismatch = CrawlError::verification_mismatch(11, Some(10));

        assert!(!sink.is_session_fatal());
        assert!(!extraction.is_session_fatal());
        assert!(!mismatch.is_session_fatal());
    }

    #[test]
    fn test_mismatch_message_without_observation() {
        let err = CrawlError::verification_mismatch(21, None);
        assert!(err.to_string().contains("observed nothing"));
    }

    #[test]
    fn test_to_dict_carries_fields() {
        let dict = CrawlError::verification_mismatch(24, Some(21)).to_dict();
        assert_eq!(dict.get("type").unwrap(), "PageVerificationMismatch");
        assert_eq!(dict.get("target").unwrap(), 24);
        assert_eq!(dict.get("observed").unwrap(), 21);

        let dict = CrawlError::from(SinkWriteError::new("json", "disk full")).to_dict();
        assert_eq!(dict.get("type").unwrap(), "SinkWriteFailure");
        assert_eq!(dict.get("sink").unwrap(), "json");
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::invalid("pagination.block_size", "must be at least 1");
        assert!(err.to_string().contains("pagination.block_size"));
    }
}
