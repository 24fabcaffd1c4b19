//! Progress event type.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine status.
    #[default]
    Info,
    /// A milestone was reached.
    Success,
    /// Something was skipped or degraded.
    Warning,
    /// Something failed.
    Error,
}

impl Severity {
    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One line on the progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Human-readable message.
    pub message: String,
    /// Severity of the message.
    pub severity: Severity,
    /// When true the consumer overwrites the previously displayed line.
    #[serde(default)]
    pub replace_previous: bool,
}

impl ProgressEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            replace_previous: false,
        }
    }

    /// Creates an info event.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    /// Creates a success event.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    /// Creates a warning event.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    /// Marks the event as replacing the previous line.
    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.replace_previous = true;
        self
    }

    /// Creates the per-page progress event.
    #[must_use]
    pub fn page_done(page: u32, page_records: usize, total_records: usize) -> Self {
        Self::info(format!(
            "Page {page}: {page_records} records ({total_records} total)"
        ))
    }

    /// Creates the arrival countdown event.
    #[must_use]
    pub fn countdown(remaining_secs: u64) -> Self {
        Self::info(format!("Waiting for target page... ({remaining_secs}s left)")).replacing()
    }

    /// Converts the event to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("severity".to_string(), serde_json::json!(self.severity.as_str()));
        map.insert(
            "replacePrevious".to_string(),
            serde_json::json!(self.replace_previous),
        );
        map
    }
}
