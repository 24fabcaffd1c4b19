//! Extracted records and their identity.
//!
//! A [`Record`] is an ordered field map produced by the extractor. Its
//! identity is defined by an [`IdentitySchema`]: the ordered list of stable
//! fields joined into a [`DedupKey`]. Payload fields never take part in
//! identity.

mod identity;
mod primary;
mod threads;

pub use identity::{dedup, DedupKey, DedupOutcome, IdentitySchema, KEY_SEPARATOR};
pub use primary::{annotate_page_review, page_review_tag, PAGE_REVIEW_FIELD};
pub use threads::{format_threads, ThreadDocument, ThreadMessage, ThreadStatus};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// What kind of items a session collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionMode {
    /// Flat item listings (reviews) with linear pagination.
    #[default]
    PrimaryItemCollection,
    /// Question/answer threads with block pagination.
    ThreadCollection,
}

impl CollectionMode {
    /// Returns the kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryItemCollection => "primary-item-collection",
            Self::ThreadCollection => "thread-collection",
        }
    }

    /// The identity schema for records of this mode.
    #[must_use]
    pub fn identity_schema(&self) -> IdentitySchema {
        match self {
            Self::PrimaryItemCollection => IdentitySchema::primary_items(),
            Self::ThreadCollection => IdentitySchema::threads(),
        }
    }

    /// Whether chunk artifacts already cover this mode's tabular output.
    #[must_use]
    pub fn is_chunk_covered(&self) -> bool {
        matches!(self, Self::PrimaryItemCollection)
    }
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted logical item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing field map.
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Adds a field, keeping insertion order.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a field in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a field rendered as text; missing fields are empty.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).map(value_text).unwrap_or_default()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Borrows the field map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the record into its field map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

/// Renders a JSON value as a flat text cell.
///
/// Strings are taken verbatim, null is empty, and arrays are joined with
/// `", "`.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
