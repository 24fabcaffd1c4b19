//! Dedup key derivation and full-set deduplication.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

use super::Record;

/// Separator between identity fields in a [`DedupKey`].
pub const KEY_SEPARATOR: &str = "|";

/// The ordered stable fields that identify a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySchema {
    fields: Vec<String>,
}

impl IdentitySchema {
    /// Creates a schema from an ordered field list.
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Identity of primary items (reviews).
    #[must_use]
    pub fn primary_items() -> Self {
        Self::new(["Reviewer Name", "Review Date", "Review Score", "Content"])
    }

    /// Identity of question/answer threads.
    #[must_use]
    pub fn threads() -> Self {
        Self::new(["author", "date", "title", "question"])
    }

    /// The identity fields in key order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Derives the key for a record. Missing fields contribute empty strings.
    #[must_use]
    pub fn key(&self, record: &Record) -> DedupKey {
        let parts: Vec<String> = self.fields.iter().map(|f| record.text(f)).collect();
        DedupKey(parts.join(KEY_SEPARATOR))
    }
}

/// A deterministic identity string for a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the key, used as a stable document id.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of deduplicating a record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Surviving records in input order.
    pub records: Vec<Record>,
    /// Number of records dropped as duplicates.
    pub duplicates_removed: usize,
}

/// Removes records whose key was already seen; the first occurrence wins.
#[must_use]
pub fn dedup(records: &[Record], schema: &IdentitySchema) -> DedupOutcome {
    let mut seen = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(schema.key(record)) {
            unique.push(record.clone());
        }
    }

    let duplicates_removed = records.len() - unique.len();
    if duplicates_removed > 0 {
        tracing::debug!(
            total = records.len(),
            unique = unique.len(),
            duplicates_removed,
            "Deduplicated record set"
        );
    }

    DedupOutcome {
        records: unique,
        duplicates_removed,
    }
}
