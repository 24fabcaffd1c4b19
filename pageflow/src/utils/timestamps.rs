//! Timestamp helpers for artifact names and event payloads.

use chrono::{DateTime, NaiveDate, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an RFC 3339 string with microseconds.
///
/// # Examples
///
/// ```
/// use pageflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Formats a timestamp for use inside file and directory names.
///
/// Only digits and underscores, so it sorts lexically and is safe on every
/// filesystem.
#[must_use]
pub fn file_timestamp(at: &Timestamp) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Normalises a dotted or dashed date (`2025.10.30.`, `2025-10-30`) to
/// `YYYY-MM-DD`.
///
/// Returns the input unchanged when fewer than eight digits are present.
#[must_use]
pub fn normalize_date(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 {
        return raw.trim().to_string();
    }
    format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8])
}

/// Returns `YYYYMMDD` for a normalised date, or for today if absent.
#[must_use]
pub fn compact_date(normalized: Option<&str>) -> String {
    normalized
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
        .format("%Y%m%d")
        .to_string()
}
