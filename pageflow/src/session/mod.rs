//! Sessions: one crawl run from invocation to persisted result.
//!
//! [`Crawler::start`] resolves the target, waits for arrival, hands the tab
//! to the extraction loop, and persists the deduplicated set beneath one
//! freshly generated session directory.

mod crawler;
mod request;

#[cfg(test)]
mod session_tests;

pub use crawler::Crawler;
pub use request::{ExclusionFlags, SessionRequest, SessionResult, SessionSpec, SortOrder};
