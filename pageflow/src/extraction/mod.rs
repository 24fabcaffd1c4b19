//! The extractor capability and the loop that drives it.
//!
//! Site-specific field extraction stays behind [`Extractor`]; the crate only
//! sequences extractor calls with pagination.

mod runner;

pub use runner::{ExtractionLoop, LoopOutcome, StopReason};

use async_trait::async_trait;
use std::path::PathBuf;

use crate::browser::TabHandle;
use crate::errors::ExtractionError;
use crate::records::{CollectionMode, Record};
use crate::session::SessionSpec;

/// What the extractor is told about the page it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// One-based page index.
    pub page: u32,
    /// What the session collects.
    pub mode: CollectionMode,
    /// Where the extractor may store downloaded images.
    pub photo_dir: PathBuf,
}

/// Site-specific extraction over one rendered page.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Applies session options (tab selection, sort order, exclusions)
    /// once after arrival.
    async fn prepare(&self, _tab: &TabHandle, _spec: &SessionSpec) -> Result<(), ExtractionError> {
        Ok(())
    }

    /// Returns true once the page has rendered enough to extract from.
    async fn page_ready(&self, _tab: &TabHandle) -> bool {
        true
    }

    /// Extracts the records on the current page.
    async fn extract(&self, tab: &TabHandle, context: &PageContext) -> Result<Vec<Record>, ExtractionError>;
}
