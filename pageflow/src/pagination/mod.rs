//! Pagination engine.
//!
//! Two topologies share one [`Paginator`] interface:
//!
//! - [`LinearPagination`]: numbered buttons with a generic "next" fallback.
//! - [`BlockPagination`]: only one block of page numbers is visible; the
//!   window has to be shifted with block-jump controls before the exact
//!   page can be clicked, and the selection is verified afterwards.
//!
//! `advance` never raises for "could not get there": it reports an
//! [`AdvanceOutcome`] and the caller ends extraction gracefully.

mod block;
mod cursor;
mod linear;

pub use block::BlockPagination;
pub use cursor::{PageBudget, PageCursor};
pub use linear::LinearPagination;

use async_trait::async_trait;

use crate::browser::{Control, TabHandle};
use crate::config::PaginationConfig;
use crate::errors::BrowserError;
use crate::records::CollectionMode;

/// What an advance attempt achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A control was clicked; the resulting page is not confirmed.
    Activated(Control),
    /// The selected-page indicator confirmed the target.
    Verified,
    /// No usable control was found.
    NoControl,
    /// Controls were clicked but the selection never matched the target.
    Mismatch {
        /// Last page the indicator reported.
        observed: Option<u32>,
    },
}

impl AdvanceOutcome {
    /// Returns true if the caller may treat the page as reached.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Activated(_) | Self::Verified)
    }
}

/// A pagination strategy over one tab.
#[async_trait]
pub trait Paginator: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Returns true if a control leading past the current page is usable.
    async fn has_next(&self, tab: &TabHandle, cursor: &PageCursor) -> Result<bool, BrowserError>;

    /// Tries to move the tab to `target`.
    async fn advance(
        &mut self,
        tab: &TabHandle,
        cursor: &PageCursor,
        target: u32,
    ) -> Result<AdvanceOutcome, BrowserError>;
}

/// Builds the strategy used by a collection mode.
#[must_use]
pub fn paginator_for(mode: CollectionMode, config: &PaginationConfig) -> Box<dyn Paginator> {
    match mode {
        CollectionMode::PrimaryItemCollection => Box::new(LinearPagination::from_config(config)),
        CollectionMode::ThreadCollection => Box::new(BlockPagination::from_config(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        assert!(AdvanceOutcome::Activated(Control::Next).is_success());
        assert!(AdvanceOutcome::Verified.is_success());
        assert!(!AdvanceOutcome::NoControl.is_success());
        assert!(!AdvanceOutcome::Mismatch { observed: Some(3) }.is_success());
    }

    #[test]
    fn test_paginator_for_mode() {
        let config = PaginationConfig::default();
        assert_eq!(paginator_for(CollectionMode::PrimaryItemCollection, &config).name(), "linear");
        assert_eq!(paginator_for(CollectionMode::ThreadCollection, &config).name(), "block");
    }
}
