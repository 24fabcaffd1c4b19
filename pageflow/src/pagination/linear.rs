//! Flat numbered pagination with a generic "next" fallback.

use async_trait::async_trait;
use tracing::debug;

use super::{AdvanceOutcome, PageCursor, Paginator};
use crate::browser::{Control, TabHandle};
use crate::config::PaginationConfig;
use crate::errors::BrowserError;
use crate::utils::{sleep_jittered, DelayRange};

/// Linear pagination: click the exact number, else "next".
#[derive(Debug, Clone)]
pub struct LinearPagination {
    delay: DelayRange,
}

impl LinearPagination {
    /// Creates a strategy that waits within `delay` after each click.
    #[must_use]
    pub fn new(delay: DelayRange) -> Self {
        Self { delay }
    }

    /// Creates a strategy from pagination settings.
    #[must_use]
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(DelayRange::from_config(config))
    }
}

impl Default for LinearPagination {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

#[async_trait]
impl Paginator for LinearPagination {
    fn name(&self) -> &'static str {
        "linear"
    }

    async fn has_next(&self, tab: &TabHandle, cursor: &PageCursor) -> Result<bool, BrowserError> {
        if tab.locate(Control::PageNumber(cursor.next_target())).await?.is_enabled() {
            return Ok(true);
        }
        Ok(tab.locate(Control::Next).await?.is_enabled())
    }

    async fn advance(
        &mut self,
        tab: &TabHandle,
        _cursor: &PageCursor,
        target: u32,
    ) -> Result<AdvanceOutcome, BrowserError> {
        for control in [Control::PageNumber(target), Control::Next] {
            if !tab.locate(control).await?.is_enabled() {
                continue;
            }
            if tab.click(control).await? {
                debug!(tab_id = tab.id(), target, %control, "Pagination control activated");
                sleep_jittered(self.delay).await;
                return Ok(AdvanceOutcome::Activated(control));
            }
        }

        debug!(tab_id = tab.id(), target, "No usable pagination control");
        Ok(AdvanceOutcome::NoControl)
    }
}
