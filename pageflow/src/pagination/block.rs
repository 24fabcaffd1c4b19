//! Windowed pagination where only one block of page numbers is visible.
//!
//! Reaching page 37 with a block size of 10 first needs the 31–40 window:
//! the strategy shifts the window with block-jump clicks (coarse phase),
//! then clicks the exact number and verifies the selection indicator (fine
//! phase).

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AdvanceOutcome, PageCursor, Paginator};
use crate::browser::{Control, TabHandle};
use crate::config::PaginationConfig;
use crate::errors::BrowserError;
use crate::utils::{poll_until, sleep_jittered, DelayRange, PollPolicy};

/// Block pagination with bounded verification and retry.
#[derive(Debug, Clone)]
pub struct BlockPagination {
    /// Zero-based index of the block believed to be visible. `None` means
    /// "derive it from the cursor".
    block_pointer: Option<u32>,
    settle: Duration,
    verify: PollPolicy,
    click_retries: usize,
    delay: DelayRange,
}

impl BlockPagination {
    /// Creates a strategy from pagination settings.
    #[must_use]
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            block_pointer: None,
            settle: config.block_settle(),
            verify: PollPolicy::attempts(config.verify_attempts, config.verify_interval()),
            click_retries: config.click_retries,
            delay: DelayRange::from_config(config),
        }
    }

    /// The block the strategy believes is visible, if it has moved one.
    #[must_use]
    pub fn block_pointer(&self) -> Option<u32> {
        self.block_pointer
    }

    async fn selection_matches(tab: &TabHandle, target: u32) -> bool {
        matches!(tab.read_selected_page().await, Ok(Some(page)) if page == target)
    }

    async fn verify_selection(&self, tab: &TabHandle, target: u32) -> bool {
        poll_until(self.verify, move |_| async move {
            Self::selection_matches(tab, target).await.then_some(())
        })
        .await
        .is_ok()
    }

    /// Shifts the visible window to `target_block`. Returns false if a
    /// block-jump control was unusable.
    async fn align_block(
        &mut self,
        tab: &TabHandle,
        from_block: u32,
        target_block: u32,
    ) -> Result<bool, BrowserError> {
        let (control, jumps) = if target_block >= from_block {
            (Control::BlockForward, target_block - from_block)
        } else {
            (Control::BlockBackward, from_block - target_block)
        };

        let mut pointer = from_block;
        for jump in 1..=jumps {
            if !tab.click(control).await? {
                warn!(tab_id = tab.id(), %control, jump, jumps, "Block jump control unavailable");
                self.block_pointer = None;
                return Ok(false);
            }
            tokio::time::sleep(self.settle).await;
            pointer = match control {
                Control::BlockBackward => pointer.saturating_sub(1),
                _ => pointer + 1,
            };
            self.block_pointer = Some(pointer);
            debug!(tab_id = tab.id(), block = pointer, "Block window shifted");
        }
        Ok(true)
    }
}

impl Default for BlockPagination {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

#[async_trait]
impl Paginator for BlockPagination {
    fn name(&self) -> &'static str {
        "block"
    }

    async fn has_next(&self, tab: &TabHandle, cursor: &PageCursor) -> Result<bool, BrowserError> {
        if tab.locate(Control::PageNumber(cursor.next_target())).await?.is_enabled() {
            return Ok(true);
        }
        Ok(tab.locate(Control::BlockForward).await?.is_enabled())
    }

    async fn advance(
        &mut self,
        tab: &TabHandle,
        cursor: &PageCursor,
        target: u32,
    ) -> Result<AdvanceOutcome, BrowserError> {
        let from_block = self
            .block_pointer
            .unwrap_or_else(|| cursor.block_of(cursor.current()));
        let target_block = cursor.block_of(target);

        if !self.align_block(tab, from_block, target_block).await? {
            return Ok(AdvanceOutcome::NoControl);
        }
        let jumped = from_block != target_block;

        // A jump may select the first page of the new window on its own.
        // Only trusted once the indicator agrees.
        if jumped && cursor.is_block_start(target) && Self::selection_matches(tab, target).await {
            debug!(tab_id = tab.id(), target, "Block jump selected the target page");
            sleep_jittered(self.delay).await;
            return Ok(AdvanceOutcome::Verified);
        }

        let mut clicked = false;
        for attempt in 0..=self.click_retries {
            if tab.click(Control::PageNumber(target)).await? {
                clicked = true;
                if self.verify_selection(tab, target).await {
                    debug!(tab_id = tab.id(), target, attempt, "Page selection verified");
                    self.block_pointer = Some(target_block);
                    sleep_jittered(self.delay).await;
                    return Ok(AdvanceOutcome::Verified);
                }
                debug!(tab_id = tab.id(), target, attempt, "Page selection not confirmed");
            } else {
                debug!(tab_id = tab.id(), target, attempt, "Page number not in visible window");
                tokio::time::sleep(self.verify.interval).await;
            }
        }

        self.block_pointer = None;
        if !clicked {
            return Ok(AdvanceOutcome::NoControl);
        }

        let observed = tab.read_selected_page().await.ok().flatten();
        warn!(tab_id = tab.id(), target, ?observed, "Page verification failed after retries");
        Ok(AdvanceOutcome::Mismatch { observed })
    }
}
