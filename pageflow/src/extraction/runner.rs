//! The extraction loop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Extractor, PageContext};
use crate::browser::TabHandle;
use crate::cancellation::CancellationToken;
use crate::errors::CrawlError;
use crate::events::{ProgressEvent, ProgressSink};
use crate::observability::SpanTimer;
use crate::pagination::{AdvanceOutcome, PageCursor, Paginator};
use crate::records::CollectionMode;
use crate::storage::ChunkedSink;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    /// The fixed page budget was used up.
    BudgetReached,
    /// No further page was reachable.
    PaginationExhausted,
    /// A control was activated but a different page ended up selected.
    VerificationMismatch {
        /// Page that was requested.
        target: u32,
        /// Page the indicator reported.
        observed: Option<u32>,
    },
    /// Cancellation was requested between pages.
    Cancelled {
        /// The first cancellation reason.
        detail: String,
    },
}

impl StopReason {
    /// Returns the snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetReached => "budget_reached",
            Self::PaginationExhausted => "pagination_exhausted",
            Self::VerificationMismatch { .. } => "verification_mismatch",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// The taxonomy error behind this stop, if it was not a normal end.
    #[must_use]
    pub fn to_error(&self) -> Option<CrawlError> {
        match self {
            Self::VerificationMismatch { target, observed } => {
                Some(CrawlError::verification_mismatch(*target, *observed))
            }
            _ => None,
        }
    }
}

/// Result of one loop run. Hands the tab back to the caller.
#[derive(Debug)]
pub struct LoopOutcome {
    /// The tab, returned to its owner.
    pub tab: TabHandle,
    /// Why the loop stopped.
    pub stop: StopReason,
    /// Pages the extractor ran on.
    pub pages_visited: u32,
    /// Pages whose extraction failed and were skipped.
    pub pages_failed: u32,
    /// Last page the cursor reached.
    pub last_page: u32,
}

/// Alternates extractor calls and pagination over a page budget.
pub struct ExtractionLoop {
    extractor: Arc<dyn Extractor>,
    paginator: Box<dyn Paginator>,
    progress: Arc<dyn ProgressSink>,
    mode: CollectionMode,
    photo_dir: PathBuf,
}

impl std::fmt::Debug for ExtractionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionLoop")
            .field("paginator", &self.paginator.name())
            .field("mode", &self.mode)
            .field("photo_dir", &self.photo_dir)
            .finish_non_exhaustive()
    }
}

impl ExtractionLoop {
    /// Creates a loop.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn Extractor>,
        paginator: Box<dyn Paginator>,
        progress: Arc<dyn ProgressSink>,
        mode: CollectionMode,
    ) -> Self {
        Self {
            extractor,
            paginator,
            progress,
            mode,
            photo_dir: PathBuf::new(),
        }
    }

    /// Sets the directory exposed to the extractor for images.
    #[must_use]
    pub fn with_photo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.photo_dir = dir.into();
        self
    }

    /// Runs until the budget is used, pagination ends, or cancellation.
    ///
    /// Extraction failures skip the page. Chunk flush failures are reported
    /// and the loop continues; the sink keeps the records.
    pub async fn run(
        &mut self,
        tab: TabHandle,
        mut cursor: PageCursor,
        sink: &mut ChunkedSink,
        cancel: &CancellationToken,
    ) -> LoopOutcome {
        let mut pages_visited = 0u32;
        let mut pages_failed = 0u32;

        let stop = loop {
            if cancel.is_cancelled() {
                let detail = cancel.reason().unwrap_or_default();
                info!(page = cursor.current(), reason = %detail, "Extraction cancelled");
                self.progress
                    .emit(ProgressEvent::warning(format!("Cancelled before page {}", cursor.current())))
                    .await;
                break StopReason::Cancelled { detail };
            }

            let page = cursor.current();
            self.extract_page(&tab, page, sink, &mut pages_failed).await;
            pages_visited += 1;

            match sink.on_page_boundary() {
                Ok(Some(chunk)) => {
                    self.progress
                        .emit(ProgressEvent::success(format!(
                            "Saved chunk {} (pages {}-{})",
                            chunk.number, chunk.first_page, chunk.last_page
                        )))
                        .await;
                }
                Ok(None) => {}
                Err(err) => {
                    self.progress
                        .emit(ProgressEvent::warning(format!("Chunk save failed, will retry: {err}")))
                        .await;
                }
            }

            if cursor.budget_exhausted() {
                break StopReason::BudgetReached;
            }

            match self.paginator.has_next(&tab, &cursor).await {
                Ok(true) => {}
                Ok(false) => break StopReason::PaginationExhausted,
                Err(err) => {
                    warn!(page, error = %err, "Could not inspect pagination");
                    break StopReason::PaginationExhausted;
                }
            }

            let target = cursor.next_target();
            match self.paginator.advance(&tab, &cursor, target).await {
                Ok(AdvanceOutcome::Verified) => {}
                Ok(AdvanceOutcome::Activated(control)) => {
                    // Confirm once where the site renders an indicator.
                    if let Ok(Some(observed)) = tab.read_selected_page().await {
                        if observed != target {
                            warn!(target, observed, %control, "Landed on a different page");
                            break StopReason::VerificationMismatch {
                                target,
                                observed: Some(observed),
                            };
                        }
                    }
                }
                Ok(AdvanceOutcome::NoControl) => break StopReason::PaginationExhausted,
                Ok(AdvanceOutcome::Mismatch { observed }) => {
                    break StopReason::VerificationMismatch { target, observed };
                }
                Err(err) => {
                    warn!(target, error = %err, "Pagination failed");
                    break StopReason::PaginationExhausted;
                }
            }

            if !cursor.advance_to(target) {
                break StopReason::BudgetReached;
            }
            debug!(page = target, paginator = self.paginator.name(), "Advanced");
        };

        if let Some(err) = stop.to_error() {
            warn!(kind = err.kind(), error = %err, "Extraction stopped early");
            self.progress.emit(ProgressEvent::warning(err.to_string())).await;
        }

        info!(
            stop = stop.as_str(),
            pages_visited,
            pages_failed,
            records = sink.records().len(),
            "Extraction finished"
        );

        LoopOutcome {
            tab,
            stop,
            pages_visited,
            pages_failed,
            last_page: cursor.current(),
        }
    }

    async fn extract_page(&self, tab: &TabHandle, page: u32, sink: &mut ChunkedSink, pages_failed: &mut u32) {
        let context = PageContext {
            page,
            mode: self.mode,
            photo_dir: self.photo_dir.clone(),
        };

        let timer = SpanTimer::start("extract_page");
        match self.extractor.extract(tab, &context).await {
            Ok(records) => {
                let count = records.len();
                for record in records {
                    sink.append(record);
                }
                debug!(page, count, duration_ms = timer.finish(), "Page extracted");
                self.progress
                    .emit(ProgressEvent::page_done(page, count, sink.records().len()))
                    .await;
            }
            Err(err) => {
                *pages_failed += 1;
                warn!(page, error = %err, "Extraction failed, skipping page");
                self.progress
                    .emit(ProgressEvent::warning(format!("Page {page} skipped: {}", err.reason)))
                    .await;
            }
        }
    }
}
