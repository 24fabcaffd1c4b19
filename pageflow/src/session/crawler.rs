//! The `start` entry point.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use super::{SessionRequest, SessionResult};
use crate::browser::{BrowserContext, TabHandle};
use crate::cancellation::CancellationToken;
use crate::config::CrawlConfig;
use crate::errors::CrawlError;
use crate::events::{LoggingProgressSink, ProgressEvent, ProgressSink};
use crate::extraction::{ExtractionLoop, Extractor, StopReason};
use crate::navigation::{resolve_start_url, SessionNavigator, TargetMatcher};
use crate::observability::{session_span, SpanTimer};
use crate::pagination::{paginator_for, PageCursor};
use crate::storage::{ChunkedSink, CsvChunkWriter, DocumentStore, SessionOutput, StorageRouter};
use crate::utils::{poll_until, PollPolicy};

#[cfg(feature = "remote")]
use crate::storage::HttpDocumentStore;

/// Runs collection sessions against one browser context.
pub struct Crawler {
    browser: Arc<dyn BrowserContext>,
    extractor: Arc<dyn Extractor>,
    config: CrawlConfig,
    progress: Arc<dyn ProgressSink>,
    document_store: Option<Arc<dyn DocumentStore>>,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.config)
            .field("document_store", &self.document_store.as_ref().map(|s| s.location()))
            .finish_non_exhaustive()
    }
}

impl Crawler {
    /// Creates a crawler reporting progress to the log.
    #[must_use]
    pub fn new(browser: Arc<dyn BrowserContext>, extractor: Arc<dyn Extractor>, config: CrawlConfig) -> Self {
        Self {
            browser,
            extractor,
            config,
            progress: Arc::new(LoggingProgressSink),
            document_store: None,
        }
    }

    /// Sets the progress channel.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the remote document store.
    #[must_use]
    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs one session to completion.
    ///
    /// Only a session that cannot start or never reaches its target page
    /// reports `success: false`. Cancellation is honoured while waiting for
    /// arrival and between pages, and still persists what was collected.
    pub async fn start(&self, request: SessionRequest, cancel: &CancellationToken) -> SessionResult {
        if let Err(err) = self.config.validate() {
            let err = CrawlError::from(err);
            error!(error = %err, "Invalid configuration");
            return SessionResult::failed(&err, None);
        }

        let root = self.output_root(&request);
        let output = match SessionOutput::create(&root, &self.config.storage.base_name) {
            Ok(output) => output,
            Err(err) => {
                let err = CrawlError::from(err);
                error!(root = %root.display(), error = %err, "Could not create session directory");
                self.progress.emit(ProgressEvent::error(err.to_string())).await;
                return SessionResult::failed(&err, None);
            }
        };

        let span = session_span(output.session_id(), request.mode.as_str());
        self.run_session(request, output, cancel).instrument(span).await
    }

    fn output_root(&self, request: &SessionRequest) -> PathBuf {
        let root = request
            .output_location
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.storage.root_dir));
        if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        }
    }

    async fn run_session(
        &self,
        request: SessionRequest,
        output: SessionOutput,
        cancel: &CancellationToken,
    ) -> SessionResult {
        let timer = SpanTimer::start("session");
        let output_dir = output.dir().to_path_buf();
        info!(
            session_target = request.target.as_str(),
            mode = request.mode.as_str(),
            budget = %request.page_budget,
            dir = %output_dir.display(),
            "Session started"
        );

        let tab = match self.arrive(&request, cancel).await {
            Ok(Some(tab)) => tab,
            Ok(None) => {
                let detail = cancel.reason().unwrap_or_default();
                info!(reason = %detail, duration_ms = timer.finish(), "Session cancelled before arrival");
                self.progress
                    .emit(ProgressEvent::warning("Cancelled before the target page was reached"))
                    .await;
                return SessionResult {
                    success: true,
                    output_location: Some(output_dir),
                    stop_reason: Some(StopReason::Cancelled { detail }),
                    ..SessionResult::default()
                };
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), "Session aborted before extraction");
                return SessionResult::failed(&err, Some(output_dir));
            }
        };

        self.await_page_ready(&tab).await;

        if let Err(err) = self.extractor.prepare(&tab, &request.spec()).await {
            warn!(error = %err, "Session options not applied");
            self.progress
                .emit(ProgressEvent::warning(format!("Could not apply session options: {}", err.reason)))
                .await;
        }

        let mode = request.mode;
        let storage = &self.config.storage;
        let mut sink = if storage.tabular.enabled && mode.is_chunk_covered() {
            let writer = CsvChunkWriter::new(output.dir(), storage.base_name.clone(), mode.identity_schema());
            ChunkedSink::new(storage.chunk_page_threshold, Box::new(writer))
        } else {
            ChunkedSink::accumulate_only()
        };

        let cursor = PageCursor::new(request.page_budget, self.config.pagination.block_size);
        let mut extraction = ExtractionLoop::new(
            self.extractor.clone(),
            paginator_for(mode, &self.config.pagination),
            self.progress.clone(),
            mode,
        )
        .with_photo_dir(output.photos_dir());
        let outcome = extraction.run(tab, cursor, &mut sink, cancel).await;

        if let Err(err) = sink.finalize() {
            self.progress
                .emit(ProgressEvent::warning(format!("Last chunk not saved: {err}")))
                .await;
        }

        let router = StorageRouter::for_session(storage, mode, &output, self.remote_store());
        let report = router.persist(sink.records()).await;
        for failure in &report.failures {
            self.progress
                .emit(ProgressEvent::warning(format!("Sink {} failed: {}", failure.sink, failure.reason)))
                .await;
        }

        self.progress
            .emit(ProgressEvent::success(format!(
                "Collected {} records into {}",
                report.unique_count,
                output_dir.display()
            )))
            .await;
        info!(
            records = report.unique_count,
            duplicates = report.duplicates_removed,
            pages = outcome.pages_visited,
            stop = outcome.stop.as_str(),
            duration_ms = timer.finish(),
            "Session finished"
        );

        SessionResult {
            success: true,
            record_count: report.unique_count,
            output_location: Some(output_dir),
            error: None,
            error_kind: None,
            stop_reason: Some(outcome.stop),
            pages_visited: outcome.pages_visited,
            pages_failed: outcome.pages_failed,
            chunks: sink.chunks().to_vec(),
            report,
        }
    }

    fn remote_store(&self) -> Option<Arc<dyn DocumentStore>> {
        if self.document_store.is_some() || !self.config.storage.remote.enabled {
            return self.document_store.clone();
        }
        #[cfg(feature = "remote")]
        match HttpDocumentStore::from_config(&self.config.storage.remote) {
            Ok(store) => return Some(Arc::new(store)),
            Err(err) => warn!(error = %err, "Remote store unavailable"),
        }
        None
    }

    /// Opens the start page and waits until some tab is on a target page.
    ///
    /// Returns `None` when cancelled first; the wait and its subscriptions
    /// are dropped.
    async fn arrive(
        &self,
        request: &SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<TabHandle>, CrawlError> {
        let start_url = resolve_start_url(&request.target, &self.config.site)?;
        self.progress
            .emit(ProgressEvent::info(format!("Opening {start_url}")))
            .await;
        let tab = self.browser.open_tab(&start_url).await?;

        let matcher = TargetMatcher::from_profile(&self.config.site);
        let navigator = SessionNavigator::from_config(&self.config.navigation, self.progress.clone());
        let waiting = navigator.wait_for_arrival(
            self.browser.as_ref(),
            TabHandle::new(tab),
            |url| matcher.matches(url),
            self.config.navigation.arrival_timeout(),
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(None),
            arrival = waiting => Ok(Some(arrival?.tab)),
        }
    }

    async fn await_page_ready(&self, tab: &TabHandle) {
        let navigation = &self.config.navigation;
        let policy = PollPolicy::deadline(navigation.page_ready_timeout(), navigation.page_ready_interval());
        let extractor = self.extractor.as_ref();

        let ready = poll_until(policy, |_| async move { extractor.page_ready(tab).await.then_some(()) }).await;
        if let Err(exhausted) = ready {
            warn!(attempts = exhausted.attempts, "Page not confirmed ready, extracting anyway");
            self.progress
                .emit(ProgressEvent::warning("Page did not finish loading; continuing"))
                .await;
        }
    }
}
