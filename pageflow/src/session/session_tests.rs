//! End-to-end tests for sessions.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::events::{CollectingProgressSink, Severity};
    use crate::extraction::StopReason;
    use crate::pagination::PageBudget;
    use crate::records::CollectionMode;
    use crate::session::{Crawler, ExclusionFlags, SessionRequest, SortOrder};
    use crate::storage::DocumentStore;
    use crate::testing::{
        fast_config, sample_page, MemoryDocumentStore, MockBrowser, MockPagination, ScriptedExtractor,
        PRODUCT_URL,
    };
    use crate::config::CrawlConfig;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    const PRIMARY: CollectionMode = CollectionMode::PrimaryItemCollection;
    const THREADS: CollectionMode = CollectionMode::ThreadCollection;

    fn config_in(root: &Path) -> CrawlConfig {
        fast_config(root.to_str().unwrap())
    }

    fn files_with_extension(dir: &Path, ext: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(ext))
            .collect();
        names.sort();
        names
    }

    /// Ten records per page; pages 2 and 3 each repeat three records seen on
    /// the previous page.
    fn overlapping_extractor() -> ScriptedExtractor {
        let page1 = sample_page(PRIMARY, 1, 10);
        let mut page2 = sample_page(PRIMARY, 2, 7);
        page2.extend_from_slice(&page1[..3]);
        let mut page3 = sample_page(PRIMARY, 3, 7);
        page3.extend_from_slice(&page2[..3]);

        ScriptedExtractor::uniform(10)
            .with_page(1, page1)
            .with_page(2, page2)
            .with_page(3, page3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_pages_with_cross_page_duplicates() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 10 }));
        let crawler = Crawler::new(browser.clone(), Arc::new(overlapping_extractor()), config_in(root.path()));

        let request = SessionRequest::new(PRODUCT_URL, PRIMARY).with_page_budget(PageBudget::fixed(3));
        let result = crawler.start(request, &CancellationToken::new()).await;

        assert!(result.success);
        assert_eq!(result.record_count, 24);
        assert_eq!(result.report.duplicates_removed, 6);
        assert_eq!(result.pages_visited, 3);
        assert_eq!(result.stop_reason, Some(StopReason::BudgetReached));

        let dir = result.output_location.clone().unwrap();
        assert!(dir.starts_with(root.path().join("results")));
        assert!(dir.join("photos").is_dir());

        // One chunk covers the whole run; primary items get no consolidated CSV.
        assert_eq!(result.chunks.len(), 1);
        assert_eq!((result.chunks[0].first_page, result.chunks[0].last_page), (1, 3));
        assert_eq!(files_with_extension(&dir, ".csv"), vec!["reviews_chunk_1.csv".to_string()]);

        let json_files = files_with_extension(&dir, ".json");
        assert_eq!(json_files.len(), 1);
        let raw = std::fs::read_to_string(dir.join(&json_files[0])).unwrap();
        let stored: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 24);
        assert_eq!(stored[0].keys().next().unwrap(), "Page_Review");
        assert_eq!(stored[0]["Page_Review"], "1_1");
        assert_eq!(stored[23]["Page_Review"], "3_7");

        let tab = browser.tab(100).unwrap();
        assert_eq!(tab.selected_page(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_arrives_through_popup_tab() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(
            MockBrowser::new()
                .with_pagination(MockPagination::Block {
                    total: 12,
                    block_size: 10,
                })
                .with_popup(PRODUCT_URL, Duration::from_secs(2)),
        );
        let extractor = Arc::new(ScriptedExtractor::uniform(2));
        let store = Arc::new(MemoryDocumentStore::new());
        let mut config = config_in(root.path());
        config.storage = config.storage.with_remote("https://db.test");

        let crawler = Crawler::new(browser.clone(), extractor.clone(), config)
            .with_document_store(store.clone());
        let request = SessionRequest::new("wireless earbuds", THREADS)
            .with_sort_order(SortOrder::Recent)
            .with_exclusion(ExclusionFlags {
                exclude_secret_threads: true,
            });
        let result = crawler.start(request, &CancellationToken::new()).await;

        assert!(result.success);
        assert!(browser.opened_urls()[0].contains("query=wireless+earbuds"));

        // The popup (second tab) won and was driven to the end.
        let popup = browser.tab(101).unwrap();
        assert_eq!(popup.front_count(), 1);
        assert_eq!(popup.selected_page(), 12);
        assert_eq!(result.pages_visited, 12);
        assert_eq!(result.stop_reason, Some(StopReason::PaginationExhausted));
        assert_eq!(result.record_count, 24);

        let spec = extractor.prepared_with().unwrap();
        assert_eq!(spec.mode, THREADS);
        assert!(spec.exclusion.exclude_secret_threads);

        // Threads are not chunked; they get one consolidated CSV instead.
        assert!(result.chunks.is_empty());
        let sinks: Vec<_> = result.report.artifacts.iter().map(|a| a.sink.as_str()).collect();
        assert_eq!(sinks, vec!["json", "csv", "remote"]);
        assert_eq!(store.documents("reviews").len(), 24);
        assert_eq!(store.location(), "memory://documents");
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrival_timeout_fails_session() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new());
        let extractor = Arc::new(ScriptedExtractor::uniform(5));
        let progress = Arc::new(CollectingProgressSink::new());
        let crawler = Crawler::new(browser, extractor.clone(), config_in(root.path())).with_progress(progress.clone());

        let result = crawler
            .start(SessionRequest::new("earbuds", PRIMARY), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("NavigationTimeout"));
        assert_eq!(result.record_count, 0);
        assert!(result.output_location.as_ref().unwrap().is_dir());
        assert!(extractor.pages_seen().is_empty());
        assert_eq!(progress.of_severity(Severity::Error).len(), 1);
        assert_eq!(result.to_dict()["success"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_place_redirect_arrives_on_opened_tab() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(
            MockBrowser::new()
                .with_pagination(MockPagination::Linear { total: 2 })
                .with_redirect(PRODUCT_URL, Duration::from_secs(3)),
        );
        let crawler = Crawler::new(browser.clone(), Arc::new(ScriptedExtractor::uniform(1)), config_in(root.path()));

        let result = crawler
            .start(SessionRequest::new("earbuds", PRIMARY), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.pages_visited, 2);
        assert_eq!(browser.tab(100).unwrap().current_location(), PRODUCT_URL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_persists_partial_results() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 10 }));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let extractor = ScriptedExtractor::uniform(5).with_hook(move |page| {
            if page == 2 {
                trigger.cancel("stop requested");
            }
        });
        let crawler = Crawler::new(browser, Arc::new(extractor), config_in(root.path()));

        let result = crawler.start(SessionRequest::new(PRODUCT_URL, PRIMARY), &cancel).await;

        assert!(result.success);
        assert_eq!(result.pages_visited, 2);
        assert_eq!(result.record_count, 10);
        assert_eq!(
            result.stop_reason,
            Some(StopReason::Cancelled {
                detail: "stop requested".to_string()
            })
        );
        assert_eq!(result.chunks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_arrival_releases_the_wait() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new());
        let extractor = Arc::new(ScriptedExtractor::uniform(5));
        let progress = Arc::new(CollectingProgressSink::new());
        let crawler = Crawler::new(browser.clone(), extractor.clone(), config_in(root.path()))
            .with_progress(progress.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel("window closed");
        });

        let started = tokio::time::Instant::now();
        let result = crawler.start(SessionRequest::new("earbuds", PRIMARY), &cancel).await;

        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(result.success);
        assert_eq!(result.record_count, 0);
        assert_eq!(
            result.stop_reason,
            Some(StopReason::Cancelled {
                detail: "window closed".to_string()
            })
        );
        assert!(result.output_location.as_ref().unwrap().is_dir());
        assert!(extractor.pages_seen().is_empty());
        assert!(progress.of_severity(Severity::Error).is_empty());
        assert_eq!(browser.tab(100).unwrap().live_navigation_listeners(), 0);
        assert_eq!(browser.live_tab_listeners(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_isolated() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 3 }));
        let mut config = config_in(root.path());
        config.storage = config.storage.with_remote("https://db.test");
        let progress = Arc::new(CollectingProgressSink::new());

        let crawler = Crawler::new(browser, Arc::new(ScriptedExtractor::uniform(4)), config)
            .with_document_store(Arc::new(MemoryDocumentStore::new().failing()))
            .with_progress(progress.clone());
        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.record_count, 12);
        assert_eq!(result.report.failures.len(), 1);
        assert_eq!(result.report.failures[0].sink, "remote");
        assert_eq!(result.report.artifacts.len(), 1);
        assert!(result.report.artifacts[0].path().is_file());
        assert!(progress
            .of_severity(Severity::Warning)
            .iter()
            .any(|e| e.message.contains("remote")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extraction_failure_and_prepare_failure_do_not_abort() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 3 }));
        let extractor = ScriptedExtractor::uniform(3).failing_on(2).failing_prepare();
        let progress = Arc::new(CollectingProgressSink::new());
        let crawler =
            Crawler::new(browser, Arc::new(extractor), config_in(root.path())).with_progress(progress.clone());

        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.pages_visited, 3);
        assert_eq!(result.pages_failed, 1);
        assert_eq!(result.record_count, 6);
        assert_eq!(progress.of_severity(Severity::Warning).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_page_is_polled_until_ready() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 1 }));
        let extractor = Arc::new(ScriptedExtractor::uniform(1).ready_after(3));
        let crawler = Crawler::new(browser, extractor.clone(), config_in(root.path()));

        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(extractor.readiness_polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_location_overrides_configured_root() {
        let configured = tempfile::tempdir().unwrap();
        let chosen = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 1 }));
        let crawler = Crawler::new(browser, Arc::new(ScriptedExtractor::uniform(1)), config_in(configured.path()));

        let request = SessionRequest::new(PRODUCT_URL, PRIMARY).with_output_location(chosen.path());
        let result = crawler.start(request, &CancellationToken::new()).await;

        assert!(result.output_location.unwrap().starts_with(chosen.path()));
        assert!(!configured.path().join("results").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sessions_get_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().with_pagination(MockPagination::Linear { total: 1 }));
        let crawler = Crawler::new(browser, Arc::new(ScriptedExtractor::uniform(1)), config_in(root.path()));
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(
            crawler.start(SessionRequest::new(PRODUCT_URL, PRIMARY), &cancel),
            crawler.start(SessionRequest::new(PRODUCT_URL, PRIMARY), &cancel),
        );

        assert_ne!(a.output_location, b.output_location);
    }

    #[tokio::test]
    async fn test_refused_tab_fails_session() {
        let root = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::new().refusing_open());
        let crawler = Crawler::new(browser, Arc::new(ScriptedExtractor::uniform(1)), config_in(root.path()));

        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("BrowserFailure"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_output() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config_in(root.path());
        config.storage.chunk_page_threshold = 0;
        let crawler = Crawler::new(
            Arc::new(MockBrowser::new()),
            Arc::new(ScriptedExtractor::uniform(1)),
            config,
        );

        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("ConfigError"));
        assert!(result.output_location.is_none());
        assert!(!root.path().join("results").exists());
    }

    #[tokio::test]
    async fn test_unrepresentable_arrival_timeout_is_a_config_error() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config_in(root.path());
        config.navigation.arrival_timeout_secs = 1e20;
        let crawler = Crawler::new(
            Arc::new(MockBrowser::new()),
            Arc::new(ScriptedExtractor::uniform(1)),
            config,
        );

        let result = crawler
            .start(SessionRequest::new(PRODUCT_URL, PRIMARY), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("ConfigError"));
        assert!(result.error.as_deref().unwrap().contains("arrival_timeout_secs"));
        assert!(!root.path().join("results").exists());
    }
}
