//! In-memory browser, extractor and store doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::fixtures::sample_page;
use crate::browser::{BrowserContext, BrowserTab, Control, ControlState, TabHandle};
use crate::errors::{BrowserError, ExtractionError, SinkWriteError};
use crate::extraction::{Extractor, PageContext};
use crate::records::Record;
use crate::session::SessionSpec;
use crate::storage::{Artifact, ChunkWriter, DocumentStore, DOCUMENT_ID_FIELD};

const LINEAR_WINDOW: u32 = 10;
const FIRST_BROWSER_TAB_ID: u64 = 100;

/// Which pagination control a [`MockTab`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockPagination {
    /// No pagination at all.
    #[default]
    None,
    /// Numbers within a ten-page window that follows the selection, plus a
    /// "next" button.
    Linear {
        /// Last page.
        total: u32,
    },
    /// One block of numbers at a time, shifted by block-jump buttons.
    Block {
        /// Last page.
        total: u32,
        /// Pages per block.
        block_size: u32,
    },
}

#[derive(Debug)]
struct TabState {
    url: String,
    selected: u32,
    window: u32,
    clicks: Vec<Control>,
    fronts: usize,
    delivered: usize,
    listeners: Vec<mpsc::UnboundedSender<String>>,
}

/// A scriptable tab.
///
/// Builder methods configure it before it is shared; once wrapped in an
/// `Arc` it is driven through the [`BrowserTab`] trait and inspected with
/// the accessors below.
#[derive(Debug)]
pub struct MockTab {
    id: u64,
    pagination: MockPagination,
    auto_select_block_start: bool,
    unresponsive: HashSet<u32>,
    state: Mutex<TabState>,
}

impl MockTab {
    /// A tab without pagination.
    #[must_use]
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self::with_pagination(id, url, MockPagination::None)
    }

    /// A tab with linear pagination over `total` pages.
    #[must_use]
    pub fn linear(id: u64, url: impl Into<String>, total: u32) -> Self {
        Self::with_pagination(id, url, MockPagination::Linear { total })
    }

    /// A tab with block pagination over `total` pages.
    #[must_use]
    pub fn block(id: u64, url: impl Into<String>, total: u32, block_size: u32) -> Self {
        Self::with_pagination(
            id,
            url,
            MockPagination::Block {
                total,
                block_size: block_size.max(1),
            },
        )
    }

    /// A tab with the given pagination, page 1 selected.
    #[must_use]
    pub fn with_pagination(id: u64, url: impl Into<String>, pagination: MockPagination) -> Self {
        Self {
            id,
            pagination,
            auto_select_block_start: false,
            unresponsive: HashSet::new(),
            state: Mutex::new(TabState {
                url: url.into(),
                selected: 1,
                window: 0,
                clicks: Vec::new(),
                fronts: 0,
                delivered: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Selects `page` and shows its window.
    #[must_use]
    pub fn with_selection(mut self, page: u32) -> Self {
        let window = self.window_of(page);
        let state = self.state.get_mut();
        state.selected = page.max(1);
        state.window = window;
        self
    }

    /// Makes block jumps select the first page of the new window.
    #[must_use]
    pub fn with_auto_select_block_start(mut self, enabled: bool) -> Self {
        self.auto_select_block_start = enabled;
        self
    }

    /// Clicks on `page` are accepted but never change the selection.
    #[must_use]
    pub fn with_unresponsive_page(mut self, page: u32) -> Self {
        self.unresponsive.insert(page);
        self
    }

    /// Wraps the tab for sharing.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Simulates a main-frame navigation, notifying live listeners.
    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        let mut state = self.state.lock();
        state.url.clone_from(&url);
        let mut delivered = 0;
        state.listeners.retain(|tx| {
            let sent = tx.send(url.clone()).is_ok();
            if sent {
                delivered += 1;
            }
            sent
        });
        state.delivered += delivered;
    }

    /// Changes the location without any navigation event.
    pub fn set_location_silently(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    /// The current location.
    #[must_use]
    pub fn current_location(&self) -> String {
        self.state.lock().url.clone()
    }

    /// Controls that were clicked while enabled, in order.
    #[must_use]
    pub fn clicks(&self) -> Vec<Control> {
        self.state.lock().clicks.clone()
    }

    /// How often `control` was clicked.
    #[must_use]
    pub fn count_clicks(&self, control: Control) -> usize {
        self.state.lock().clicks.iter().filter(|c| **c == control).count()
    }

    /// The selected page.
    #[must_use]
    pub fn selected_page(&self) -> u32 {
        self.state.lock().selected
    }

    /// Navigation subscriptions whose receiver is still alive.
    #[must_use]
    pub fn live_navigation_listeners(&self) -> usize {
        self.state.lock().listeners.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Navigation events that reached a listener.
    #[must_use]
    pub fn delivered_navigations(&self) -> usize {
        self.state.lock().delivered
    }

    /// How often the tab was brought to the front.
    #[must_use]
    pub fn front_count(&self) -> usize {
        self.state.lock().fronts
    }

    /// A session handle over this tab.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> TabHandle {
        TabHandle::new(self.clone())
    }

    fn window_size(&self) -> u32 {
        match self.pagination {
            MockPagination::Block { block_size, .. } => block_size,
            _ => LINEAR_WINDOW,
        }
    }

    fn window_of(&self, page: u32) -> u32 {
        (page.max(1) - 1) / self.window_size()
    }

    fn control_state(&self, state: &TabState, control: Control) -> ControlState {
        let size = self.window_size();
        match (self.pagination, control) {
            (MockPagination::None, _) => ControlState::Absent,
            (MockPagination::Linear { total }, Control::PageNumber(page)) => {
                if page == 0 || page > total || self.window_of(page) != self.window_of(state.selected) {
                    ControlState::Absent
                } else if page == state.selected {
                    ControlState::Disabled
                } else {
                    ControlState::Enabled
                }
            }
            (MockPagination::Linear { total }, Control::Next) => {
                if state.selected < total {
                    ControlState::Enabled
                } else {
                    ControlState::Disabled
                }
            }
            (MockPagination::Linear { .. }, _) => ControlState::Absent,
            (MockPagination::Block { total, .. }, Control::PageNumber(page)) => {
                if page == 0 || page > total || self.window_of(page) != state.window {
                    ControlState::Absent
                } else if page == state.selected {
                    ControlState::Disabled
                } else {
                    ControlState::Enabled
                }
            }
            (MockPagination::Block { total, .. }, Control::BlockForward) => {
                if (state.window + 1) * size < total {
                    ControlState::Enabled
                } else {
                    ControlState::Disabled
                }
            }
            (MockPagination::Block { .. }, Control::BlockBackward) => {
                if state.window > 0 {
                    ControlState::Enabled
                } else {
                    ControlState::Disabled
                }
            }
            (MockPagination::Block { .. }, Control::Next) => ControlState::Absent,
        }
    }
}

#[async_trait]
impl BrowserTab for MockTab {
    fn id(&self) -> u64 {
        self.id
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.current_location())
    }

    fn navigation_events(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().listeners.push(tx);
        rx
    }

    async fn bring_to_front(&self) -> Result<(), BrowserError> {
        self.state.lock().fronts += 1;
        Ok(())
    }

    async fn locate(&self, control: Control) -> Result<ControlState, BrowserError> {
        let state = self.state.lock();
        Ok(self.control_state(&state, control))
    }

    async fn click(&self, control: Control) -> Result<bool, BrowserError> {
        let size = self.window_size();
        let mut state = self.state.lock();
        if !self.control_state(&state, control).is_enabled() {
            return Ok(false);
        }
        state.clicks.push(control);

        match control {
            Control::PageNumber(page) => {
                if !self.unresponsive.contains(&page) {
                    state.selected = page;
                }
            }
            Control::Next => {
                let page = state.selected + 1;
                if !self.unresponsive.contains(&page) {
                    state.selected = page;
                }
            }
            Control::BlockForward => {
                state.window += 1;
                if self.auto_select_block_start {
                    state.selected = state.window * size + 1;
                }
            }
            Control::BlockBackward => {
                state.window -= 1;
                if self.auto_select_block_start {
                    state.selected = state.window * size + 1;
                }
            }
        }
        Ok(true)
    }

    async fn read_selected_page(&self) -> Result<Option<u32>, BrowserError> {
        if self.pagination == MockPagination::None {
            return Ok(None);
        }
        Ok(Some(self.state.lock().selected))
    }
}

#[derive(Debug, Default)]
struct BrowserShared {
    next_id: AtomicU64,
    tabs: Mutex<Vec<Arc<MockTab>>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Arc<dyn BrowserTab>>>>,
    opened: Mutex<Vec<String>>,
}

impl BrowserShared {
    fn spawn(&self, url: &str, pagination: MockPagination) -> Arc<MockTab> {
        let id = FIRST_BROWSER_TAB_ID + self.next_id.fetch_add(1, Ordering::SeqCst);
        let tab = MockTab::with_pagination(id, url, pagination).into_shared();
        self.tabs.lock().push(tab.clone());

        let announced: Arc<dyn BrowserTab> = tab.clone();
        self.listeners.lock().retain(|tx| tx.send(announced.clone()).is_ok());
        tab
    }
}

/// A scriptable browser context.
///
/// Tabs it creates get ids from 100 upwards and the configured pagination.
/// Opening a tab can schedule a follow-up: a popup tab, or an in-place
/// navigation of the opened tab.
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    pagination: MockPagination,
    popup: Option<(String, Duration)>,
    redirect: Option<(String, Duration)>,
    refuse_open: bool,
    shared: Arc<BrowserShared>,
}

impl MockBrowser {
    /// A browser with no scripted behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pagination for every tab this browser creates.
    #[must_use]
    pub fn with_pagination(mut self, pagination: MockPagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// After `open_tab`, a new tab on `url` appears once `delay` elapsed.
    #[must_use]
    pub fn with_popup(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.popup = Some((url.into(), delay));
        self
    }

    /// After `open_tab`, the opened tab navigates to `url` once `delay` elapsed.
    #[must_use]
    pub fn with_redirect(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.redirect = Some((url.into(), delay));
        self
    }

    /// Makes `open_tab` fail.
    #[must_use]
    pub fn refusing_open(mut self) -> Self {
        self.refuse_open = true;
        self
    }

    /// Creates a tab as if the page had opened it.
    pub fn spawn_tab(&self, url: &str) -> Arc<MockTab> {
        self.shared.spawn(url, self.pagination)
    }

    /// A tab this browser created.
    #[must_use]
    pub fn tab(&self, id: u64) -> Option<Arc<MockTab>> {
        self.shared.tabs.lock().iter().find(|t| t.id == id).cloned()
    }

    /// URLs passed to `open_tab`.
    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.shared.opened.lock().clone()
    }

    /// Tab-creation subscriptions whose receiver is still alive.
    #[must_use]
    pub fn live_tab_listeners(&self) -> usize {
        self.shared.listeners.lock().iter().filter(|tx| !tx.is_closed()).count()
    }
}

#[async_trait]
impl BrowserContext for MockBrowser {
    fn tab_events(&self) -> mpsc::UnboundedReceiver<Arc<dyn BrowserTab>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.listeners.lock().push(tx);
        rx
    }

    async fn open_tab(&self, url: &str) -> Result<Arc<dyn BrowserTab>, BrowserError> {
        if self.refuse_open {
            return Err(BrowserError::open_tab(url, "browser refused to open a tab"));
        }
        self.shared.opened.lock().push(url.to_string());
        let tab = self.shared.spawn(url, self.pagination);

        if let Some((popup_url, delay)) = self.popup.clone() {
            let shared = self.shared.clone();
            let pagination = self.pagination;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                shared.spawn(&popup_url, pagination);
            });
        }
        if let Some((target, delay)) = self.redirect.clone() {
            let opened = tab.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                opened.navigate(target);
            });
        }
        Ok(tab)
    }
}

type PageHook = Box<dyn Fn(u32) + Send + Sync>;

/// An extractor that serves generated or scripted records per page.
pub struct ScriptedExtractor {
    per_page: usize,
    pages: HashMap<u32, Vec<Record>>,
    failing: HashSet<u32>,
    hook: Option<PageHook>,
    ready_after: usize,
    fail_prepare: bool,
    ready_polls: AtomicUsize,
    seen: Mutex<Vec<u32>>,
    last_context: Mutex<Option<PageContext>>,
    prepared: Mutex<Option<SessionSpec>>,
}

impl std::fmt::Debug for ScriptedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedExtractor")
            .field("per_page", &self.per_page)
            .field("scripted_pages", &self.pages.len())
            .field("failing", &self.failing)
            .finish_non_exhaustive()
    }
}

impl ScriptedExtractor {
    /// Yields `per_page` distinct generated records on every page.
    #[must_use]
    pub fn uniform(per_page: usize) -> Self {
        Self {
            per_page,
            pages: HashMap::new(),
            failing: HashSet::new(),
            hook: None,
            ready_after: 0,
            fail_prepare: false,
            ready_polls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            last_context: Mutex::new(None),
            prepared: Mutex::new(None),
        }
    }

    /// Serves exactly `records` on `page`.
    #[must_use]
    pub fn with_page(mut self, page: u32, records: Vec<Record>) -> Self {
        self.pages.insert(page, records);
        self
    }

    /// Fails extraction on `page`.
    #[must_use]
    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Runs `hook` after each page is extracted.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Reports not-ready for the first `polls` readiness checks.
    #[must_use]
    pub fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self
    }

    /// Makes `prepare` fail.
    #[must_use]
    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    /// Pages extracted so far, including failed ones.
    #[must_use]
    pub fn pages_seen(&self) -> Vec<u32> {
        self.seen.lock().clone()
    }

    /// Context of the most recent extraction.
    #[must_use]
    pub fn last_context(&self) -> Option<PageContext> {
        self.last_context.lock().clone()
    }

    /// Options passed to `prepare`, if it ran.
    #[must_use]
    pub fn prepared_with(&self) -> Option<SessionSpec> {
        self.prepared.lock().clone()
    }

    /// Readiness checks made so far.
    #[must_use]
    pub fn readiness_polls(&self) -> usize {
        self.ready_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn prepare(&self, _tab: &TabHandle, spec: &SessionSpec) -> Result<(), ExtractionError> {
        *self.prepared.lock() = Some(spec.clone());
        if self.fail_prepare {
            return Err(ExtractionError::new(0, "sort control not found"));
        }
        Ok(())
    }

    async fn page_ready(&self, _tab: &TabHandle) -> bool {
        self.ready_polls.fetch_add(1, Ordering::SeqCst) >= self.ready_after
    }

    async fn extract(&self, _tab: &TabHandle, context: &PageContext) -> Result<Vec<Record>, ExtractionError> {
        let page = context.page;
        self.seen.lock().push(page);
        *self.last_context.lock() = Some(context.clone());
        if let Some(hook) = &self.hook {
            hook(page);
        }

        if self.failing.contains(&page) {
            return Err(ExtractionError::new(page, "review list did not render"));
        }
        Ok(self
            .pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| sample_page(context.mode, page, self.per_page)))
    }
}

#[derive(Debug, Default)]
struct ChunkWriterState {
    written: Vec<(u32, usize)>,
    fail_remaining: usize,
}

/// Chunk writer keeping chunk numbers in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkWriter {
    state: Arc<Mutex<ChunkWriterState>>,
}

impl MemoryChunkWriter {
    /// A writer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `attempts` writes.
    #[must_use]
    pub fn failing_first(self, attempts: usize) -> Self {
        self.state.lock().fail_remaining = attempts;
        self
    }

    /// Numbers of the chunks written successfully.
    #[must_use]
    pub fn written_numbers(&self) -> Vec<u32> {
        self.state.lock().written.iter().map(|(n, _)| *n).collect()
    }

    /// Record counts of the chunks written successfully.
    #[must_use]
    pub fn written_sizes(&self) -> Vec<usize> {
        self.state.lock().written.iter().map(|(_, size)| *size).collect()
    }
}

impl ChunkWriter for MemoryChunkWriter {
    fn write_chunk(&self, number: u32, records: &[Record]) -> Result<Artifact, SinkWriteError> {
        let mut state = self.state.lock();
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(SinkWriteError::new("memory", format!("chunk {number} rejected")));
        }
        state.written.push((number, records.len()));
        Ok(Artifact::remote("memory", format!("memory://chunks/{number}"), records.len()))
    }
}

/// Document store keeping collections in memory, upserting by `_id`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    failing: bool,
}

impl MemoryDocumentStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert fail as if the store were unreachable.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Documents held in `collection`.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections.lock().get(collection).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert(&self, collection: &str, documents: Vec<Value>) -> Result<usize, SinkWriteError> {
        if self.failing {
            return Err(SinkWriteError::new("remote", "connection refused"));
        }
        let count = documents.len();
        let mut collections = self.collections.lock();
        let stored = collections.entry(collection.to_string()).or_default();
        for doc in documents {
            let id = doc.get(DOCUMENT_ID_FIELD).cloned();
            match stored.iter_mut().find(|d| id.is_some() && d.get(DOCUMENT_ID_FIELD) == id.as_ref()) {
                Some(existing) => *existing = doc,
                None => stored.push(doc),
            }
        }
        Ok(count)
    }

    fn location(&self) -> String {
        "memory://documents".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CollectionMode;

    #[tokio::test]
    async fn test_linear_window_follows_selection() {
        let tab = MockTab::linear(1, "https://shop.test/p", 25).with_selection(9).into_shared();

        assert_eq!(tab.locate(Control::PageNumber(10)).await.unwrap(), ControlState::Enabled);
        assert_eq!(tab.locate(Control::PageNumber(11)).await.unwrap(), ControlState::Absent);
        assert_eq!(tab.locate(Control::PageNumber(9)).await.unwrap(), ControlState::Disabled);

        assert!(tab.click(Control::Next).await.unwrap());
        assert!(tab.click(Control::Next).await.unwrap());
        assert_eq!(tab.locate(Control::PageNumber(12)).await.unwrap(), ControlState::Enabled);
    }

    #[tokio::test]
    async fn test_block_jump_shifts_window() {
        let tab = MockTab::block(1, "https://shop.test/p", 25, 10).into_shared();

        assert!(!tab.click(Control::BlockBackward).await.unwrap());
        assert!(tab.click(Control::BlockForward).await.unwrap());
        assert_eq!(tab.locate(Control::PageNumber(11)).await.unwrap(), ControlState::Enabled);
        assert_eq!(tab.selected_page(), 1);
        assert!(tab.click(Control::BlockForward).await.unwrap());
        assert!(!tab.click(Control::BlockForward).await.unwrap());
        assert_eq!(tab.clicks(), vec![Control::BlockForward, Control::BlockForward]);
    }

    #[tokio::test]
    async fn test_dropped_listener_receives_nothing() {
        let tab = MockTab::new(1, "about:blank").into_shared();
        let rx = tab.navigation_events();
        assert_eq!(tab.live_navigation_listeners(), 1);
        drop(rx);

        tab.navigate("https://shop.test/p");
        assert_eq!(tab.live_navigation_listeners(), 0);
        assert_eq!(tab.delivered_navigations(), 0);
    }

    #[tokio::test]
    async fn test_scripted_extractor_generates_distinct_records() {
        let tab = MockTab::new(1, "about:blank").into_shared();
        let extractor = ScriptedExtractor::uniform(3);
        let context = PageContext {
            page: 2,
            mode: CollectionMode::ThreadCollection,
            photo_dir: std::path::PathBuf::new(),
        };

        let records = extractor.extract(&tab.handle(), &context).await.unwrap();
        let schema = CollectionMode::ThreadCollection.identity_schema();
        let keys: HashSet<_> = records.iter().map(|r| schema.key(r)).collect();
        assert_eq!(keys.len(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_upserts_by_id() {
        let store = MemoryDocumentStore::new();
        let doc = serde_json::json!({"_id": "a", "v": 1});
        let newer = serde_json::json!({"_id": "a", "v": 2});

        store.upsert("c", vec![doc]).await.unwrap();
        store.upsert("c", vec![newer]).await.unwrap();

        assert_eq!(store.documents("c"), vec![serde_json::json!({"_id": "a", "v": 2})]);
    }
}
