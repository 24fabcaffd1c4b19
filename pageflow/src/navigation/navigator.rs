//! The arrival race.
//!
//! Sources watched concurrently:
//!
//! 1. an immediate read of the tracked tab,
//! 2. navigations of the tracked tab,
//! 3. tabs created in the browser context, each contributing its own
//!    navigations plus one delayed read of its location (fresh tabs report
//!    a blank location for a moment).
//!
//! The first URL satisfying the predicate wins. Every subscription is a
//! receiver owned by the wait; returning drops them all, so losing sources
//! are released together with the resolution and nothing fires afterwards.

use futures::stream::{self, BoxStream, SelectAll};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::browser::{BrowserContext, BrowserTab, TabHandle};
use crate::config::NavigationConfig;
use crate::errors::CrawlError;
use crate::events::{ProgressEvent, ProgressSink};
use crate::observability::SpanTimer;

const MIN_COUNTDOWN_INTERVAL: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(86_400);

/// Which source detected arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalSource {
    /// The tracked tab was already on the target page.
    AlreadyThere,
    /// The tracked tab navigated to the target page.
    Navigation,
    /// A newly created tab reached the target page.
    NewTab,
}

/// The winning tab and the URL that satisfied the predicate.
#[derive(Debug)]
pub struct Arrival {
    /// Exclusive handle to the tab on the target page.
    pub tab: TabHandle,
    /// The matching URL.
    pub url: String,
    /// Where the arrival was observed.
    pub source: ArrivalSource,
}

/// Detects arrival at a target page.
pub struct SessionNavigator {
    settle: Duration,
    countdown_interval: Duration,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for SessionNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionNavigator")
            .field("settle", &self.settle)
            .field("countdown_interval", &self.countdown_interval)
            .finish_non_exhaustive()
    }
}

impl SessionNavigator {
    /// Creates a navigator with default timings.
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self::from_config(&NavigationConfig::default(), progress)
    }

    /// Creates a navigator from navigation settings.
    #[must_use]
    pub fn from_config(config: &NavigationConfig, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            settle: config.new_tab_settle(),
            countdown_interval: config.countdown_interval(),
            progress,
        }
    }

    /// Sets the delay before reading a new tab's location.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Sets how often the countdown is reported.
    #[must_use]
    pub fn with_countdown_interval(mut self, interval: Duration) -> Self {
        self.countdown_interval = interval;
        self
    }

    /// Waits until some tab satisfies `predicate`, or `timeout` elapses.
    ///
    /// Takes ownership of the starting tab and hands back ownership of the
    /// winner, which may be a different tab.
    pub async fn wait_for_arrival<P>(
        &self,
        browser: &dyn BrowserContext,
        starting: TabHandle,
        predicate: P,
        timeout: Duration,
    ) -> Result<Arrival, CrawlError>
    where
        P: Fn(&str) -> bool + Send + Sync,
    {
        let timer = SpanTimer::start("wait_for_arrival");
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + MAX_WAIT);
        let tracked = starting.into_inner();

        // Subscribe before the immediate check so an event landing in
        // between is not lost.
        let mut tracked_nav = tracked.navigation_events();
        let mut created_tabs = browser.tab_events();

        if let Ok(url) = tracked.current_url().await {
            if predicate(&url) {
                return Ok(self.resolve(tracked, url, ArrivalSource::AlreadyThere, timer));
            }
        }

        let mut new_tabs: Vec<Arc<dyn BrowserTab>> = Vec::new();
        let mut candidates: SelectAll<BoxStream<'static, (usize, String)>> = SelectAll::new();
        let mut tracked_open = true;
        let mut created_open = true;

        let period = self.countdown_interval.max(MIN_COUNTDOWN_INTERVAL);
        let mut countdown = tokio::time::interval_at(started + period, period);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;

                () = &mut expired => {
                    warn!(
                        tab_id = tracked.id(),
                        timeout_secs = timeout.as_secs_f64(),
                        new_tabs = new_tabs.len(),
                        "Target page not reached"
                    );
                    let err = CrawlError::navigation_timeout(timeout.as_secs_f64());
                    self.progress.try_emit(ProgressEvent::error(err.to_string()).replacing());
                    let _ = timer.finish();
                    return Err(err);
                }

                navigated = tracked_nav.recv(), if tracked_open => match navigated {
                    Some(url) if predicate(&url) => {
                        return Ok(self.resolve(tracked, url, ArrivalSource::Navigation, timer));
                    }
                    Some(url) => debug!(tab_id = tracked.id(), url = %url, "Tracked tab navigated elsewhere"),
                    None => tracked_open = false,
                },

                created = created_tabs.recv(), if created_open => match created {
                    Some(tab) => {
                        debug!(tab_id = tab.id(), "New tab created during wait");
                        candidates.push(new_tab_candidates(new_tabs.len(), tab.clone(), self.settle));
                        new_tabs.push(tab);
                    }
                    None => created_open = false,
                },

                Some((index, url)) = candidates.next(), if !candidates.is_empty() => {
                    if predicate(&url) {
                        let tab = new_tabs.swap_remove(index);
                        if let Err(e) = tab.bring_to_front().await {
                            warn!(tab_id = tab.id(), error = %e, "Could not focus new tab");
                        }
                        return Ok(self.resolve(tab, url, ArrivalSource::NewTab, timer));
                    }
                    debug!(index, url = %url, "New tab not on a target page");
                }

                _ = countdown.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.progress.try_emit(ProgressEvent::countdown(remaining.as_secs()));
                }
            }
        }
    }

    fn resolve(
        &self,
        tab: Arc<dyn BrowserTab>,
        url: String,
        source: ArrivalSource,
        timer: SpanTimer,
    ) -> Arrival {
        let waited_ms = timer.finish();
        info!(tab_id = tab.id(), url = %url, ?source, waited_ms, "Arrived at target page");
        self.progress
            .try_emit(ProgressEvent::success("Target page detected").replacing());
        Arrival {
            tab: TabHandle::new(tab),
            url,
            source,
        }
    }
}

/// Candidate URLs from one new tab: its navigations plus a single read
/// after the settle delay.
fn new_tab_candidates(
    index: usize,
    tab: Arc<dyn BrowserTab>,
    settle: Duration,
) -> BoxStream<'static, (usize, String)> {
    let navigations = receiver_stream(tab.navigation_events());
    let settled = stream::once(async move {
        tokio::time::sleep(settle).await;
        tab.current_url().await.ok()
    })
    .filter_map(futures::future::ready);

    stream::select(navigations, settled)
        .map(move |url| (index, url))
        .boxed()
}

fn receiver_stream<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}
