//! Progress sink trait and implementations.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{ProgressEvent, Severity};

/// Trait for consumers of the progress channel.
///
/// Emission is fire-and-forget: implementations must not block the session
/// and must swallow their own failures.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: ProgressEvent);

    /// Emits an event without awaiting.
    fn try_emit(&self, event: ProgressEvent);
}

/// A no-op sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn emit(&self, _event: ProgressEvent) {}

    fn try_emit(&self, _event: ProgressEvent) {}
}

/// A sink that mirrors progress into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgressSink;

impl LoggingProgressSink {
    fn log_event(event: &ProgressEvent) {
        match event.severity {
            Severity::Info | Severity::Success => info!(
                severity = event.severity.as_str(),
                replace_previous = event.replace_previous,
                "{}", event.message
            ),
            Severity::Warning => warn!(
                replace_previous = event.replace_previous,
                "{}", event.message
            ),
            Severity::Error => error!(
                replace_previous = event.replace_previous,
                "{}", event.message
            ),
        }
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        Self::log_event(&event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        Self::log_event(&event);
    }
}

/// A sink that forwards events to an unbounded channel read by the UI.
///
/// Once the receiver is dropped, events are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    /// Creates a sink and the receiver the UI should drain.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.try_emit(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: parking_lot::RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events of one severity.
    #[must_use]
    pub fn of_severity(&self, severity: Severity) -> Vec<ProgressEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }

    /// Returns the lines a consumer would display after applying
    /// `replace_previous`.
    #[must_use]
    pub fn rendered_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for event in self.events.read().iter() {
            if event.replace_previous && !lines.is_empty() {
                lines.pop();
            }
            lines.push(event.message.clone());
        }
        lines
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpProgressSink;
        sink.emit(ProgressEvent::info("x")).await;
        sink.try_emit(ProgressEvent::error("y"));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingProgressSink;
        sink.emit(ProgressEvent::warning("page skipped")).await;
        sink.try_emit(ProgressEvent::success("done"));
    }

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelProgressSink::new();
        sink.emit(ProgressEvent::info("one")).await;
        sink.try_emit(ProgressEvent::info("two"));

        assert_eq!(rx.recv().await.unwrap().message, "one");
        assert_eq!(rx.recv().await.unwrap().message, "two");
    }

    #[tokio::test]
    async fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgressSink::new();
        drop(rx);
        sink.emit(ProgressEvent::info("nobody listens")).await;
    }

    #[tokio::test]
    async fn test_collecting_sink_rendering() {
        let sink = CollectingProgressSink::new();
        sink.emit(ProgressEvent::info("start")).await;
        sink.emit(ProgressEvent::countdown(3)).await;
        sink.emit(ProgressEvent::countdown(2)).await;
        sink.emit(ProgressEvent::success("arrived").replacing()).await;

        assert_eq!(sink.len(), 4);
        assert_eq!(sink.rendered_lines(), vec!["arrived".to_string()]);
        assert_eq!(sink.of_severity(Severity::Success).len(), 1);
    }
}
