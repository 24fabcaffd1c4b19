//! Progress channel exposed to the UI collaborator.
//!
//! Progress events are best-effort and ordered; there is no delivery
//! guarantee and no backpressure. Internal diagnostics go through `tracing`
//! instead; [`LoggingProgressSink`] bridges the two when no UI is attached.

mod event;
mod sink;

pub use event::{ProgressEvent, Severity};
pub use sink::{
    ChannelProgressSink, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink,
    ProgressSink,
};
