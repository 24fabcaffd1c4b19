//! Cooperative cancellation of a crawl session.
//!
//! The session checks the token between pages only; an in-flight page is
//! always completed and collected records are still persisted.

mod token;

pub use token::{CancelCallback, CancellationToken};
