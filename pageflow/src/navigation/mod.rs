//! Arrival detection.
//!
//! Reaching the target page may happen in place on the tracked tab or in a
//! tab the site opens by itself. [`SessionNavigator::wait_for_arrival`] races
//! every possible source and resolves at most once.

mod navigator;
mod target;

pub use navigator::{Arrival, ArrivalSource, SessionNavigator};
pub use target::{resolve_start_url, SessionTarget, TargetMatcher};
