//! Jittered delays between page transitions.

use rand::Rng;
use std::time::Duration;

use crate::config::PaginationConfig;

/// An inclusive range of delays sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

impl DelayRange {
    /// Creates a new range; the bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    /// The per-page delay range from pagination settings.
    #[must_use]
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    /// A range that never sleeps.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }
}

/// Samples a delay uniformly from the range.
#[must_use]
pub fn jittered_delay(range: DelayRange) -> Duration {
    if range.min_ms == range.max_ms {
        return Duration::from_millis(range.min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
}

/// Sleeps for a jittered delay and returns how long it slept.
pub async fn sleep_jittered(range: DelayRange) -> Duration {
    let delay = jittered_delay(range);
    if !delay.is_zero() {
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Waiting for re-render");
        tokio::time::sleep(delay).await;
    }
    delay
}
