//! Bounded polling shared by every wait site.
//!
//! Arrival confirmation, page-number verification and page-ready checks all
//! reduce to "probe, sleep, probe again, give up after a bound". The bound is
//! an attempt count, a deadline, or both; whichever is hit first ends the
//! poll with [`PollExhausted`].

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Bounds for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between probes.
    pub interval: Duration,
    /// Maximum number of probes.
    pub max_attempts: Option<usize>,
    /// Overall time budget.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// A policy bounded by attempt count.
    #[must_use]
    pub fn attempts(max_attempts: usize, interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts.max(1)),
            deadline: None,
        }
    }

    /// A policy bounded by elapsed time.
    #[must_use]
    pub fn deadline(deadline: Duration, interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: Some(deadline),
        }
    }

    /// Adds a deadline to an attempt-bounded policy.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// The poll ran out of attempts or time without the probe succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Polling exhausted after {attempts} attempts ({elapsed_ms}ms)")]
pub struct PollExhausted {
    /// Number of probes made.
    pub attempts: usize,
    /// Time spent polling.
    pub elapsed_ms: u64,
}

/// Probes until it yields `Some`, or the policy's bound is reached.
///
/// The first probe runs immediately. A probe returning `None` means "not yet".
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Result<T, PollExhausted>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    let mut attempts = 0usize;

    loop {
        let outcome = probe(attempts).await;
        attempts += 1;

        if let Some(value) = outcome {
            return Ok(value);
        }

        let elapsed = started.elapsed();
        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = policy
            .deadline
            .is_some_and(|deadline| elapsed + policy.interval > deadline);

        if out_of_attempts || out_of_time {
            tracing::debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Polling exhausted");
            return Err(PollExhausted {
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_probe_succeeds_without_sleeping() {
        let started = Instant::now();
        let result = poll_until(PollPolicy::attempts(5, Duration::from_secs(1)), |_| async {
            Some(7)
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_later_attempt() {
        let result = poll_until(PollPolicy::attempts(8, Duration::from_millis(800)), |n| async move {
            (n == 3).then_some(n)
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_bound_is_exact() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> =
            poll_until(PollPolicy::attempts(8, Duration::from_millis(800)), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 8);
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        // Seven sleeps between eight probes.
        assert_eq!(err.elapsed_ms, 7 * 800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bound() {
        let result: Result<(), _> = poll_until(
            PollPolicy::deadline(Duration::from_secs(5), Duration::from_secs(1)),
            |_| async { None },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.elapsed_ms <= 5000);
        assert!(err.attempts >= 5);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = PollPolicy::attempts(0, Duration::from_millis(1));
        assert_eq!(policy.max_attempts, Some(1));
    }
}
