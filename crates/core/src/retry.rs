//! Bounded polling primitive.
//!
//! Both waits in the worker -- the startup readiness wait against
//! `/system_stats` and the per-job result wait against `/history` --
//! are the same loop: probe, sleep a fixed interval, give up once a
//! deadline passes. [`poll_until`] is that loop, parameterized by
//! interval, window, and probe.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a [`poll_until`] wait that did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    /// The window elapsed without the probe producing a value.
    #[error("timed out after {:.1}s", .elapsed.as_secs_f64())]
    Timeout {
        /// Total time spent waiting.
        elapsed: Duration,
    },

    /// The probe failed hard; the wait was abandoned immediately.
    #[error(transparent)]
    Probe(E),
}

/// Repeatedly invoke `probe` until it yields a value or `timeout` elapses.
///
/// The probe's three outcomes drive the loop:
/// * `Ok(Some(value))` -- done, return the value.
/// * `Ok(None)` -- not yet, sleep `interval` and retry.
/// * `Err(e)` -- hard failure, return [`PollError::Probe`] without retrying.
///
/// The deadline is checked before each probe, so a wait never runs more
/// than one `interval` past `timeout`. A zero `timeout` fails without
/// probing at all.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;

    while start.elapsed() < timeout {
        attempt += 1;
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::trace!(attempt, elapsed_ms = start.elapsed().as_millis() as u64, "Poll attempt pending");
            }
            Err(e) => return Err(PollError::Probe(e)),
        }
        tokio::time::sleep(interval).await;
    }

    Err(PollError::Timeout {
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("probe exploded")]
    struct ProbeFailure;

    #[tokio::test]
    async fn returns_value_on_first_success() {
        let result: Result<u32, PollError<ProbeFailure>> = poll_until(
            Duration::from_millis(10),
            Duration::from_secs(1),
            || async { Ok(Some(42)) },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_probe_produces_a_value() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result: Result<u32, PollError<ProbeFailure>> = poll_until(
            Duration::from_millis(5),
            Duration::from_secs(1),
            move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n >= 3 { Some(n) } else { None })
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn times_out_when_probe_never_succeeds() {
        let start = std::time::Instant::now();

        let result: Result<u32, PollError<ProbeFailure>> = poll_until(
            Duration::from_millis(10),
            Duration::from_millis(50),
            || async { Ok(None) },
        )
        .await;

        match result {
            Err(PollError::Timeout { elapsed }) => {
                assert!(elapsed >= Duration::from_millis(50));
            }
            other => panic!("Expected Timeout, got {other:?}"),
        }
        // One interval of slack past the window, with headroom for a
        // slow test runner.
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn probe_error_short_circuits() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result: Result<u32, PollError<ProbeFailure>> = poll_until(
            Duration::from_millis(5),
            Duration::from_secs(1),
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ProbeFailure)
            },
        )
        .await;

        assert!(matches!(result, Err(PollError::Probe(ProbeFailure))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_timeout_fails_without_probing() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result: Result<u32, PollError<ProbeFailure>> = poll_until(
            Duration::from_millis(5),
            Duration::ZERO,
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok(Some(1))
            },
        )
        .await;

        assert!(matches!(result, Err(PollError::Timeout { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
