//! Fixed-delay retry with a blocking, human-visible countdown.
//!
//! Upload and install share this loop but are configured independently.
//! Each retry re-runs the whole operation; the delay is constant between
//! attempts.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::SyncError;

/// Number of retries after the first attempt and the pause before each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub times: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(times: u32, delay: Duration) -> Self {
        Self { times, delay }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.times + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(30))
    }
}

/// Receives countdown ticks while a retry delay elapses.
pub trait RetryProgress: Send + Sync {
    /// Called once when the countdown starts, then with the remaining time
    /// roughly every second, and finally with zero.
    fn countdown(&self, header: &str, remaining: Duration);
}

/// Reports the countdown through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl RetryProgress for LogProgress {
    fn countdown(&self, header: &str, remaining: Duration) {
        if remaining.is_zero() {
            info!("{}", header);
        } else {
            info!("{} {}s left", header, remaining.as_secs());
        }
    }
}

/// Drops every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl RetryProgress for SilentProgress {
    fn countdown(&self, _header: &str, _remaining: Duration) {}
}

/// Sleep for `delay`, reporting the remaining time once per second.
pub fn countdown(progress: &dyn RetryProgress, header: &str, delay: Duration) {
    let tick = Duration::from_secs(1);
    let mut remaining = delay;

    while !remaining.is_zero() {
        progress.countdown(header, remaining);
        let step = remaining.min(tick);
        std::thread::sleep(step);
        remaining -= step;
    }
    progress.countdown(header, Duration::ZERO);
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// Only retryable [`SyncError`]s are re-attempted; the error of the final
/// attempt is returned. `label` names the operation in log lines and the
/// countdown header (e.g. "upload").
pub fn retry_with_delay<T, F>(
    policy: RetryPolicy,
    label: &str,
    target: &str,
    progress: &dyn RetryProgress,
    mut operation: F,
) -> Result<T, SyncError>
where
    F: FnMut(u32) -> Result<T, SyncError>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.times => {
                attempt += 1;
                warn!(instance = %target, "Cannot {} on {}: {}", label, target, e);

                let header = format!(
                    "Retrying {} ({}/{}) after delay.",
                    label, attempt, policy.times
                );
                countdown(progress, &header, policy.delay);
            }
            Err(e) => {
                error!(instance = %target, "Cannot {} on {}: {}", label, target, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestFailure;
    use std::sync::Mutex;

    fn failure() -> SyncError {
        SyncError::request(
            "http://localhost:4502",
            RequestFailure::Status("503 Service Unavailable".to_string()),
        )
    }

    #[derive(Default)]
    struct RecordingProgress {
        ticks: Mutex<Vec<(String, Duration)>>,
    }

    impl RetryProgress for RecordingProgress {
        fn countdown(&self, header: &str, remaining: Duration) {
            self.ticks
                .lock()
                .unwrap()
                .push((header.to_string(), remaining));
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let progress = RecordingProgress::default();
        let mut calls = 0;

        let result = retry_with_delay(
            RetryPolicy::new(2, Duration::ZERO),
            "upload",
            "local-author",
            &progress,
            |_| {
                calls += 1;
                if calls <= 2 { Err(failure()) } else { Ok(calls) }
            },
        );

        assert_eq!(result.unwrap(), 3);
        let ticks = progress.ticks.lock().unwrap();
        let headers: Vec<_> = ticks.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(
            headers,
            vec![
                "Retrying upload (1/2) after delay.",
                "Retrying upload (2/2) after delay."
            ]
        );
    }

    #[test]
    fn returns_last_error_when_exhausted() {
        let mut attempts = Vec::new();
        let result: Result<(), _> = retry_with_delay(
            RetryPolicy::new(3, Duration::ZERO),
            "install",
            "local-author",
            &SilentProgress,
            |attempt| {
                attempts.push(attempt);
                Err(SyncError::malformed("attempt", attempt))
            },
        );

        assert_eq!(attempts, vec![0, 1, 2, 3]);
        match result.unwrap_err() {
            SyncError::MalformedResponse { reason, .. } => assert_eq!(reason, "3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_delay(
            RetryPolicy::new(5, Duration::ZERO),
            "upload",
            "local-author",
            &SilentProgress,
            |_| {
                calls += 1;
                Err(SyncError::PackageNotResolved {
                    instance: "local-author".to_string(),
                })
            },
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn countdown_ticks_every_second() {
        let progress = RecordingProgress::default();
        countdown(&progress, "Waiting", Duration::from_millis(1500));

        let ticks = progress.ticks.lock().unwrap();
        let remaining: Vec<_> = ticks.iter().map(|(_, r)| *r).collect();
        assert_eq!(
            remaining,
            vec![
                Duration::from_millis(1500),
                Duration::from_millis(500),
                Duration::ZERO
            ]
        );
    }
}
