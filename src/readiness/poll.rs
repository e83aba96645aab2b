//! The generic fixed-interval polling loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Result of a single readiness attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The instance accepted the probe.
    Ready,
    /// Not ready yet; try again after the interval.
    NotYet,
    /// Retrying cannot help (e.g. a malformed address). Stops the loop.
    Fatal(String),
}

impl Probe {
    /// Returns true for [`Probe::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Probe::Ready)
    }
}

impl From<bool> for Probe {
    fn from(ready: bool) -> Self {
        if ready { Probe::Ready } else { Probe::NotYet }
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A probe succeeded.
    Ready {
        /// Number of probes made, including the successful one.
        attempts: u32,
    },
    /// The overall timeout elapsed without a successful probe.
    TimedOut {
        /// Number of probes made.
        attempts: u32,
        /// Time since the first probe when the loop gave up.
        elapsed: Duration,
    },
    /// A probe reported a fatal condition.
    Aborted {
        /// Reason reported by the probe.
        reason: String,
    },
}

impl PollOutcome {
    /// Returns true if polling ended with a successful probe.
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// Repeatedly run `check` until it reports ready, reports a fatal error, or
/// more than `timeout` has passed since the first attempt.
///
/// The first attempt runs immediately; a successful first attempt returns
/// without sleeping. After each unsuccessful attempt the loop sleeps for
/// `interval`, then checks the elapsed time before trying again.
///
/// The elapsed time is only compared between attempts, so an attempt that
/// itself takes a long time can push the total past `timeout` by up to one
/// attempt's duration. Bound slow probes with their own per-attempt timeout
/// (the TCP and HTTP probes do).
pub async fn poll_until<F, Fut>(mut check: F, interval: Duration, timeout: Duration) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match check().await {
            Probe::Ready => return PollOutcome::Ready { attempts },
            Probe::Fatal(reason) => {
                tracing::debug!(attempts, %reason, "Readiness probe aborted");
                return PollOutcome::Aborted { reason };
            }
            Probe::NotYet => {
                tracing::trace!(attempts, "Not ready yet");
            }
        }

        tokio::time::sleep(interval).await;

        let elapsed = start.elapsed();
        if elapsed > timeout {
            tracing::debug!(attempts, ?elapsed, ?timeout, "Gave up waiting for readiness");
            return PollOutcome::TimedOut { attempts, elapsed };
        }
    }
}

/// Boolean form of [`poll_until`]: `true` as soon as `check` returns `true`,
/// `false` once the timeout has elapsed. Never fails.
pub async fn poll<F, Fut>(mut check: F, interval: Duration, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(
        || {
            let attempt = check();
            async move { Probe::from(attempt.await) }
        },
        interval,
        timeout,
    )
    .await
    .is_ready()
}
