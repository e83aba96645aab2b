//! Readiness checks: decide when a freshly started container can take work.
//!
//! The building block is [`poll_until`], a fixed-interval retry loop with an
//! overall timeout. [`ReadinessCheck`] packages a loop (or any other async
//! predicate) as a one-shot value that a scope runs once before handing the
//! container to the caller.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use dockerscope::readiness::{ProbeSettings, ReadinessCheck};
//!
//! // Postgres is ready once it accepts TCP connections on the published port.
//! let check = ReadinessCheck::tcp("127.0.0.1", 55432);
//!
//! // Tighter budget for a fast service.
//! let quick = ReadinessCheck::tcp_with(
//!     "127.0.0.1",
//!     56379,
//!     ProbeSettings::default()
//!         .with_interval(Duration::from_millis(50))
//!         .with_timeout(Duration::from_secs(5)),
//! );
//! ```

mod http;
mod poll;
mod tcp;

pub use http::http_probe;
pub use poll::{PollOutcome, Probe, poll, poll_until};
pub use tcp::tcp_probe;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::config::ProbeConfig;

/// Interval and timeouts for the built-in polling checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Delay between attempts.
    pub interval: Duration,
    /// Overall budget, measured from the first attempt.
    pub timeout: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            timeout: Duration::from_secs(20),
            attempt_timeout: Duration::from_secs(2),
        }
    }
}

impl ProbeSettings {
    /// Set the delay between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the overall budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-attempt bound.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
            ..Default::default()
        }
    }
}

type CheckFn = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

/// A one-shot readiness predicate.
///
/// Any retry interval and timeout live inside the check itself; the scope
/// just awaits it once and treats `false` as "not ready in time".
pub struct ReadinessCheck {
    description: String,
    timeout: Option<Duration>,
    check: CheckFn,
}

impl ReadinessCheck {
    /// Wrap an arbitrary async predicate.
    pub fn new<F, Fut>(description: impl Into<String>, check: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            description: description.into(),
            timeout: None,
            check: Box::new(move || check().boxed()),
        }
    }

    /// Poll `check` every `interval` until it succeeds or `timeout` passes.
    pub fn polling<F, Fut>(
        description: impl Into<String>,
        check: F,
        interval: Duration,
        timeout: Duration,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::new(description, move || poll(check, interval, timeout)).with_known_timeout(timeout)
    }

    /// Wait until `host:port` accepts TCP connections, every 200ms for up to 20s.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::tcp_with(host, port, ProbeSettings::default())
    }

    /// Wait until `host:port` accepts TCP connections.
    pub fn tcp_with(host: impl Into<String>, port: u16, settings: ProbeSettings) -> Self {
        let host = host.into();
        let description = format!("tcp {host}:{port}");
        Self::new(description, move || async move {
            let outcome = poll_until(
                || tcp_probe(&host, port, settings.attempt_timeout),
                settings.interval,
                settings.timeout,
            )
            .await;
            log_outcome(&outcome);
            outcome.is_ready()
        })
        .with_known_timeout(settings.timeout)
    }

    /// Wait until a GET on `url` answers with a 2xx status.
    pub fn http(url: impl Into<String>) -> Self {
        Self::http_with(url, ProbeSettings::default())
    }

    /// Wait until a GET on `url` answers with a 2xx status.
    pub fn http_with(url: impl Into<String>, settings: ProbeSettings) -> Self {
        let url = url.into();
        let description = format!("http {url}");
        Self::new(description, move || async move {
            let client = reqwest::Client::builder()
                .timeout(settings.attempt_timeout)
                .build();
            poll_http(client, &url, settings).await
        })
        .with_known_timeout(settings.timeout)
    }

    /// Sleep for `delay`, then report ready.
    ///
    /// For workloads with no externally observable ready signal.
    pub fn delay(delay: Duration) -> Self {
        Self::new(format!("delay {delay:?}"), move || async move {
            tokio::time::sleep(delay).await;
            true
        })
    }

    fn with_known_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human-readable description, used in logs and errors.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Overall timeout, when the check was built with one.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the check to completion.
    pub async fn run(self) -> bool {
        (self.check)().await
    }
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

async fn poll_http(
    client: reqwest::Result<reqwest::Client>,
    url: &str,
    settings: ProbeSettings,
) -> bool {
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(url, error = %e, "Could not build HTTP client for readiness check");
            return false;
        }
    };

    let outcome = poll_until(
        || http_probe(&client, url),
        settings.interval,
        settings.timeout,
    )
    .await;
    log_outcome(&outcome);
    outcome.is_ready()
}

fn log_outcome(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::Ready { attempts } => {
            tracing::debug!(attempts, "Readiness probe succeeded");
        }
        PollOutcome::TimedOut { attempts, elapsed } => {
            tracing::debug!(attempts, ?elapsed, "Readiness probe timed out");
        }
        PollOutcome::Aborted { reason } => {
            tracing::warn!(%reason, "Readiness probe aborted");
        }
    }
}
