//! "Can I open a TCP connection?" probe.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::readiness::poll::Probe;

/// Try once to connect to `host:port`, closing the stream straight away.
///
/// Refused, reset, unreachable and timed-out connections are the normal
/// state of a service that is still starting, so they map to
/// [`Probe::NotYet`] and are logged at trace level. Only input that can never
/// become valid maps to [`Probe::Fatal`].
pub async fn tcp_probe(host: &str, port: u16, attempt_timeout: Duration) -> Probe {
    match tokio::time::timeout(attempt_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            tracing::debug!(host, port, "Connected");
            Probe::Ready
        }
        Ok(Err(e)) => classify_connect_error(host, port, &e),
        Err(_) => {
            tracing::trace!(host, port, ?attempt_timeout, "Connection attempt timed out");
            Probe::NotYet
        }
    }
}

fn classify_connect_error(host: &str, port: u16, err: &io::Error) -> Probe {
    match err.kind() {
        io::ErrorKind::InvalidInput => Probe::Fatal(format!("invalid address {host}:{port}: {err}")),
        kind => {
            tracing::trace!(host, port, ?kind, error = %err, "Connection failed");
            Probe::NotYet
        }
    }
}
