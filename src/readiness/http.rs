//! "Does this URL answer with a 2xx?" probe.

use crate::readiness::poll::Probe;

/// Issue one GET to `url`.
///
/// Connection failures and timeouts mean the service is still coming up.
/// A URL that cannot even be turned into a request is fatal.
pub async fn http_probe(client: &reqwest::Client, url: &str) -> Probe {
    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => Probe::Ready,
        Ok(resp) => {
            tracing::trace!(url, status = %resp.status(), "Not healthy yet");
            Probe::NotYet
        }
        Err(e) if e.is_builder() => Probe::Fatal(format!("invalid url {url}: {e}")),
        Err(e) => {
            tracing::trace!(url, error = %e, "Health request failed");
            Probe::NotYet
        }
    }
}
