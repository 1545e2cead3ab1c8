//! Backend health probing
//!
//! A probe is a `GET` on the backend's health path bounded by a timeout.
//! A timeout, a transport failure or a non-2xx status all count as
//! unhealthy.

use std::time::Duration;

use reqwest::Method;
use tracing::debug;

use super::backend::{BackendConfig, FailureReason};
use super::transport::{HttpRequest, HttpTransport};

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            path: "/health".to_string(),
        }
    }
}

/// Probes a single backend
///
/// The probe future is dropped when the timeout fires, so a hung backend
/// cannot stall the caller.
pub async fn probe_backend(
    transport: &dyn HttpTransport,
    backend: &BackendConfig,
    config: &HealthCheckConfig,
) -> Result<(), FailureReason> {
    let url = backend.url_for(&config.path);
    let request = HttpRequest::new(Method::GET, url).with_timeout(config.timeout);

    let outcome = tokio::time::timeout(config.timeout, transport.send(request)).await;

    let result = match outcome {
        Err(_) => Err(FailureReason::HealthCheck(format!(
            "timed out after {}ms",
            config.timeout.as_millis()
        ))),
        Ok(Err(err)) => Err(FailureReason::HealthCheck(err.to_string())),
        Ok(Ok(response)) if response.is_success() => Ok(()),
        Ok(Ok(response)) => Err(FailureReason::HealthCheck(format!(
            "HTTP {}",
            response.status
        ))),
    };

    debug!(backend = %backend.name, healthy = result.is_ok(), "health probe finished");
    result
}

/// Probes every backend concurrently, returning results in input order
pub async fn probe_all(
    transport: &dyn HttpTransport,
    backends: &[BackendConfig],
    config: &HealthCheckConfig,
) -> Vec<Result<(), FailureReason>> {
    let checks = backends
        .iter()
        .map(|backend| probe_backend(transport, backend, config));
    futures::future::join_all(checks).await
}
