//! Backend configuration and runtime health state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Static description of one API origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub base_url: String,
    /// Lower is preferred
    pub priority: u32,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            priority,
        }
    }

    /// Joins `base_url` and `endpoint` with exactly one slash between them
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Why a backend was last marked unhealthy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    HealthCheck(String),
    RateLimited,
    ServerError(u16),
    Network(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::HealthCheck(msg) => write!(f, "health check failed: {msg}"),
            FailureReason::RateLimited => write!(f, "rate limited (HTTP 429)"),
            FailureReason::ServerError(status) => write!(f, "server error (HTTP {status})"),
            FailureReason::Network(msg) => write!(f, "network failure: {msg}"),
        }
    }
}

/// A backend together with its mutable health state
#[derive(Debug, Clone)]
pub struct Backend {
    pub config: BackendConfig,
    pub is_healthy: bool,
    /// Monotonic time of the last probe or failed request
    pub last_checked: Option<Instant>,
    /// Wall-clock time of the same event, for display
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_failure: Option<FailureReason>,
}

impl Backend {
    /// Backends start healthy and unchecked
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            is_healthy: true,
            last_checked: None,
            last_checked_at: None,
            last_failure: None,
        }
    }

    pub fn mark_healthy(&mut self) {
        self.is_healthy = true;
        self.last_failure = None;
        self.touch();
    }

    pub fn mark_unhealthy(&mut self, reason: FailureReason) {
        self.is_healthy = false;
        self.last_failure = Some(reason);
        self.touch();
    }

    fn touch(&mut self) {
        self.last_checked = Some(Instant::now());
        self.last_checked_at = Some(Utc::now());
    }

    /// Whether the health state is older than `max_age` (or was never checked)
    pub fn is_stale(&self, max_age: std::time::Duration) -> bool {
        match self.last_checked {
            Some(checked) => Instant::now().saturating_duration_since(checked) >= max_age,
            None => true,
        }
    }

    pub fn snapshot(&self) -> BackendSnapshot {
        BackendSnapshot {
            name: self.config.name.clone(),
            base_url: self.config.base_url.clone(),
            priority: self.config.priority,
            is_healthy: self.is_healthy,
            last_checked: self.last_checked_at,
            last_failure: self.last_failure.as_ref().map(ToString::to_string),
        }
    }
}

/// Read-only view of a backend for callers and the CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendSnapshot {
    pub name: String,
    pub base_url: String,
    pub priority: u32,
    pub is_healthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

/// Picks the preferred healthy backend not in `exclude`
///
/// Ties on priority go to the backend configured first.
pub fn select_backend(backends: &[Backend], exclude: &[usize]) -> Option<usize> {
    backends
        .iter()
        .enumerate()
        .filter(|(idx, backend)| backend.is_healthy && !exclude.contains(idx))
        .min_by_key(|(idx, backend)| (backend.config.priority, *idx))
        .map(|(idx, _)| idx)
}
