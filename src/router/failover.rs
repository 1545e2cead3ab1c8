//! Multi-backend request router with health tracking and failover
//!
//! The router keeps a static, priority-ordered list of backends. The
//! current backend is always the preferred healthy one. Requests go to the
//! current backend first; a rate-limited (429), erroring (5xx) or
//! unreachable backend is marked unhealthy and the same request is retried
//! on the next-best backend not yet tried in this call.

use std::sync::{Arc, Mutex, Weak};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::backend::{select_backend, Backend, BackendConfig, BackendSnapshot, FailureReason};
use super::health::{probe_all, HealthCheckConfig};
use super::transport::{HttpRequest, HttpTransport};
use crate::auth::TokenStore;

/// Capacity of the event channel; slow receivers lose the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Errors returned by the router
#[derive(Debug, Error)]
pub enum RouterError {
    /// Every backend is unhealthy or failed within this request
    #[error("all backends unavailable (attempted: [{}])", .attempted.join(", "))]
    AllBackendsUnavailable {
        attempted: Vec<String>,
        #[source]
        last_error: Option<Box<RouterError>>,
    },

    /// A single backend failed; recorded against its health
    #[error("backend '{backend}' failed: {reason}")]
    Transient {
        backend: String,
        reason: FailureReason,
    },

    /// The backend answered with a non-retryable HTTP error
    #[error("HTTP {status} from backend '{backend}': {body}")]
    Http {
        backend: String,
        status: u16,
        body: String,
    },

    /// The backend answered 2xx but the body could not be decoded
    #[error("malformed response from backend '{backend}': {message}")]
    MalformedResponse { backend: String, message: String },
}

impl RouterError {
    /// Whether this is the terminal "total outage" error
    pub fn is_outage(&self) -> bool {
        matches!(self, RouterError::AllBackendsUnavailable { .. })
    }
}

/// Observable changes of the current backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// The current backend changed
    Switchover { from: Option<String>, to: String },
    /// No backend is healthy any more
    AllBackendsDown,
}

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub health: HealthCheckConfig,
    /// Extra attempts after the first one
    pub max_retries: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            health: HealthCheckConfig::default(),
            max_retries: 2,
        }
    }
}

struct RouterState {
    /// Sorted by priority, ties in configuration order
    backends: Vec<Backend>,
    current: Option<usize>,
}

impl RouterState {
    /// Recomputes the current backend, returning an event if it changed
    fn reselect(&mut self) -> Option<RouterEvent> {
        let next = select_backend(&self.backends, &[]);
        if next == self.current {
            return None;
        }

        let from = self
            .current
            .map(|idx| self.backends[idx].config.name.clone());
        self.current = next;

        match next {
            Some(idx) => {
                let to = self.backends[idx].config.name.clone();
                info!(from = ?from, to = %to, "switched current backend");
                Some(RouterEvent::Switchover { from, to })
            }
            None => {
                warn!("all backends are unhealthy");
                Some(RouterEvent::AllBackendsDown)
            }
        }
    }
}

struct RouterInner {
    state: RwLock<RouterState>,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    config: RouterConfig,
    events: broadcast::Sender<RouterEvent>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        if let Ok(mut task) = self.health_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

/// Failover-aware JSON-over-HTTP client
///
/// Cheap to clone; clones share backend state.
#[derive(Clone)]
pub struct FailoverRouter {
    inner: Arc<RouterInner>,
}

impl std::fmt::Debug for FailoverRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverRouter")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl FailoverRouter {
    /// Creates a router over a static backend list
    ///
    /// Backends start healthy and are probed on first use.
    pub fn new(
        backends: Vec<BackendConfig>,
        config: RouterConfig,
        transport: Arc<dyn HttpTransport>,
        tokens: TokenStore,
    ) -> Self {
        let mut backends: Vec<Backend> = backends.into_iter().map(Backend::new).collect();
        backends.sort_by_key(|backend| backend.config.priority);
        let current = select_backend(&backends, &[]);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(RouterInner {
                state: RwLock::new(RouterState { backends, current }),
                transport,
                tokens,
                config,
                events,
                health_task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Receives switchover and outage notifications
    pub fn events(&self) -> broadcast::Receiver<RouterEvent> {
        self.inner.events.subscribe()
    }

    pub async fn backends(&self) -> Vec<BackendSnapshot> {
        let state = self.inner.state.read().await;
        state.backends.iter().map(Backend::snapshot).collect()
    }

    pub async fn current_backend(&self) -> Option<BackendSnapshot> {
        let state = self.inner.state.read().await;
        state.current.map(|idx| state.backends[idx].snapshot())
    }

    /// Probes every backend now and returns the resulting state
    pub async fn check_health(&self) -> Vec<BackendSnapshot> {
        let configs: Vec<(usize, BackendConfig)> = {
            let state = self.inner.state.read().await;
            state
                .backends
                .iter()
                .enumerate()
                .map(|(idx, backend)| (idx, backend.config.clone()))
                .collect()
        };
        self.probe_and_apply(configs).await;
        self.backends().await
    }

    /// Probes only backends whose health state is older than the interval
    async fn refresh_stale_health(&self) {
        let interval = self.inner.config.health.interval;
        let stale: Vec<(usize, BackendConfig)> = {
            let state = self.inner.state.read().await;
            state
                .backends
                .iter()
                .enumerate()
                .filter(|(_, backend)| backend.is_stale(interval))
                .map(|(idx, backend)| (idx, backend.config.clone()))
                .collect()
        };

        if !stale.is_empty() {
            self.probe_and_apply(stale).await;
        }
    }

    /// Probes `targets` and applies the results
    ///
    /// A backend whose state changed after the probes started keeps that
    /// newer state, so a probe issued before a failed request cannot mark
    /// the backend healthy again.
    async fn probe_and_apply(&self, targets: Vec<(usize, BackendConfig)>) {
        let configs: Vec<BackendConfig> = targets.iter().map(|(_, c)| c.clone()).collect();
        let started = Instant::now();
        let results = probe_all(
            self.inner.transport.as_ref(),
            &configs,
            &self.inner.config.health,
        )
        .await;

        let event = {
            let mut state = self.inner.state.write().await;
            for ((idx, config), result) in targets.into_iter().zip(results) {
                let backend = &mut state.backends[idx];
                if backend.last_checked.is_some_and(|checked| checked > started) {
                    debug!(backend = %config.name, "discarding outdated probe result");
                    continue;
                }
                match result {
                    Ok(()) => {
                        if !backend.is_healthy {
                            info!(backend = %config.name, "backend recovered");
                        }
                        backend.mark_healthy();
                    }
                    Err(reason) => {
                        if backend.is_healthy {
                            warn!(backend = %config.name, %reason, "backend failed health check");
                        }
                        backend.mark_unhealthy(reason);
                    }
                }
            }
            state.reselect()
        };
        self.publish(event);
    }

    /// Starts periodic health checks; calling it again is a no-op
    ///
    /// The first check runs immediately.
    pub fn spawn_health_checks(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no async runtime, periodic health checks not started");
            return;
        }
        let Ok(mut task) = self.inner.health_task.lock() else {
            return;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let weak: Weak<RouterInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.health.interval;
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                FailoverRouter { inner }.check_health().await;
            }
        }));
    }

    /// Stops periodic health checks
    pub fn shutdown(&self) {
        if let Ok(mut task) = self.inner.health_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    /// Sends a request, failing over between backends
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, RouterError> {
        let mut tried: Vec<usize> = Vec::new();
        let mut attempted: Vec<String> = Vec::new();
        let mut last_error: Option<RouterError> = None;

        for _ in 0..=self.inner.config.max_retries {
            self.refresh_stale_health().await;

            let target = {
                let state = self.inner.state.read().await;
                select_backend(&state.backends, &tried)
                    .map(|idx| (idx, state.backends[idx].config.clone()))
            };
            let Some((idx, backend)) = target else {
                break;
            };
            tried.push(idx);
            attempted.push(backend.name.clone());

            let request = HttpRequest::new(method.clone(), backend.url_for(endpoint))
                .with_body(body.clone())
                .with_bearer_token(self.inner.tokens.read());

            debug!(backend = %backend.name, %method, endpoint, "sending request");

            let reason = match self.inner.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    return decode_body(&backend.name, &response.body);
                }
                Ok(response) if response.status == 429 => FailureReason::RateLimited,
                Ok(response) if response.status >= 500 => {
                    FailureReason::ServerError(response.status)
                }
                Ok(response) => {
                    return Err(RouterError::Http {
                        backend: backend.name,
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) => FailureReason::Network(err.to_string()),
            };

            last_error = Some(self.record_failure(idx, reason).await);
        }

        warn!(endpoint, attempted = ?attempted, "no backend could serve the request");
        Err(RouterError::AllBackendsUnavailable {
            attempted,
            last_error: last_error.map(Box::new),
        })
    }

    async fn record_failure(&self, idx: usize, reason: FailureReason) -> RouterError {
        let (name, event) = {
            let mut state = self.inner.state.write().await;
            let backend = &mut state.backends[idx];
            warn!(
                backend = %backend.config.name,
                %reason,
                "request failed, marking backend unhealthy"
            );
            backend.mark_unhealthy(reason.clone());
            let name = backend.config.name.clone();
            (name, state.reselect())
        };
        self.publish(event);
        RouterError::Transient {
            backend: name,
            reason,
        }
    }

    fn publish(&self, event: Option<RouterEvent>) {
        if let Some(event) = event {
            // No receivers is fine
            let _ = self.inner.events.send(event);
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RouterError> {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, RouterError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, RouterError> {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, RouterError> {
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RouterError> {
        self.request(Method::DELETE, endpoint, None).await
    }
}

/// Decodes a 2xx body; an empty body decodes as JSON `null`
fn decode_body<T: DeserializeOwned>(backend: &str, body: &str) -> Result<T, RouterError> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| RouterError::MalformedResponse {
        backend: backend.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::transport::mock::{MockTransport, Reply};
    use crate::router::transport::TransportError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn two_backends() -> Vec<BackendConfig> {
        vec![
            BackendConfig::new("primary", "http://a", 1),
            BackendConfig::new("fallback", "http://b", 2),
        ]
    }

    fn router_with(transport: Arc<MockTransport>) -> FailoverRouter {
        FailoverRouter::new(
            two_backends(),
            RouterConfig::default(),
            transport,
            TokenStore::anonymous(),
        )
    }

    fn both_healthy(transport: &MockTransport) {
        transport.reply("http://a/health", Reply::ok(""));
        transport.reply("http://b/health", Reply::ok(""));
    }

    #[test]
    fn test_router_config_default() {
        let config = RouterConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.health, HealthCheckConfig::default());
    }

    #[tokio::test]
    async fn test_backends_sorted_by_priority() {
        let transport = Arc::new(MockTransport::new());
        let router = FailoverRouter::new(
            vec![
                BackendConfig::new("fallback", "http://b", 2),
                BackendConfig::new("primary", "http://a", 1),
            ],
            RouterConfig::default(),
            transport,
            TokenStore::anonymous(),
        );

        let names: Vec<String> = router.backends().await.into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["primary", "fallback"]);
        assert_eq!(router.current_backend().await.unwrap().name, "primary");
    }

    #[tokio::test]
    async fn test_request_uses_primary_when_healthy() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/clients", Reply::ok("[{\"id\":1}]"));

        let router = router_with(transport.clone());
        let body: Value = router.get("/clients").await.expect("request should succeed");

        assert_eq!(body, serde_json::json!([{"id": 1}]));
        assert_eq!(transport.resource_urls(), vec!["http://a/clients".to_string()]);
    }

    #[tokio::test]
    async fn test_failover_to_healthy_backend() {
        let transport = Arc::new(MockTransport::new());
        transport.reply("http://a/health", Reply::Status(503, String::new()));
        transport.reply("http://b/health", Reply::ok(""));
        transport.reply("http://b/clients", Reply::ok("[]"));

        let router = router_with(transport.clone());
        let mut events = router.events();
        let _: Value = router.get("/clients").await.expect("request should succeed");

        assert_eq!(transport.resource_urls(), vec!["http://b/clients".to_string()]);
        assert!(!transport.urls().contains(&"http://a/clients".to_string()));
        assert_eq!(
            events.try_recv().unwrap(),
            RouterEvent::Switchover {
                from: Some("primary".to_string()),
                to: "fallback".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_exhaustion_makes_no_http_call() {
        let transport = Arc::new(MockTransport::new());
        transport.reply("http://a/health", Reply::Status(500, String::new()));
        transport.reply(
            "http://b/health",
            Reply::Fail(TransportError::Network("refused".to_string())),
        );

        let router = router_with(transport.clone());
        router.check_health().await;
        let before = transport.requests().len();

        let result: Result<Value, RouterError> = router.get("/clients").await;

        let err = result.unwrap_err();
        assert!(err.is_outage());
        assert_eq!(transport.requests().len(), before, "no HTTP call expected");
        assert!(router.current_backend().await.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_backend_retried_on_next() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/alerts", Reply::Status(429, "slow down".to_string()));
        transport.reply("http://b/alerts", Reply::ok("{\"ok\":true}"));

        let router = router_with(transport.clone());
        let mut events = router.events();
        let body: Value = router.get("alerts").await.expect("should fail over");

        assert_eq!(body, serde_json::json!({"ok": true}));
        assert_eq!(
            transport.resource_urls(),
            vec!["http://a/alerts".to_string(), "http://b/alerts".to_string()]
        );

        let backends = router.backends().await;
        assert!(!backends[0].is_healthy);
        assert_eq!(backends[0].last_failure.as_deref(), Some("rate limited (HTTP 429)"));
        assert!(backends[1].is_healthy);
        assert!(matches!(
            events.try_recv().unwrap(),
            RouterEvent::Switchover { to, .. } if to == "fallback"
        ));
    }

    #[tokio::test]
    async fn test_network_failure_on_every_backend_is_outage() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);

        let router = router_with(transport.clone());
        let mut events = router.events();
        let err = router.get::<Value>("/reports").await.unwrap_err();

        match err {
            RouterError::AllBackendsUnavailable {
                attempted,
                last_error,
            } => {
                assert_eq!(attempted, vec!["primary", "fallback"]);
                assert!(matches!(
                    last_error.as_deref(),
                    Some(RouterError::Transient { backend, .. }) if backend == "fallback"
                ));
            }
            other => panic!("expected outage, got {other:?}"),
        }
        assert!(matches!(events.try_recv().unwrap(), RouterEvent::Switchover { .. }));
        assert_eq!(events.try_recv().unwrap(), RouterEvent::AllBackendsDown);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/clients/9", Reply::Status(404, "not found".to_string()));

        let router = router_with(transport.clone());
        let err = router.get::<Value>("/clients/9").await.unwrap_err();

        assert!(matches!(err, RouterError::Http { status: 404, .. }));
        assert_eq!(transport.resource_urls().len(), 1);
        assert!(router.backends().await[0].is_healthy);
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/clients", Reply::ok("<html>oops</html>"));

        let router = router_with(transport.clone());
        let err = router.get::<Value>("/clients").await.unwrap_err();

        assert!(matches!(err, RouterError::MalformedResponse { .. }));
        assert_eq!(transport.resource_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_max_retries_bounds_attempts() {
        let transport = Arc::new(MockTransport::new());
        let backends = vec![
            BackendConfig::new("a", "http://a", 1),
            BackendConfig::new("b", "http://b", 2),
            BackendConfig::new("c", "http://c", 3),
        ];
        for host in ["a", "b", "c"] {
            transport.reply(&format!("http://{host}/health"), Reply::ok(""));
            transport.reply(&format!("http://{host}/x"), Reply::Status(502, String::new()));
        }
        let config = RouterConfig {
            max_retries: 1,
            ..RouterConfig::default()
        };
        let router = FailoverRouter::new(
            backends,
            config,
            transport.clone(),
            TokenStore::anonymous(),
        );

        let err = router.get::<Value>("x").await.unwrap_err();
        assert!(err.is_outage());
        assert_eq!(transport.resource_urls().len(), 2);
        assert!(router.backends().await[2].is_healthy);
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/clients/1", Reply::Status(204, String::new()));

        let router = router_with(transport.clone());
        let body: Value = router.delete("/clients/1").await.expect("delete should succeed");
        assert_eq!(body, Value::Null);
        assert_eq!(transport.requests().last().unwrap().method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_bearer_token_and_body_attached() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let tokens = TokenStore::with_path(temp_dir.path().join("auth_token"));
        tokens.write("secret-token").unwrap();

        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        transport.reply("http://a/clients", Reply::Status(201, "{\"id\":7}".to_string()));

        let router = FailoverRouter::new(
            two_backends(),
            RouterConfig::default(),
            transport.clone(),
            tokens,
        );
        let created: Value = router
            .post("/clients", serde_json::json!({"name": "Acme"}))
            .await
            .expect("post should succeed");

        assert_eq!(created["id"], 7);
        let sent = transport.requests().into_iter().last().unwrap();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.bearer_token.as_deref(), Some("secret-token"));
        assert_eq!(sent.body, Some(serde_json::json!({"name": "Acme"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_unhealthy_backend_is_reprobed_and_recovers() {
        let transport = Arc::new(MockTransport::new());
        transport.reply("http://a/health", Reply::Status(503, String::new()));
        transport.reply("http://b/health", Reply::ok(""));
        transport.reply("http://a/clients", Reply::ok("[]"));
        transport.reply("http://b/clients", Reply::ok("[]"));

        let router = router_with(transport.clone());
        let mut events = router.events();
        router.check_health().await;
        assert_eq!(router.current_backend().await.unwrap().name, "fallback");

        transport.reply("http://a/health", Reply::ok(""));
        tokio::time::advance(Duration::from_secs(31)).await;
        let _: Value = router.get("/clients").await.unwrap();

        assert_eq!(transport.resource_urls(), vec!["http://a/clients".to_string()]);
        assert!(matches!(events.try_recv().unwrap(), RouterEvent::Switchover { .. }));
        assert_eq!(
            events.try_recv().unwrap(),
            RouterEvent::Switchover {
                from: Some("fallback".to_string()),
                to: "primary".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_health_checks_stop_on_shutdown() {
        let transport = Arc::new(MockTransport::new());
        both_healthy(&transport);
        let router = router_with(transport.clone());

        router.spawn_health_checks();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.requests().len(), 2, "first check runs immediately");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.requests().len(), 4);

        router.shutdown();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_started_before_failure_does_not_restore_backend() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(
            "http://a/health",
            Reply::Delayed(Duration::from_millis(100), 200, String::new()),
        );
        transport.reply("http://b/health", Reply::ok(""));
        transport.reply("http://a/x", Reply::Status(429, String::new()));
        transport.reply("http://b/x", Reply::ok("{}"));

        let router = router_with(transport.clone());
        router.check_health().await;

        // The 429 lands while the second round of probes is in flight
        let (_, result) = tokio::join!(router.check_health(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            router.get::<Value>("x").await
        });
        result.expect("fallback should serve the request");

        let backends = router.backends().await;
        assert!(!backends[0].is_healthy, "429 must not be overwritten");
        assert_eq!(router.current_backend().await.unwrap().name, "fallback");

        // A probe issued after the failure may restore it
        router.check_health().await;
        assert!(router.backends().await[0].is_healthy);
        assert_eq!(router.current_backend().await.unwrap().name, "primary");
    }

    #[test]
    fn test_spawn_health_checks_outside_runtime_is_noop() {
        let router = router_with(Arc::new(MockTransport::new()));
        router.spawn_health_checks();
        assert!(router.inner.health_task.lock().unwrap().is_none());
    }
}
