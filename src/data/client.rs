//! Caching data client
//!
//! `DataClient` is the single entry point UI code uses to read
//! collections. A fetch is served from the cache while the entry is fresh;
//! otherwise the records are loaded from the `RecordSource`, run through
//! the query pipeline, cached, and pushed to the endpoint's subscribers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::query::{cache_key, process};
use super::source::RecordSource;
use super::{DataResponse, QueryParams};
use crate::cache::{CacheManager, CacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::refresh::{RefreshConfig, RefreshTask};
use crate::router::RouterError;

/// Subscriber callback; identity is the `Arc` allocation
pub type Callback = Arc<dyn Fn(&DataResponse) + Send + Sync>;

/// Configuration for a `DataClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataClientConfig {
    pub cache_ttl: Duration,
    pub max_cache_entries: usize,
    pub refresh: RefreshConfig,
}

impl Default for DataClientConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            max_cache_entries: DEFAULT_MAX_ENTRIES,
            refresh: RefreshConfig::default(),
        }
    }
}

/// Subscribers of one endpoint plus its auto-refresh timer
struct EndpointSubscribers {
    /// In subscription order
    callbacks: Vec<(u64, Callback)>,
    refresh: Option<RefreshTask>,
}

struct ClientInner {
    source: Arc<dyn RecordSource>,
    config: DataClientConfig,
    cache: Mutex<CacheManager<DataResponse>>,
    subscribers: Mutex<HashMap<String, EndpointSubscribers>>,
    next_id: AtomicU64,
}

impl ClientInner {
    fn cache(&self) -> MutexGuard<'_, CacheManager<DataResponse>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<String, EndpointSubscribers>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes one callback; the endpoint's timer stops with its last subscriber
    fn remove_subscriber(&self, endpoint: &str, id: u64) {
        let removed = {
            let mut subscribers = self.subscribers();
            let Some(entry) = subscribers.get_mut(endpoint) else {
                return;
            };
            entry.callbacks.retain(|(existing, _)| *existing != id);
            if entry.callbacks.is_empty() {
                subscribers.remove(endpoint)
            } else {
                None
            }
        };

        if removed.is_some() {
            debug!(endpoint, "last subscriber left, auto-refresh stopped");
        }
        // `removed` drops here, outside the lock, aborting its timer
    }
}

/// Caching, filtering, paginating client with live-update subscriptions
///
/// Cheap to clone; clones share the cache and subscriptions.
#[derive(Clone)]
pub struct DataClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for DataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl DataClient {
    pub fn new(source: Arc<dyn RecordSource>, config: DataClientConfig) -> Self {
        let cache = CacheManager::new(config.cache_ttl, config.max_cache_entries);
        Self {
            inner: Arc::new(ClientInner {
                source,
                config,
                cache: Mutex::new(cache),
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &DataClientConfig {
        &self.inner.config
    }

    /// Returns one processed page of `endpoint`
    ///
    /// A fresh cache entry is returned without touching the network. On a
    /// miss the source error, if any, is returned unchanged and nothing is
    /// cached.
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<DataResponse, RouterError> {
        let key = cache_key(endpoint, params);
        let cached = self.inner.cache().read(&key);
        if let Some(cached) = cached {
            debug!(key = %key, "cache hit");
            return Ok(cached);
        }

        debug!(key = %key, "cache miss");
        self.load(endpoint, params, key).await
    }

    /// Like `fetch` but always goes to the source
    pub async fn refresh(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<DataResponse, RouterError> {
        let key = cache_key(endpoint, params);
        self.load(endpoint, params, key).await
    }

    async fn load(
        &self,
        endpoint: &str,
        params: &QueryParams,
        key: String,
    ) -> Result<DataResponse, RouterError> {
        let records = self.inner.source.fetch_records(endpoint).await?;
        let response = process(records, params);

        {
            let mut cache = self.inner.cache();
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, "dropped expired cache entries");
            }
            cache.write(&key, response.clone());
        }
        self.notify(endpoint, &response);

        Ok(response)
    }

    /// Delivers `response` to the endpoint's subscribers in subscription order
    fn notify(&self, endpoint: &str, response: &DataResponse) {
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers()
            .get(endpoint)
            .map(|entry| entry.callbacks.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(response))).is_err() {
                error!(endpoint, "subscriber callback panicked");
            }
        }
    }

    /// Registers `callback` for updates of `endpoint`
    ///
    /// Registering the same callback twice keeps a single registration.
    /// The first subscriber of an endpoint starts its auto-refresh timer
    /// when live updates are enabled; without a Tokio runtime no timer is
    /// started. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, endpoint: &str, callback: Callback) -> Subscription {
        let mut subscribers = self.inner.subscribers();
        let entry = subscribers
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointSubscribers {
                callbacks: Vec::new(),
                refresh: None,
            });

        let existing = entry
            .callbacks
            .iter()
            .find(|(_, cb)| same_callback(cb, &callback))
            .map(|(id, _)| *id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                entry.callbacks.push((id, callback));
                id
            }
        };

        if entry.refresh.is_none() && self.inner.config.refresh.enabled {
            entry.refresh = self.start_auto_refresh(endpoint);
        }

        Subscription {
            client: Arc::downgrade(&self.inner),
            endpoint: endpoint.to_string(),
            id,
        }
    }

    /// Subscribes with a channel instead of a callback
    pub fn watch(&self, endpoint: &str) -> (Subscription, mpsc::UnboundedReceiver<DataResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: Callback = Arc::new(move |response: &DataResponse| {
            // Receiver gone means the watcher stopped listening
            let _ = tx.send(response.clone());
        });
        (self.subscribe(endpoint, callback), rx)
    }

    fn start_auto_refresh(&self, endpoint: &str) -> Option<RefreshTask> {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(endpoint, "no async runtime, auto-refresh disabled for subscription");
            return None;
        }

        let weak = Arc::downgrade(&self.inner);
        let endpoint = endpoint.to_string();
        debug!(endpoint = %endpoint, "starting auto-refresh");

        Some(RefreshTask::spawn(
            self.inner.config.refresh.interval,
            move || {
                let weak = weak.clone();
                let endpoint = endpoint.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return false;
                    };
                    let client = DataClient { inner };
                    if let Err(err) = client.refresh(&endpoint, &QueryParams::default()).await {
                        warn!(endpoint = %endpoint, error = %err, "auto-refresh failed");
                    }
                    true
                }
            },
        ))
    }

    /// Number of callbacks registered for `endpoint`
    pub fn subscriber_count(&self, endpoint: &str) -> usize {
        self.inner
            .subscribers()
            .get(endpoint)
            .map_or(0, |entry| entry.callbacks.len())
    }

    /// Whether `endpoint` currently has a running auto-refresh timer
    pub fn is_auto_refreshing(&self, endpoint: &str) -> bool {
        self.inner
            .subscribers()
            .get(endpoint)
            .and_then(|entry| entry.refresh.as_ref())
            .is_some_and(|task| !task.is_finished())
    }

    /// Drops cached entries for `endpoint`, or everything when `None`
    ///
    /// Subscriptions and timers are not affected.
    pub fn clear_cache(&self, endpoint: Option<&str>) {
        let mut cache = self.inner.cache();
        match endpoint {
            Some(endpoint) => {
                let removed = cache.remove_prefix(&format!("{endpoint}:"));
                debug!(endpoint, removed, "cleared endpoint cache");
            }
            None => cache.clear(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache().stats()
    }

    /// Clears the cache and drops every subscription and timer
    pub fn destroy(&self) {
        self.inner.cache().clear();
        let subscribers = std::mem::take(&mut *self.inner.subscribers());
        drop(subscribers);
    }
}

fn same_callback(a: &Callback, b: &Callback) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Live-update registration; unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    client: Weak<ClientInner>,
    endpoint: String,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Removes exactly this callback
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.client.upgrade() {
            inner.remove_subscriber(&self.endpoint, self.id);
        }
    }
}
