//! In-memory cache manager with TTL expiry and an insertion-order bound
//!
//! Provides a `CacheManager` that stores processed responses keyed by
//! request, expiring them after a configurable TTL.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

/// Default time-to-live for cache entries (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default maximum number of cached entries
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Wrapper struct for a cached value
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    inserted_at: Instant,
    /// How long the entry stays valid
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

/// Hit/miss counters and current size of a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Manages reading and writing cached data in memory
///
/// Entries are valid while `now - inserted_at < ttl`; stale entries are
/// removed as soon as a read observes them. When the cache is full the
/// entry inserted longest ago is evicted to admit a new key. Reads do not
/// affect eviction order, so this is a FIFO bound and not an LRU.
#[derive(Debug)]
pub struct CacheManager<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    default_ttl: Duration,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<T: Clone> Default for CacheManager<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl<T: Clone> CacheManager<T> {
    /// Creates a new CacheManager
    ///
    /// A `max_entries` of zero is treated as one so that a fresh write is
    /// always readable.
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            default_ttl,
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Writes data under `key` with the default TTL
    pub fn write(&mut self, key: &str, data: T) {
        let ttl = self.default_ttl;
        self.write_with_ttl(key, data, ttl);
    }

    /// Writes data under `key` with an explicit TTL
    ///
    /// Overwriting an existing key keeps its original insertion slot.
    pub fn write_with_ttl(&mut self, key: &str, data: T, ttl: Duration) {
        let entry = CacheEntry {
            data,
            inserted_at: Instant::now(),
            ttl,
        };

        if let Some(existing) = self.entries.get_mut(key) {
            *existing = entry;
            return;
        }

        while self.entries.len() >= self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.to_string());
        self.entries.insert(key.to_string(), entry);
    }

    /// Reads a valid entry from the cache
    ///
    /// Returns `None` if the entry doesn't exist or has expired. Expired
    /// entries are evicted on the way out.
    pub fn read(&mut self, key: &str) -> Option<T> {
        let now = Instant::now();
        let valid = match self.entries.get(key) {
            Some(entry) => entry.is_valid(now),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if !valid {
            self.remove(key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Removes a single key
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Removes every key starting with `prefix`, returning how many were dropped
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        self.order.retain(|k| !k.starts_with(prefix));
        before - self.entries.len()
    }

    /// Removes everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Drops all expired entries
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid(now));
        let entries = &self.entries;
        self.order.retain(|k| entries.contains_key(k));
        before - self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
