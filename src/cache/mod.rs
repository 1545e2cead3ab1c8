//! Cache module for storing processed API responses in memory
//!
//! This module provides a cache manager that keeps responses for a
//! configurable TTL (time-to-live) and bounds the number of entries by
//! evicting the oldest insertion first. Stale entries are never returned.

mod manager;

pub use manager::{CacheManager, CacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
