//! Routing decision cache
//!
//! Normalized query -> prior RoutingDecision. Lookups return the stored
//! decision unchanged and never re-validate staleness; TTL and capacity
//! pruning run at insert time. Concurrent misses for the same key may both
//! classify and both write; decisions for identical normalized queries are
//! idempotent in content, so last write wins.

use crate::routing::RoutingDecision;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached routing decision with its creation time
#[derive(Debug, Clone)]
struct CacheEntry {
    decision: RoutingDecision,
    created_at: Instant,
}

/// Shared routing cache
pub struct RoutingCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl RoutingCache {
    /// Create a cache with the given entry lifetime and capacity
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Look up a normalized query
    ///
    /// A hit returns the full stored decision unchanged.
    pub fn get(&self, normalized_query: &str) -> Option<RoutingDecision> {
        let entries = self.entries.lock().ok()?;
        entries.get(normalized_query).map(|e| e.decision.clone())
    }

    /// Store a decision under its normalized query
    ///
    /// Expired entries are pruned first; if the cache is still full, the
    /// oldest entry is evicted.
    pub fn insert(&self, normalized_query: String, decision: RoutingDecision) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        let ttl = self.ttl;
        entries.retain(|_, e| e.created_at.elapsed() <= ttl);

        if entries.len() >= self.capacity && !entries.contains_key(&normalized_query) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            normalized_query,
            CacheEntry {
                decision,
                created_at: Instant::now(),
            },
        );
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
