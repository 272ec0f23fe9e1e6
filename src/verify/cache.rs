//! In-memory result cache for verification outcomes.
//!
//! Avoids redundant network calls when the same identifier is checked more
//! than once within a run (the same link cited on several pages, the same DOI
//! appearing across documents). Entries expire passively: staleness is checked
//! on read and expired entries are dropped, no background sweep runs.
//!
//! The composite [`get_or_compute`](ResultCache::get_or_compute) is what the
//! engines actually use: it guarantees the compute closure runs at most once
//! even when many workers ask for the same key at the same time (single
//! flight), while the closure itself runs outside any map lock so unrelated
//! keys never wait on each other's network calls.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// A value with its expiry stamp.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe in-memory cache keyed by identifier.
///
/// Values are returned by clone; no reference into the cache's internal state
/// ever escapes, so callers can hold results for as long as they like without
/// pinning a map shard.
pub struct ResultCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    /// Per-key in-flight computation locks.
    /// Uses Arc so the lock can be cloned out and the `DashMap` shard released
    /// before awaiting (never hold a shard lock across an await point).
    flights: DashMap<String, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResultCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            flights: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of cache hits since creation.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses since creation.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of entries currently in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> ResultCache<V> {
    /// Looks up an unexpired value for the given key.
    ///
    /// Returns `Some(value)` on cache hit (within TTL), `None` on miss.
    /// Expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = match self.entries.get(key) {
            Some(e) => e,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if entry.expires_at <= Instant::now() {
            // Expired - remove and treat as miss
            drop(entry);
            self.entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key, "cache entry expired");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Stores a value under the given key, stamped to expire after `ttl`.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// Under concurrent callers requesting the same key, `compute` is invoked
    /// at most once; the other callers wait for the winner and receive the
    /// stored value. Callers for different keys never wait on each other, and
    /// `compute` runs without any cache-internal lock held beyond the per-key
    /// flight lock itself.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        // Register (or join) the in-flight computation for this key.
        // Clone the Arc out so the DashMap shard lock is released before awaiting.
        let flight = self
            .flights
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = flight.lock().await;

        // A concurrent caller may have finished the computation while we
        // waited for the flight lock.
        if let Some(value) = self.get(key) {
            return value;
        }

        debug!(key, "cache miss - computing");
        let value = compute().await;
        self.put(key, value.clone(), ttl);

        // Waiters still queued on this flight hold their own Arc; they will
        // re-check the cache and hit. Fresh callers hit the cache directly.
        self.flights.remove(key);

        value
    }
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
