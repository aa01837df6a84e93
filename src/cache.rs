use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::constants::cache::{DEFAULT_TTL, KEY_SEPARATOR};
use crate::types::OperationName;

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Shared clones observe the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache key: operation name plus serialized parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for an operation without parameters, e.g. `constructions:`.
    pub fn bare(operation: impl Into<OperationName>) -> Self {
        Self(format!("{}{}", operation.into(), KEY_SEPARATOR))
    }

    /// Key for an operation with serialized `params`.
    ///
    /// Params that fail to serialize fall back to their debug form so a key
    /// is always produced.
    pub fn new<P>(operation: impl Into<OperationName>, params: &P) -> Self
    where
        P: Serialize + fmt::Debug,
    {
        let serialized = serde_json::to_string(params).unwrap_or_else(|_| format!("{params:?}"));
        Self(format!("{}{}{}", operation.into(), KEY_SEPARATOR, serialized))
    }

    /// Raw key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hit/miss counters since the cache was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a live entry.
    pub hits: u64,
    /// Lookups that invoked the producer.
    pub misses: u64,
}

/// Internal cache entry plus the instant it was written.
struct CacheEntry<V> {
    payload: V,
    stored_at: Instant,
}

/// Internal mutable cache storage behind the `TtlCache` lock.
struct TtlCacheInner<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    stats: CacheStats,
}

/// Short-lived memoization of backend reads.
///
/// Entries are valid strictly while `now - stored_at < ttl`. There is no
/// eviction besides lazy expiry on read, and no in-flight de-duplication:
/// two callers missing the same key both run their producer and the last
/// write wins. The lock is never held while a producer runs.
pub struct TtlCache<V> {
    inner: Arc<Mutex<TtlCacheInner<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    /// Cache with the default one-minute TTL and the system clock.
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_TTL, Arc::new(SystemClock))
    }

    /// Cache with an explicit TTL and clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TtlCacheInner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            })),
            ttl,
            clock,
        }
    }

    // A panicking producer never runs under the lock, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, TtlCacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live payload for `key`, or run `producer` and store its result.
    ///
    /// Producer errors are returned unchanged and leave the cache untouched.
    pub fn get_or_fetch<E, F>(&self, key: &CacheKey, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let now = self.clock.now();
        {
            let mut inner = self.lock();
            let live = inner
                .entries
                .get(key)
                .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
                .map(|entry| entry.payload.clone());
            if let Some(payload) = live {
                inner.stats.hits = inner.stats.hits.saturating_add(1);
                debug!(key = %key, "cache hit");
                return Ok(payload);
            }
            inner.stats.misses = inner.stats.misses.saturating_add(1);
        }

        debug!(key = %key, "cache miss, invoking producer");
        let payload = producer()?;
        let stored_at = self.clock.now();
        let mut inner = self.lock();
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                payload: payload.clone(),
                stored_at,
            },
        );
        Ok(payload)
    }

    /// Live payload for `key` without invoking anything.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.payload.clone())
    }

    /// Remove every entry, live or expired.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet overwritten.
    pub fn len(&self) -> usize {
        let inner = self.lock();
        inner.entries.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        inner.stats
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
