//! CachingLoader: a thread-safe, time- and freshness-aware entity cache.
//!
//! A cached entry is served until its lifetime runs out. After that, the
//! base loader is asked when the resource last changed: if the answer is
//! known and not newer than the entry's load time, the entry is kept and its
//! expiry pushed forward; otherwise the entity is loaded again.
//!
//! Loads are serialized per key. Any number of threads asking for the same
//! missing or stale key cause exactly one base load, and all of them get
//! the same `Arc`. Hits never wait on a load.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use loadstone_source::{check_key, Result};

use crate::clock::{Clock, SystemClock};
use crate::loader::{short_type_name, EntityLoader};

/// Settings for a [`CachingLoader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry stays fresh, in milliseconds. Zero or negative
    /// means entries never expire.
    pub lifetime_ms: i64,
    /// Name used in logs. Defaults to the cache type name.
    pub name: Option<String>,
}

impl CacheConfig {
    pub fn with_lifetime_ms(lifetime_ms: i64) -> Self {
        Self {
            lifetime_ms,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The lifetime as a duration, `None` when entries never expire.
    pub fn lifetime(&self) -> Option<Duration> {
        (self.lifetime_ms > 0).then(|| Duration::milliseconds(self.lifetime_ms))
    }
}

/// One cached artifact. Entries are never mutated, only replaced.
#[derive(Debug)]
pub struct CacheEntry<T> {
    artifact: Arc<T>,
    loaded_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    fn new(artifact: Arc<T>, loaded_at: DateTime<Utc>, lifetime: Option<Duration>) -> Self {
        Self {
            artifact,
            loaded_at,
            expires_at: lifetime.map(|l| loaded_at + l),
        }
    }

    /// Same artifact and load time, new expiry.
    fn extended(&self, now: DateTime<Utc>, lifetime: Option<Duration>) -> Self {
        Self {
            artifact: Arc::clone(&self.artifact),
            loaded_at: self.loaded_at,
            expires_at: lifetime.map(|l| now + l),
        }
    }

    pub fn artifact(&self) -> &Arc<T> {
        &self.artifact
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// `None` for entries that never expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| now <= expires)
    }
}

/// A snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a fresh entry.
    pub hits: u64,
    /// Base loads that succeeded.
    pub loads: u64,
    /// Expired entries kept because the resource had not changed.
    pub revalidations: u64,
    /// Base loads that failed.
    pub failures: u64,
}

impl CacheStats {
    /// Fraction of requests answered without a base load.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.revalidations;
        let total = served + self.loads + self.failures;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    loads: AtomicU64,
    revalidations: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

type Gate = Arc<Mutex<()>>;

/// Caches the entities produced by a base [`EntityLoader`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_entity::{CachingLoader, EntityLoader, SourceLoader, TextDecoder};
/// use loadstone_source::MemorySource;
///
/// let source = Arc::new(MemorySource::new("mem"));
/// source.insert("greeting", "hello");
///
/// let cache = CachingLoader::new(60_000, SourceLoader::new(source, TextDecoder));
/// let first = cache.load("greeting").unwrap();
/// let second = cache.load("greeting").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct CachingLoader<L: EntityLoader> {
    name: String,
    lifetime_ms: i64,
    lifetime: Option<Duration>,
    base: L,
    clock: Arc<dyn Clock>,
    table: RwLock<HashMap<String, Arc<CacheEntry<L::Entity>>>>,
    gates: Mutex<HashMap<String, Gate>>,
    counters: Counters,
}

impl<L: EntityLoader> CachingLoader<L> {
    /// Cache `base` with the given lifetime in milliseconds (≤ 0: forever).
    pub fn new(lifetime_ms: i64, base: L) -> Self {
        Self::with_config(CacheConfig::with_lifetime_ms(lifetime_ms), base)
    }

    pub fn with_config(config: CacheConfig, base: L) -> Self {
        let name = config
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| short_type_name::<Self>().to_string());

        tracing::info!(
            cache = %name,
            lifetime_ms = config.lifetime_ms,
            loader = %base.name(),
            "entity cache created"
        );

        Self {
            name,
            lifetime_ms: config.lifetime_ms,
            lifetime: config.lifetime(),
            base,
            clock: Arc::new(SystemClock),
            table: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime_ms(&self) -> i64 {
        self.lifetime_ms
    }

    pub fn base(&self) -> &L {
        &self.base
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// The current entry for `key`, fresh or not.
    pub fn entry(&self, key: &str) -> Option<Arc<CacheEntry<L::Entity>>> {
        self.read_table().get(key).cloned()
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.write_table().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.write_table().clear();
    }

    pub fn len(&self) -> usize {
        self.read_table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_table(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<CacheEntry<L::Entity>>>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<CacheEntry<L::Entity>>>> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve `key` from the table if its entry is fresh, or stale but
    /// confirmed unchanged. `None` means a base load is needed.
    fn lookup(&self, key: &str) -> Option<Arc<L::Entity>> {
        let entry = self.read_table().get(key).cloned()?;
        let now = self.clock.now();
        if entry.is_fresh(now) {
            Counters::bump(&self.counters.hits);
            return Some(Arc::clone(&entry.artifact));
        }

        let modified = self.base.last_modified(key)?;
        if modified > entry.loaded_at {
            return None;
        }

        let extended = Arc::new(entry.extended(now, self.lifetime));
        {
            let mut table = self.write_table();
            // Only replace what we inspected; a concurrent reload wins.
            if table.get(key).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
                table.insert(key.to_string(), extended);
            }
        }

        Counters::bump(&self.counters.revalidations);
        tracing::trace!(cache = %self.name, key, "unchanged, expiry extended");
        Some(Arc::clone(&entry.artifact))
    }

    fn reload(&self, key: &str) -> Result<Arc<L::Entity>> {
        let replacing = self.read_table().contains_key(key);

        match self.base.load(key) {
            Ok(entity) => {
                let entry = Arc::new(CacheEntry::new(
                    Arc::new(entity),
                    self.clock.now(),
                    self.lifetime,
                ));
                let artifact = Arc::clone(&entry.artifact);
                self.write_table().insert(key.to_string(), entry);
                Counters::bump(&self.counters.loads);

                if replacing {
                    tracing::info!(cache = %self.name, key, "reloaded");
                } else {
                    tracing::debug!(cache = %self.name, key, "loaded");
                }
                Ok(artifact)
            }
            Err(e) => {
                Counters::bump(&self.counters.failures);
                tracing::warn!(cache = %self.name, key, error = %e, "load failed");
                Err(e)
            }
        }
    }

    fn acquire_gate(&self, key: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(gates.entry(key.to_string()).or_default())
    }

    fn release_gate(&self, key: &str, gate: Gate) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this caller are the only holders: nobody is waiting.
        let idle = gates
            .get(key)
            .is_some_and(|g| Arc::ptr_eq(g, &gate) && Arc::strong_count(&gate) == 2);
        if idle {
            gates.remove(key);
        }
    }
}

impl<L> EntityLoader for CachingLoader<L>
where
    L: EntityLoader,
    L::Entity: Send + Sync,
{
    type Entity = Arc<L::Entity>;

    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.base.effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.base.last_modified(key)
    }

    fn load(&self, key: &str) -> Result<Arc<L::Entity>> {
        check_key("resource key", key)?;

        if let Some(artifact) = self.lookup(key) {
            return Ok(artifact);
        }

        let gate = self.acquire_gate(key);
        let result = {
            let _guard = gate.lock().unwrap_or_else(|e| e.into_inner());
            match self.lookup(key) {
                Some(artifact) => Ok(artifact),
                None => self.reload(key),
            }
        };
        self.release_gate(key, gate);
        result
    }
}

impl<L: EntityLoader> std::fmt::Debug for CachingLoader<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingLoader")
            .field("name", &self.name)
            .field("lifetime_ms", &self.lifetime_ms)
            .field("loader", &self.base.name())
            .field("entries", &self.len())
            .finish()
    }
}
