//! Generic caching infrastructure backing the LibraryDoc provider (§4.2).
//!
//! The cache is process-wide but explicitly owned and constructed (§9
//! "Global library cache" — an explicit store passed in at construction,
//! never a hidden singleton) so tests and multi-workspace hosts can each
//! have their own isolated instance. Reads are lock-free via `DashMap`;
//! writes to a given key are naturally serialized by `DashMap`'s per-shard
//! locking, matching §5's "writes... serialized per cache key".

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Opaque owner token recorded alongside a cache entry so the provider can
/// garbage-collect entries whose owners have all gone away (§4.2). Callers
/// obtain one from [`SentinelRegistry::next`] per subscriber (typically:
/// once per `Import` node being resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sentinel(u64);

#[derive(Debug, Default)]
pub struct SentinelRegistry {
    counter: AtomicU64,
}

impl SentinelRegistry {
    pub fn next(&self) -> Sentinel {
        Sentinel(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// A process-wide, keyed cache with change notification and sentinel-based
/// garbage collection.
///
/// `K` is the resolved cache key (per §4.2: a pure function of
/// `(kind, resolved_absolute_source, args)`), `V` the cached value.
pub struct FingerprintCache<K, V> {
    entries: DashMap<K, Arc<V>>,
    sentinels: DashMap<K, Vec<Sentinel>>,
    changed: broadcast::Sender<K>,
}

impl<K, V> Default for FingerprintCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FingerprintCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (changed, _) = broadcast::channel(256);
        Self {
            entries: DashMap::new(),
            sentinels: DashMap::new(),
            changed,
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|e| Arc::clone(&e))
    }

    /// Returns the cached value for `key`, computing and inserting it with
    /// `fetch` on a miss. `owner` is recorded so [`Self::collect_garbage`]
    /// can later drop entries whose every owner has unsubscribed.
    pub fn get_or_fetch(&self, key: K, owner: Sentinel, fetch: impl FnOnce() -> V) -> Arc<V> {
        self.sentinels.entry(key.clone()).or_default().push(owner);

        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(&existing);
        }

        let value = Arc::new(fetch());
        self.entries.insert(key.clone(), Arc::clone(&value));
        value
    }

    /// Drops the entry for `key` and notifies subscribers. Idempotent.
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
        self.sentinels.remove(key);
        let _ = self.changed.send(key.clone());
    }

    /// Drops every entry whose key matches `predicate`, notifying
    /// subscribers for each. Used for the resource/variables invalidation
    /// asymmetry (§9 Open Question b): resources invalidate by source path
    /// alone, so the predicate there ignores args/alias.
    pub fn invalidate_matching(&self, mut predicate: impl FnMut(&K) -> bool) {
        let keys: Vec<K> = self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| predicate(k))
            .collect();
        for key in keys {
            self.invalidate(&key);
        }
    }

    /// Drops every cached entry whose recorded owner set is now disjoint
    /// from `live_owners` (§4.2 "drop entries whose sentinels are all
    /// gone").
    pub fn collect_garbage(&self, live_owners: &[Sentinel]) {
        let dead: Vec<K> = self
            .sentinels
            .iter()
            .filter(|e| e.value().iter().all(|s| !live_owners.contains(s)))
            .map(|e| e.key().clone())
            .collect();
        for key in dead {
            self.entries.remove(&key);
            self.sentinels.remove(&key);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<K> {
        self.changed.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_fetch_computes_once_per_key() {
        let cache: FingerprintCache<String, u32> = FingerprintCache::new();
        let registry = SentinelRegistry::default();
        let owner = registry.next();

        let calls = std::sync::atomic::AtomicU32::new(0);
        let v1 = cache.get_or_fetch("a".to_string(), owner, || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        });
        let v2 = cache.get_or_fetch("a".to_string(), owner, || {
            calls.fetch_add(1, Ordering::SeqCst);
            99
        });

        assert_eq!(*v1, 42);
        assert_eq!(*v2, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_recompute_and_notifies() {
        let cache: FingerprintCache<String, u32> = FingerprintCache::new();
        let registry = SentinelRegistry::default();
        let owner = registry.next();
        let mut rx = cache.subscribe();

        cache.get_or_fetch("a".to_string(), owner, || 1);
        cache.invalidate(&"a".to_string());
        assert_eq!(rx.try_recv().unwrap(), "a");

        let v = cache.get_or_fetch("a".to_string(), owner, || 2);
        assert_eq!(*v, 2);
    }

    #[test]
    fn collect_garbage_drops_entries_with_no_live_owner() {
        let cache: FingerprintCache<String, u32> = FingerprintCache::new();
        let registry = SentinelRegistry::default();
        let owner = registry.next();

        cache.get_or_fetch("a".to_string(), owner, || 1);
        assert_eq!(cache.len(), 1);

        cache.collect_garbage(&[]);
        assert_eq!(cache.len(), 0);
    }
}
