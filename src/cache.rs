use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use lru::LruCache;

/// Capacity of the dataset and query caches.
pub const DEFAULT_CAPACITY: usize = 10;

/// Cumulative lookup counters, for tests and observability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

type Slot<V, E> = Arc<OnceLock<Result<Arc<V>, E>>>;

/// A capacity-bounded memo cache with at-most-once fallible computation.
///
/// Lookups hold the map lock only long enough to find or insert the entry's
/// slot; the computation itself runs outside it, so a slow key never blocks
/// lookups for other keys. Concurrent requests for the same unpopulated key
/// rendezvous on the slot's `OnceLock`: one computes, the rest wait and
/// share the outcome. Failed computations are evicted immediately so an
/// error is never served warm, while successful values stay until LRU
/// eviction.
pub struct MemoCache<K, V, E> {
    inner: Mutex<LruCache<K, Slot<V, E>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V, E> MemoCache<K, V, E>
where
    K: Hash + Eq + Clone,
    E: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_compute<F>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = {
            let mut cache = self.inner.lock().expect("memo cache mutex poisoned");
            match cache.get(&key) {
                Some(slot) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Arc::clone(slot)
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let slot: Slot<V, E> = Arc::new(OnceLock::new());
                    cache.put(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        let result = slot.get_or_init(|| compute().map(Arc::new)).clone();
        if result.is_err() {
            let mut cache = self.inner.lock().expect("memo cache mutex poisoned");
            // Only drop the slot we populated; a fresh retry may already be
            // in flight under the same key.
            if cache.peek(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                cache.pop(&key);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("memo cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    type TestCache = MemoCache<String, u64, String>;

    #[test]
    fn test_second_lookup_skips_compute() {
        let cache = TestCache::new(4);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };
        let first = cache.get_or_compute("k".to_string(), compute).unwrap();
        let second = cache.get_or_compute("k".to_string(), compute).unwrap();
        assert_eq!(*first, 7);
        assert_eq!(*second, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_error_not_cached() {
        let cache = TestCache::new(4);
        let err = cache
            .get_or_compute("k".to_string(), || Err("boom".to_string()))
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
        // The retry recomputes and succeeds.
        let value = cache.get_or_compute("k".to_string(), || Ok(3)).unwrap();
        assert_eq!(*value, 3);
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let cache = TestCache::new(2);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache
                .get_or_compute(key.to_string(), || Ok(i as u64))
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
        let calls = AtomicUsize::new(0);
        cache
            .get_or_compute("a".to_string(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "a was evicted");
    }

    #[test]
    fn test_concurrent_same_key_computes_once() {
        let cache = Arc::new(TestCache::new(4));
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    let value = cache
                        .get_or_compute("shared".to_string(), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            Ok(42)
                        })
                        .unwrap();
                    assert_eq!(*value, 42);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
