//! Process-local TTL caches.
//!
//! Bounded LRU with a per-entry time-to-live. Reads may be stale up to the
//! TTL; writers that learn fresher state overwrite through `insert`.

use std::{
    hash::Hash,
    num::NonZeroUsize,
    sync::Mutex,
    time::Duration,
};

use lru::LruCache;
use winc_common::time::TimestampMs;

pub const DEFAULT_CAPACITY: usize = 10_000;

pub struct TtlCache<K, V> {
    inner: Mutex<LruCache<K, (TimestampMs, V)>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &K, now: TimestampMs) -> Option<V> {
        let mut cache = self.inner.lock().expect("cache mutex poisoned");
        match cache.get(key) {
            Some((inserted_at, value))
                if now.saturating_duration_since(*inserted_at) < self.ttl =>
            {
                Some(value.clone())
            }
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V, now: TimestampMs) {
        let mut cache = self.inner.lock().expect("cache mutex poisoned");
        cache.put(key, (now, value));
    }

    pub fn invalidate(&self, key: &K) {
        let mut cache = self.inner.lock().expect("cache mutex poisoned");
        cache.pop(key);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::new(10, Duration::from_secs(60));
        let t0 = TimestampMs::from_millis(1_000).unwrap();
        cache.insert("key", 42, t0);

        assert_eq!(cache.get(&"key", t0), Some(42));
        let just_before = t0 + Duration::from_secs(59);
        assert_eq!(cache.get(&"key", just_before), Some(42));
        let after = t0 + Duration::from_secs(60);
        assert_eq!(cache.get(&"key", after), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        let t0 = TimestampMs::from_millis(1_000).unwrap();
        cache.insert(1, "a", t0);
        cache.insert(2, "b", t0);
        cache.insert(3, "c", t0);
        // 1 was least recently used and got evicted.
        assert_eq!(cache.get(&1, t0), None);
        assert_eq!(cache.get(&2, t0), Some("b"));
        assert_eq!(cache.get(&3, t0), Some("c"));
    }

    #[test]
    fn invalidate_on_write_through() {
        let cache = TtlCache::new(10, Duration::from_secs(60));
        let t0 = TimestampMs::from_millis(1_000).unwrap();
        cache.insert("key", 1, t0);
        cache.invalidate(&"key");
        assert_eq!(cache.get(&"key", t0), None);
    }
}
