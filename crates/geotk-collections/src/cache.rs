//! Cache keeping recent values strongly and older ones weakly.
//!
//! The `strong_capacity` most recently inserted or accessed values are owned
//! by the cache in LRU order. When a value falls off the strong layer it is
//! demoted to a weak reference: it stays retrievable for as long as some
//! other owner keeps it alive, and is promoted back to the strong layer when
//! it is read again.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lru::LruCache;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cleaner::{self, Purge};

/// Counters for cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from either layer
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    /// Values moved from the strong to the weak layer
    pub demotions: AtomicU64,
    /// Weak values read again and moved back to the strong layer
    pub promotions: AtomicU64,
}

impl CacheStats {
    /// Fraction of lookups that were hits.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

struct Layers<K, V> {
    strong: LruCache<K, Arc<V>>,
    weak: HashMap<K, Weak<V>>,
}

pub struct Cache<K, V> {
    layers: Mutex<Layers<K, V>>,
    strong_capacity: usize,
    stats: CacheStats,
}

impl<K: Eq + Hash, V> Cache<K, V> {
    pub fn new(strong_capacity: usize) -> Self {
        Self {
            layers: Mutex::new(Layers {
                strong: LruCache::unbounded(),
                weak: HashMap::new(),
            }),
            strong_capacity,
            stats: CacheStats::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Layers<K, V>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move least recently used strong values to the weak layer until the
    /// strong layer fits.
    fn demote_overflow(&self, layers: &mut Layers<K, V>) {
        while layers.strong.len() > self.strong_capacity {
            let Some((key, value)) = layers.strong.pop_lru() else {
                break;
            };
            layers.weak.insert(key, Arc::downgrade(&value));
            self.stats.demotions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.insert_arc(key, Arc::new(value))
    }

    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Arc<V> {
        let mut layers = self.lock();
        layers.weak.remove(&key);
        layers.strong.put(key, Arc::clone(&value));
        self.demote_overflow(&mut layers);
        value
    }

    /// Look `key` up in both layers. A live weak value is promoted.
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut layers = self.lock();
        if let Some(value) = layers.strong.get(key) {
            let value = Arc::clone(value);
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        let Some((key, weak)) = layers.weak.remove_entry(key) else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        match weak.upgrade() {
            Some(value) => {
                layers.strong.put(key, Arc::clone(&value));
                self.demote_overflow(&mut layers);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                self.stats.promotions.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cached value for `key`, or the one `create` builds when there is
    /// none.
    pub fn get_or_insert_with<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        match self.get(&key) {
            Some(value) => value,
            None => self.insert(key, create()),
        }
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut layers = self.lock();
        if let Some(value) = layers.strong.pop(key) {
            layers.weak.remove(key);
            return Some(value);
        }
        layers.weak.remove(key).and_then(|weak| weak.upgrade())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let layers = self.lock();
        layers.strong.contains(key)
            || layers
                .weak
                .get(key)
                .is_some_and(|weak| weak.strong_count() > 0)
    }

    pub fn strong_len(&self) -> usize {
        self.lock().strong.len()
    }

    /// Entries in the weak layer, dead ones included until purged.
    pub fn weak_len(&self) -> usize {
        self.lock().weak.len()
    }

    pub fn len(&self) -> usize {
        let layers = self.lock();
        layers.strong.len() + layers.weak.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn strong_capacity(&self) -> usize {
        self.strong_capacity
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn clear(&self) {
        let mut layers = self.lock();
        layers.strong.clear();
        layers.weak.clear();
    }
}

impl<K: Eq + Hash, V> Purge for Cache<K, V> {
    fn purge(&self) -> usize {
        let mut layers = self.lock();
        let before = layers.weak.len();
        layers.weak.retain(|_, value| value.strong_count() > 0);
        let removed = before - layers.weak.len();
        if removed > 0 {
            debug!(
                removed,
                strong = layers.strong.len(),
                weak = layers.weak.len(),
                "Dropped collected cache entries"
            );
        }
        removed
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + Sync + 'static,
{
    /// Purge the weak layer of `cache` every `period` until it is dropped.
    pub fn spawn_cleaner(cache: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        cleaner::spawn_cleaner(cache, period)
    }
}
