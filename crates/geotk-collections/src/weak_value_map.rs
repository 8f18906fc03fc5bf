//! Hash map whose values are weak references.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cleaner::{self, Purge};

/// Maps keys to values owned elsewhere.
///
/// An entry stays readable while any `Arc` to its value is alive. Dead
/// entries are invisible to lookups and are removed by [`purge`](Self::purge),
/// either on demand or from a background cleaner.
pub struct WeakValueHashMap<K, V> {
    entries: Mutex<HashMap<K, Weak<V>>>,
}

impl<K, V> Default for WeakValueHashMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V> WeakValueHashMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Weak<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a weak reference to `value` and hand the strong one back.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.insert_arc(key, Arc::new(value))
    }

    /// Like [`insert`](Self::insert) for a value that is already shared.
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Arc<V> {
        self.lock().insert(key, Arc::downgrade(&value));
        value
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().get(key).and_then(Weak::upgrade)
    }

    /// Live value for `key`, or the one `create` builds when there is none.
    pub fn get_or_insert_with<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        let mut entries = self.lock();
        if let Some(value) = entries.get(&key).and_then(Weak::upgrade) {
            return value;
        }
        let value = Arc::new(create());
        entries.insert(key, Arc::downgrade(&value));
        value
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().remove(key).and_then(|weak| weak.upgrade())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Number of entries, dead ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<K: Eq + Hash, V> Purge for WeakValueHashMap<K, V> {
    fn purge(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, value| value.strong_count() > 0);
        before - entries.len()
    }
}

impl<K, V> WeakValueHashMap<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + Sync + 'static,
{
    /// Purge `map` every `period` until it is dropped.
    pub fn spawn_cleaner(map: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        cleaner::spawn_cleaner(map, period)
    }
}
