//! Background purging of weak entries.

use std::sync::Arc;
use std::time::Duration;

use geotk_collections::{Cache, Purge, WeakValueHashMap};

async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    done()
}

#[tokio::test]
async fn test_weak_map_cleaner_drops_dead_entries() {
    let map = Arc::new(WeakValueHashMap::new());
    let kept = map.insert("EPSG:4326", "WGS 84".to_string());
    map.insert("EPSG:3857", "Pseudo-Mercator".to_string());
    assert_eq!(map.len(), 2);

    let handle = WeakValueHashMap::spawn_cleaner(&map, Duration::from_millis(10));
    assert!(wait_until(|| map.len() == 1).await);
    assert_eq!(map.get("EPSG:4326"), Some(kept));

    handle.abort();
}

#[tokio::test]
async fn test_cache_cleaner_purges_weak_layer() {
    let cache = Arc::new(Cache::new(1));
    let held = cache.insert(1, "first");
    cache.insert(2, "second");
    cache.insert(3, "third");
    // 1 is held elsewhere, 2 was collected on demotion
    assert_eq!(cache.weak_len(), 2);

    let handle = Cache::spawn_cleaner(&cache, Duration::from_millis(10));
    assert!(wait_until(|| cache.weak_len() == 1).await);
    assert_eq!(cache.get(&1), Some(held));

    handle.abort();
}

#[tokio::test]
async fn test_cleaner_ends_with_its_map() {
    let map: Arc<WeakValueHashMap<u32, u32>> = Arc::new(WeakValueHashMap::new());
    let handle = WeakValueHashMap::spawn_cleaner(&map, Duration::from_millis(5));
    drop(map);

    let finished = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(matches!(finished, Ok(Ok(()))));
}

#[test]
fn test_manual_purge_without_runtime() {
    let map = WeakValueHashMap::new();
    for id in 0..10 {
        map.insert(id, id * 2);
    }
    assert_eq!(map.purge(), 10);
    assert!(map.is_empty());
}
