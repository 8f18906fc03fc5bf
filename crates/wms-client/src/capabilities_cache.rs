//! Capabilities document caching.
//!
//! Parsed capabilities are kept per GetCapabilities URL for a configurable
//! TTL so that preparing requests does not refetch the document every time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::capabilities::Capabilities;

/// Cached capabilities with fetch timestamp.
struct CachedCapabilities {
    capabilities: Arc<Capabilities>,
    fetched_at: Instant,
}

/// TTL cache of parsed capabilities keyed by GetCapabilities URL.
pub struct CapabilitiesCache {
    entries: RwLock<HashMap<String, CachedCapabilities>>,
    ttl: Duration,
}

impl CapabilitiesCache {
    /// Create a new capabilities cache with the specified TTL in seconds.
    pub fn new(ttl_secs: u64) -> Self {
        info!(ttl_secs = ttl_secs, "Initializing capabilities cache");
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Get cached capabilities if still valid.
    pub async fn get(&self, url: &str) -> Option<Arc<Capabilities>> {
        let guard = self.entries.read().await;
        if let Some(cached) = guard.get(url) {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!(url = %url, "Capabilities cache hit");
                return Some(Arc::clone(&cached.capabilities));
            }
            debug!(url = %url, "Capabilities cache expired");
        }
        None
    }

    /// Store capabilities in cache.
    pub async fn set(&self, url: &str, capabilities: Arc<Capabilities>) {
        let mut guard = self.entries.write().await;
        guard.insert(
            url.to_string(),
            CachedCapabilities {
                capabilities,
                fetched_at: Instant::now(),
            },
        );
        debug!(url = %url, "Capabilities cached");
    }

    /// Drop the entry of one server.
    pub async fn invalidate(&self, url: &str) {
        self.entries.write().await.remove(url);
        debug!(url = %url, "Capabilities cache entry invalidated");
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Capabilities cache cleared");
    }

    /// Get the configured TTL.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://host/wms?SERVICE=WMS&REQUEST=GetCapabilities";

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let cache = CapabilitiesCache::new(60);
        cache.set(URL, Arc::new(Capabilities::default())).await;

        let result = cache.get(URL).await;
        assert!(result.is_some());
        assert!(cache.get("http://other/wms").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_miss_when_empty() {
        let cache = CapabilitiesCache::new(60);
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_clears_entry() {
        let cache = CapabilitiesCache::new(60);
        cache.set(URL, Arc::new(Capabilities::default())).await;

        cache.invalidate(URL).await;

        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_hits() {
        let cache = CapabilitiesCache::new(0);
        cache.set(URL, Arc::new(Capabilities::default())).await;
        assert!(cache.get(URL).await.is_none());
    }

    #[test]
    fn test_ttl_secs() {
        let cache = CapabilitiesCache::new(300);
        assert_eq!(cache.ttl_secs(), 300);
    }
}
