//! Cache-aside store for externally sourced quotes.
//!
//! Values are grouped by namespace and written with an explicit TTL. Expiry is
//! enforced on read, so an expired entry is indistinguishable from a missing
//! one. Backend failures are logged and reported as misses.

use crate::core::clock::{Clock, seconds_until_end_of_day};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache entry could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// One namespace worth of raw key/value pairs.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;
}

/// Hands out collections by namespace name.
pub trait CacheStore: Send + Sync {
    fn collection(&self, namespace: &str) -> Result<Arc<dyn KeyValueCollection>, CacheError>;
}

/// Namespaces and how their TTL is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Metal quotes stay fresh until the end of the local calendar day.
    Metal,
    /// Security quotes use a short fixed TTL.
    Security { ttl: Duration },
}

impl Namespace {
    pub fn name(&self) -> &'static str {
        match self {
            Namespace::Metal => "metal",
            Namespace::Security { .. } => "security",
        }
    }

    pub fn ttl_at(&self, now: &DateTime<FixedOffset>) -> Duration {
        match self {
            Namespace::Metal => Duration::from_secs(seconds_until_end_of_day(now)),
            Namespace::Security { ttl } => *ttl,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<FixedOffset>,
}

#[derive(Clone)]
pub struct QuoteCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl QuoteCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the live value for `key`, or `None` if absent, expired or unreadable.
    pub async fn get<V: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<V> {
        match self.try_get(namespace, key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(namespace, key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn try_get<V: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<V>, CacheError> {
        let collection = self.store.collection(namespace)?;
        let Some(raw) = collection.get(key).await? else {
            debug!(namespace, key, "Cache MISS");
            return Ok(None);
        };

        let entry: CacheEntry<V> = serde_json::from_slice(&raw)?;
        // Expired entries stay put until the next write replaces them, so a
        // read never deletes a value a concurrent `set` just stored.
        if self.clock.now() >= entry.expires_at {
            debug!(namespace, key, "Cache entry expired");
            return Ok(None);
        }

        debug!(namespace, key, "Cache HIT");
        Ok(Some(entry.value))
    }

    /// Stores `value` under `key`, replacing any previous entry and its expiry.
    pub async fn set<V: Serialize + Sync>(
        &self,
        namespace: &str,
        key: &str,
        value: &V,
        ttl: Duration,
    ) {
        if let Err(e) = self.try_set(namespace, key, value, ttl).await {
            warn!(namespace, key, error = %e, "Cache write failed");
        }
    }

    async fn try_set<V: Serialize + Sync>(
        &self,
        namespace: &str,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Backend(format!("TTL out of range: {e}")))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| {
                CacheError::Backend(format!("TTL of {}s overflows", ttl.num_seconds()))
            })?;
        let entry = CacheEntry { value, expires_at };
        let raw = serde_json::to_vec(&entry)?;
        self.store.collection(namespace)?.put(key, raw).await?;
        debug!(namespace, key, ttl_secs = ttl.num_seconds(), "Cache PUT");
        Ok(())
    }

    /// Writes with the TTL policy of `namespace`.
    pub async fn set_in<V: Serialize + Sync>(&self, namespace: Namespace, key: &str, value: &V) {
        let ttl = namespace.ttl_at(&self.clock.now());
        self.set(namespace.name(), key, value, ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    fn clock_at(h: u32, m: u32, s: u32) -> Arc<ManualClock> {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 1, h, m, s)
            .unwrap();
        Arc::new(ManualClock::new(now))
    }

    fn cache_with(clock: Arc<ManualClock>) -> QuoteCache {
        QuoteCache::new(Arc::new(MemoryStore::new()), clock)
    }

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn collection(&self, _namespace: &str) -> Result<Arc<dyn KeyValueCollection>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let cache = cache_with(clock_at(10, 0, 0));

        cache
            .set("security", "AAPL", &150_i64, Duration::from_secs(60))
            .await;

        assert_eq!(cache.get::<i64>("security", "AAPL").await, Some(150));
        assert_eq!(cache.get::<i64>("security", "MSFT").await, None);
        assert_eq!(cache.get::<i64>("metal", "AAPL").await, None);
    }

    #[tokio::test]
    async fn test_entry_absent_once_ttl_elapsed() {
        let clock = clock_at(10, 0, 0);
        let cache = cache_with(clock.clone());

        cache
            .set("security", "AAPL", &150_i64, Duration::from_secs(60))
            .await;
        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(cache.get::<i64>("security", "AAPL").await, Some(150));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get::<i64>("security", "AAPL").await, None);
    }

    #[tokio::test]
    async fn test_set_overwrites_value_and_resets_expiry() {
        let clock = clock_at(10, 0, 0);
        let cache = cache_with(clock.clone());

        cache
            .set("security", "AAPL", &1_i64, Duration::from_secs(10))
            .await;
        clock.advance(chrono::Duration::seconds(8));
        cache
            .set("security", "AAPL", &2_i64, Duration::from_secs(10))
            .await;
        clock.advance(chrono::Duration::seconds(8));

        assert_eq!(cache.get::<i64>("security", "AAPL").await, Some(2));
    }

    #[tokio::test]
    async fn test_metal_entry_never_crosses_midnight() {
        let clock = clock_at(23, 59, 50);
        let cache = cache_with(clock.clone());

        cache.set_in(Namespace::Metal, "XAU", &2300_i64).await;
        assert_eq!(cache.get::<i64>("metal", "XAU").await, Some(2300));

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(cache.get::<i64>("metal", "XAU").await, None);
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_a_miss() {
        let cache = QuoteCache::new(Arc::new(BrokenStore), clock_at(10, 0, 0));

        cache
            .set("security", "AAPL", &150_i64, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get::<i64>("security", "AAPL").await, None);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_a_failed_write() {
        let cache = cache_with(clock_at(10, 0, 0));

        cache
            .set(
                "security",
                "AAPL",
                &150_i64,
                Duration::from_secs(9_000_000_000_000),
            )
            .await;
        assert_eq!(cache.get::<i64>("security", "AAPL").await, None);

        // The cache keeps working afterwards.
        cache
            .set("security", "AAPL", &151_i64, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get::<i64>("security", "AAPL").await, Some(151));
    }

    #[tokio::test]
    async fn test_expired_read_leaves_entry_for_next_write() {
        let clock = clock_at(10, 0, 0);
        let store = Arc::new(MemoryStore::new());
        let cache = QuoteCache::new(store.clone(), clock.clone());

        cache
            .set("security", "AAPL", &150_i64, Duration::from_secs(60))
            .await;
        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(cache.get::<i64>("security", "AAPL").await, None);

        let raw = store.collection("security").unwrap();
        assert!(raw.get("AAPL").await.unwrap().is_some());

        cache
            .set("security", "AAPL", &152_i64, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get::<i64>("security", "AAPL").await, Some(152));
    }

    #[tokio::test]
    async fn test_concurrent_writes_keep_a_whole_value() {
        let cache = cache_with(clock_at(10, 0, 0));

        let writes = (0..16_i64).map(|i| {
            let cache = cache.clone();
            async move {
                cache
                    .set("security", "AAPL", &vec![i; 4], Duration::from_secs(60))
                    .await
            }
        });
        futures::future::join_all(writes).await;

        let stored = cache.get::<Vec<i64>>("security", "AAPL").await.unwrap();
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|v| *v == stored[0]));
    }
}
