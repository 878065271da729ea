//! Request cache for status queries
//!
//! Keeps successful results for the policy's stale time. Failures are never
//! cached, so the next fetch after an error always reaches the source. A
//! result whose key was invalidated or cleared while it was in flight is
//! handed back to its caller but not stored.

use authsync_core::{
    async_trait, retry_async_if, AuthSyncResult, FetchPolicy, Fetcher, RequestCache,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Cache entry with expiration
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub access_count: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Invalidation counters. `of(key)` moves on every invalidate of `key` and
/// on every clear.
#[derive(Debug, Default)]
struct Generations {
    per_key: HashMap<String, u64>,
    clears: u64,
}

impl Generations {
    fn of(&self, key: &str) -> u64 {
        self.clears
            .wrapping_add(self.per_key.get(key).copied().unwrap_or(0))
    }
}

/// In-memory request cache keyed by string
#[derive(Debug)]
pub struct MemoryRequestCache<V> {
    // Lock order: entries before generations
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    generations: RwLock<Generations>,
    stats: RwLock<CacheStats>,
    // Serializes fetches so concurrent callers share one request
    fetch_lock: Mutex<()>,
}

impl<V> MemoryRequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generations: RwLock::new(Generations::default()),
            stats: RwLock::new(CacheStats::default()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Fresh cached value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                debug!("Cache entry expired and removed: {}", key);
                None
            }
            Some(entry) => {
                entry.access_count += 1;
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.total_entries = self.entries.read().await.len();
        stats
    }
}

impl<V> Default for MemoryRequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> RequestCache<V> for MemoryRequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn fetch_with_policy(
        &self,
        key: &str,
        policy: &FetchPolicy,
        fetcher: Fetcher<V>,
    ) -> AuthSyncResult<V> {
        let _guard = self.fetch_lock.lock().await;

        if let Some(value) = self.get(key).await {
            debug!("Cache hit for key: {}", key);
            self.stats.write().await.hits += 1;
            return Ok(value);
        }

        debug!("Cache miss for key: {}", key);
        self.stats.write().await.misses += 1;

        let generation = self.generations.read().await.of(key);
        let value = retry_async_if(
            || fetcher(),
            policy.retry.clone(),
            key,
            |error| !error.is_unauthorized(),
        )
        .await?;

        if !policy.stale_time.is_zero() {
            let mut entries = self.entries.write().await;
            if self.generations.read().await.of(key) == generation {
                entries.insert(key.to_string(), CacheEntry::new(value.clone(), policy.stale_time));
            } else {
                debug!("Key {} invalidated during fetch, result not cached", key);
            }
        }

        Ok(value)
    }

    async fn invalidate(&self, key: &str) {
        {
            let mut entries = self.entries.write().await;
            let mut generations = self.generations.write().await;
            *generations.per_key.entry(key.to_string()).or_default() += 1;
            if entries.remove(key).is_some() {
                debug!("Invalidated cache entry: {}", key);
            }
        }
        self.stats.write().await.invalidations += 1;
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let mut generations = self.generations.write().await;
        generations.clears = generations.clears.wrapping_add(1);
        entries.clear();
        info!("Request cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authsync_core::{AuthSyncError, RetryConfig};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy(stale_time: Duration) -> FetchPolicy {
        FetchPolicy {
            stale_time,
            retry: RetryConfig::with_retries(2)
                .with_delays(1, 2)
                .without_jitter(),
        }
    }

    fn counting_fetcher(calls: Arc<AtomicUsize>) -> Fetcher<u32> {
        Box::new(move || {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u32) }.boxed()
        })
    }

    fn slow_fetcher(calls: Arc<AtomicUsize>) -> Fetcher<u32> {
        Box::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                let value = calls.fetch_add(1, Ordering::SeqCst) as u32;
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value)
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn fresh_result_is_reused() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_secs(300));

        let first = cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        let second = cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_secs(300));

        cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        cache.invalidate("auth-status").await;
        let value = cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_millis(10));

        cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried_or_cached() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher: Fetcher<u32> = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(AuthSyncError::from_status(401, "expired")) }.boxed()
        });

        let result = cache
            .fetch_with_policy("auth-status", &policy(Duration::from_secs(300)), fetcher)
            .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn transient_errors_retry_twice() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher: Fetcher<u32> = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(AuthSyncError::from_status(503, "unavailable")) }.boxed()
        });

        let result = cache
            .fetch_with_policy("auth-status", &policy(Duration::from_secs(300)), fetcher)
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalidate_during_fetch_keeps_result_out_of_cache() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_secs(300));

        let (fetched, ()) = tokio::join!(
            cache.fetch_with_policy("auth-status", &policy, slow_fetcher(calls.clone())),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.invalidate("auth-status").await;
            }
        );

        assert_eq!(fetched.unwrap(), 0);
        assert_eq!(cache.stats().await.total_entries, 0);

        let next = cache
            .fetch_with_policy("auth-status", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        assert_eq!(next, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_during_fetch_keeps_result_out_of_cache() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_secs(300));

        let (fetched, ()) = tokio::join!(
            cache.fetch_with_policy("auth-status", &policy, slow_fetcher(calls.clone())),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.clear().await;
            }
        );

        assert!(fetched.is_ok());
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache: MemoryRequestCache<u32> = MemoryRequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = policy(Duration::from_secs(300));

        cache
            .fetch_with_policy("a", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        cache
            .fetch_with_policy("b", &policy, counting_fetcher(calls.clone()))
            .await
            .unwrap();
        cache.clear().await;

        assert_eq!(cache.stats().await.total_entries, 0);
    }
}
