//! Keyed cache of lazily established connection handles.
//!
//! The cache stores the in-flight establishment before anything is awaited,
//! so concurrent first-time callers for one key share a single attempt and
//! observe the same outcome. A failed establishment is removed so the next
//! call starts clean.
//!
//! ```rust,no_run
//! use sqlgate_query::{GatewayResult, PoolCache};
//!
//! # async fn example() -> GatewayResult<()> {
//! let cache: PoolCache<u32> = PoolCache::new("example");
//! let handle = cache.get_or_create("postgres://localhost/app", || async { Ok(7) }).await?;
//! assert_eq!(handle, 7);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::GatewayResult;

type Establishing<H> = Shared<BoxFuture<'static, GatewayResult<H>>>;

struct Entry<H: Clone> {
    generation: u64,
    handle: Establishing<H>,
}

/// A handle obtained from the cache.
#[derive(Debug, Clone)]
pub struct Acquired<H> {
    /// The shared handle.
    pub handle: H,
    /// Identifies the cache entry the handle came from.
    pub generation: u64,
    /// Whether this call started the establishment.
    pub fresh: bool,
}

/// Map from raw connection string to a shared, lazily established handle.
pub struct PoolCache<H: Clone> {
    entries: Mutex<HashMap<String, Entry<H>>>,
    next_generation: AtomicU64,
    label: &'static str,
}

impl<H> PoolCache<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Create an empty cache. `label` names it in log output.
    pub fn new(label: &'static str) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            label,
        }
    }

    /// Get the handle for `key`, establishing it with `establish` on a miss.
    pub async fn get_or_create<F, Fut>(&self, key: &str, establish: F) -> GatewayResult<H>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<H>> + Send + 'static,
    {
        self.acquire(key, establish).await.map(|acquired| acquired.handle)
    }

    /// Like [`get_or_create`](Self::get_or_create) but also reports which
    /// entry the handle belongs to and whether this call created it.
    pub async fn acquire<F, Fut>(&self, key: &str, establish: F) -> GatewayResult<Acquired<H>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<H>> + Send + 'static,
    {
        let (generation, pending, fresh) = {
            let mut entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) => {
                    debug!(cache = self.label, generation = entry.generation, "Pool cache hit");
                    (entry.generation, entry.handle.clone(), false)
                }
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let pending = establish().boxed().shared();
                    entries.insert(
                        key.to_string(),
                        Entry {
                            generation,
                            handle: pending.clone(),
                        },
                    );
                    debug!(cache = self.label, generation, "Pool cache miss, establishing");
                    (generation, pending, true)
                }
            }
        };

        match pending.await {
            Ok(handle) => Ok(Acquired {
                handle,
                generation,
                fresh,
            }),
            Err(err) => {
                if self.remove_generation(key, generation).is_some() {
                    debug!(cache = self.label, generation, error = %err, "Evicted failed pool entry");
                }
                Err(err)
            }
        }
    }

    /// Remove the entry for `key`, returning its handle if it was established.
    ///
    /// Callers own closing the returned handle. Queries already holding the
    /// handle are not affected.
    pub fn evict(&self, key: &str) -> Option<H> {
        let entry = self.entries.lock().remove(key)?;
        debug!(cache = self.label, generation = entry.generation, "Pool entry evicted");
        established(&entry)
    }

    /// Remove the entry for `key` only if it is still the given generation.
    pub fn evict_generation(&self, key: &str, generation: u64) -> Option<H> {
        let entry = self.remove_generation(key, generation)?;
        debug!(cache = self.label, generation, "Pool entry evicted");
        established(&entry)
    }

    /// Apply the outcome of a connectivity check to the entry `acquired`
    /// came from.
    ///
    /// A check that created the entry removes it again, and a failed check
    /// removes whatever entry it used. A passing check against an entry that
    /// already existed keeps it. Returns the handle only when the check
    /// failed, so the caller can close it; otherwise the removed handle is
    /// released and queries still holding a clone keep working.
    pub fn settle_check(&self, key: &str, acquired: &Acquired<H>, healthy: bool) -> Option<H> {
        if healthy && !acquired.fresh {
            return None;
        }
        let handle = self.evict_generation(key, acquired.generation);
        if healthy { None } else { handle }
    }

    /// Remove every entry, returning the established handles.
    pub fn drain(&self) -> Vec<H> {
        let entries: Vec<Entry<H>> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        entries.iter().filter_map(established).collect()
    }

    /// Whether `key` has an entry, pending or established.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn remove_generation(&self, key: &str, generation: u64) -> Option<Entry<H>> {
        let mut entries = self.entries.lock();
        if entries.get(key)?.generation == generation {
            entries.remove(key)
        } else {
            None
        }
    }
}

fn established<H: Clone>(entry: &Entry<H>) -> Option<H> {
    match entry.handle.peek() {
        Some(Ok(handle)) => Some(handle.clone()),
        _ => None,
    }
}

impl<H: Clone> std::fmt::Debug for PoolCache<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolCache")
            .field("label", &self.label)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_connect(
        attempts: &Arc<AtomicUsize>,
        outcome: GatewayResult<u32>,
    ) -> impl FnOnce() -> BoxFuture<'static, GatewayResult<u32>> {
        let attempts = attempts.clone();
        move || {
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                outcome
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_connects_once() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_create("k", counting_connect(&attempts, Ok(1))),
            cache.get_or_create("k", counting_connect(&attempts, Ok(2))),
        );

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failure_is_shared_and_evicted() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));
        let failure = Err(GatewayError::connection_failed("refused"));

        let (a, b) = tokio::join!(
            cache.get_or_create("k", counting_connect(&attempts, failure.clone())),
            cache.get_or_create("k", counting_connect(&attempts, failure)),
        );

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap_err(), GatewayError::connection_failed("refused"));
        assert_eq!(b.unwrap_err(), GatewayError::connection_failed("refused"));
        assert!(cache.is_empty());

        let retried = cache
            .get_or_create("k", counting_connect(&attempts, Ok(3)))
            .await
            .unwrap();
        assert_eq!(retried, 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_raw_strings() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_create("postgres://h/db", counting_connect(&attempts, Ok(1)))
            .await
            .unwrap();
        cache
            .get_or_create("postgres://h:5432/db", counting_connect(&attempts, Ok(2)))
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_acquire_reports_fresh() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let first = cache.acquire("k", counting_connect(&attempts, Ok(1))).await.unwrap();
        let second = cache.acquire("k", counting_connect(&attempts, Ok(2))).await.unwrap();

        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(first.generation, second.generation);
    }

    #[tokio::test]
    async fn test_evict_returns_established_handle() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));
        cache.get_or_create("k", counting_connect(&attempts, Ok(9))).await.unwrap();

        assert_eq!(cache.evict("k"), Some(9));
        assert!(!cache.contains("k"));
        assert_eq!(cache.evict("k"), None);
    }

    #[tokio::test]
    async fn test_evict_generation_skips_replaced_entry() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let old = cache.acquire("k", counting_connect(&attempts, Ok(1))).await.unwrap();
        cache.evict("k");
        let new = cache.acquire("k", counting_connect(&attempts, Ok(2))).await.unwrap();

        assert_eq!(cache.evict_generation("k", old.generation), None);
        assert!(cache.contains("k"));
        assert_eq!(cache.evict_generation("k", new.generation), Some(2));
    }

    #[tokio::test]
    async fn test_passing_check_keeps_cached_entry() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));
        cache.get_or_create("k", counting_connect(&attempts, Ok(1))).await.unwrap();

        let acquired = cache.acquire("k", counting_connect(&attempts, Ok(2))).await.unwrap();
        assert!(!acquired.fresh);

        assert_eq!(cache.settle_check("k", &acquired, true), None);
        assert!(cache.contains("k"));
    }

    #[tokio::test]
    async fn test_failing_check_evicts_cached_entry() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));
        cache.get_or_create("k", counting_connect(&attempts, Ok(1))).await.unwrap();

        let acquired = cache.acquire("k", counting_connect(&attempts, Ok(2))).await.unwrap();

        assert_eq!(cache.settle_check("k", &acquired, false), Some(1));
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_passing_check_releases_fresh_entry_without_closing() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let acquired = cache.acquire("k", counting_connect(&attempts, Ok(1))).await.unwrap();
        assert!(acquired.fresh);

        assert_eq!(cache.settle_check("k", &acquired, true), None);
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_failing_check_closes_fresh_entry() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let acquired = cache.acquire("k", counting_connect(&attempts, Ok(1))).await.unwrap();

        assert_eq!(cache.settle_check("k", &acquired, false), Some(1));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_settle_check_ignores_replaced_entry() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));

        let stale = cache.acquire("k", counting_connect(&attempts, Ok(1))).await.unwrap();
        cache.evict("k");
        cache.get_or_create("k", counting_connect(&attempts, Ok(2))).await.unwrap();

        assert_eq!(cache.settle_check("k", &stale, false), None);
        assert!(cache.contains("k"));
    }

    #[tokio::test]
    async fn test_drain() {
        let cache = PoolCache::new("test");
        let attempts = Arc::new(AtomicUsize::new(0));
        cache.get_or_create("a", counting_connect(&attempts, Ok(1))).await.unwrap();
        cache.get_or_create("b", counting_connect(&attempts, Ok(2))).await.unwrap();

        let mut drained = cache.drain();
        drained.sort();
        assert_eq!(drained, vec![1, 2]);
        assert!(cache.is_empty());
    }
}
