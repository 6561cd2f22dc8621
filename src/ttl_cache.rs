//! TTL Cache Module
//!
//! The shareable cache handle: storage behind a `tokio::sync::RwLock`, a
//! closed flag, statistics, and the background reaper that runs for the
//! cache's lifetime.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{
    resolve, CacheStats, CacheStore, EntryInfo, Lookup, StatsRecorder, TtlDirective,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::Reaper;

// == Shared State ==
/// State shared between cache handles and the reaper.
pub(crate) struct Shared<K, V> {
    pub(crate) store: RwLock<CacheStore<K, V>>,
    pub(crate) config: CacheConfig,
    pub(crate) stats: StatsRecorder,
    pub(crate) closed: AtomicBool,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(config: CacheConfig) -> Self {
        let store = CacheStore::with_capacity(config.capacity_hint.unwrap_or(0));
        Self {
            store: RwLock::new(store),
            config,
            stats: StatsRecorder::new(),
            closed: AtomicBool::new(false),
        }
    }

    // == Purge Expired ==
    /// Removes every entry expired at call time, in batches of
    /// `sweep_batch_size`, releasing the write lock between batches.
    ///
    /// Returns the number of entries removed.
    pub(crate) async fn purge_expired(&self) -> usize {
        if self.store.read().await.expiring_len() == 0 {
            return 0;
        }

        let batch = self.config.sweep_batch_size;
        let now = Instant::now();
        let mut total = 0;
        loop {
            let removed = self.store.write().await.purge_expired(now, batch);
            total += removed;
            if removed < batch {
                break;
            }
            tokio::task::yield_now().await;
        }

        self.stats.record_expirations(total);
        total
    }
}

// == TTL Cache ==
/// A concurrent key-value cache with per-entry and default expiration.
///
/// Share one instance between tasks with `Arc<TtlCache<K, V>>`. Construction
/// spawns a reaper task on the current tokio runtime; `close` stops it.
///
/// # Example
/// ```no_run
/// # async fn demo() -> ttl_cache::Result<()> {
/// use std::time::Duration;
/// use ttl_cache::{CacheConfig, TtlCache, TtlDirective};
///
/// let config = CacheConfig::new().with_default_ttl(Duration::from_millis(50));
/// let cache = TtlCache::new(config)?;
/// cache.set("key".to_string(), "value", TtlDirective::Default).await?;
/// assert_eq!(cache.get("key").await, Some("value"));
/// cache.close().await;
/// # Ok(())
/// # }
/// ```
pub struct TtlCache<K, V> {
    pub(crate) shared: Arc<Shared<K, V>>,
    pub(crate) reaper: Mutex<Option<Reaper>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its reaper on the current tokio runtime.
    ///
    /// # Errors
    /// * `InvalidConfig` - the configuration failed validation
    /// * `Runtime` - called outside a tokio runtime
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| CacheError::Runtime(e.to_string()))?;

        let interval = config.effective_sweep_interval();
        info!(
            "TTL cache created: default_ttl={:?}, sweep_interval={:?}, touch_on_read={}",
            config.default_ttl, interval, config.touch_on_read
        );

        let shared = Arc::new(Shared::new(config));
        let reaper = Reaper::spawn(&runtime, Arc::downgrade(&shared), interval);

        Ok(Self {
            shared,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Creates a cache with `CacheConfig::default()`.
    pub fn with_defaults() -> Result<Self> {
        Self::new(CacheConfig::default())
    }

    // == Set ==
    /// Stores a key-value pair, replacing any previous value and expiration.
    ///
    /// The expiration is computed from the moment the write lock is held.
    ///
    /// # Errors
    /// * `ClosedCache` - the cache has been closed
    /// * `InvalidTtl` - an explicit TTL of zero, or one too large to represent
    pub async fn set(&self, key: K, value: V, ttl: TtlDirective) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::ClosedCache);
        }

        let mut store = self.shared.store.write().await;
        if self.is_closed() {
            return Err(CacheError::ClosedCache);
        }
        let expiration = resolve(self.shared.config.default_ttl, ttl, Instant::now())?;
        store.insert(key, value, expiration);
        Ok(())
    }

    // == Get ==
    /// Returns a clone of the value for `key` if present and not expired.
    ///
    /// An expired entry found here is removed on the spot. With
    /// `touch_on_read` enabled, a hit also re-arms the entry's expiration.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.shared.config.touch_on_read {
            let mut store = self.shared.store.write().await;
            return match store.touch(key, Instant::now()) {
                Lookup::Live(entry) => {
                    self.shared.stats.record_hit();
                    Some(entry.value.clone())
                }
                Lookup::Expired => {
                    self.shared.stats.record_expirations(1);
                    self.shared.stats.record_miss();
                    None
                }
                Lookup::Missing => {
                    self.shared.stats.record_miss();
                    None
                }
            };
        }

        {
            let store = self.shared.store.read().await;
            match store.lookup(key, Instant::now()) {
                Lookup::Live(entry) => {
                    self.shared.stats.record_hit();
                    return Some(entry.value.clone());
                }
                Lookup::Missing => {
                    self.shared.stats.record_miss();
                    return None;
                }
                Lookup::Expired => {}
            }
        }

        // Re-checked under the write lock: a concurrent set may have replaced it
        let mut store = self.shared.store.write().await;
        if store.evict_if_expired(key, Instant::now()) {
            self.shared.stats.record_expirations(1);
            debug!("Evicted expired entry on read");
        }
        self.shared.stats.record_miss();
        None
    }

    // == Contains Key ==
    /// Returns true if `key` holds a live entry. Does not touch or count stats.
    pub async fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.shared.store.read().await;
        matches!(store.lookup(key, Instant::now()), Lookup::Live(_))
    }

    // == Remaining TTL ==
    /// Returns the time left before `key` expires.
    ///
    /// # Returns
    /// - `None` if the key is absent or expired
    /// - `Some(None)` if the entry never expires
    /// - `Some(Some(remaining))` otherwise
    pub async fn remaining_ttl<Q>(&self, key: &Q) -> Option<Option<Duration>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.shared.store.read().await;
        let now = Instant::now();
        match store.lookup(key, now) {
            Lookup::Live(entry) => Some(entry.ttl_remaining_at(now)),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    // == Entry Info ==
    /// Returns insertion/update times and expiry data of a live entry.
    pub async fn entry_info<Q>(&self, key: &Q) -> Option<EntryInfo>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.shared.store.read().await;
        let now = Instant::now();
        match store.lookup(key, now) {
            Lookup::Live(entry) => Some(entry.info_at(now)),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    // == Touch ==
    /// Re-arms a live entry's expiration to `now + ttl` of its last write.
    ///
    /// Returns false if the key is absent or already expired.
    pub async fn touch<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut store = self.shared.store.write().await;
        match store.touch(key, Instant::now()) {
            Lookup::Live(_) => true,
            Lookup::Expired => {
                self.shared.stats.record_expirations(1);
                false
            }
            Lookup::Missing => false,
        }
    }

    // == Delete ==
    /// Removes `key` if present. Deleting a missing key is a no-op.
    pub async fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.write().await.remove(key);
    }

    // == Clear ==
    /// Removes every entry.
    pub async fn clear(&self) {
        let removed = self.shared.store.write().await.clear();
        debug!("Cleared {} entries", removed);
    }

    // == Purge Expired ==
    /// Runs one reaper sweep immediately, returning the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        self.shared.purge_expired().await
    }

    // == Length ==
    /// Returns the number of live entries; expired entries awaiting removal
    /// are not counted.
    pub async fn len(&self) -> usize {
        self.shared.store.read().await.live_len(Instant::now())
    }

    /// Returns true if no live entries are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns a snapshot of the live keys.
    pub async fn keys(&self) -> Vec<K> {
        self.shared.store.read().await.live_keys(Instant::now())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let live = self.len().await;
        self.shared.stats.snapshot(live)
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    // == Close ==
    /// Rejects further writes and stops the reaper.
    ///
    /// Once this returns, the reaper is no longer running and every `set`
    /// fails with `ClosedCache`. Reads and deletes keep working. Calling it
    /// again is a no-op.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        // Wait out any write that passed the closed check before the flag flipped
        drop(self.shared.store.write().await);

        let mut reaper = self.reaper.lock().await;
        if let Some(reaper) = reaper.take() {
            reaper.stop().await;
            info!("TTL cache closed");
        }
    }
}

impl<K, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.abort();
        }
    }
}
