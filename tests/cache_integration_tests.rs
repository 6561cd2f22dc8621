//! Integration Tests for the Cache API
//!
//! Exercises the public surface from outside the crate, including
//! multi-threaded access and shutdown.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use ttl_cache::{CacheConfig, CacheError, TtlCache, TtlDirective};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "ttl_cache=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn fast_reaper() -> CacheConfig {
    CacheConfig::new().with_sweep_interval(Duration::from_millis(20))
}

// == Visibility ==

#[tokio::test(start_paused = true)]
async fn test_no_ttl_entries_stay_visible() {
    init_tracing();
    let cache = TtlCache::new(fast_reaper().with_default_ttl(Duration::from_millis(10))).unwrap();

    cache
        .set("eternal".to_string(), "value".to_string(), TtlDirective::NoTtl)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(cache.get("eternal").await, Some("value".to_string()));
    assert_eq!(cache.remaining_ttl("eternal").await, Some(None));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_ttl_window() {
    init_tracing();
    // Reaper out of the picture: visibility must come from the read path
    let config = CacheConfig::new().with_sweep_interval(Duration::from_secs(3600));
    let cache = TtlCache::new(config).unwrap();

    cache
        .set("key".to_string(), 42u32, TtlDirective::Ttl(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(cache.get("key").await, Some(42));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(cache.get("key").await, None);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_default_ttl_resolution() {
    init_tracing();
    let cache = TtlCache::new(CacheConfig::new().with_default_ttl(Duration::from_millis(50))).unwrap();

    cache
        .set("key".to_string(), "value", TtlDirective::Default)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.get("key").await, Some("value"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("key").await, None);
}

#[tokio::test]
async fn test_invalid_ttl_rejects_single_call() {
    let cache: TtlCache<String, u32> = TtlCache::with_defaults().unwrap();

    let result = cache
        .set("key".to_string(), 1, TtlDirective::Ttl(Duration::ZERO))
        .await;
    assert!(matches!(result, Err(CacheError::InvalidTtl(_))));

    cache
        .set("key".to_string(), 2, TtlDirective::Ttl(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(cache.get("key").await, Some(2));
}

#[tokio::test]
async fn test_invalid_config() {
    let result = TtlCache::<String, u32>::new(CacheConfig::new().with_default_ttl(Duration::ZERO));
    assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_oversized_default_ttl_fails_construction_not_writes() {
    let result = TtlCache::<String, u32>::new(CacheConfig::new().with_default_ttl(Duration::MAX));
    assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

    let result =
        TtlCache::<String, u32>::new(CacheConfig::new().with_sweep_interval(Duration::MAX));
    assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_are_linearized() {
    init_tracing();
    let cache: Arc<TtlCache<String, usize>> = Arc::new(TtlCache::with_defaults().unwrap());
    let writers = 64;

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .set("shared".to_string(), i, TtlDirective::NoTtl)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let value = cache.get("shared").await.expect("key should be present");
    assert!(value < writers);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writers() {
    let cache: Arc<TtlCache<u32, u32>> = Arc::new(TtlCache::new(fast_reaper()).unwrap());

    let writers: Vec<_> = (0..4u32)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..250u32 {
                    let key = w * 1000 + i;
                    cache
                        .set(key, key, TtlDirective::Ttl(Duration::from_secs(60)))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4u32)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..250u32 {
                    let key = w * 1000 + i;
                    // Any visible value must be the one written for that key
                    if let Some(value) = cache.get(&key).await {
                        assert_eq!(value, key);
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await, 1000);
    let keys: HashSet<u32> = cache.keys().await.into_iter().collect();
    assert_eq!(keys.len(), 1000);
}

// == Reaper ==

#[tokio::test(start_paused = true)]
async fn test_reaper_bounds_storage() {
    init_tracing();
    let cache: TtlCache<String, u32> = TtlCache::new(fast_reaper()).unwrap();

    for round in 0..3 {
        for i in 0..500 {
            cache
                .set(
                    format!("{}-{}", round, i),
                    i,
                    TtlDirective::Ttl(Duration::from_millis(10)),
                )
                .await
                .unwrap();
        }

        // TTL plus more than one sweep interval
        tokio::time::sleep(Duration::from_millis(10 + 20 + 50)).await;
        assert_eq!(cache.len().await, 0);
    }

    let stats = cache.stats().await;
    assert_eq!(stats.expirations, 1500);
    assert_eq!(stats.total_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_on_demand() {
    let config = CacheConfig::new().with_sweep_interval(Duration::from_secs(3600));
    let cache: TtlCache<String, u32> = TtlCache::new(config).unwrap();

    for i in 0..10 {
        cache
            .set(format!("key{}", i), i, TtlDirective::Ttl(Duration::from_millis(10)))
            .await
            .unwrap();
    }
    cache
        .set("keep".to_string(), 0, TtlDirective::NoTtl)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(cache.purge_expired().await, 10);
    assert_eq!(cache.purge_expired().await, 0);
    assert_eq!(cache.keys().await, vec!["keep".to_string()]);
}

// == Shutdown ==

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_rejects_writes_and_allows_reads() {
    init_tracing();
    let cache: Arc<TtlCache<String, String>> = Arc::new(TtlCache::new(fast_reaper()).unwrap());
    cache
        .set("key".to_string(), "value".to_string(), TtlDirective::NoTtl)
        .await
        .unwrap();

    let reader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..100 {
                seen.push(cache.get("key").await);
                tokio::task::yield_now().await;
            }
            seen
        })
    };

    cache.close().await;

    let result = cache
        .set("other".to_string(), "value".to_string(), TtlDirective::NoTtl)
        .await;
    assert_eq!(result, Err(CacheError::ClosedCache));

    let seen = reader.await.unwrap();
    assert!(seen.iter().all(|v| v.as_deref() == Some("value")));
    assert_eq!(cache.get("key").await, Some("value".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_drop_without_close() {
    let cache: TtlCache<String, u32> = TtlCache::new(fast_reaper()).unwrap();
    cache
        .set("key".to_string(), 1, TtlDirective::NoTtl)
        .await
        .unwrap();
    drop(cache);

    // Runtime keeps working after the reaper is aborted
    tokio::time::sleep(Duration::from_millis(50)).await;
}
