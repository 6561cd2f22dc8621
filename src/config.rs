//! Configuration Module
//!
//! Immutable cache settings, built in code or loaded from environment variables.

use std::env;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{CacheError, Result};

/// Interval between reaper sweeps when none is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of expired entries removed per write-lock hold.
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 1024;

/// Longest accepted default TTL or sweep interval (100 years).
///
/// Keeps `now + default_ttl` representable for the whole life of a cache, so
/// `TtlDirective::Default` writes never fail on clock overflow.
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache configuration parameters.
///
/// A cache copies its configuration at construction; changing a `CacheConfig`
/// afterwards has no effect on caches already built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied to writes using `TtlDirective::Default`, None = never expire
    pub default_ttl: Option<Duration>,
    /// Reaper sweep interval, None = `DEFAULT_SWEEP_INTERVAL`
    pub sweep_interval: Option<Duration>,
    /// Number of entries to pre-allocate room for
    pub capacity_hint: Option<usize>,
    /// Upper bound on entries removed per reaper batch
    pub sweep_batch_size: usize,
    /// Re-arm an entry's expiration every time it is read
    pub touch_on_read: bool,
}

impl CacheConfig {
    /// Creates a configuration with no default TTL and default reaper settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTL_CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: none)
    /// - `TTL_CACHE_SWEEP_INTERVAL_MS` - Reaper interval in milliseconds (default: 1000)
    /// - `TTL_CACHE_CAPACITY` - Capacity hint (default: none)
    /// - `TTL_CACHE_SWEEP_BATCH_SIZE` - Reaper batch size (default: 1024)
    /// - `TTL_CACHE_TOUCH_ON_READ` - `true`/`false` (default: false)
    pub fn from_env() -> Self {
        Self {
            default_ttl: parse_var::<u64>("TTL_CACHE_DEFAULT_TTL_MS").map(Duration::from_millis),
            sweep_interval: parse_var::<u64>("TTL_CACHE_SWEEP_INTERVAL_MS")
                .map(Duration::from_millis),
            capacity_hint: parse_var("TTL_CACHE_CAPACITY"),
            sweep_batch_size: parse_var("TTL_CACHE_SWEEP_BATCH_SIZE")
                .unwrap_or(DEFAULT_SWEEP_BATCH_SIZE),
            touch_on_read: parse_var("TTL_CACHE_TOUCH_ON_READ").unwrap_or(false),
        }
    }

    // == Builders ==
    /// Sets the TTL used by `TtlDirective::Default`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the reaper sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Sets the capacity hint.
    pub fn with_capacity_hint(mut self, capacity: usize) -> Self {
        self.capacity_hint = Some(capacity);
        self
    }

    /// Sets the reaper batch size.
    pub fn with_sweep_batch_size(mut self, batch_size: usize) -> Self {
        self.sweep_batch_size = batch_size;
        self
    }

    /// Enables or disables touch-on-read.
    pub fn with_touch_on_read(mut self, enabled: bool) -> Self {
        self.touch_on_read = enabled;
        self
    }

    // == Effective Sweep Interval ==
    /// Returns the configured sweep interval or the built-in default.
    pub fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.unwrap_or(DEFAULT_SWEEP_INTERVAL)
    }

    // == Validate ==
    /// Checks the configuration, returning `InvalidConfig` on the first problem.
    pub fn validate(&self) -> Result<()> {
        if let Some(ttl) = self.default_ttl {
            check_duration("default_ttl", ttl)?;
        }
        if let Some(interval) = self.sweep_interval {
            check_duration("sweep_interval", interval)?;
        }
        if self.sweep_batch_size == 0 {
            return Err(CacheError::InvalidConfig(
                "sweep_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: None,
            sweep_interval: None,
            capacity_hint: None,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            touch_on_read: false,
        }
    }
}

fn check_duration(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(CacheError::InvalidConfig(format!("{} must be positive", name)));
    }
    if value > MAX_CONFIG_DURATION || Instant::now().checked_add(value).is_none() {
        return Err(CacheError::InvalidConfig(format!(
            "{} of {:?} exceeds the maximum of {:?}",
            name, value, MAX_CONFIG_DURATION
        )));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
