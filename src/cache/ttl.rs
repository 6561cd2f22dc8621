//! TTL Resolution Module
//!
//! Turns a per-write TTL directive into an absolute expiration.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{CacheError, Result};

// == TTL Directive ==
/// How a single write should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlDirective {
    /// The entry never expires, whatever default the cache carries.
    NoTtl,
    /// Defer to the cache's default TTL; never expires if none is configured.
    Default,
    /// Expire this long after the write.
    Ttl(Duration),
}

impl From<Duration> for TtlDirective {
    fn from(ttl: Duration) -> Self {
        TtlDirective::Ttl(ttl)
    }
}

// == Expiration ==
/// Resolved expiration of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    /// TTL the deadline was computed from, reused when the entry is touched
    pub ttl: Duration,
    /// Absolute deadline; the entry is expired once `now >= at`
    pub at: Instant,
}

impl Expiration {
    /// Computes `now + ttl`, failing if the clock would overflow.
    pub fn after(ttl: Duration, now: Instant) -> Result<Self> {
        let at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::InvalidTtl(format!("TTL {:?} is out of range", ttl)))?;
        Ok(Self { ttl, at })
    }
}

// == Resolve ==
/// Resolves a directive against the cache default.
///
/// Returns `Ok(None)` when the write never expires.
///
/// # Arguments
/// * `default_ttl` - The cache's configured default TTL, if any
/// * `directive` - The directive passed with the write
/// * `now` - Write time
pub fn resolve(
    default_ttl: Option<Duration>,
    directive: TtlDirective,
    now: Instant,
) -> Result<Option<Expiration>> {
    match directive {
        TtlDirective::Ttl(ttl) if ttl.is_zero() => Err(CacheError::InvalidTtl(
            "TTL must be positive".to_string(),
        )),
        TtlDirective::Ttl(ttl) => Expiration::after(ttl, now).map(Some),
        TtlDirective::NoTtl => Ok(None),
        TtlDirective::Default => match default_ttl {
            Some(ttl) => Expiration::after(ttl, now).map(Some),
            None => Ok(None),
        },
    }
}
