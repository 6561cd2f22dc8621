//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::Expiration;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Resolved TTL of the latest write, None = no expiration
    pub ttl: Option<Duration>,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
    /// Wall-clock time of the first write of this key
    pub inserted_at: DateTime<Utc>,
    /// Wall-clock time of the latest write of this key
    pub updated_at: DateTime<Utc>,
    /// Write sequence number, disambiguates equal deadlines in the expiry index
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with an optional resolved expiration.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expiration` - Resolved expiration, None = never expires
    /// * `seq` - Write sequence number assigned by the store
    pub fn new(value: V, expiration: Option<Expiration>, seq: u64) -> Self {
        let now = Utc::now();
        Self {
            value,
            ttl: expiration.map(|e| e.ttl),
            expires_at: expiration.map(|e| e.at),
            inserted_at: now,
            updated_at: now,
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`, so
    /// it disappears as soon as its TTL has fully elapsed.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the time left before expiry, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    // == Info ==
    /// Returns the entry's metadata as seen at `now`.
    pub fn info_at(&self, now: Instant) -> EntryInfo {
        EntryInfo {
            inserted_at: self.inserted_at,
            updated_at: self.updated_at,
            ttl: self.ttl,
            remaining: self.ttl_remaining_at(now),
        }
    }
}

// == Entry Info ==
/// Metadata of a live entry, without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Wall-clock time of the first write of this key
    pub inserted_at: DateTime<Utc>,
    /// Wall-clock time of the latest write of this key
    pub updated_at: DateTime<Utc>,
    /// Resolved TTL of the latest write, None = no expiration
    pub ttl: Option<Duration>,
    /// Time left before expiry, None = no expiration
    pub remaining: Option<Duration>,
}
