//! Cache Store Module
//!
//! Main storage engine combining HashMap storage with an ordered expiry index.
//! The store itself is not synchronized; `TtlCache` guards it with a lock.

use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use tokio::time::Instant;

use crate::cache::{CacheEntry, Expiration};

// == Lookup ==
/// Outcome of reading a key at a given instant.
#[derive(Debug)]
pub enum Lookup<'a, V> {
    /// Entry present and not expired
    Live(&'a CacheEntry<V>),
    /// Entry present but past its deadline
    Expired,
    /// No entry for the key
    Missing,
}

// == Cache Store ==
/// Key-value storage with TTL bookkeeping.
///
/// Every entry with a deadline has exactly one record in `expirations`,
/// keyed by `(deadline, write sequence)`, so sweeps walk expired entries in
/// deadline order and never touch live ones.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Deadline-ordered index of entries that expire
    expirations: BTreeMap<(Instant, u64), K>,
    /// Next write sequence number
    next_seq: u64,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty store with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            expirations: BTreeMap::new(),
            next_seq: 0,
        }
    }

    // == Insert ==
    /// Stores a key-value pair with a resolved expiration.
    ///
    /// If the key already exists, value and expiration are replaced and the
    /// original insertion time is kept.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `expiration` - Resolved expiration, None = never expires
    pub fn insert(&mut self, key: K, value: V, expiration: Option<Expiration>) {
        let seq = self.bump_seq();
        let mut entry = CacheEntry::new(value, expiration, seq);

        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                let previous = slot.get();
                if let Some(at) = previous.expires_at {
                    self.expirations.remove(&(at, previous.seq));
                }
                entry.inserted_at = previous.inserted_at;
                if let Some(expiration) = expiration {
                    self.expirations
                        .insert((expiration.at, seq), slot.key().clone());
                }
                slot.insert(entry);
            }
            Entry::Vacant(slot) => {
                if let Some(expiration) = expiration {
                    self.expirations
                        .insert((expiration.at, seq), slot.key().clone());
                }
                slot.insert(entry);
            }
        }
    }

    // == Lookup ==
    /// Reads a key without modifying the store.
    pub fn lookup<Q>(&self, key: &Q, now: Instant) -> Lookup<'_, V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => Lookup::Expired,
            Some(entry) => Lookup::Live(entry),
            None => Lookup::Missing,
        }
    }

    // == Touch ==
    /// Reads a key and re-arms its deadline to `now + ttl`.
    ///
    /// An expired entry is removed and reported as `Expired`. Entries
    /// without a TTL are returned unchanged.
    pub fn touch<Q>(&mut self, key: &Q, now: Instant) -> Lookup<'_, V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return Lookup::Missing,
        };
        if expired {
            self.remove(key);
            return Lookup::Expired;
        }

        let seq = self.bump_seq();
        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Missing;
        };
        if let (Some(ttl), Some(at)) = (entry.ttl, entry.expires_at) {
            if let Ok(renewed) = Expiration::after(ttl, now) {
                if let Some(indexed_key) = self.expirations.remove(&(at, entry.seq)) {
                    self.expirations.insert((renewed.at, seq), indexed_key);
                    entry.expires_at = Some(renewed.at);
                    entry.seq = seq;
                }
            }
        }
        Lookup::Live(entry)
    }

    // == Remove ==
    /// Removes an entry by key, returning it if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        if let Some(at) = entry.expires_at {
            self.expirations.remove(&(at, entry.seq));
        }
        Some(entry)
    }

    // == Evict If Expired ==
    /// Removes the entry for `key` only if it is expired at `now`.
    ///
    /// Returns true if an entry was removed.
    pub fn evict_if_expired<Q>(&mut self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => self.remove(key).is_some(),
            _ => false,
        }
    }

    // == Purge Expired ==
    /// Removes up to `limit` entries whose deadline is at or before `now`,
    /// earliest deadline first.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: Instant, limit: usize) -> usize {
        let mut removed = 0;
        while removed < limit {
            let Some(entry) = self.expirations.first_entry() else {
                break;
            };
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            self.entries.remove(&key);
            removed += 1;
        }
        removed
    }

    // == Clear ==
    /// Removes every entry, returning how many were stored.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.expirations.clear();
        count
    }

    // == Live Length ==
    /// Returns the number of entries not expired at `now`.
    pub fn live_len(&self, now: Instant) -> usize {
        let expired = self
            .expirations
            .range(..=(now, u64::MAX))
            .count();
        self.entries.len() - expired
    }

    /// Returns the live keys at `now`.
    pub fn live_keys(&self, now: Instant) -> Vec<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Length ==
    /// Returns the number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is physically stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of stored entries that carry a deadline.
    pub fn expiring_len(&self) -> usize {
        self.expirations.len()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }
}
