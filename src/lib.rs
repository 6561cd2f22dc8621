//! TTL Cache - A concurrent in-memory key-value cache
//!
//! Entries expire per write, by a cache-wide default, or never. Expired
//! entries are hidden immediately and reclaimed lazily on access and by a
//! background reaper task.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;
mod ttl_cache;

pub use cache::{CacheStats, EntryInfo, TtlDirective};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use ttl_cache::TtlCache;
