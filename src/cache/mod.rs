//! Cache Module
//!
//! Storage, TTL resolution and statistics behind `TtlCache`.

mod entry;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::{CacheEntry, EntryInfo};
pub use stats::{CacheStats, StatsRecorder};
pub use store::{CacheStore, Lookup};
pub use ttl::{resolve, Expiration, TtlDirective};
