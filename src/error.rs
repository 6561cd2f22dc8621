//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected constructor arguments
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Explicit TTL that cannot be applied to a write
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Write attempted after the cache was closed
    #[error("Cache is closed")]
    ClosedCache,

    /// No tokio runtime available to host the reaper
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
