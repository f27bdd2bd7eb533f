//! Error types for the caching layer
//!
//! Pool contract violations (recycling a target the pool never saw,
//! decrementing a spawn count below zero, creating a duplicate pool key)
//! panic instead of returning an error: they are programmer errors upstream
//! and must not be silently retried.

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced to callers of [`crate::ResourceCache::load`].
///
/// One bad asset never poisons the cache: every variant is local to the
/// requested key and the cache stays usable for other keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Metadata resolution found no asset behind the key.
    #[error("asset '{0}' does not exist")]
    NotExist(String),

    /// The loader could not materialize a handle for an existing asset.
    #[error("asset '{0}' could not be materialized")]
    NotReady(String),

    /// The wait for an in-flight load exceeded the hard ceiling. The
    /// underlying load keeps running for other waiters.
    #[error("gave up waiting for load of '{0}' after {1:?}")]
    Timeout(String, Duration),

    /// The load task went away without publishing an outcome.
    #[error("load of '{0}' was cancelled")]
    Cancelled(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
