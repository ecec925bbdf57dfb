//! Error types returned across the façade's public API.

use cachekit_core::ConfigError;

/// Errors from any façade operation, generic over the backend's own error type.
///
/// Caller errors (`InvalidKey`, `InvalidTag`) and configuration errors fail fast
/// before any backend or factory call runs; metrics are left untouched. Backend
/// errors propagate the concrete `E` unchanged so callers can match on it rather
/// than losing the cause behind an opaque string.
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The key was empty or whitespace-only.
    #[error("key must be non-empty and non-whitespace")]
    InvalidKey,
    /// A tag was empty or whitespace-only.
    #[error("tag must be non-empty and non-whitespace")]
    InvalidTag,
    /// TTL/sliding/stale resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The underlying backend returned an error.
    #[error("backend error: {0}")]
    Backend(#[source] E),
    /// The operation was cancelled before it completed.
    #[error("operation was cancelled")]
    Cancelled,
}

/// Errors from `Cache::get_or_set`, which also runs a caller-supplied factory
/// whose error type `F` is typically unrelated to the backend's error type `E`.
#[derive(Debug, thiserror::Error)]
pub enum GetOrSetError<E, F>
where
    E: std::error::Error + Send + Sync + 'static,
    F: std::error::Error + Send + Sync + 'static,
{
    /// A cache-side error (validation, config, backend, cancellation).
    #[error(transparent)]
    Cache(#[from] CacheError<E>),
    /// The factory failed to produce a value. Nothing was written to the cache.
    #[error("factory error: {0}")]
    Factory(#[source] F),
}
