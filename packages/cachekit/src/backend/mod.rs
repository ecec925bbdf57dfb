//! Uniform backend contract consumed by the façade, plus the two concrete
//! backends: an in-process object store and an adapter over an external byte
//! store.

pub mod byte;
pub mod object;

pub use byte::{ByteBackend, ByteStore};
pub use object::ObjectBackend;

use async_trait::async_trait;
use cachekit_core::EntryMetadata;

/// The storage mode a backend is fixed to at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Values are live, in-process objects.
    Object,
    /// Values are opaque byte payloads carried in an envelope.
    Byte,
}

/// Outcome of a backend lookup, already classified against the backend's own clock.
#[derive(Debug, Clone)]
pub enum GetOutcome<V> {
    /// Key absent.
    Miss,
    /// Present and within its TTL/sliding window.
    Hit(V, EntryMetadata),
    /// Present, past TTL, but within its stale window.
    Stale(V, EntryMetadata),
    /// Present but past its stale deadline; the backend has already removed it.
    Expired,
}

/// Narrow contract the façade drives every backend through.
///
/// Implementations MUST consult their own clock and apply [`EntryMetadata`]
/// predicates before returning from `get`, removing the key on an `Expired`
/// outcome, and writing back a refreshed entry on a sliding `Hit`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The value type this backend hands back (`Arc<V>` for object-mode, the
    /// decoded payload type for byte-mode).
    type Value: Send + Sync;
    /// The backend's own error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Looks up `key`, classifying freshness and performing any required
    /// writeback (sliding refresh) or purge (expiry) as a side effect.
    async fn get(&self, key: &str) -> Result<GetOutcome<Self::Value>, Self::Error>;

    /// Unconditionally replaces the entry at `key`.
    async fn set(
        &self,
        key: &str,
        metadata: EntryMetadata,
        value: Self::Value,
    ) -> Result<(), Self::Error>;

    /// Removes `key`. Idempotent.
    async fn remove(&self, key: &str) -> Result<(), Self::Error>;

    /// The fixed storage mode of this backend.
    fn mode(&self) -> Mode;
}
