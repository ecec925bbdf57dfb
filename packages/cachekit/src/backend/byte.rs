//! Byte backend: adapts an external byte-oriented store via the envelope codec.
//!
//! The external store is consumed only through the narrow [`ByteStore`] trait,
//! the same way `DefaultRecordStore` consumes `MapDataStore`
//! (`storage/map_data_store.rs` in the teacher repo) only through a trait
//! object -- the façade never depends on a concrete driver.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cachekit_core::{envelope, Clock, EntryMetadata, Freshness};

use super::{Backend, GetOutcome, Mode};

/// The floor below which a computed relative TTL is clamped, per the envelope spec.
const MIN_STORE_TTL: Duration = Duration::from_secs(1);

/// Narrow contract over an external byte store: get, set-with-ttl, remove.
///
/// Implementations are adapters over a concrete driver (Redis, a KV store, a
/// filesystem, ...); the façade has no opinion on what sits behind this trait.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// The adapter's own error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the raw blob stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Writes `blob` at `key`, asking the store to retain it for at least `ttl`.
    async fn set_with_ttl(&self, key: &str, blob: Vec<u8>, ttl: Duration) -> Result<(), Self::Error>;

    /// Removes `key`. Idempotent.
    async fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// Byte-mode backend wrapping any [`ByteStore`].
pub struct ByteBackend<S> {
    store: S,
    clock: Clock,
}

impl<S> ByteBackend<S> {
    /// Wraps `store`, using `clock` for every timing decision.
    #[must_use]
    pub fn new(store: S, clock: Clock) -> Self {
        Self { store, clock }
    }
}

fn relative_ttl(metadata: &EntryMetadata, now: i64) -> Duration {
    let until = if metadata.absolute_expiration == 0 {
        // Never expires: ask the store to retain it as long as it is willing to.
        return Duration::from_secs(u64::from(u32::MAX));
    } else {
        metadata.stale_deadline().max(metadata.absolute_expiration)
    };
    let remaining_ms = (until - now).max(0) as u64;
    Duration::from_millis(remaining_ms).max(MIN_STORE_TTL)
}

#[async_trait]
impl<S> Backend for ByteBackend<S>
where
    S: ByteStore,
{
    type Value = Bytes;
    type Error = S::Error;

    async fn get(&self, key: &str) -> Result<GetOutcome<Bytes>, S::Error> {
        let now = self.clock.now_millis();

        let Some(blob) = self.store.get(key).await? else {
            return Ok(GetOutcome::Miss);
        };

        let Ok((metadata, payload)) = envelope::decode(&blob) else {
            self.store.remove(key).await?;
            return Ok(GetOutcome::Expired);
        };

        match metadata.classify(now) {
            Freshness::Expired => {
                self.store.remove(key).await?;
                Ok(GetOutcome::Expired)
            }
            Freshness::Stale => Ok(GetOutcome::Stale(Bytes::copy_from_slice(payload), metadata)),
            Freshness::Fresh => {
                if metadata.is_sliding() {
                    let refreshed = metadata.refreshed(now);
                    let reencoded = envelope::encode(&refreshed, payload);
                    self.store
                        .set_with_ttl(key, reencoded, relative_ttl(&refreshed, now))
                        .await?;
                    Ok(GetOutcome::Hit(Bytes::copy_from_slice(payload), refreshed))
                } else {
                    Ok(GetOutcome::Hit(Bytes::copy_from_slice(payload), metadata))
                }
            }
        }
    }

    async fn set(&self, key: &str, metadata: EntryMetadata, value: Bytes) -> Result<(), S::Error> {
        let now = self.clock.now_millis();
        let blob = envelope::encode(&metadata, &value);
        self.store
            .set_with_ttl(key, blob, relative_ttl(&metadata, now))
            .await
    }

    async fn remove(&self, key: &str) -> Result<(), S::Error> {
        self.store.remove(key).await
    }

    fn mode(&self) -> Mode {
        Mode::Byte
    }
}

/// An in-process [`ByteStore`] reference adapter used only by this crate's own
/// tests, the same way the teacher tests `DefaultRecordStore` against
/// `HashMapStorage`/`NullDataStore` rather than a real driver.
#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use std::convert::Infallible;
    use std::time::Duration;

    use async_trait::async_trait;
    use dashmap::DashMap;

    use super::ByteStore;

    /// A `DashMap`-backed byte store with no real TTL enforcement, for tests.
    #[derive(Debug, Default)]
    pub struct MemoryByteStore {
        blobs: DashMap<String, Vec<u8>>,
    }

    impl MemoryByteStore {
        /// Creates an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ByteStore for MemoryByteStore {
        type Error = Infallible;

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Infallible> {
            Ok(self.blobs.get(key).map(|b| b.clone()))
        }

        async fn set_with_ttl(&self, key: &str, blob: Vec<u8>, _ttl: Duration) -> Result<(), Infallible> {
            self.blobs.insert(key.to_string(), blob);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), Infallible> {
            self.blobs.remove(key);
            Ok(())
        }
    }
}
