//! In-process object backend: a concurrent map storing live values directly.
//!
//! Mirrors `HashMapStorage` (`storage/engines/hashmap.rs` in the teacher repo):
//! no backend-wide lock, every operation delegates straight to `DashMap`'s own
//! per-shard locking.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use cachekit_core::{Clock, EntryMetadata, Freshness};
use dashmap::DashMap;

use super::{Backend, GetOutcome, Mode};

/// An in-process backend keyed by string, storing `Arc<V>` so that handing a
/// value back to a caller is a reference-count bump, never a copy.
pub struct ObjectBackend<V> {
    entries: DashMap<String, (EntryMetadata, Arc<V>)>,
    clock: Clock,
}

impl<V> ObjectBackend<V> {
    /// Creates an empty object backend using `clock` for all timing decisions.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries currently held, including stale-but-not-yet-purged ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backend currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<V> Backend for ObjectBackend<V>
where
    V: Send + Sync + 'static,
{
    type Value = Arc<V>;
    type Error = Infallible;

    async fn get(&self, key: &str) -> Result<GetOutcome<Arc<V>>, Infallible> {
        let now = self.clock.now_millis();

        let Some(entry) = self.entries.get(key) else {
            return Ok(GetOutcome::Miss);
        };
        let (metadata, value) = entry.value().clone();
        drop(entry);

        match metadata.classify(now) {
            Freshness::Expired => {
                self.entries.remove(key);
                Ok(GetOutcome::Expired)
            }
            Freshness::Stale => Ok(GetOutcome::Stale(value, metadata)),
            Freshness::Fresh => {
                if metadata.is_sliding() {
                    let refreshed = metadata.refreshed(now);
                    self.entries
                        .insert(key.to_string(), (refreshed, Arc::clone(&value)));
                    Ok(GetOutcome::Hit(value, refreshed))
                } else {
                    Ok(GetOutcome::Hit(value, metadata))
                }
            }
        }
    }

    async fn set(&self, key: &str, metadata: EntryMetadata, value: Arc<V>) -> Result<(), Infallible> {
        self.entries.insert(key.to_string(), (metadata, value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Infallible> {
        self.entries.remove(key);
        Ok(())
    }

    fn mode(&self) -> Mode {
        Mode::Object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachekit_core::clock::ManualClock;

    fn backend(clock: &ManualClock) -> ObjectBackend<String> {
        ObjectBackend::new(Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn get_on_empty_is_miss() {
        let clock = ManualClock::new(0);
        let backend = backend(&clock);
        assert!(matches!(backend.get("k").await.unwrap(), GetOutcome::Miss));
    }

    #[tokio::test]
    async fn set_then_get_is_hit() {
        let clock = ManualClock::new(0);
        let backend = backend(&clock);
        let meta = EntryMetadata::new(0, 1_000, 0, 0);
        backend.set("k", meta, Arc::new("v".to_string())).await.unwrap();
        match backend.get("k").await.unwrap() {
            GetOutcome::Hit(v, _) => assert_eq!(*v, "v"),
            other => panic!("expected Hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_entry_is_purged_on_read() {
        let clock = ManualClock::new(2_000);
        let backend = backend(&clock);
        let meta = EntryMetadata::new(0, 1_000, 0, 0);
        backend.set("k", meta, Arc::new("v".to_string())).await.unwrap();
        assert!(matches!(backend.get("k").await.unwrap(), GetOutcome::Expired));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn stale_entry_is_returned_without_purge() {
        let clock = ManualClock::new(1_200);
        let backend = backend(&clock);
        let meta = EntryMetadata::new(0, 1_000, 0, 500);
        backend.set("k", meta, Arc::new("v".to_string())).await.unwrap();
        match backend.get("k").await.unwrap() {
            GetOutcome::Stale(v, _) => assert_eq!(*v, "v"),
            other => panic!("expected Stale, got {other:?}"),
        }
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn sliding_hit_refreshes_expiration_in_place() {
        let clock = ManualClock::new(500);
        let backend = backend(&clock);
        let meta = EntryMetadata::new(0, 1_000, 1_000, 0);
        backend.set("k", meta, Arc::new("v".to_string())).await.unwrap();

        match backend.get("k").await.unwrap() {
            GetOutcome::Hit(_, refreshed) => assert_eq!(refreshed.absolute_expiration, 1_500),
            other => panic!("expected Hit, got {other:?}"),
        }

        // Advance past the original expiration; the refreshed deadline keeps it fresh.
        clock.set(1_200);
        assert!(matches!(backend.get("k").await.unwrap(), GetOutcome::Hit(..)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let clock = ManualClock::new(0);
        let backend = backend(&clock);
        backend.remove("missing").await.unwrap();
        backend
            .set("k", EntryMetadata::new(0, 0, 0, 0), Arc::new("v".to_string()))
            .await
            .unwrap();
        backend.remove("k").await.unwrap();
        backend.remove("k").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn mode_is_object() {
        let clock = ManualClock::new(0);
        assert_eq!(backend(&clock).mode(), Mode::Object);
    }
}
