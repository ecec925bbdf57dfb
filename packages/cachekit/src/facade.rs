//! The public façade: orchestrates the backend, TTL resolver, single-flight,
//! tag index, and metrics into the lookup state machine, cache-aside
//! population, stale-while-revalidate, and tag invalidation.
//!
//! Grounded in the orchestration style of `DefaultRecordStore`
//! (`storage/impls/default_record_store.rs`): a single type holding its
//! collaborators behind narrow fields, with every public method a short
//! sequence of calls into them.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use cachekit_core::ConfigError;
use dashmap::DashSet;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, GetOutcome};
use crate::error::{CacheError, GetOrSetError};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::options::{validate_category, CacheConfig, CategoryConfig, SetOptions};
use crate::single_flight::SingleFlight;
use crate::tag_index::TagIndex;
use crate::ttl;

/// The caching façade. Cheap to share: clone an `Arc<Cache<B>>` across tasks.
///
/// `B::Value` must be `Clone` because `get_or_set` both returns the value and
/// hands the same value to `Set` -- a cheap reference clone for object-mode
/// (`Arc<V>`) or a ref-counted byte clone for byte-mode (`bytes::Bytes`).
pub struct Cache<B: Backend> {
    backend: B,
    config: CacheConfig,
    categories: ArcSwap<HashMap<String, CategoryConfig>>,
    tags: TagIndex,
    single_flight: SingleFlight,
    metrics: Metrics,
    tracked_keys: DashSet<String>,
}

impl<B: Backend> Cache<B> {
    /// Builds a façade over `backend` with the given global `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config`'s defaults are invalid (zero
    /// `default_ttl`, or a zero optional default duration).
    pub fn new(backend: B, config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            categories: ArcSwap::from_pointee(HashMap::new()),
            tags: TagIndex::new(),
            single_flight: SingleFlight::new(),
            metrics: Metrics::new(),
            tracked_keys: DashSet::new(),
        })
    }

    /// Registers (or replaces) a named category's default options.
    ///
    /// Lock-free for readers: the whole category map is replaced by an atomic
    /// pointer swap, the same pattern as `ShutdownController::health_state`
    /// (`network/shutdown.rs`) generalized from one cell to a map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `category` is internally inconsistent.
    pub fn register_category(
        &self,
        name: impl Into<String>,
        category: CategoryConfig,
    ) -> Result<(), ConfigError> {
        validate_category(&category)?;
        let name = name.into();
        let mut replacement = (**self.categories.load()).clone();
        replacement.insert(name, category);
        self.categories.store(Arc::new(replacement));
        Ok(())
    }

    /// A point-in-time snapshot of this façade's counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn validate_key(key: &str) -> Result<(), CacheError<B::Error>> {
        if key.trim().is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(())
    }

    fn validate_tag(tag: &str) -> Result<(), CacheError<B::Error>> {
        if tag.trim().is_empty() {
            return Err(CacheError::InvalidTag);
        }
        Ok(())
    }

    /// Removes `key` from the façade's own view: drops it from the tracked-key
    /// set (incrementing `evictions` iff it was tracked) and detaches its tags.
    fn evict(&self, key: &str) {
        if self.tracked_keys.remove(key).is_some() {
            self.metrics.record_eviction();
        }
        self.tags.detach(key);
    }

    /// Looks up `key`. Returns `None` on miss or expiry.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<B::Value>, CacheError<B::Error>> {
        Self::validate_key(key)?;
        let outcome = self.backend_get(key, cancel).await?;
        match outcome {
            GetOutcome::Hit(value, _) => {
                tracing::trace!(key, outcome = "hit");
                self.metrics.record_hit();
                Ok(Some(value))
            }
            GetOutcome::Stale(value, _) => {
                tracing::trace!(key, outcome = "stale");
                self.metrics.record_stale_hit();
                Ok(Some(value))
            }
            GetOutcome::Expired => {
                tracing::trace!(key, outcome = "expired");
                self.evict(key);
                Ok(None)
            }
            GetOutcome::Miss => {
                tracing::trace!(key, outcome = "miss");
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    /// Whether `key` currently resolves to a fresh or stale entry. Performs the
    /// same metric and eviction bookkeeping as [`Self::get`].
    pub async fn exists(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, CacheError<B::Error>> {
        Ok(self.get(key, cancel).await?.is_some())
    }

    async fn backend_get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<GetOutcome<B::Value>, CacheError<B::Error>> {
        tokio::select! {
            result = self.backend.get(key) => result.map_err(CacheError::Backend),
            () = cancel.cancelled() => Err(CacheError::Cancelled),
        }
    }

    /// Resolves TTL/sliding/stale from `options` and writes `value` at `key`.
    #[tracing::instrument(skip(self, value, cancel))]
    pub async fn set(
        &self,
        key: &str,
        value: B::Value,
        options: SetOptions,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError<B::Error>> {
        Self::validate_key(key)?;
        for tag in &options.tags {
            Self::validate_tag(tag)?;
        }

        let category = options
            .category
            .as_ref()
            .and_then(|name| self.categories.load().get(name).cloned());
        let now = self.config.clock.now_millis();
        let metadata = ttl::resolve(&options, category.as_ref(), &self.config, now)?;

        tokio::select! {
            result = self.backend.set(key, metadata, value) => result.map_err(CacheError::Backend)?,
            () = cancel.cancelled() => return Err(CacheError::Cancelled),
        };

        let newly_installed = self.tracked_keys.insert(key.to_string());
        self.metrics.record_set();
        if newly_installed {
            self.metrics.inc_size();
        }
        self.tags.associate(key, &options.tags);
        Ok(())
    }

    /// Removes `key`. Idempotent; decrements `size` only if `key` was tracked.
    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<(), CacheError<B::Error>> {
        Self::validate_key(key)?;
        tokio::select! {
            result = self.backend.remove(key) => result.map_err(CacheError::Backend)?,
            () = cancel.cancelled() => return Err(CacheError::Cancelled),
        };
        if self.tracked_keys.remove(key).is_some() {
            self.metrics.dec_size();
        }
        self.metrics.record_removal();
        self.tags.detach(key);
        Ok(())
    }

    /// Removes every key currently associated with `tag`. A no-op if the tag
    /// has no keys.
    pub async fn invalidate_tag(&self, tag: &str, cancel: &CancellationToken) -> Result<(), CacheError<B::Error>> {
        self.invalidate_tags(std::slice::from_ref(&tag.to_string()), cancel).await
    }

    /// Removes every key associated with any tag in `tags`. An empty slice is
    /// a no-op.
    pub async fn invalidate_tags(
        &self,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), CacheError<B::Error>> {
        if tags.is_empty() {
            return Ok(());
        }
        for tag in tags {
            Self::validate_tag(tag)?;
        }

        let mut keys = BTreeSet::new();
        for tag in tags {
            keys.extend(self.tags.keys_for(tag));
        }

        for key in keys {
            if cancel.is_cancelled() {
                return Err(CacheError::Cancelled);
            }
            self.remove(&key, cancel).await?;
        }
        Ok(())
    }
}

impl<B> Cache<B>
where
    B: Backend + 'static,
    B::Value: Clone,
{
    /// Cache-aside lookup with stampede protection and stale-while-revalidate.
    ///
    /// On a fresh hit, returns it directly. On a stale hit with SWR enabled,
    /// schedules a detached background refresh and returns the stale value
    /// immediately. Otherwise populates synchronously, coalescing concurrent
    /// callers for the same key through the single-flight when stampede
    /// protection is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`GetOrSetError::Cache`] for validation/config/backend/cancellation
    /// failures, or [`GetOrSetError::Factory`] if `factory` fails (nothing is
    /// written to the cache in that case).
    pub async fn get_or_set<F, Fut, E>(
        self: &Arc<Self>,
        key: &str,
        factory: F,
        options: SetOptions,
        cancel: &CancellationToken,
    ) -> Result<B::Value, GetOrSetError<B::Error, E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<B::Value, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::validate_key(key).map_err(GetOrSetError::Cache)?;

        let outcome = self
            .backend_get(key, cancel)
            .await
            .map_err(GetOrSetError::Cache)?;

        match outcome {
            GetOutcome::Hit(value, _) => {
                self.metrics.record_hit();
                Ok(value)
            }
            GetOutcome::Stale(value, _) => {
                self.metrics.record_stale_hit();
                if self.config.enable_stale_while_revalidate {
                    self.schedule_background_refresh(key, factory, options);
                    Ok(value)
                } else {
                    self.populate(key, factory, options, false, cancel).await
                }
            }
            GetOutcome::Expired => {
                self.evict(key);
                self.populate(key, factory, options, true, cancel).await
            }
            GetOutcome::Miss => self.populate(key, factory, options, false, cancel).await,
        }
    }

    async fn populate<F, Fut, E>(
        self: &Arc<Self>,
        key: &str,
        factory: F,
        options: SetOptions,
        eviction_already_recorded: bool,
        cancel: &CancellationToken,
    ) -> Result<B::Value, GetOrSetError<B::Error, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B::Value, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let _lease = if self.config.enable_stampede_protection {
            let lease = self
                .single_flight
                .acquire(key, cancel)
                .await
                .ok_or(GetOrSetError::Cache(CacheError::Cancelled))?;

            match self.backend_get(key, cancel).await.map_err(GetOrSetError::Cache)? {
                GetOutcome::Hit(value, _) => {
                    self.metrics.record_hit();
                    return Ok(value);
                }
                GetOutcome::Expired if !eviction_already_recorded => self.evict(key),
                _ => {}
            }
            Some(lease)
        } else {
            None
        };

        self.metrics.record_miss();
        let value = factory().await.map_err(GetOrSetError::Factory)?;
        self.set(key, value.clone(), options, cancel)
            .await
            .map_err(GetOrSetError::Cache)?;
        Ok(value)
    }

    /// Attempts a non-blocking refresh of `key` in a detached task. If a
    /// refresh for `key` is already running, does nothing -- at most one
    /// background refresh per key runs at a time.
    fn schedule_background_refresh<F, Fut, E>(self: &Arc<Self>, key: &str, factory: F, options: SetOptions)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<B::Value, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Some(lease) = self.single_flight.try_acquire(key) else {
            tracing::debug!(key, "background refresh already in flight, skipping");
            return;
        };

        let this = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            let _lease = lease;
            // Independent cancellation scope: the caller's token never reaches here.
            let cancel = CancellationToken::new();
            match factory().await {
                Ok(value) => {
                    if let Err(err) = this.set(&key, value, options, &cancel).await {
                        tracing::error!(key, error = %err, "background refresh failed to write cache");
                    }
                }
                Err(err) => {
                    tracing::error!(key, error = %err, "background refresh factory failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::object::ObjectBackend;
    use cachekit_core::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache_with_clock<V>(clock: ManualClock) -> Arc<Cache<ObjectBackend<V>>> {
        let clock: cachekit_core::Clock = Arc::new(clock);
        let backend = ObjectBackend::new(Arc::clone(&clock));
        let config = CacheConfig {
            clock,
            ..CacheConfig::default()
        };
        Arc::new(Cache::new(backend, config).unwrap())
    }

    #[tokio::test]
    async fn set_then_get_reports_hit_and_size() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();
        cache
            .set("item", Arc::new("value".to_string()), SetOptions::new(), &cancel)
            .await
            .unwrap();
        let got = cache.get("item", &cancel).await.unwrap().unwrap();
        assert_eq!(*got, "value");
        let snap = cache.metrics();
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.sets, 1);
        assert_eq!(snap.size, 1);
    }

    #[tokio::test]
    async fn get_missing_key_reports_miss() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();
        assert!(cache.get("missing", &cancel).await.unwrap().is_none());
        assert_eq!(cache.metrics().misses, 1);
        assert_eq!(cache.metrics().size, 0);
    }

    #[tokio::test]
    async fn empty_key_is_rejected_without_touching_state() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();
        let err = cache.get("  ", &cancel).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey));
        assert_eq!(cache.metrics(), MetricsSnapshot::default());
    }

    #[tokio::test]
    async fn invalidate_tag_removes_tagged_keys() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();
        cache
            .set(
                "p",
                Arc::new("v".to_string()),
                SetOptions::new().with_tags(["products".to_string()]),
                &cancel,
            )
            .await
            .unwrap();
        cache.invalidate_tag("products", &cancel).await.unwrap();
        assert!(cache.get("p", &cancel).await.unwrap().is_none());
        assert_eq!(cache.metrics().size, 0);
    }

    #[tokio::test]
    async fn get_or_set_populates_on_miss() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);

        let value: Result<Arc<String>, std::convert::Infallible> = cache
            .get_or_set(
                "k",
                move || {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    async { Ok(Arc::new("computed".to_string())) }
                },
                SetOptions::new(),
                &cancel,
            )
            .await;
        assert_eq!(*value.unwrap(), "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().size, 1);
    }

    #[tokio::test]
    async fn get_or_set_concurrent_miss_runs_factory_once() {
        let cache = cache_with_clock(ManualClock::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                let result: Result<Arc<u32>, std::convert::Infallible> = cache
                    .get_or_set(
                        "k",
                        move || {
                            let calls = Arc::clone(&calls);
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(20)).await;
                                Ok(Arc::new(42))
                            }
                        },
                        SetOptions::new(),
                        &cancel,
                    )
                    .await;
                *result.unwrap()
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_set_factory_error_writes_nothing() {
        let cache = cache_with_clock(ManualClock::new(0));
        let cancel = CancellationToken::new();

        let result: Result<Arc<String>, GetOrSetError<std::convert::Infallible, &'static str>> = cache
            .get_or_set(
                "k",
                || async { Err::<Arc<String>, _>("boom") },
                SetOptions::new(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(GetOrSetError::Factory("boom"))));
        assert!(cache.get("k", &cancel).await.unwrap().is_none());
        assert_eq!(cache.metrics().misses, 2); // populate's miss, then the get() re-check
    }

    #[tokio::test]
    async fn stale_hit_with_swr_returns_stale_value_without_waiting_for_refresh() {
        let clock = ManualClock::new(0);
        let cache = cache_with_clock(clock.clone());
        let cancel = CancellationToken::new();
        cache
            .set(
                "x",
                Arc::new(1u32),
                SetOptions::new()
                    .with_ttl(Duration::from_secs(5))
                    .with_stale_ttl(Duration::from_secs(30)),
                &cancel,
            )
            .await
            .unwrap();
        clock.advance(6_000);

        let result: Result<Arc<u32>, std::convert::Infallible> = cache
            .get_or_set(
                "x",
                || async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(Arc::new(2))
                },
                SetOptions::new().with_ttl(Duration::from_secs(5)).with_stale_ttl(Duration::from_secs(30)),
                &cancel,
            )
            .await;
        assert_eq!(*result.unwrap(), 1);
        assert_eq!(cache.metrics().stale_hits, 1);
    }

    #[tokio::test]
    async fn stale_hit_background_refresh_becomes_visible_to_a_later_get() {
        let clock = ManualClock::new(0);
        let cache = cache_with_clock(clock.clone());
        let cancel = CancellationToken::new();
        cache
            .set(
                "x",
                Arc::new(1u32),
                SetOptions::new().with_ttl(Duration::from_secs(5)).with_stale_ttl(Duration::from_secs(30)),
                &cancel,
            )
            .await
            .unwrap();
        clock.advance(6_000);

        let result: Result<Arc<u32>, std::convert::Infallible> = cache
            .get_or_set(
                "x",
                || async { Ok(Arc::new(2)) },
                SetOptions::new().with_ttl(Duration::from_secs(5)).with_stale_ttl(Duration::from_secs(30)),
                &cancel,
            )
            .await;
        assert_eq!(*result.unwrap(), 1, "stale get_or_set must return the old value immediately");

        // Let the detached background refresh run to completion.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let refreshed = cache.get("x", &cancel).await.unwrap().unwrap();
        assert_eq!(*refreshed, 2, "a later get must observe the background-refreshed value");
        assert_eq!(cache.metrics().hits, 1);
    }

    #[tokio::test]
    async fn stale_hit_swr_runs_background_refresh_at_most_once_under_concurrency() {
        let clock = ManualClock::new(0);
        let cache = cache_with_clock(clock.clone());
        let cancel = CancellationToken::new();
        cache
            .set(
                "x",
                Arc::new(1u32),
                SetOptions::new().with_ttl(Duration::from_secs(5)).with_stale_ttl(Duration::from_secs(30)),
                &cancel,
            )
            .await
            .unwrap();
        clock.advance(6_000);

        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let refresh_calls = Arc::clone(&refresh_calls);
            handles.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                let result: Result<Arc<u32>, std::convert::Infallible> = cache
                    .get_or_set(
                        "x",
                        move || {
                            let refresh_calls = Arc::clone(&refresh_calls);
                            async move {
                                refresh_calls.fetch_add(1, Ordering::SeqCst);
                                Ok(Arc::new(2))
                            }
                        },
                        SetOptions::new().with_ttl(Duration::from_secs(5)).with_stale_ttl(Duration::from_secs(30)),
                        &cancel,
                    )
                    .await;
                *result.unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 1, "every concurrent stale reader gets the old value");
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }
}
