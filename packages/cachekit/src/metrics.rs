//! Lock-free façade metrics: hit/miss/stale/set/remove/evict/size counters.
//!
//! `AtomicU64` fields with `Relaxed` ordering throughout (per the design
//! notes: snapshot reads may be torn across fields and that is acceptable by
//! design), exposed through a [`MetricsSnapshot`] value type returned by
//! [`Metrics::snapshot`] -- the same shape as the teacher's `MergeKeyResult`
//! snapshot value types in `core-rust`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters backing a façade instance.
#[derive(Debug, Default)]
pub struct Metrics {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
    sets: AtomicU64,
    removals: AtomicU64,
    evictions: AtomicU64,
    size: AtomicU64,
}

impl Metrics {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_size(&self) {
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_size(&self) {
        self.size.fetch_sub(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot. Individual fields may be torn relative
    /// to one another under concurrent mutation; that is acceptable by design.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
        }
    }
}

/// A consistent-enough point-in-time view of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Fresh hits served directly from the backend.
    pub hits: u64,
    /// Lookups that found no entry.
    pub misses: u64,
    /// Hits served from the stale window (SWR or synchronous repopulate).
    pub stale_hits: u64,
    /// Successful `Set` calls, including overwrites.
    pub sets: u64,
    /// Successful `Remove` calls (including tag-driven bulk removes).
    pub removals: u64,
    /// Expired entries purged on read.
    pub evictions: u64,
    /// Keys the façade currently believes are installed.
    pub size: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} stale_hits={} sets={} removals={} evictions={} size={}",
            self.hits, self.misses, self.stale_hits, self.sets, self.removals, self.evictions, self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metrics_snapshot_is_all_zero() {
        assert_eq!(Metrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        m.inc_size();
        let snap = m.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.size, 1);
    }

    #[test]
    fn size_can_decrease() {
        let m = Metrics::new();
        m.inc_size();
        m.inc_size();
        m.dec_size();
        assert_eq!(m.snapshot().size, 1);
    }

    #[test]
    fn display_includes_all_fields() {
        let snap = MetricsSnapshot {
            hits: 1,
            misses: 2,
            stale_hits: 3,
            sets: 4,
            removals: 5,
            evictions: 6,
            size: 7,
        };
        let text = snap.to_string();
        for token in ["hits=1", "misses=2", "stale_hits=3", "sets=4", "removals=5", "evictions=6", "size=7"] {
            assert!(text.contains(token), "missing {token} in {text}");
        }
    }
}
