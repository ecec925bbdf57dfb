//! Entry metadata: TTL/sliding/stale arithmetic and freshness classification.

/// Result of classifying an [`EntryMetadata`] against a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Within the TTL (or sliding) window; safe to serve directly.
    Fresh,
    /// Past the TTL but within the stale window; servable under SWR.
    Stale,
    /// Past the stale window (or past the TTL with no stale window).
    Expired,
}

/// Metadata carried alongside every cached value, independent of the backend.
///
/// Immutable after construction. A sliding entry's `absolute_expiration` is
/// recomputed (via [`EntryMetadata::refreshed`]) on every fresh read rather than
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// UTC instant of creation, milliseconds since the Unix epoch.
    pub created_at: i64,
    /// UTC instant at which the entry becomes non-fresh. Zero means "never expires".
    pub absolute_expiration: i64,
    /// Sliding window length in milliseconds; zero means not a sliding entry.
    pub sliding_window_millis: i64,
    /// Stale window length in milliseconds; zero means no stale window.
    pub stale_window_millis: i64,
}

impl EntryMetadata {
    /// Builds metadata for an entry created `now`, expiring at `absolute_expiration`
    /// (0 = never), with the given sliding and stale window lengths (0 = none).
    #[must_use]
    pub fn new(
        now: i64,
        absolute_expiration: i64,
        sliding_window_millis: i64,
        stale_window_millis: i64,
    ) -> Self {
        Self {
            created_at: now,
            absolute_expiration,
            sliding_window_millis,
            stale_window_millis,
        }
    }

    /// Whether this entry recomputes its expiration on every fresh read.
    #[must_use]
    pub fn is_sliding(&self) -> bool {
        self.sliding_window_millis != 0
    }

    /// The instant after which the entry is no longer even servable as stale.
    ///
    /// `0` if the entry never expires.
    #[must_use]
    pub fn stale_deadline(&self) -> i64 {
        if self.absolute_expiration == 0 {
            0
        } else {
            self.absolute_expiration + self.stale_window_millis
        }
    }

    /// Classifies this entry against `now`.
    #[must_use]
    pub fn classify(&self, now: i64) -> Freshness {
        if self.absolute_expiration == 0 || now <= self.absolute_expiration {
            return Freshness::Fresh;
        }
        if self.stale_window_millis != 0 && now <= self.stale_deadline() {
            return Freshness::Stale;
        }
        Freshness::Expired
    }

    /// Returns a copy with the absolute expiration recomputed as `now + sliding_window`.
    ///
    /// `created_at`, `sliding_window_millis`, and `stale_window_millis` are preserved.
    /// Only meaningful when [`Self::is_sliding`] is true.
    #[must_use]
    pub fn refreshed(&self, now: i64) -> Self {
        Self {
            absolute_expiration: now + self.sliding_window_millis,
            ..*self
        }
    }
}
