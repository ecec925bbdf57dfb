//! Per-operation options, global configuration, and category defaults.

use std::time::Duration;

use cachekit_core::{Clock, ConfigError};

/// Options accepted by `Cache::set` and `Cache::get_or_set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Absolute TTL. Mutually exclusive with `sliding`.
    pub ttl: Option<Duration>,
    /// Sliding window; expiry resets on every fresh read. Mutually exclusive with `ttl`.
    pub sliding: Option<Duration>,
    /// Enables stale-while-revalidate for this entry with the given window.
    pub stale_ttl: Option<Duration>,
    /// Tags for bulk invalidation. May be empty.
    pub tags: Vec<String>,
    /// Selects a registered category's defaults for any field left unset here.
    pub category: Option<String>,
}

impl SetOptions {
    /// An empty options record: no explicit TTL/sliding/stale, no tags, no category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets a sliding expiration window.
    #[must_use]
    pub fn with_sliding(mut self, sliding: Duration) -> Self {
        self.sliding = Some(sliding);
        self
    }

    /// Enables stale-while-revalidate with the given stale window.
    #[must_use]
    pub fn with_stale_ttl(mut self, stale_ttl: Duration) -> Self {
        self.stale_ttl = Some(stale_ttl);
        self
    }

    /// Attaches tags for bulk invalidation.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Selects a registered category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Per-category default options, registered once and selected by name thereafter.
///
/// Mirrors [`SetOptions`] minus `tags`/`category`, which are always per-operation.
#[derive(Debug, Clone, Default)]
pub struct CategoryConfig {
    /// Absolute TTL default for this category.
    pub ttl: Option<Duration>,
    /// Sliding window default for this category.
    pub sliding: Option<Duration>,
    /// Stale window default for this category.
    pub stale_ttl: Option<Duration>,
}

/// Global cache configuration: the lowest-precedence layer of the TTL resolver.
///
/// Built with a hand-written `Default`, matching `ServerConfig::default()` and
/// `NetworkConfig::default()` in the teacher repo rather than a builder macro --
/// the core never reads this from a file or environment variable.
#[derive(Clone)]
pub struct CacheConfig {
    /// Required fallback TTL used when nothing else resolves one. Must be positive.
    pub default_ttl: Duration,
    /// Fallback sliding window used only when no TTL/sliding is set anywhere else.
    pub default_sliding: Option<Duration>,
    /// Fallback stale window used when no per-operation or per-category value is set.
    pub default_stale_ttl: Option<Duration>,
    /// Whether `get_or_set` coalesces concurrent population of the same missing key.
    pub enable_stampede_protection: bool,
    /// Whether stale hits trigger a background refresh instead of a synchronous one.
    pub enable_stale_while_revalidate: bool,
    /// Clock used for every timing decision in the cache.
    pub clock: Clock,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("default_ttl", &self.default_ttl)
            .field("default_sliding", &self.default_sliding)
            .field("default_stale_ttl", &self.default_stale_ttl)
            .field("enable_stampede_protection", &self.enable_stampede_protection)
            .field("enable_stale_while_revalidate", &self.enable_stale_while_revalidate)
            .finish_non_exhaustive()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            default_sliding: None,
            default_stale_ttl: None,
            enable_stampede_protection: true,
            enable_stale_while_revalidate: true,
            clock: cachekit_core::clock::system_clock(),
        }
    }
}

impl CacheConfig {
    /// Validates the global defaults: `default_ttl` positive, and any optional
    /// default duration, if set, positive.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl.is_zero() {
            return Err(ConfigError::MissingDefaultTtl);
        }
        for d in [self.default_sliding, self.default_stale_ttl].into_iter().flatten() {
            if d.is_zero() {
                return Err(ConfigError::NonPositiveDuration);
            }
        }
        Ok(())
    }
}

/// Validates a category's options record at registration time.
pub(crate) fn validate_category(category: &CategoryConfig) -> Result<(), ConfigError> {
    if category.ttl.is_some() && category.sliding.is_some() {
        return Err(ConfigError::TtlAndSlidingBothSet);
    }
    for d in [category.ttl, category.sliding, category.stale_ttl]
        .into_iter()
        .flatten()
    {
        if d.is_zero() {
            return Err(ConfigError::NonPositiveDuration);
        }
    }
    Ok(())
}
