//! TTL resolution: merges per-operation, per-category, and global defaults into
//! a single [`EntryMetadata`].

use std::time::Duration;

use cachekit_core::{ConfigError, EntryMetadata};

use crate::options::{CacheConfig, CategoryConfig, SetOptions};

/// Resolves the effective TTL/sliding/stale configuration for a `Set` call and
/// builds the resulting [`EntryMetadata`] anchored at `now`.
///
/// Precedence, high to low: per-operation options, the named category (if any),
/// global defaults. `ttl` and `sliding` are mutually exclusive at every layer
/// and whichever layer wins determines both fields -- they are never blended
/// across layers.
pub fn resolve(
    options: &SetOptions,
    category: Option<&CategoryConfig>,
    config: &CacheConfig,
    now: i64,
) -> Result<EntryMetadata, ConfigError> {
    if options.ttl.is_some() && options.sliding.is_some() {
        return Err(ConfigError::TtlAndSlidingBothSet);
    }

    let (mut ttl, sliding) = if options.ttl.is_some() || options.sliding.is_some() {
        (options.ttl, options.sliding)
    } else if let Some(cat) = category.filter(|c| c.ttl.is_some() || c.sliding.is_some()) {
        if cat.ttl.is_some() && cat.sliding.is_some() {
            return Err(ConfigError::TtlAndSlidingBothSet);
        }
        (cat.ttl, cat.sliding)
    } else {
        (None, config.default_sliding)
    };

    if ttl.is_none() && sliding.is_none() {
        ttl = Some(config.default_ttl);
    }

    for d in [ttl, sliding].into_iter().flatten() {
        if d.is_zero() {
            return Err(ConfigError::NonPositiveDuration);
        }
    }

    let stale_ttl = options
        .stale_ttl
        .or_else(|| category.and_then(|c| c.stale_ttl))
        .or(config.default_stale_ttl);
    if let Some(d) = stale_ttl {
        if d.is_zero() {
            return Err(ConfigError::NonPositiveDuration);
        }
    }

    let window = sliding.or(ttl).expect("ttl defaulted above when both unset");
    let absolute_expiration = now + millis(window);
    let sliding_millis = sliding.map(millis).unwrap_or(0);
    let stale_millis = stale_ttl.map(millis).unwrap_or(0);

    Ok(EntryMetadata::new(
        now,
        absolute_expiration,
        sliding_millis,
        stale_millis,
    ))
}

fn millis(d: Duration) -> i64 {
    d.as_millis() as i64
}
