//! Error types shared by the metadata resolver and envelope codec.

use thiserror::Error;

/// Failure resolving or validating TTL/sliding/stale configuration.
///
/// Raised by the TTL resolver in `cachekit` and by [`crate::metadata::EntryMetadata`]
/// construction helpers; never touches cache state (see the caller/configuration
/// error split in the crate documentation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `ttl` and `sliding` were both set at the same precedence layer.
    #[error("ttl and sliding are mutually exclusive")]
    TtlAndSlidingBothSet,
    /// A duration that must be strictly positive was zero or negative.
    #[error("duration must be strictly positive")]
    NonPositiveDuration,
    /// The global default TTL was not configured (or was zero).
    #[error("default_ttl must be set to a positive duration")]
    MissingDefaultTtl,
}

/// Failure decoding a byte-mode envelope.
///
/// Any of these causes the byte backend to purge the key and report it as
/// expired rather than surfacing a decode error to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The blob was shorter than the fixed 36-byte header.
    #[error("envelope shorter than header: {len} bytes")]
    Truncated {
        /// Length of the blob that was decoded.
        len: usize,
    },
    /// The header's payload length field was negative.
    #[error("envelope payload length is negative: {declared}")]
    NegativePayloadLength {
        /// The raw (negative) length read from the header.
        declared: i32,
    },
    /// The blob was shorter than `header + declared payload length`.
    #[error("envelope payload truncated: declared {declared} bytes, found {found}")]
    PayloadTruncated {
        /// Declared payload length from the header.
        declared: u32,
        /// Bytes actually available after the header.
        found: usize,
    },
}
