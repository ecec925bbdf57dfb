//! Dependency-free value types shared by the cache façade: the clock abstraction,
//! entry metadata with TTL/sliding/stale arithmetic, the byte-mode envelope codec,
//! and the error types that cross the crate boundary.
//!
//! No async, no locking, no I/O. Everything here is a pure value type or a trait
//! with no default implementation state, so it can be used from both the façade
//! crate and any downstream caller without pulling in `tokio`.

pub mod clock;
pub mod envelope;
pub mod error;
pub mod metadata;

pub use clock::{Clock, ClockSource, ManualClock, SystemClock};
pub use error::{ConfigError, EnvelopeError};
pub use metadata::{EntryMetadata, Freshness};
