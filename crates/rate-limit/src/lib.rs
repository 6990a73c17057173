//! Token bucket rate limiting for the permit gate.
//!
//! This crate provides:
//! - One token bucket per caller key, created lazily and full
//! - Fractional refill from elapsed monotonic time
//! - Per-key serialized updates through an injected [`BucketStore`]
//! - Passive eviction of buckets that have been idle long enough to be full again
//!
//! Reads `tokio::time::Instant`, so tests can drive it with a paused clock.

#![deny(missing_docs)]

mod bucket;
mod error;
mod key;
mod limiter;
mod storage;

pub use bucket::Bucket;
pub use error::{KeyError, RateLimitError};
pub use key::{RateLimitKey, RateLimitKeyBuilder};
pub use limiter::{Decision, RateLimiter};
pub use storage::{BucketStore, InMemoryStorage};
