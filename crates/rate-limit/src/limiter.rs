//! Token bucket rate limiter.

use std::sync::{Mutex, TryLockError};
use std::time::Duration;

use config::RateLimitConfig;
use tokio::time::Instant;

use crate::bucket::Bucket;
use crate::error::RateLimitError;
use crate::storage::{BucketStore, InMemoryStorage};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed. One token was consumed.
    Admitted {
        /// Whole tokens left in the bucket.
        remaining: u32,
    },
    /// The request must not proceed. No token was consumed.
    Rejected {
        /// Time until the next whole token is available.
        retry_after: Duration,
    },
}

impl Decision {
    /// Whether the request was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// Time to wait before retrying, if rejected.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Admitted { .. } => None,
            Decision::Rejected { retry_after } => Some(*retry_after),
        }
    }
}

/// Admission control limiting each caller key to a sustained rate with a burst allowance.
///
/// Buckets are created full on first use of a key and refill continuously at
/// `rate_per_second`, up to `burst` tokens. Every admitted request consumes one
/// token. Buckets idle for at least [`RateLimitConfig::effective_idle_timeout`]
/// and back at capacity are dropped by an opportunistic sweep; a new one
/// created in their place decides exactly the same.
pub struct RateLimiter<S = InMemoryStorage> {
    rate_per_second: f64,
    capacity: f64,
    idle_timeout: Duration,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
    storage: S,
}

impl RateLimiter<InMemoryStorage> {
    /// Create a limiter backed by in-memory storage.
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        Self::with_storage(config, InMemoryStorage::new())
    }
}

impl<S: BucketStore> RateLimiter<S> {
    /// Create a limiter owning the given storage.
    pub fn with_storage(config: &RateLimitConfig, storage: S) -> Result<Self, RateLimitError> {
        if !config.rate_per_second.is_finite() || config.rate_per_second <= 0.0 {
            return Err(RateLimitError::InvalidRate(config.rate_per_second));
        }

        if config.burst == 0 {
            return Err(RateLimitError::InvalidBurst);
        }

        let idle_timeout = config.effective_idle_timeout();

        log::info!(
            "Rate limiter configured: {} tokens/second, burst of {}, idle buckets evicted after {idle_timeout:?}",
            config.rate_per_second,
            config.burst
        );

        Ok(Self {
            rate_per_second: config.rate_per_second,
            capacity: f64::from(config.burst),
            idle_timeout,
            sweep_interval: config.sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
            storage,
        })
    }

    /// Admits or rejects a request for `key` at the current instant.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.check(key).is_admitted()
    }

    /// Admits or rejects a request for `key` at `now`.
    pub fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        self.check_at(key, now).is_admitted()
    }

    /// Decides on a request for `key` at the current instant.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Decides on a request for `key` at `now`.
    ///
    /// The refilled state is stored whether or not the request is admitted.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        self.maybe_sweep(now);

        let decision = self.storage.update(
            key,
            || Bucket::full(self.capacity, now),
            |bucket| {
                bucket.refill(now, self.rate_per_second, self.capacity);

                if bucket.try_take() {
                    Decision::Admitted {
                        remaining: bucket.tokens() as u32,
                    }
                } else {
                    Decision::Rejected {
                        retry_after: bucket.time_until_token(self.rate_per_second),
                    }
                }
            },
        );

        match decision {
            Decision::Admitted { remaining } => {
                log::debug!("Request admitted for key '{key}', {remaining} tokens remaining");
            }
            Decision::Rejected { retry_after } => {
                log::debug!("Request rejected for key '{key}', retry after {retry_after:?}");
            }
        }

        decision
    }

    /// The stored bucket for `key`, as of its last refill.
    pub fn peek(&self, key: &str) -> Option<Bucket> {
        self.storage.get(key)
    }

    /// Drops every bucket idle for at least the eviction threshold, returning how many were dropped.
    ///
    /// A bucket is only dropped once it has refilled to capacity, even if rounding
    /// leaves it a hair short after the threshold.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let evicted = self.storage.retain(|_, bucket| {
            bucket.idle_for(now) < self.idle_timeout || !bucket.is_full_at(now, self.rate_per_second, self.capacity)
        });

        if evicted > 0 {
            log::debug!("Evicted {evicted} idle rate limit buckets, {} remaining", self.storage.len());
        }

        evicted
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether no bucket is live.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Steady-state refill rate in tokens per second.
    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    /// Bucket capacity.
    pub fn burst(&self) -> u32 {
        self.capacity as u32
    }

    fn maybe_sweep(&self, now: Instant) {
        // Whoever holds the lock is already sweeping; the others carry on.
        let mut last_sweep = match self.last_sweep.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };

        if now.saturating_duration_since(*last_sweep) < self.sweep_interval {
            return;
        }

        *last_sweep = now;
        self.evict_idle(now);
    }
}
