//! Per-key token bucket state.

use std::time::Duration;

use tokio::time::Instant;

/// Token bucket for a single caller key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    tokens: f64,
    last_refill_at: Instant,
}

impl Bucket {
    /// A bucket holding `capacity` tokens, as created on first use of a key.
    pub fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill_at: now,
        }
    }

    /// Currently available tokens, as of [`Self::last_refill_at`].
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// When the tokens were last recalculated.
    pub fn last_refill_at(&self) -> Instant {
        self.last_refill_at
    }

    /// Adds the tokens accrued since the last refill, capped at `capacity`.
    ///
    /// An instant earlier than the last refill counts as zero elapsed time and
    /// leaves `last_refill_at` untouched.
    pub(crate) fn refill(&mut self, now: Instant, rate_per_second: f64, capacity: f64) {
        let Some(elapsed) = now.checked_duration_since(self.last_refill_at) else {
            return;
        };

        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate_per_second).min(capacity);
        self.last_refill_at = now;
    }

    /// Consumes one token if a whole token is available.
    pub(crate) fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until a whole token is available at the given refill rate.
    pub(crate) fn time_until_token(&self, rate_per_second: f64) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }

        Duration::try_from_secs_f64((1.0 - self.tokens) / rate_per_second).unwrap_or(Duration::MAX)
    }

    /// Whether refilling at `now` would bring the bucket to `capacity`.
    ///
    /// Such a bucket decides exactly like a freshly created one.
    pub(crate) fn is_full_at(&self, now: Instant, rate_per_second: f64, capacity: f64) -> bool {
        self.tokens + self.idle_for(now).as_secs_f64() * rate_per_second >= capacity
    }

    /// Time since the bucket was last touched.
    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refill_at)
    }
}
