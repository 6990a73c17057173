//! Token bucket configuration.

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Token bucket settings, fixed at process start.
///
/// One bucket exists per caller key. Every bucket refills at `rate_per_second`
/// and holds at most `burst` tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Steady-state refill rate in tokens per second. Fractions are allowed.
    pub rate_per_second: f64,
    /// Bucket capacity, which is also the largest instantaneous burst.
    pub burst: u32,
    /// Minimum time a bucket must stay unused before it may be evicted.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,
    /// Minimum time between two opportunistic eviction sweeps.
    #[serde(deserialize_with = "deserialize_duration")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 0.3,
            burst: 5,
            idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Time an empty bucket needs to refill to capacity.
    pub fn full_refill(&self) -> Duration {
        Duration::try_from_secs_f64(f64::from(self.burst) / self.rate_per_second).unwrap_or(Duration::MAX)
    }

    /// The idle threshold actually used for eviction.
    ///
    /// Never shorter than [`Self::full_refill`], so an idle bucket past this
    /// threshold has refilled to capacity, give or take a nanosecond of rounding.
    pub fn effective_idle_timeout(&self) -> Duration {
        self.idle_timeout.max(self.full_refill())
    }
}
