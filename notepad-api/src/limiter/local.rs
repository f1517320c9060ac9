//! In-process rate limiter.
//!
//! One governor bucket per (scope, IP), held in a `DashMap`. Counters are
//! per process: behind a load balancer each instance enforces its own budget.

use async_trait::async_trait;
use dashmap::DashMap;
use governor::{clock::Clock, clock::DefaultClock, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{LimiterError, RateDecision, RateLimitKey, RateLimitPolicy, RateLimitScope, RateLimiter};

/// Type alias for the rate limiter we use.
type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    DefaultClock,
>;

struct Entry {
    limiter: Arc<DirectRateLimiter>,
    last_seen: Instant,
}

/// Rate limiter backed by in-memory governor buckets.
#[derive(Clone)]
pub struct LocalRateLimiter {
    policy: RateLimitPolicy,
    /// Per-key buckets - DashMap for lock-free concurrent access
    entries: Arc<DashMap<RateLimitKey, Entry>>,
}

impl LocalRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn quota(&self, scope: RateLimitScope) -> Quota {
        let per_minute = self.scaled_to_minute(self.policy.limit_for(scope));
        Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(self.policy.burst_for(scope)).unwrap_or(NonZeroU32::MIN))
    }

    /// Governor quotas are expressed per minute; convert from the window.
    fn scaled_to_minute(&self, per_window: u32) -> u32 {
        let window = self.policy.window_secs();
        if window == 60 {
            return per_window;
        }
        let scaled = (u64::from(per_window) * 60).div_ceil(window);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// How long a bucket must sit idle before it is indistinguishable from a
    /// fresh one: one window, or the full refill time if that is longer.
    fn idle_after(&self, scope: RateLimitScope) -> Duration {
        let limit = self.policy.limit_for(scope);
        let burst = self.policy.burst_for(scope);
        let refill = self.policy.window.mul_f64(f64::from(burst) / f64::from(limit));
        self.policy.window.max(refill)
    }
}

#[async_trait]
impl RateLimiter for LocalRateLimiter {
    async fn check(&self, key: &RateLimitKey) -> Result<RateDecision, LimiterError> {
        let limiter = {
            let mut entry = self.entries.entry(key.clone()).or_insert_with(|| Entry {
                limiter: Arc::new(governor::RateLimiter::direct(self.quota(key.scope))),
                last_seen: Instant::now(),
            });
            entry.last_seen = Instant::now();
            entry.limiter.clone()
        };

        match limiter.check() {
            Ok(_) => Ok(RateDecision::Allowed {
                limit: self.policy.limit_for(key.scope),
            }),
            Err(not_until) => {
                let retry_after_secs = not_until
                    .wait_time_from(DefaultClock::default().now())
                    .as_secs()
                    .max(1); // Minimum 1 second
                Ok(RateDecision::Limited { retry_after_secs })
            }
        }
    }

    async fn sweep(&self) -> Result<u64, LimiterError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| now.duration_since(entry.last_seen) < self.idle_after(key.scope));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
