//! Centralized sliding-window rate limiter.
//!
//! Counts live in the `rate_limits` table as fixed windows. A request is
//! judged against an estimate of the sliding window ending now: the previous
//! window's count weighted by how much of it still overlaps, plus the
//! current window's count. All instances sharing the database share budgets.
//!
//! Every request is counted, including rejected ones.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;

use super::{LimiterError, RateDecision, RateLimitKey, RateLimitPolicy, RateLimiter};

/// Sliding-window estimate: `previous * (1 - elapsed_fraction) + current`.
///
/// `elapsed_fraction` is how far into the current window we are, in [0, 1].
pub fn sliding_window_estimate(previous: u64, current: u64, elapsed_fraction: f64) -> f64 {
    let remaining = 1.0 - elapsed_fraction.clamp(0.0, 1.0);
    previous as f64 * remaining + current as f64
}

/// Seconds until the estimate falls back to `limit`, at least 1 and at most
/// one window.
///
/// If the current window alone is at the limit, the caller has to wait for
/// it to end.
pub fn sliding_window_retry_after(
    previous: u64,
    current: u64,
    limit: u64,
    elapsed_secs: u64,
    window_secs: u64,
) -> u64 {
    let window = window_secs.max(1);
    let elapsed = elapsed_secs.min(window);

    let wait = if current >= limit || previous == 0 {
        window - elapsed
    } else {
        // previous * (1 - t/window) + current <= limit
        //   =>  t >= window * (previous - (limit - current)) / previous
        let over = previous.saturating_sub(limit - current);
        let needed = (window * over).div_ceil(previous);
        needed.saturating_sub(elapsed)
    };

    wait.clamp(1, window)
}

/// Rate limiter sharing counters through PostgreSQL.
#[derive(Clone)]
pub struct PgRateLimiter {
    pool: Pool,
    policy: RateLimitPolicy,
}

impl PgRateLimiter {
    pub fn new(pool: Pool, policy: RateLimitPolicy) -> Self {
        Self { pool, policy }
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, LimiterError> {
        self.pool
            .get()
            .await
            .map_err(|e| LimiterError::Backend(format!("pool: {}", e)))
    }
}

fn db_error(err: tokio_postgres::Error) -> LimiterError {
    LimiterError::Backend(err.to_string())
}

#[async_trait]
impl RateLimiter for PgRateLimiter {
    async fn check(&self, key: &RateLimitKey) -> Result<RateDecision, LimiterError> {
        let limit = self.policy.limit_for(key.scope);
        let window_secs = self.policy.window_secs() as i64;

        let now = Utc::now().timestamp();
        let window_start = now - now.rem_euclid(window_secs);
        let previous_start = window_start - window_secs;
        let elapsed_secs = now - window_start;
        let elapsed_fraction = elapsed_secs as f64 / window_secs as f64;

        let key_str = key.to_string();
        let conn = self.conn().await?;

        let row = conn
            .query_one(
                "INSERT INTO rate_limits (key, window_start, hits) VALUES ($1, $2, 1) \
                 ON CONFLICT (key, window_start) DO UPDATE SET hits = rate_limits.hits + 1 \
                 RETURNING hits",
                &[&key_str, &window_start],
            )
            .await
            .map_err(db_error)?;
        let current: i32 = row.try_get(0).map_err(db_error)?;

        let previous: i32 = conn
            .query_opt(
                "SELECT hits FROM rate_limits WHERE key = $1 AND window_start = $2",
                &[&key_str, &previous_start],
            )
            .await
            .map_err(db_error)?
            .map(|row| row.try_get::<_, i32>(0))
            .transpose()
            .map_err(db_error)?
            .unwrap_or(0);

        let previous = previous.max(0) as u64;
        let current = current.max(0) as u64;

        let estimate = sliding_window_estimate(previous, current, elapsed_fraction);
        if estimate <= f64::from(limit) {
            return Ok(RateDecision::Allowed { limit });
        }

        Ok(RateDecision::Limited {
            retry_after_secs: sliding_window_retry_after(
                previous,
                current,
                u64::from(limit),
                elapsed_secs as u64,
                window_secs as u64,
            ),
        })
    }

    async fn sweep(&self) -> Result<u64, LimiterError> {
        let window_secs = self.policy.window_secs() as i64;
        // Anything older than the previous window can no longer be read.
        let cutoff = Utc::now().timestamp() - 2 * window_secs;

        let conn = self.conn().await?;
        conn.execute("DELETE FROM rate_limits WHERE window_start < $1", &[&cutoff])
            .await
            .map_err(db_error)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
