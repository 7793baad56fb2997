//! Minimum spacing between consecutive remote calls.
//!
//! The generator quota is enforced per request, so every attempt
//! (first tries and retries alike) goes through [`RateLimiter::wait_turn`].
//! Spacing is measured from the moment the previous call returned, so a
//! slow call never eats into the gap before the next one. Retry backoff
//! goes through [`RateLimiter::pause`], which adds to the spacing instead
//! of overlapping with it.
//!
//! The limiter is owned by a single sequential flow; running workers
//! concurrently would need a shared token bucket instead.

use std::time::Duration;

use tokio::time::Instant;

/// Default spacing between remote calls.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Enforces at least `delay` between the end of one call and the start
/// of the next.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    delay: Duration,
    released_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            released_at: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspend until `delay` has elapsed since the last call was marked
    /// done (or the last pause ended). The first turn is granted
    /// immediately.
    pub async fn wait_turn(&mut self) {
        if let Some(released) = self.released_at {
            let ready_at = released + self.delay;
            let now = Instant::now();
            if ready_at > now {
                tracing::trace!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Rate limiter holding next request",
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    /// Record that the call granted by the last turn has returned.
    pub fn mark_done(&mut self) {
        self.released_at = Some(Instant::now());
    }

    /// Sleep for `duration`, then restart the spacing window, so the next
    /// turn comes at least `duration + delay` after the last call.
    pub async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
        self.released_at = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_DELAY)
    }
}
