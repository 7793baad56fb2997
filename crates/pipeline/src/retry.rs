//! Bounded retry with exponential backoff for generation calls.
//!
//! Each item runs through a small state machine:
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!                       -> Retrying -> Attempting
//!                       -> Failed
//!                       -> FatalAbort
//! ```
//!
//! Transitions are computed by [`RetryPolicy::on_failure`], a pure
//! function, so the policy can be tested without a network. The
//! [`RetryingInvoker`] drives the machine against a real client.

use std::time::Duration;

use agentmint_core::work_item::WorkItem;
use agentmint_fal::client::GenerationClient;
use agentmint_fal::error::GenerationError;
use rand::Rng;

use crate::rate_limit::RateLimiter;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on the computed backoff.
    pub max_delay: Duration,
    /// Upper bound on a server-provided `Retry-After` hint.
    pub max_retry_after: Duration,
    /// Randomise each delay within `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_retry_after: Duration::from_secs(300),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Backoff slept before `attempt` (1-based).
    ///
    /// Zero for the first attempt, then `base_delay * 2^(attempt - 2)`,
    /// clamped to [`max_delay`](Self::max_delay).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Decide the next state after `attempt` failed with `error`.
    ///
    /// A rate-limit hint from the server replaces the computed backoff,
    /// clamped to [`max_retry_after`](Self::max_retry_after).
    pub fn on_failure(&self, attempt: u32, error: &GenerationError) -> AttemptState {
        if error.is_fatal() {
            return AttemptState::FatalAbort;
        }
        if !error.is_retryable() || attempt >= self.max_attempts {
            return AttemptState::Failed;
        }

        let next_attempt = attempt + 1;
        let delay = match error.retry_after() {
            Some(hint) => hint.min(self.max_retry_after),
            None => self.jittered(self.backoff_before(next_attempt)),
        };

        AttemptState::Retrying {
            next_attempt,
            delay,
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let max_ms = delay.as_millis() as u64;
        let min_ms = max_ms / 2;
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Per-item retry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Attempting { attempt: u32 },
    Retrying { next_attempt: u32, delay: Duration },
    Succeeded,
    Failed,
    FatalAbort,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::FatalAbort)
    }
}

/// Transient bookkeeping for one item within one run.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<GenerationError>,
    pub next_delay: Option<Duration>,
    pub state: AttemptState,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            last_error: None,
            next_delay: None,
            state: AttemptState::Pending,
        }
    }

    /// Enter `Attempting` for the next attempt and return its number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.next_delay = None;
        self.state = AttemptState::Attempting {
            attempt: self.attempt,
        };
        self.attempt
    }

    pub fn record_success(&mut self) {
        self.state = AttemptState::Succeeded;
    }

    /// Record a failed attempt and move to the state the policy selects.
    pub fn record_failure(&mut self, error: &GenerationError, policy: &RetryPolicy) -> &AttemptState {
        let next = policy.on_failure(self.attempt, error);
        if let AttemptState::Retrying { delay, .. } = next {
            self.next_delay = Some(delay);
        }
        self.last_error = Some(error.clone());
        self.state = next;
        &self.state
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// Final result of driving one item through the state machine.
#[derive(Debug)]
pub enum InvokeOutcome {
    Succeeded { bytes: Vec<u8>, attempts: u32 },
    Failed { error: GenerationError, attempts: u32 },
    FatalAbort { error: GenerationError, attempts: u32 },
}

impl InvokeOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::FatalAbort { attempts, .. } => *attempts,
        }
    }
}

/// Wraps a [`GenerationClient`] with retry, backoff and rate limiting.
///
/// Before every attempt the invoker waits for a rate-limiter turn. Retry
/// backoff is slept through the limiter, so a retry starts no earlier
/// than backoff plus request spacing after the failed call returned.
pub struct RetryingInvoker<C> {
    client: C,
    policy: RetryPolicy,
    limiter: RateLimiter,
}

impl<C: GenerationClient> RetryingInvoker<C> {
    pub fn new(client: C, policy: RetryPolicy, limiter: RateLimiter) -> Self {
        Self {
            client,
            policy,
            limiter,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate the image for `item`, retrying retryable failures.
    pub async fn invoke(&mut self, item: &WorkItem) -> InvokeOutcome {
        let mut state = RetryState::new();

        loop {
            let attempt = state.begin_attempt();
            self.limiter.wait_turn().await;

            let result = self.client.generate(item).await;
            self.limiter.mark_done();

            let error = match result {
                Ok(bytes) => {
                    state.record_success();
                    return InvokeOutcome::Succeeded {
                        bytes,
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            match state.record_failure(&error, &self.policy).clone() {
                AttemptState::Retrying { delay, .. } => {
                    tracing::warn!(
                        token_id = item.token_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        kind = error.kind(),
                        error = %error,
                        retry_in_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying",
                    );
                    self.limiter.pause(delay).await;
                }
                AttemptState::FatalAbort => {
                    return InvokeOutcome::FatalAbort {
                        error,
                        attempts: attempt,
                    };
                }
                AttemptState::Failed => {
                    tracing::warn!(
                        token_id = item.token_id,
                        attempt,
                        kind = error.kind(),
                        error = %error,
                        "Attempt failed, giving up",
                    );
                    return InvokeOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
                // `on_failure` only yields Retrying, Failed or FatalAbort.
                AttemptState::Pending | AttemptState::Attempting { .. } | AttemptState::Succeeded => {
                    return InvokeOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
