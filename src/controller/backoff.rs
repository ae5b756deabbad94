//! # Exponential Backoff
//!
//! Provides a randomized exponential backoff for bounded retry loops.
//!
//! The delay before retrying attempt `n` is `2^n` seconds plus a uniformly
//! random jitter in `[0, 2s)`; attempt 1 waits between 2s and 4s.
//!
//! The calculator is stateless: callers pass the attempt number and own the
//! attempt budget. The health prober and the registrar share it so both back
//! off at the same cadence.
//!
//! ## Usage
//!
//! ```rust
//! use service_registrar::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::default();
//! let delay = backoff.next_delay(1);
//! assert!(delay >= Duration::from_secs(2));
//! assert!(delay < Duration::from_secs(4));
//! ```

use crate::constants::{BACKOFF_BASE_MS, BACKOFF_JITTER_MS, BACKOFF_MAX_EXPONENT};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Randomized exponential backoff calculator
///
/// `delay(attempt) = base * 2^attempt + uniform(0, jitter)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Base delay in milliseconds, multiplied by `2^attempt`
    base_ms: u64,
    /// Exclusive upper bound of the random jitter in milliseconds
    jitter_ms: u64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(BACKOFF_BASE_MS, BACKOFF_JITTER_MS)
    }
}

impl ExponentialBackoff {
    /// Create a backoff with the given base and jitter bound (milliseconds)
    #[must_use]
    pub fn new(base_ms: u64, jitter_ms: u64) -> Self {
        Self { base_ms, jitter_ms }
    }

    /// Deterministic part of the delay for `attempt`
    ///
    /// The exponent saturates at `BACKOFF_MAX_EXPONENT` so large attempt
    /// numbers cannot overflow.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(BACKOFF_MAX_EXPONENT);
        Duration::from_millis(self.base_ms.saturating_mul(1u64 << exponent))
    }

    /// Exclusive upper bound of the delay for `attempt`
    #[must_use]
    pub fn max_delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(self.jitter_ms)
    }

    /// Delay to wait before the attempt after `attempt`, using thread-local randomness
    ///
    /// # Example
    ///
    /// ```
    /// use service_registrar::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let delay = ExponentialBackoff::default().next_delay(3);
    /// assert!(delay >= Duration::from_secs(8));
    /// assert!(delay < Duration::from_secs(10));
    /// ```
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.next_delay_with(attempt, &mut rand::thread_rng())
    }

    /// Delay for `attempt` drawing the jitter from `rng`
    pub fn next_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..self.jitter_ms)
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }
}

/// Suspension point between retries
///
/// Retry loops sleep through this trait so tests can record the requested
/// delays instead of waiting them out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
