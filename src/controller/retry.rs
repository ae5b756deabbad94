//! # Bounded Retry
//!
//! Explicit state machine for bounded retry loops:
//!
//! ```text
//! Attempting(n) -> Success
//!               -> Retrying(delay) -> Attempting(n + 1)
//!               -> Exhausted
//! ```
//!
//! The attempt number and the last failure travel through the states as
//! values; nothing is mutated in place. Each attempt reports either a
//! transient failure (retried while budget remains) or a permanent one
//! (returned immediately).

use crate::controller::backoff::{ExponentialBackoff, Sleeper};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// One position in a bounded retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    /// Total attempt budget
    pub max: u32,
}

impl Attempt {
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.number >= self.max
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.number, self.max)
    }
}

/// Failure reported by a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<F, E> {
    /// Retried while attempts remain
    Transient(F),
    /// Ends the loop immediately
    Permanent(E),
}

/// Why a retry loop gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<F, E> {
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last_failure: F },
    /// An attempt failed permanently
    Permanent(E),
}

/// What the loop does after a transient failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision<F> {
    Retrying {
        next: Attempt,
        delay: Duration,
        last_failure: F,
    },
    Exhausted {
        attempts: u32,
        last_failure: F,
    },
}

/// Attempt budget plus backoff cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    /// Create a policy; a budget of zero is raised to a single attempt
    #[must_use]
    pub fn new(max_attempts: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn first(&self) -> Attempt {
        Attempt {
            number: 1,
            max: self.max_attempts,
        }
    }

    /// Transition out of a failed attempt
    pub fn on_failure<F>(&self, attempt: Attempt, failure: F) -> RetryDecision<F> {
        if attempt.is_last() {
            return RetryDecision::Exhausted {
                attempts: attempt.number,
                last_failure: failure,
            };
        }
        RetryDecision::Retrying {
            next: Attempt {
                number: attempt.number + 1,
                max: attempt.max,
            },
            delay: self.backoff.next_delay(attempt.number),
            last_failure: failure,
        }
    }

    /// Drive `operation` until it succeeds, fails permanently, or the budget runs out
    ///
    /// `label` names the operation in log lines.
    pub async fn run<T, F, E, Op, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        label: &str,
        mut operation: Op,
    ) -> Result<T, RetryError<F, E>>
    where
        F: Display,
        Op: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, AttemptError<F, E>>>,
    {
        let mut attempt = self.first();
        loop {
            debug!("{} (attempt {})", label, attempt);
            let failure = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Permanent(error)) => return Err(RetryError::Permanent(error)),
                Err(AttemptError::Transient(failure)) => failure,
            };

            match self.on_failure(attempt, failure) {
                RetryDecision::Retrying {
                    next,
                    delay,
                    last_failure,
                } => {
                    warn!(
                        "{} failed (attempt {}): {}; retrying in {}ms",
                        label,
                        attempt,
                        last_failure,
                        delay.as_millis()
                    );
                    sleeper.sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::Exhausted {
                    attempts,
                    last_failure,
                } => {
                    warn!(
                        "{} failed (attempt {}): {}; giving up",
                        label, attempt, last_failure
                    );
                    return Err(RetryError::Exhausted {
                        attempts,
                        last_failure,
                    });
                }
            }
        }
    }
}
