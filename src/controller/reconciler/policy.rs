//! # Error Policies
//!
//! Two ways of walking a list of remote operations:
//!
//! - [`for_each_or_abort`]: the first failure stops the walk and is returned.
//! - [`for_each_best_effort`]: failures are logged and counted; every item is
//!   attempted.
//!
//! Visibility updates use the first, cleanup (pruning, teardown) the second.

use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Tally of a best-effort pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl CleanupReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Apply `operation` to each item in order, stopping at the first error
///
/// Returns the number of items processed.
///
/// # Errors
/// Returns the first error produced by `operation`
pub async fn for_each_or_abort<I, T, E, Op, Fut>(items: I, mut operation: Op) -> Result<usize, E>
where
    I: IntoIterator<Item = T>,
    Op: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut processed = 0;
    for item in items {
        operation(item).await?;
        processed += 1;
    }
    Ok(processed)
}

/// Apply `operation` to every item, logging failures instead of stopping
pub async fn for_each_best_effort<I, T, E, Op, Fut>(
    items: I,
    label: &str,
    mut operation: Op,
) -> CleanupReport
where
    I: IntoIterator<Item = T>,
    T: Display + Clone,
    E: Display,
    Op: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut report = CleanupReport::default();
    for item in items {
        match operation(item.clone()).await {
            Ok(()) => report.succeeded += 1,
            Err(e) => {
                warn!("{} {} failed, continuing: {}", label, item, e);
                report.failed += 1;
            }
        }
    }
    report
}
