//! # Health Prober
//!
//! Polls `GET /health` until the admin API answers 2xx or the attempt budget
//! runs out. Probes back off exponentially between attempts.

use crate::controller::backoff::Sleeper;
use crate::controller::reconciler::admin::AdminClient;
use crate::controller::reconciler::types::{CallFailure, ReconcilerError};
use crate::controller::retry::{AttemptError, RetryError, RetryPolicy};
use std::convert::Infallible;
use tracing::{info, info_span, Instrument};

/// Block until the admin API is healthy
///
/// # Errors
/// Returns `ReconcilerError::HealthCheckFailed` with the last failure once
/// every attempt has failed
pub async fn wait_until_healthy(
    admin: &AdminClient<'_>,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<(), ReconcilerError> {
    let span = info_span!("registrar.health", admin.url = admin.base_url());
    async move {
        info!("Performing health check against {}", admin.base_url());
        let result = policy
            .run(sleeper, "Health check", |_| async move {
                admin
                    .health()
                    .await
                    .map_err(AttemptError::<CallFailure, Infallible>::Transient)
            })
            .await;

        match result {
            Ok(()) => {
                info!("✅ Admin API is healthy");
                Ok(())
            }
            Err(RetryError::Exhausted {
                attempts,
                last_failure,
            }) => Err(ReconcilerError::HealthCheckFailed {
                attempts,
                last_failure,
            }),
            Err(RetryError::Permanent(never)) => match never {},
        }
    }
    .instrument(span)
    .await
}
