//! # Registrar
//!
//! Registers the handler deployment with `POST /deployments` and checks that
//! the expected service came back.
//!
//! Older runtimes only know `/endpoints`. A 404 on the very first attempt is
//! answered with one immediate request against the legacy path inside the
//! same attempt; later attempts go back to `/deployments`.

use crate::constants::{DEPLOYMENTS_PATH, LEGACY_ENDPOINTS_PATH};
use crate::controller::backoff::Sleeper;
use crate::controller::reconciler::admin::{
    AdminClient, RegisterDeploymentRequest, RegisterDeploymentResponse,
};
use crate::controller::reconciler::types::{CallFailure, ReconcilerError};
use crate::controller::retry::{AttemptError, RetryError, RetryPolicy};
use crate::event::RegistrationRequest;
use tracing::{info, info_span, warn, Instrument};

type RegistrationAttempt =
    Result<RegisterDeploymentResponse, AttemptError<CallFailure, ReconcilerError>>;

/// Register the deployment, retrying transient failures
///
/// # Errors
/// - `ServiceNameMismatch` as soon as a response lacks the expected service
/// - `RegistrationFailed` with the last failure once the budget is spent
pub async fn register_deployment(
    admin: &AdminClient<'_>,
    request: &RegistrationRequest,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<RegisterDeploymentResponse, ReconcilerError> {
    let span = info_span!(
        "registrar.register",
        handler.arn = %request.handler_arn,
        service.expected = request.service_name.as_deref().unwrap_or("")
    );
    async move {
        let body = RegisterDeploymentRequest {
            arn: &request.handler_arn,
            assume_role_arn: request.invoker_role_arn.as_deref(),
        };
        let body = &body;
        info!(
            "Triggering registration at {}{} for {}",
            admin.base_url(),
            DEPLOYMENTS_PATH,
            request.handler_arn
        );

        let result = policy
            .run(sleeper, "Service registration", |attempt| async move {
                let first = match admin.register(DEPLOYMENTS_PATH, body).await {
                    Err(failure) if attempt.is_first() && failure.status_code() == Some(404) => {
                        warn!(
                            "{}{} returned 404, retrying once against legacy path {}",
                            admin.base_url(),
                            DEPLOYMENTS_PATH,
                            LEGACY_ENDPOINTS_PATH
                        );
                        admin.register(LEGACY_ENDPOINTS_PATH, body).await
                    }
                    other => other,
                };
                check_response(first, request)
            })
            .await;

        match result {
            Ok(response) => {
                info!(
                    "✅ Registered deployment {} with {} service(s)",
                    response.id,
                    response.services.len()
                );
                Ok(response)
            }
            Err(RetryError::Permanent(error)) => Err(error),
            Err(RetryError::Exhausted {
                attempts,
                last_failure,
            }) => Err(ReconcilerError::RegistrationFailed {
                attempts,
                last_failure,
            }),
        }
    }
    .instrument(span)
    .await
}

fn check_response(
    response: Result<RegisterDeploymentResponse, CallFailure>,
    request: &RegistrationRequest,
) -> RegistrationAttempt {
    let response = response.map_err(AttemptError::Transient)?;
    let Some(expected) = request.service_name.as_deref() else {
        return Ok(response);
    };
    if response.services.iter().any(|s| s.name == expected) {
        return Ok(response);
    }
    Err(AttemptError::Permanent(ReconcilerError::ServiceNameMismatch {
        expected: expected.to_string(),
        deployment_id: response.id,
        returned: response.services.into_iter().map(|s| s.name).collect(),
    }))
}
