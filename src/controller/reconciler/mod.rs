//! # Reconciler
//!
//! Converges the runtime's registration state to one immutable
//! [`RegistrationRequest`].
//!
//! ## Reconciliation Flow
//!
//! Create and Update events:
//! 1. Resolve the bearer token (fatal if the secret cannot be read)
//! 2. Wait for `GET /health` to answer 2xx
//! 3. Register the deployment and check the expected service
//! 4. Patch service visibility where it differs
//! 5. Prune drained deployments, if enabled (never fails the run)
//!
//! Delete events skip all of the above and run the teardown handler.
//!
//! Phases run strictly in order and the first terminal error ends the run.

pub mod admin;
pub mod health;
pub mod policy;
pub mod prune;
pub mod query;
pub mod registration;
pub mod teardown;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;
pub mod visibility;

pub use policy::CleanupReport;
pub use types::{CallFailure, PruneReport, ReconcilerError, RegistrationOutcome, TeardownOutcome};

use crate::config::RegistrarConfig;
use crate::controller::backoff::{ExponentialBackoff, Sleeper};
use crate::controller::retry::RetryPolicy;
use crate::event::{EventResponse, RegistrationRequest, RequestType, ResourceEvent};
use crate::secrets::{resolve_auth_header, SecretResolver};
use crate::transport::Transport;
use admin::AdminClient;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// Event handler wiring the phases to their collaborators
#[derive(Clone)]
pub struct Reconciler {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretResolver>,
    sleeper: Arc<dyn Sleeper>,
    config: RegistrarConfig,
    backoff: ExponentialBackoff,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        secrets: Arc<dyn SecretResolver>,
        sleeper: Arc<dyn Sleeper>,
        config: RegistrarConfig,
    ) -> Self {
        Self {
            transport,
            secrets,
            sleeper,
            config,
            backoff: ExponentialBackoff::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    fn health_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.health_check_max_attempts, self.backoff)
    }

    fn registration_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.registration_max_attempts, self.backoff)
    }

    /// Handle one platform event and produce the response document
    ///
    /// Never fails; terminal errors become a `FAILED` response carrying the
    /// error message as the reason.
    pub async fn handle_event(&self, event: &ResourceEvent) -> EventResponse {
        let span = info_span!(
            "registrar.event",
            request_type = event.request_type.as_str(),
            request.id = event.request_id.as_deref().unwrap_or(""),
            resource.id = event.logical_resource_id.as_deref().unwrap_or("")
        );
        async move {
            info!("Received {} event", event.request_type.as_str());

            if event.request_type == RequestType::Delete {
                let outcome = teardown::teardown(
                    self.transport.as_ref(),
                    self.secrets.as_ref(),
                    &event.resource_properties,
                )
                .await;
                return EventResponse::success_with(outcome.to_data());
            }

            let result = match RegistrationRequest::from_properties(&event.resource_properties) {
                Ok(request) => self.reconcile(&request).await,
                Err(e) => Err(ReconcilerError::from(e)),
            };

            match result {
                Ok(outcome) => EventResponse::success_with(outcome.to_data()),
                Err(e) => {
                    error!("❌ Registration failed: {}", e);
                    EventResponse::failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the registration phases for `request`
    ///
    /// # Errors
    /// Returns the first terminal `ReconcilerError`; pruning problems are
    /// reported in the outcome instead
    pub async fn reconcile(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationOutcome, ReconcilerError> {
        let auth =
            resolve_auth_header(self.secrets.as_ref(), request.auth_secret_ref.as_deref()).await?;
        let admin = AdminClient::new(
            self.transport.as_ref(),
            &request.admin_url,
            auth,
            request.trust,
        );
        let sleeper = self.sleeper.as_ref();

        health::wait_until_healthy(&admin, &self.health_policy(), sleeper).await?;

        let deployment = registration::register_deployment(
            &admin,
            request,
            &self.registration_policy(),
            sleeper,
        )
        .await?;

        let patched =
            visibility::reconcile_visibility(&admin, &deployment.services, request.visibility)
                .await?;

        let pruning = if request.pruning.enabled {
            Some(prune::prune_drained_deployments(&admin, &request.pruning, &deployment.id).await)
        } else {
            None
        };

        info!(
            "✅ Deployment {} reconciled ({} visibility update(s))",
            deployment.id,
            patched.len()
        );
        Ok(RegistrationOutcome {
            deployment_id: deployment.id,
            services: deployment.services.into_iter().map(|s| s.name).collect(),
            patched,
            pruning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{FakeDeployment, FakeRuntime, RecordingSleeper, StaticSecretResolver};
    use crate::event::{RegistrationProperties, ResponseStatus};
    use crate::transport::{HttpResponse, Method};
    use serde_json::json;

    const HANDLER: &str = "arn:aws:lambda:eu-central-1:1:function:greeter:7";

    struct Harness {
        runtime: Arc<FakeRuntime>,
        secrets: Arc<StaticSecretResolver>,
        sleeper: Arc<RecordingSleeper>,
        reconciler: Reconciler,
    }

    fn harness(runtime: FakeRuntime, secrets: StaticSecretResolver) -> Harness {
        let runtime = Arc::new(runtime);
        let secrets = Arc::new(secrets);
        let sleeper = Arc::new(RecordingSleeper::default());
        let reconciler = Reconciler::new(
            Arc::clone(&runtime) as Arc<dyn Transport>,
            Arc::clone(&secrets) as Arc<dyn SecretResolver>,
            Arc::clone(&sleeper) as Arc<dyn Sleeper>,
            RegistrarConfig::default(),
        );
        Harness {
            runtime,
            secrets,
            sleeper,
            reconciler,
        }
    }

    fn event(request_type: RequestType, properties: serde_json::Value) -> ResourceEvent {
        serde_json::from_value(json!({
            "RequestType": request_type.as_str(),
            "RequestId": "req-1",
            "LogicalResourceId": "GreeterRegistration",
            "ResourceProperties": properties,
        }))
        .expect("event should deserialize")
    }

    fn properties(extra: serde_json::Value) -> serde_json::Value {
        let mut props = json!({
            "adminUrl": "http://restate:9070",
            "servicePath": "greeter",
            "serviceLambdaArn": HANDLER,
            "authTokenSecretArn": "arn:aws:secretsmanager:eu-central-1:1:secret:token",
        });
        if let (Some(props), Some(extra)) = (props.as_object_mut(), extra.as_object()) {
            props.extend(extra.clone());
        }
        props
    }

    #[tokio::test]
    async fn test_full_run_registers_patches_and_prunes() {
        let h = harness(
            FakeRuntime::new()
                .with_services(&[("greeter", true)])
                .with_deployment(FakeDeployment {
                    id: "dp_old".to_string(),
                    endpoint: "arn:aws:lambda:eu-central-1:1:function:greeter:6".to_string(),
                    created_at: 1,
                    has_services: false,
                }),
            StaticSecretResolver::with_token("t0k"),
        );

        let response = h
            .reconciler
            .handle_event(&event(
                RequestType::Create,
                properties(json!({ "private": "true", "pruneDrainedDeployments": "true" })),
            ))
            .await;

        assert_eq!(response.status, ResponseStatus::Success, "{response:?}");
        let data = response.data.expect("data");
        assert_eq!(data["DeploymentId"], json!("dp_2"));
        assert_eq!(data["VisibilityUpdated"], json!(["greeter"]));
        assert_eq!(data["Pruned"], json!(1));
        assert_eq!(
            h.runtime.calls(),
            vec![
                "GET /health",
                "POST /deployments",
                "PATCH /services/greeter",
                "POST /query",
                "DELETE /deployments/dp_old?force=true",
            ]
        );
        assert!(h
            .runtime
            .requests()
            .iter()
            .all(|r| r.header_value("Authorization") == Some("Bearer t0k")));
        assert!(h.sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_converged() {
        let h = harness(
            FakeRuntime::new().with_services(&[("greeter", true), ("counter", true)]),
            StaticSecretResolver::with_token("t0k"),
        );
        let event = event(RequestType::Update, properties(json!({ "private": true })));

        let first = h.reconciler.handle_event(&event).await;
        assert!(first.is_success());
        assert_eq!(h.runtime.count(Method::Patch, "/services"), 2);

        let second = h.reconciler.handle_event(&event).await;
        assert!(second.is_success());
        assert_eq!(h.runtime.count(Method::Patch, "/services"), 2);
    }

    #[tokio::test]
    async fn test_health_failure_skips_later_phases() {
        let script = (0..5)
            .map(|_| Ok(HttpResponse::new(503, "warming up")))
            .collect();
        let h = harness(
            FakeRuntime::new().with_health_responses(script),
            StaticSecretResolver::with_token("t0k"),
        );

        let response = h
            .reconciler
            .handle_event(&event(RequestType::Create, properties(json!({}))))
            .await;

        assert_eq!(response.status, ResponseStatus::Failed);
        let reason = response.reason.expect("reason");
        assert!(reason.contains("health check failed after 5 attempts"), "{reason}");
        assert!(reason.contains("503"), "{reason}");
        assert_eq!(h.runtime.count(Method::Post, "/deployments"), 0);
        assert_eq!(h.sleeper.sleeps().len(), 4);
    }

    #[tokio::test]
    async fn test_unresolvable_secret_fails_before_any_call() {
        let h = harness(FakeRuntime::new(), StaticSecretResolver::failing());

        let response = h
            .reconciler
            .handle_event(&event(RequestType::Create, properties(json!({}))))
            .await;

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(h.runtime.requests().is_empty());
        assert_eq!(h.secrets.lookups().len(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_reported_to_platform() {
        let h = harness(
            FakeRuntime::new().with_services(&[("other", true)]),
            StaticSecretResolver::with_token("t0k"),
        );

        let response = h
            .reconciler
            .handle_event(&event(RequestType::Create, properties(json!({}))))
            .await;

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response
            .reason
            .as_deref()
            .is_some_and(|r| r.contains("expected service \"greeter\" not found")));
    }

    #[tokio::test]
    async fn test_invalid_properties_fail_without_calls() {
        let h = harness(FakeRuntime::new(), StaticSecretResolver::with_token("t0k"));

        let response = h
            .reconciler
            .handle_event(&event(RequestType::Create, json!({ "adminUrl": "restate" })))
            .await;

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(h.runtime.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_default_policy_is_noop() {
        let h = harness(FakeRuntime::new(), StaticSecretResolver::with_token("t0k"));

        let response = h
            .reconciler
            .handle_event(&event(RequestType::Delete, properties(json!({}))))
            .await;

        assert!(response.is_success());
        assert!(h.runtime.requests().is_empty());
        assert!(h.secrets.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_fails() {
        let h = harness(
            FakeRuntime::new().with_query_failure(),
            StaticSecretResolver::failing(),
        );

        let response = h
            .reconciler
            .handle_event(&event(
                RequestType::Delete,
                properties(json!({ "removalPolicy": "destroy" })),
            ))
            .await;

        assert!(response.is_success());
        assert_eq!(h.runtime.calls(), vec!["POST /query"]);
    }

    #[test]
    fn test_registration_properties_roundtrip_defaults() {
        let props: RegistrationProperties =
            serde_json::from_value(properties(json!({}))).expect("properties");
        let request = RegistrationRequest::from_properties(&props).expect("request");
        assert!(!request.pruning.enabled);
    }
}
