//! # Teardown Handler
//!
//! Runs instead of registration when the resource is removed.
//!
//! - `retain` (default): nothing is touched and no remote call is made.
//!   In-flight invocations may still depend on the deployment.
//! - `destroy`: every deployment registered for the handler is deleted,
//!   including ones that still expose services.
//!
//! Teardown never fails the removal. An unresolvable auth secret means the
//! calls go out without a token; query and deletion failures are logged.

use crate::controller::reconciler::admin::AdminClient;
use crate::controller::reconciler::policy::for_each_best_effort;
use crate::controller::reconciler::query::{deployments_for_handler, DeploymentRow};
use crate::controller::reconciler::types::TeardownOutcome;
use crate::event::{RegistrationProperties, RemovalPolicy, TeardownTarget};
use crate::secrets::{resolve_auth_header, AuthHeader, SecretResolver};
use crate::transport::Transport;
use tracing::{info, info_span, warn, Instrument};

/// Apply the removal policy carried by `props`
pub async fn teardown(
    transport: &dyn Transport,
    secrets: &dyn SecretResolver,
    props: &RegistrationProperties,
) -> TeardownOutcome {
    let policy = props.removal_policy.unwrap_or_default();
    let span = info_span!("registrar.teardown", policy = policy.as_str());
    async move {
        if policy == RemovalPolicy::Retain {
            info!("Removal policy is retain, leaving registrations in place");
            return TeardownOutcome::Retained;
        }

        let target = match TeardownTarget::from_properties(props) {
            Ok(target) => target,
            Err(e) => {
                warn!("Cannot tear down registrations: {}", e);
                return TeardownOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let auth = match resolve_auth_header(secrets, target.auth_secret_ref.as_deref()).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!("{}; continuing teardown without authentication", e);
                AuthHeader::none()
            }
        };
        let admin = AdminClient::new(transport, &target.admin_url, auth, target.trust);

        let sql = deployments_for_handler(&target.handler_arn);
        let rows: Vec<DeploymentRow> = match admin.query(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "Failed to list deployments for {}, skipping teardown: {}",
                    target.handler_arn, e
                );
                return TeardownOutcome::Skipped {
                    reason: format!("deployment query failed: {e}"),
                };
            }
        };

        let mut ids: Vec<String> = rows.into_iter().map(|row| row.id).collect();
        ids.sort_unstable();
        ids.dedup();
        info!(
            "Deleting {} deployment(s) registered for {}",
            ids.len(),
            target.handler_arn
        );

        let admin = &admin;
        let report = for_each_best_effort(ids, "Deleting deployment", |id| async move {
            admin.delete_deployment(&id).await.map(|_| ())
        })
        .await;

        info!(
            "🗑️ Teardown deleted {} deployment(s), {} failure(s)",
            report.succeeded, report.failed
        );
        TeardownOutcome::Destroyed(report)
    }
    .instrument(span)
    .await
}
