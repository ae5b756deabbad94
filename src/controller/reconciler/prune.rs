//! # Deployment Pruner
//!
//! Deletes drained deployments after a successful registration.
//!
//! A deployment is drained when no service points at it and no invocation in
//! a non-terminal state is pinned to it. The newest `revision_history_limit`
//! drained deployments are kept; at most `max_pruned_per_run` are deleted per
//! run. The deployment registered in this run is never a candidate.
//!
//! The drained query spans the whole runtime, not just this handler's
//! deployments.
//!
//! Nothing in here fails the run: query errors and individual deletion errors
//! are logged and reported in the [`PruneReport`].

use crate::controller::reconciler::admin::AdminClient;
use crate::controller::reconciler::policy::for_each_best_effort;
use crate::controller::reconciler::query::{drained_deployments, DeploymentRow};
use crate::controller::reconciler::types::PruneReport;
use crate::event::PruningPolicy;
use tracing::{info, info_span, warn, Instrument};

/// Delete drained deployments according to `policy`
pub async fn prune_drained_deployments(
    admin: &AdminClient<'_>,
    policy: &PruningPolicy,
    just_created: &str,
) -> PruneReport {
    let span = info_span!(
        "registrar.prune",
        history = policy.revision_history_limit,
        max = policy.max_pruned_per_run
    );
    async move {
        let sql = drained_deployments(
            just_created,
            policy.revision_history_limit,
            policy.max_pruned_per_run,
        );
        let rows: Vec<DeploymentRow> = match admin.query(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Drained deployment query failed, skipping pruning: {}", e);
                return PruneReport::query_failed();
            }
        };

        let candidates = plan_deletions(rows, just_created, policy.max_pruned_per_run);
        if candidates.is_empty() {
            info!("No drained deployments to prune");
            return PruneReport::default();
        }

        info!(
            "Pruning {} drained deployment(s): {}",
            candidates.len(),
            candidates.join(", ")
        );
        let cleanup =
            for_each_best_effort(candidates.iter().cloned(), "Pruning deployment", |id| async move {
                admin.delete_deployment(&id).await.map(|_| ())
            })
            .await;

        info!(
            "Pruned {} deployment(s), {} failure(s)",
            cleanup.succeeded, cleanup.failed
        );
        PruneReport {
            candidates: candidates.len(),
            cleanup,
            query_failed: false,
        }
    }
    .instrument(span)
    .await
}

/// Deployment ids to delete, in query order
///
/// Drops the just-created deployment and duplicates, and never returns more
/// than `max` ids even if the runtime ignored `LIMIT`.
fn plan_deletions(rows: Vec<DeploymentRow>, just_created: &str, max: u32) -> Vec<String> {
    let mut planned: Vec<String> = Vec::new();
    for row in rows {
        if row.id == just_created || planned.contains(&row.id) {
            continue;
        }
        planned.push(row.id);
        if planned.len() >= max as usize {
            break;
        }
    }
    planned
}
