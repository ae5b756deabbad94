//! # Visibility Reconciler
//!
//! Brings each registered service's `public` flag to the desired value.
//! Services that already match are left alone, so a converged runtime sees no
//! writes. The first failed patch aborts the run; remaining services are not
//! attempted.

use crate::controller::reconciler::admin::{AdminClient, ServiceInfo};
use crate::controller::reconciler::policy::for_each_or_abort;
use crate::controller::reconciler::types::ReconcilerError;
use crate::event::Visibility;
use tracing::{debug, info, info_span, Instrument};

/// Patch every service whose flag differs from `desired`
///
/// Returns the names of the patched services.
///
/// # Errors
/// Returns `ReconcilerError::VisibilityUpdateFailed` for the first patch that fails
pub async fn reconcile_visibility(
    admin: &AdminClient<'_>,
    services: &[ServiceInfo],
    desired: Visibility,
) -> Result<Vec<String>, ReconcilerError> {
    let span = info_span!("registrar.visibility", desired = desired.as_str());
    async move {
        let public = desired.is_public();
        let (pending, converged): (Vec<&ServiceInfo>, Vec<&ServiceInfo>) =
            services.iter().partition(|s| s.public != public);

        for service in &converged {
            debug!(
                "Service {} is already {}, skipping",
                service.name,
                desired.as_str()
            );
        }

        for_each_or_abort(pending.iter().copied(), |service| async move {
            info!("Marking service {} as {}", service.name, desired.as_str());
            admin
                .patch_service_visibility(&service.name, public)
                .await
                .map_err(|failure| ReconcilerError::VisibilityUpdateFailed {
                    service: service.name.clone(),
                    failure,
                })
        })
        .await?;

        Ok(pending.iter().map(|s| s.name.clone()).collect())
    }
    .instrument(span)
    .await
}
