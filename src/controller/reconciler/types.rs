//! # Reconciler Types
//!
//! Error taxonomy and run results shared by the reconciliation phases.

use crate::constants::MAX_ERROR_BODY_LEN;
use crate::controller::reconciler::policy::CleanupReport;
use crate::event::RequestError;
use crate::secrets::SecretError;
use crate::transport::TransportError;
use serde_json::json;
use thiserror::Error;

/// Why a single admin API call did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// No response was received
    #[error("{0}")]
    Network(#[from] TransportError),
    /// A response arrived with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// A 2xx response whose body could not be decoded
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl CallFailure {
    /// Non-2xx failure with the body truncated for error messages
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_body(body),
        }
    }

    /// Status code, if a response was received
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CallFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failure of a registration run
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("invalid registration properties: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("{0}")]
    SecretUnavailable(#[from] SecretError),

    #[error("admin API health check failed after {attempts} attempts: {last_failure}")]
    HealthCheckFailed {
        attempts: u32,
        last_failure: CallFailure,
    },

    #[error("service registration failed after {attempts} attempts: {last_failure}")]
    RegistrationFailed {
        attempts: u32,
        last_failure: CallFailure,
    },

    #[error(
        "service registration failed: expected service \"{expected}\" not found in deployment \
         {deployment_id} (registered services: [{}])",
        .returned.join(", ")
    )]
    ServiceNameMismatch {
        expected: String,
        deployment_id: String,
        returned: Vec<String>,
    },

    #[error("failed to update visibility of service {service}: {failure}")]
    VisibilityUpdateFailed {
        service: String,
        failure: CallFailure,
    },
}

/// Result of a drained deployment pruning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Drained deployments returned by the query after client-side filtering
    pub candidates: usize,
    pub cleanup: CleanupReport,
    /// The drained deployment query itself failed
    pub query_failed: bool,
}

impl PruneReport {
    #[must_use]
    pub fn query_failed() -> Self {
        Self {
            query_failed: true,
            ..Self::default()
        }
    }
}

/// Result of a successful registration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub deployment_id: String,
    pub services: Vec<String>,
    /// Services whose visibility flag was changed
    pub patched: Vec<String>,
    /// `None` when pruning is disabled
    pub pruning: Option<PruneReport>,
}

impl RegistrationOutcome {
    /// Attributes reported back to the platform
    #[must_use]
    pub fn to_data(&self) -> serde_json::Value {
        let mut data = json!({
            "DeploymentId": self.deployment_id,
            "Services": self.services,
            "VisibilityUpdated": self.patched,
        });
        if let Some(report) = &self.pruning {
            data["Pruned"] = json!(report.cleanup.succeeded);
            data["PruneFailures"] = json!(report.cleanup.failed);
        }
        data
    }
}

/// Result of a removal event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// Retain policy: registrations were left alone
    Retained,
    /// Destroy policy could not run; the reason is logged
    Skipped { reason: String },
    /// Destroy policy ran against every matching deployment
    Destroyed(CleanupReport),
}

impl TeardownOutcome {
    #[must_use]
    pub fn to_data(&self) -> serde_json::Value {
        match self {
            TeardownOutcome::Retained => json!({ "Teardown": "retained" }),
            TeardownOutcome::Skipped { reason } => {
                json!({ "Teardown": "skipped", "Reason": reason })
            }
            TeardownOutcome::Destroyed(report) => json!({
                "Teardown": "destroyed",
                "Deleted": report.succeeded,
                "DeleteFailures": report.failed,
            }),
        }
    }
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
