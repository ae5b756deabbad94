//! # Events
//!
//! The platform event that triggers a run, the property bag it carries, and
//! the response handed back.
//!
//! ## Example
//!
//! ```json
//! {
//!   "RequestType": "Update",
//!   "ResourceProperties": {
//!     "adminUrl": "https://restate.example.com:9070",
//!     "servicePath": "greeter",
//!     "serviceLambdaArn": "arn:aws:lambda:eu-central-1:123456789012:function:greeter:7",
//!     "private": "false",
//!     "removalPolicy": "retain",
//!     "pruneDrainedDeployments": "true",
//!     "revisionHistoryLimit": "2"
//!   }
//! }
//! ```

mod lenient;
pub mod request;
pub mod response;

pub use request::{
    PruningPolicy, RegistrationRequest, RemovalPolicy, RequestError, TeardownTarget, Visibility,
};
pub use response::{EventResponse, ResponseStatus};

use crate::constants::DEFAULT_MAX_PRUNED_PER_RUN;
use serde::{Deserialize, Serialize};

/// Lifecycle transition that triggered the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
        }
    }

    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, RequestType::Delete)
    }
}

/// Infrastructure-change event delivered to the registrar
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEvent {
    pub request_type: RequestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_properties: RegistrationProperties,
}

impl ResourceEvent {
    /// Deletions the run may perform; `None` when it never prunes
    #[must_use]
    pub fn pruning_budget(&self) -> Option<u32> {
        let props = &self.resource_properties;
        if self.request_type.is_removal() || !props.prune_drained_deployments.unwrap_or(false) {
            return None;
        }
        Some(props.max_pruned_per_run.unwrap_or(DEFAULT_MAX_PRUNED_PER_RUN))
    }
}

/// Raw property bag as delivered by the platform
///
/// Values arrive stringified (`"true"`, `"3"`); the boolean and integer
/// fields accept both native JSON and string forms. Unknown properties such
/// as `ServiceToken` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationProperties {
    /// Runtime admin API base URL
    #[serde(default, alias = "metaEndpoint", skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    /// Service name the deployment is expected to expose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_path: Option<String>,
    /// Handler identity; a specific function version ARN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_lambda_arn: Option<String>,
    /// Role the runtime assumes to invoke the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_role_arn: Option<String>,
    /// Secret holding the admin API bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_secret_arn: Option<String>,
    /// Mark the registered services private (not reachable via ingress)
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub private: Option<bool>,
    /// Accept self-signed certificates from the admin API
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub insecure: Option<bool>,
    /// Changing this forces a new run upstream; ignored by the registrar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_version: Option<String>,
    /// What happens to registrations when the resource is removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_policy: Option<RemovalPolicy>,
    /// Delete drained deployments after a successful registration
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub prune_drained_deployments: Option<bool>,
    /// Most recent drained deployments kept by the pruner
    #[serde(
        default,
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision_history_limit: Option<u32>,
    /// Upper bound on deletions per pruning run
    #[serde(
        default,
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_pruned_per_run: Option<u32>,
}
