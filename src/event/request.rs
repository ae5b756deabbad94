//! # Registration Request
//!
//! Validated, immutable description of the desired end state for one run.
//! Every phase reads from the same request; nothing writes to it.

use super::RegistrationProperties;
use crate::constants::{DEFAULT_MAX_PRUNED_PER_RUN, DEFAULT_REVISION_HISTORY_LIMIT};
use crate::transport::TrustMode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Property bag that cannot be turned into a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("missing required property {0}")]
    MissingProperty(&'static str),
    #[error("adminUrl must be an http:// or https:// URL, got \"{0}\"")]
    InvalidAdminUrl(String),
    #[error("maxPrunedPerRun must be at least 1")]
    ZeroPruneLimit,
}

/// Desired reachability of the registered services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Callable through the runtime's ingress
    #[default]
    Public,
    /// Only callable from other services
    Private,
}

impl Visibility {
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// What happens to the handler's registrations when the resource is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Leave every deployment registered
    #[default]
    Retain,
    /// Best-effort delete every deployment of the handler
    Destroy,
}

impl RemovalPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "retain",
            RemovalPolicy::Destroy => "destroy",
        }
    }
}

// Anything other than "destroy" (e.g. "snapshot", "retain-on-update-or-delete")
// keeps the registrations.
impl<'de> Deserialize<'de> for RemovalPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value.trim().eq_ignore_ascii_case("destroy") {
            Ok(RemovalPolicy::Destroy)
        } else {
            Ok(RemovalPolicy::Retain)
        }
    }
}

impl Serialize for RemovalPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Drained deployment pruning settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruningPolicy {
    pub enabled: bool,
    /// Most recent drained deployments to keep
    pub revision_history_limit: u32,
    /// Upper bound on deletions per run, at least 1
    pub max_pruned_per_run: u32,
}

impl Default for PruningPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            revision_history_limit: DEFAULT_REVISION_HISTORY_LIMIT,
            max_pruned_per_run: DEFAULT_MAX_PRUNED_PER_RUN,
        }
    }
}

/// Desired end state for one registration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Admin API base URL without trailing slash
    pub admin_url: String,
    /// Service the deployment must expose, if checked
    pub service_name: Option<String>,
    /// Handler identity registered with the runtime
    pub handler_arn: String,
    pub invoker_role_arn: Option<String>,
    pub auth_secret_ref: Option<String>,
    pub visibility: Visibility,
    pub trust: TrustMode,
    /// Only forces re-invocation upstream
    pub configuration_version: Option<String>,
    pub removal_policy: RemovalPolicy,
    pub pruning: PruningPolicy,
}

/// Where a removal finds the handler's deployments
///
/// Carries only what teardown uses; registration-only settings such as the
/// pruning limits are not validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownTarget {
    /// Admin API base URL without trailing slash
    pub admin_url: String,
    pub handler_arn: String,
    pub auth_secret_ref: Option<String>,
    pub trust: TrustMode,
}

impl TeardownTarget {
    /// Validate the fields teardown needs
    ///
    /// # Errors
    /// Returns `RequestError` if the admin URL or handler identity is missing
    /// or malformed
    pub fn from_properties(props: &RegistrationProperties) -> Result<Self, RequestError> {
        let admin_url = non_blank(props.admin_url.as_deref())
            .ok_or(RequestError::MissingProperty("adminUrl"))?;
        let admin_url = normalize_admin_url(admin_url)?;

        let handler_arn = non_blank(props.service_lambda_arn.as_deref())
            .ok_or(RequestError::MissingProperty("serviceLambdaArn"))?
            .to_string();

        Ok(Self {
            admin_url,
            handler_arn,
            auth_secret_ref: non_blank(props.auth_token_secret_arn.as_deref())
                .map(str::to_string),
            trust: if props.insecure.unwrap_or(false) {
                TrustMode::Insecure
            } else {
                TrustMode::Strict
            },
        })
    }
}

impl RegistrationRequest {
    /// Validate the raw property bag
    ///
    /// # Errors
    /// Returns `RequestError` if the admin URL or handler identity is missing
    /// or malformed, or the pruning limits are out of range
    pub fn from_properties(props: &RegistrationProperties) -> Result<Self, RequestError> {
        let TeardownTarget {
            admin_url,
            handler_arn,
            auth_secret_ref,
            trust,
        } = TeardownTarget::from_properties(props)?;

        let max_pruned_per_run = props
            .max_pruned_per_run
            .unwrap_or(DEFAULT_MAX_PRUNED_PER_RUN);
        if max_pruned_per_run == 0 {
            return Err(RequestError::ZeroPruneLimit);
        }

        Ok(Self {
            admin_url,
            service_name: non_blank(props.service_path.as_deref()).map(str::to_string),
            handler_arn,
            invoker_role_arn: non_blank(props.invoke_role_arn.as_deref()).map(str::to_string),
            auth_secret_ref,
            visibility: if props.private.unwrap_or(false) {
                Visibility::Private
            } else {
                Visibility::Public
            },
            trust,
            configuration_version: props.configuration_version.clone(),
            removal_policy: props.removal_policy.unwrap_or_default(),
            pruning: PruningPolicy {
                enabled: props.prune_drained_deployments.unwrap_or(false),
                revision_history_limit: props
                    .revision_history_limit
                    .unwrap_or(DEFAULT_REVISION_HISTORY_LIMIT),
                max_pruned_per_run,
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_admin_url(url: &str) -> Result<String, RequestError> {
    let lower = url.to_ascii_lowercase();
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len());
    if !has_host {
        return Err(RequestError::InvalidAdminUrl(url.to_string()));
    }
    Ok(url.trim_end_matches('/').to_string())
}
