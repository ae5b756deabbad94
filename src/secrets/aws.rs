//! # AWS Secrets Manager Resolver
//!
//! Resolves bearer tokens stored in AWS Secrets Manager.
//!
//! Credentials come from the default provider chain (the handler's execution
//! role). When the reference is a full secret ARN, the lookup targets the
//! ARN's region, so tokens stored in another region resolve without extra
//! configuration.

use super::{SecretError, SecretResolver};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Secret resolver backed by AWS Secrets Manager
pub struct AwsSecretResolver {
    sdk_config: SdkConfig,
}

impl std::fmt::Debug for AwsSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretResolver")
            .field("region", &self.sdk_config.region())
            .finish_non_exhaustive()
    }
}

impl AwsSecretResolver {
    /// Load the AWS SDK config from the environment
    ///
    /// `endpoint_override` routes requests to a mock server instead of real AWS.
    pub async fn new(endpoint_override: Option<&str>) -> Self {
        let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(endpoint) = endpoint_override {
            info!("Secrets Manager endpoint override: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        let sdk_config = builder.load().await;
        Self { sdk_config }
    }

    /// Client for the region the secret lives in
    fn client_for(&self, secret_ref: &str) -> SecretsManagerClient {
        let mut config = aws_sdk_secretsmanager::config::Builder::from(&self.sdk_config);
        if let Some(region) = region_from_secret_arn(secret_ref) {
            debug!("Using region {} from secret ARN", region);
            config = config.region(aws_config::Region::new(region.to_string()));
        }
        SecretsManagerClient::from_conf(config.build())
    }
}

#[async_trait]
impl SecretResolver for AwsSecretResolver {
    async fn resolve(&self, secret_ref: &str) -> Result<Zeroizing<String>, SecretError> {
        let response = self
            .client_for(secret_ref)
            .get_secret_value()
            .secret_id(secret_ref)
            .send()
            .await
            .map_err(|e| SecretError::new(secret_ref, DisplayErrorContext(&e).to_string()))?;

        info!(
            "Successfully retrieved secret \"{}\" version {}",
            response.name().unwrap_or(secret_ref),
            response.version_id().unwrap_or("unknown")
        );

        response
            .secret_string()
            .map(|s| Zeroizing::new(s.to_string()))
            .ok_or_else(|| SecretError::new(secret_ref, "secret has no string value"))
    }
}

/// Region segment of a Secrets Manager ARN
///
/// `arn:aws:secretsmanager:<region>:<account>:secret:<name>`; plain secret
/// names yield `None`.
#[must_use]
pub fn region_from_secret_arn(secret_ref: &str) -> Option<&str> {
    let mut parts = secret_ref.splitn(6, ':');
    let (Some("arn"), Some(_partition), Some("secretsmanager"), Some(region)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    (!region.is_empty()).then_some(region)
}
