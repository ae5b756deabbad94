//! # Secret Resolution
//!
//! Resolves the admin API bearer token from a secret reference.
//!
//! - No reference: calls are made unauthenticated.
//! - Reference set: the secret's string value becomes `Authorization: Bearer <value>`.
//!
//! Whether an unresolvable reference is fatal is decided by the caller: the
//! registration path aborts, teardown carries on without the header.

pub mod aws;

pub use aws::AwsSecretResolver;

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

/// Failure to turn a secret reference into a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve auth token secret {secret_ref}: {message}")]
pub struct SecretError {
    pub secret_ref: String,
    pub message: String,
}

impl SecretError {
    pub fn new(secret_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            secret_ref: secret_ref.into(),
            message: message.into(),
        }
    }
}

/// Looks up a secret's string value by reference
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, secret_ref: &str) -> Result<Zeroizing<String>, SecretError>;
}

/// Authorization header for admin API calls, possibly empty
///
/// The token is wiped from memory on drop and never printed.
#[derive(Clone, Default)]
pub struct AuthHeader(Option<Zeroizing<String>>);

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("AuthHeader(Bearer ***)"),
            None => f.write_str("AuthHeader(none)"),
        }
    }
}

impl AuthHeader {
    /// No `Authorization` header
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    /// `Authorization: Bearer <token>`
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self(Some(Zeroizing::new(format!("Bearer {token}"))))
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Header name and value, if a token is set
    #[must_use]
    pub fn header(&self) -> Option<(&'static str, &str)> {
        self.0.as_ref().map(|value| ("Authorization", value.as_str()))
    }
}

/// Resolve the optional secret reference into an auth header
///
/// # Errors
/// Returns `SecretError` if a reference is set but cannot be resolved
pub async fn resolve_auth_header(
    resolver: &dyn SecretResolver,
    secret_ref: Option<&str>,
) -> Result<AuthHeader, SecretError> {
    let Some(secret_ref) = secret_ref else {
        return Ok(AuthHeader::none());
    };

    tracing::info!("Using bearer authentication token from secret {}", secret_ref);
    let token = resolver.resolve(secret_ref).await?;
    if token.trim().is_empty() {
        return Err(SecretError::new(secret_ref, "secret value is empty"));
    }
    Ok(AuthHeader::bearer(token.trim()))
}
