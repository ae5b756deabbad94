//! Common test utilities for Pact integration tests
//!
//! Provides shared initialization code for all Pact tests, including
//! rustls crypto provider setup and a fixed secret resolver.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use async_trait::async_trait;
use service_registrar::secrets::{SecretError, SecretResolver};
use std::sync::Once;
use zeroize::Zeroizing;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// This must be called before any transport is built.
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Required for rustls 0.23+ when no default provider is set via features
        // We use ring as the crypto provider (matches main application)
        // The Pact mock server may already have installed a process default
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");
        }
    });
}

/// Mock server base URL without the trailing slash
pub fn base_url(url: &impl ToString) -> String {
    url.to_string().trim_end_matches('/').to_string()
}

/// Resolves every reference to the same token
pub struct FixedSecret(pub &'static str);

#[async_trait]
impl SecretResolver for FixedSecret {
    async fn resolve(&self, secret_ref: &str) -> Result<Zeroizing<String>, SecretError> {
        if secret_ref.is_empty() {
            return Err(SecretError::new(secret_ref, "empty reference"));
        }
        Ok(Zeroizing::new(self.0.to_string()))
    }
}
