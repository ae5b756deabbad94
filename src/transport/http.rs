//! reqwest-backed transport
//!
//! Uses reqwest with rustls (no OpenSSL dependencies). Two clients are built
//! up front: one validating certificates and one accepting any certificate,
//! selected per request by its trust mode.

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError, TrustMode};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// HTTP transport for the runtime's admin API
#[derive(Clone)]
pub struct ReqwestTransport {
    strict: Client,
    insecure: Client,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build the strict and insecure clients
    ///
    /// # Errors
    /// Returns an error if either client fails to initialize
    pub fn new() -> Result<Self> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let strict = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        let insecure = Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to create insecure HTTP client")?;

        Ok(Self { strict, insecure })
    }

    fn client(&self, trust: TrustMode) -> &Client {
        match trust {
            TrustMode::Strict => &self.strict,
            TrustMode::Insecure => &self.insecure,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client(request.trust);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                    timeout_ms: request.timeout.as_millis(),
                }
            } else {
                TransportError::Network {
                    url: request.url.clone(),
                    message: error_chain(&e),
                }
            }
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(HttpResponse { status, body })
    }
}

/// Flatten an error and its sources into one line
///
/// reqwest's top-level message ("error sending request") hides the cause,
/// e.g. a refused connection or a certificate rejection.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
