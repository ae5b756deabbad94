//! # Admin API Client
//!
//! Typed wrapper over the runtime's admin HTTP API.
//!
//! Every call is a single request through the [`Transport`]; retries are left
//! to the phase that owns the call. Header rules:
//! - `Authorization: Bearer <token>` on every request when a token is set
//! - `Content-Type: application/json` on everything except `/health` and `/query`
//! - `Accept: application/json` on `/query`

use crate::constants::{
    DELETION_TIMEOUT_SECS, DEPLOYMENTS_PATH, HEALTH_CHECK_TIMEOUT_SECS, HEALTH_PATH, QUERY_PATH,
    QUERY_TIMEOUT_SECS, REGISTRATION_TIMEOUT_SECS, SERVICES_PATH, VISIBILITY_PATCH_TIMEOUT_SECS,
};
use crate::controller::reconciler::types::CallFailure;
use crate::secrets::AuthHeader;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TrustMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// `POST /deployments` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterDeploymentRequest<'a> {
    pub arn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_role_arn: Option<&'a str>,
}

/// `POST /deployments` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterDeploymentResponse {
    pub id: String,
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
}

/// Service exposed by a registered deployment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub revision: u64,
    /// The runtime registers services as public unless told otherwise
    #[serde(default = "default_public")]
    pub public: bool,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct VisibilityPatch {
    public: bool,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    rows: Vec<T>,
}

/// How a deletion request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    /// 404; someone else removed it first
    AlreadyGone,
}

/// Admin API client bound to one base URL, auth header and trust mode
pub struct AdminClient<'a> {
    transport: &'a dyn Transport,
    base_url: &'a str,
    auth: AuthHeader,
    trust: TrustMode,
}

impl std::fmt::Debug for AdminClient<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("trust", &self.trust)
            .finish_non_exhaustive()
    }
}

impl<'a> AdminClient<'a> {
    #[must_use]
    pub fn new(
        transport: &'a dyn Transport,
        base_url: &'a str,
        auth: AuthHeader,
        trust: TrustMode,
    ) -> Self {
        Self {
            transport,
            base_url,
            auth,
            trust,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
    }

    fn request(&self, method: Method, path: &str, timeout_secs: u64) -> HttpRequest {
        let mut request = HttpRequest::new(
            method,
            format!("{}{}", self.base_url, path),
            Duration::from_secs(timeout_secs),
        )
        .trust(self.trust);
        if let Some((name, value)) = self.auth.header() {
            request = request.header(name, value);
        }
        request
    }

    fn json_request<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        timeout_secs: u64,
        body: &T,
    ) -> Result<HttpRequest, CallFailure> {
        let body = serde_json::to_string(body)
            .map_err(|e| CallFailure::InvalidResponse(format!("failed to encode request: {e}")))?;
        Ok(self
            .request(method, path, timeout_secs)
            .header("Content-Type", "application/json")
            .body(body))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, CallFailure> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        debug!("{} {} -> {}", method, url, response.status);
        Ok(response)
    }

    async fn send_expecting_success(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, CallFailure> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(CallFailure::status(response.status, &response.body))
        }
    }

    /// `GET /health`; any 2xx is healthy
    pub async fn health(&self) -> Result<(), CallFailure> {
        let request = self.request(Method::Get, HEALTH_PATH, HEALTH_CHECK_TIMEOUT_SECS);
        self.send_expecting_success(request).await.map(|_| ())
    }

    /// Register a deployment at `path` (`/deployments` or the legacy `/endpoints`)
    pub async fn register(
        &self,
        path: &str,
        body: &RegisterDeploymentRequest<'_>,
    ) -> Result<RegisterDeploymentResponse, CallFailure> {
        let request = self.json_request(Method::Post, path, REGISTRATION_TIMEOUT_SECS, body)?;
        let response = self.send_expecting_success(request).await?;
        decode(&response)
    }

    /// `PATCH /services/{name}` with the desired public flag
    pub async fn patch_service_visibility(
        &self,
        service: &str,
        public: bool,
    ) -> Result<(), CallFailure> {
        let request = self.json_request(
            Method::Patch,
            &format!("{SERVICES_PATH}/{service}"),
            VISIBILITY_PATCH_TIMEOUT_SECS,
            &VisibilityPatch { public },
        )?;
        self.send_expecting_success(request).await.map(|_| ())
    }

    /// Run an introspection query and decode its rows
    pub async fn query<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>, CallFailure> {
        let body = serde_json::to_string(&QueryRequest { query: sql })
            .map_err(|e| CallFailure::InvalidResponse(format!("failed to encode query: {e}")))?;
        let request = self
            .request(Method::Post, QUERY_PATH, QUERY_TIMEOUT_SECS)
            .header("Accept", "application/json")
            .body(body);
        let response = self.send_expecting_success(request).await?;
        decode::<QueryResponse<T>>(&response).map(|r| r.rows)
    }

    /// `DELETE /deployments/{id}?force=true`; 404 counts as success
    pub async fn delete_deployment(&self, id: &str) -> Result<DeletionOutcome, CallFailure> {
        let request = self
            .request(
                Method::Delete,
                &format!("{DEPLOYMENTS_PATH}/{id}?force=true"),
                DELETION_TIMEOUT_SECS,
            )
            .header("Content-Type", "application/json");
        let response = self.send(request).await?;
        match response.status {
            404 => Ok(DeletionOutcome::AlreadyGone),
            _ if response.is_success() => Ok(DeletionOutcome::Deleted),
            status => Err(CallFailure::status(status, &response.body)),
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, CallFailure> {
    serde_json::from_str(&response.body).map_err(|e| CallFailure::InvalidResponse(e.to_string()))
}
