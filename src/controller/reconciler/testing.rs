//! Test doubles for the reconciler: an in-memory runtime, a recording sleeper
//! and a static secret resolver.

use crate::controller::backoff::Sleeper;
use crate::secrets::{SecretError, SecretResolver};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use zeroize::Zeroizing;

/// Deployment known to the fake runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDeployment {
    pub id: String,
    pub endpoint: String,
    pub created_at: u64,
    pub has_services: bool,
}

/// Invocation pinned to a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeInvocation {
    pub deployment_id: String,
    pub status: String,
}

type Scripted = VecDeque<Result<HttpResponse, TransportError>>;

#[derive(Debug, Default)]
struct RuntimeState {
    requests: Vec<HttpRequest>,
    health: Scripted,
    registration: Scripted,
    services: BTreeMap<String, bool>,
    patch_failures: HashSet<String>,
    deployments: Vec<FakeDeployment>,
    invocations: Vec<FakeInvocation>,
    delete_failures: HashSet<String>,
    query_failure: bool,
    ignore_query_limit: bool,
}

/// In-memory admin API
///
/// Scripted health and registration responses are served first; once a
/// script runs dry the runtime behaves like a healthy server backed by its
/// deployment, service and invocation tables.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().expect("fake runtime lock poisoned")
    }

    fn state_mut(&mut self) -> &mut RuntimeState {
        self.state.get_mut().expect("fake runtime lock poisoned")
    }

    pub fn with_health_responses(
        mut self,
        responses: Vec<Result<HttpResponse, TransportError>>,
    ) -> Self {
        self.state_mut().health = responses.into();
        self
    }

    pub fn with_registration_responses(
        mut self,
        responses: Vec<Result<HttpResponse, TransportError>>,
    ) -> Self {
        self.state_mut().registration = responses.into();
        self
    }

    /// Services returned by registration, with their current public flag
    pub fn with_services(mut self, services: &[(&str, bool)]) -> Self {
        self.state_mut().services = services
            .iter()
            .map(|(name, public)| ((*name).to_string(), *public))
            .collect();
        self
    }

    pub fn with_deployment(mut self, deployment: FakeDeployment) -> Self {
        self.state_mut().deployments.push(deployment);
        self
    }

    pub fn with_invocation(mut self, deployment_id: &str, status: &str) -> Self {
        self.state_mut().invocations.push(FakeInvocation {
            deployment_id: deployment_id.to_string(),
            status: status.to_string(),
        });
        self
    }

    pub fn with_patch_failure(mut self, service: &str) -> Self {
        self.state_mut().patch_failures.insert(service.to_string());
        self
    }

    pub fn with_delete_failure(mut self, id: &str) -> Self {
        self.state_mut().delete_failures.insert(id.to_string());
        self
    }

    pub fn with_query_failure(mut self) -> Self {
        self.state_mut().query_failure = true;
        self
    }

    /// Return every drained deployment past the offset, ignoring `LIMIT`
    pub fn ignoring_query_limit(mut self) -> Self {
        self.state_mut().ignore_query_limit = true;
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    /// Recorded requests as `"METHOD /path"` strings
    pub fn calls(&self) -> Vec<String> {
        self.state()
            .requests
            .iter()
            .map(|r| format!("{} {}", r.method, path_of(&r.url)))
            .collect()
    }

    pub fn count(&self, method: Method, path_prefix: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && path_of(&r.url).starts_with(path_prefix))
            .count()
    }

    pub fn deployment_ids(&self) -> Vec<String> {
        self.state().deployments.iter().map(|d| d.id.clone()).collect()
    }

    pub fn service_visibility(&self, name: &str) -> Option<bool> {
        self.state().services.get(name).copied()
    }

    /// Drained ids newest first, computed directly from the tables
    pub fn drained_ids(&self) -> Vec<String> {
        self.state().drained().into_iter().map(|d| d.id).collect()
    }
}

impl RuntimeState {
    fn respond(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = path_of(&request.url).to_string();
        match (request.method, path.as_str()) {
            (Method::Get, "/health") => self
                .health
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, ""))),
            (Method::Post, "/deployments" | "/endpoints") => match self.registration.pop_front() {
                Some(scripted) => scripted,
                None => Ok(self.register(request)),
            },
            (Method::Patch, p) if p.starts_with("/services/") => {
                Ok(self.patch(&p["/services/".len()..], request))
            }
            (Method::Post, "/query") => Ok(self.query(request)),
            (Method::Delete, p) if p.starts_with("/deployments/") => {
                let id = p["/deployments/".len()..]
                    .trim_end_matches("?force=true")
                    .to_string();
                Ok(self.delete(&id))
            }
            _ => Ok(HttpResponse::new(404, "not found")),
        }
    }

    fn register(&mut self, request: &HttpRequest) -> HttpResponse {
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}"))
            .unwrap_or_default();
        let endpoint = body["arn"].as_str().unwrap_or_default().to_string();
        let created_at = self
            .deployments
            .iter()
            .map(|d| d.created_at)
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("dp_{created_at}");
        self.deployments.push(FakeDeployment {
            id: id.clone(),
            endpoint,
            created_at,
            has_services: !self.services.is_empty(),
        });
        let services: Vec<Value> = self
            .services
            .iter()
            .map(|(name, public)| json!({ "name": name, "revision": 1, "public": public }))
            .collect();
        HttpResponse::new(201, json!({ "id": id, "services": services }).to_string())
    }

    fn patch(&mut self, service: &str, request: &HttpRequest) -> HttpResponse {
        if self.patch_failures.contains(service) {
            return HttpResponse::new(500, "patch rejected");
        }
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}"))
            .unwrap_or_default();
        match (self.services.get_mut(service), body["public"].as_bool()) {
            (Some(public), Some(desired)) => {
                *public = desired;
                HttpResponse::new(200, json!({ "name": service, "public": desired }).to_string())
            }
            (None, _) => HttpResponse::new(404, "unknown service"),
            (_, None) => HttpResponse::new(400, "missing public flag"),
        }
    }

    fn drained(&self) -> Vec<FakeDeployment> {
        let pinned: HashSet<&str> = self
            .invocations
            .iter()
            .filter(|i| i.status != "completed")
            .map(|i| i.deployment_id.as_str())
            .collect();
        let mut drained: Vec<FakeDeployment> = self
            .deployments
            .iter()
            .filter(|d| !d.has_services && !pinned.contains(d.id.as_str()))
            .cloned()
            .collect();
        drained.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        drained
    }

    fn query(&mut self, request: &HttpRequest) -> HttpResponse {
        if self.query_failure {
            return HttpResponse::new(500, "query engine unavailable");
        }
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}"))
            .unwrap_or_default();
        let sql = body["query"].as_str().unwrap_or_default();

        let rows: Vec<Value> = if let Some(endpoint) = literal_after(sql, "endpoint = ") {
            self.deployments
                .iter()
                .filter(|d| d.endpoint == endpoint)
                .map(|d| json!({ "id": d.id }))
                .collect()
        } else {
            let excluded = literal_after(sql, "d.id != ");
            let offset = number_after(sql, "OFFSET").unwrap_or(0);
            let limit = if self.ignore_query_limit {
                usize::MAX
            } else {
                number_after(sql, "LIMIT").unwrap_or(usize::MAX)
            };
            self.drained()
                .into_iter()
                .filter(|d| Some(d.id.as_str()) != excluded.as_deref())
                .skip(offset)
                .take(limit)
                .map(|d| json!({ "id": d.id, "created_at": d.created_at }))
                .collect()
        };
        HttpResponse::new(200, json!({ "rows": rows }).to_string())
    }

    fn delete(&mut self, id: &str) -> HttpResponse {
        if self.delete_failures.contains(id) {
            return HttpResponse::new(500, "deletion failed");
        }
        let before = self.deployments.len();
        self.deployments.retain(|d| d.id != id);
        if self.deployments.len() < before {
            HttpResponse::new(202, "")
        } else {
            HttpResponse::new(404, "deployment not found")
        }
    }
}

#[async_trait]
impl Transport for FakeRuntime {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state();
        state.requests.push(request.clone());
        state.respond(&request)
    }
}

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |i| &rest[i..])
}

fn literal_after(sql: &str, marker: &str) -> Option<String> {
    let start = sql.find(marker)? + marker.len();
    let quoted = sql[start..].strip_prefix('\'')?;
    quoted.find('\'').map(|end| quoted[..end].to_string())
}

fn number_after(sql: &str, keyword: &str) -> Option<usize> {
    let mut words = sql.split_whitespace();
    words.find(|w| *w == keyword)?;
    words.next()?.parse().ok()
}

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleeper lock poisoned").clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .expect("sleeper lock poisoned")
            .push(duration);
    }
}

/// Resolver returning a fixed token, or failing every lookup
#[derive(Debug, Default)]
pub struct StaticSecretResolver {
    token: Option<String>,
    lookups: Mutex<Vec<String>>,
}

impl StaticSecretResolver {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            lookups: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("resolver lock poisoned").clone()
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn resolve(&self, secret_ref: &str) -> Result<Zeroizing<String>, SecretError> {
        self.lookups
            .lock()
            .expect("resolver lock poisoned")
            .push(secret_ref.to_string());
        self.token
            .as_ref()
            .map(|token| Zeroizing::new(token.clone()))
            .ok_or_else(|| SecretError::new(secret_ref, "ResourceNotFoundException"))
    }
}
