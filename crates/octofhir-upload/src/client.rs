//! HTTP access to the target FHIR server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::{Result, UploadError};
use crate::resource::{Resource, ResourceKind};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What the client needs to set the Authorization header
#[derive(Clone)]
pub enum AuthHeader {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
            Self::Bearer { .. } => f.write_str("Bearer(***)"),
        }
    }
}

/// Status of one submission. Transport failures carry a synthetic status so
/// they flow through the same evaluation as server-reported errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Http(u16),
    Transport { message: String },
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Http(code) if (200..300).contains(code))
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Http(code) => Some(*code),
            Self::Transport { .. } => None,
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "HTTP {code}"),
            Self::Transport { message } => write!(f, "transport failure ({message})"),
        }
    }
}

/// Server reply to one submission.
#[derive(Debug, Clone)]
pub struct SubmitResponse {
    pub status: AttemptStatus,
    /// Parsed response body, if it was JSON
    pub body: Option<Value>,
    /// Raw response text, kept for reporting unparseable bodies
    pub raw_body: String,
    /// Expansion returned for a ValueSet upload
    pub expansion: Option<Value>,
    /// Id the server gave a resource created by POST
    pub assigned_id: Option<String>,
}

impl SubmitResponse {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Transport {
                message: message.into(),
            },
            body: None,
            raw_body: String::new(),
            expansion: None,
            assigned_id: None,
        }
    }

    pub fn http(status: u16, body: Option<Value>) -> Self {
        let raw_body = body.as_ref().map(Value::to_string).unwrap_or_default();
        Self {
            status: AttemptStatus::Http(status),
            body,
            raw_body,
            expansion: None,
            assigned_id: None,
        }
    }

    pub fn with_assigned_id(mut self, id: impl Into<String>) -> Self {
        self.assigned_id = Some(id.into());
        self
    }

    pub fn with_expansion(mut self, expansion: Value) -> Self {
        self.expansion = Some(expansion);
        self
    }
}

/// A server that accepts terminology resources.
#[async_trait]
pub trait TerminologyServer: Send + Sync {
    /// Check that the server can be reached at all. Called once before the
    /// first upload; an error halts the run.
    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    /// Submit the current content of `resource`. Never fails: transport
    /// problems are reported through [`AttemptStatus::Transport`].
    async fn submit(&self, resource: &Resource) -> SubmitResponse;
}

/// reqwest-backed client for a FHIR REST base URL.
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<AuthHeader>,
}

impl FhirClient {
    pub fn new(base_url: &str, auth: Option<AuthHeader>, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UploadError::configuration(format!(
                "Unsupported endpoint scheme \"{}\"",
                parsed.scheme()
            )));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fhir_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        match &self.auth {
            Some(AuthHeader::Basic { username, password }) => {
                req = req.basic_auth(username, Some(password));
            }
            Some(AuthHeader::Bearer { token }) => {
                req = req.bearer_auth(token);
            }
            None => {}
        }
        req.header("Accept", "application/json")
    }

    async fn send(&self, method: Method, url: &str, body: Option<&str>) -> SubmitResponse {
        let mut req = self.request(method, url);
        if let Some(body) = body {
            req = req
                .header("Content-Type", "application/json")
                .body(body.to_string());
        }
        match req.send().await {
            Ok(resp) => read_response(resp).await,
            Err(e) => {
                tracing::error!(url, error = %e, "Request failed");
                SubmitResponse::transport(transport_message(&e))
            }
        }
    }

    async fn expand(&self, id: &str) -> SubmitResponse {
        let url = self.fhir_url(&format!("ValueSet/{id}/$expand"));
        tracing::info!("Expanding ValueSet: GET {url}");
        self.send(Method::GET, &url, None).await
    }
}

#[async_trait]
impl TerminologyServer for FhirClient {
    async fn probe(&self) -> Result<()> {
        let url = self.fhir_url("metadata");
        match self.request(Method::GET, &url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                tracing::warn!(
                    status = resp.status().as_u16(),
                    "Server metadata endpoint did not answer with success, continuing"
                );
                Ok(())
            }
            Err(e) => Err(UploadError::unreachable(
                self.base_url.clone(),
                transport_message(&e),
            )),
        }
    }

    async fn submit(&self, resource: &Resource) -> SubmitResponse {
        let kind = resource.kind.as_str();
        let (method, url) = match &resource.id {
            Some(id) => (Method::PUT, self.fhir_url(&format!("{kind}/{id}"))),
            None => (Method::POST, self.fhir_url(kind)),
        };
        tracing::info!("-> {method} {url}");

        let mut stored = self.send(method, &url, Some(&resource.content)).await;
        if !stored.status.is_success() {
            return stored;
        }
        let returned_id = stored
            .body
            .as_ref()
            .and_then(|b| b.get("id"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if resource.id.is_none() {
            stored.assigned_id = returned_id.clone();
        }
        if resource.kind != ResourceKind::ValueSet {
            return stored;
        }

        let Some(id) = returned_id.or_else(|| resource.id.clone()) else {
            tracing::warn!("Server did not report an id for the ValueSet, cannot expand it");
            return stored;
        };

        let mut expanded = self.expand(&id).await;
        if !expanded.status.is_success() {
            expanded.assigned_id = stored.assigned_id;
            return expanded;
        }
        match expanded.body {
            Some(expansion) => stored.with_expansion(expansion),
            None => stored,
        }
    }
}

async fn read_response(resp: reqwest::Response) -> SubmitResponse {
    let status = resp.status().as_u16();
    let raw_body = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str(&raw_body).ok();
    SubmitResponse {
        status: AttemptStatus::Http(status),
        body,
        raw_body,
        expansion: None,
        assigned_id: None,
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
