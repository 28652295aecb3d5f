//! Thin HTTP clients for the platform's storage and orchestrator services.
//!
//! Only the calls the harness needs are exposed. Both services use basic
//! auth. A `409 Conflict` answer to a POST means the resource is already
//! registered (e.g. a previous harness run); it is reported as
//! [`PostOutcome::AlreadyExists`] rather than as an error.
//!
//! The [`StorageApi`] and [`OrchestratorApi`] traits are the seams the
//! harness workflow is written against, so it can run against fakes.

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::metadata::{Resource, ResourceKind};

/// Failure of a remote call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("cannot decode response of {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("cannot attach {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Successful result of a POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Created,
    /// The service already knows this resource (HTTP 409).
    AlreadyExists,
}

/// Which uplet list to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpletKind {
    Learnuplet,
    Preduplet,
}

impl UpletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpletKind::Learnuplet => "learnuplet",
            UpletKind::Preduplet => "preduplet",
        }
    }

    /// Top-level key of the list response, e.g. `{"learnuplets": [...]}`.
    pub fn list_key(&self) -> &'static str {
        match self {
            UpletKind::Learnuplet => "learnuplets",
            UpletKind::Preduplet => "preduplets",
        }
    }
}

impl std::fmt::Display for UpletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait StorageApi {
    /// Upload a resource's metadata together with its data blob.
    fn post(
        &self,
        kind: ResourceKind,
        resource: &Resource,
        blob: &Path,
    ) -> Result<PostOutcome, RemoteError>;

    fn post_problem(&self, resource: &Resource, blob: &Path) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Problem, resource, blob)
    }

    fn post_data(&self, resource: &Resource, blob: &Path) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Data, resource, blob)
    }

    fn post_algo(&self, resource: &Resource, blob: &Path) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Algo, resource, blob)
    }
}

pub trait OrchestratorApi {
    fn post(&self, kind: ResourceKind, resource: &Resource) -> Result<PostOutcome, RemoteError>;

    /// Raw body of `GET /<uplet kind>`.
    fn get_list(&self, kind: UpletKind) -> Result<Vec<u8>, RemoteError>;

    fn post_problem(&self, resource: &Resource) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Problem, resource)
    }

    fn post_data(&self, resource: &Resource) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Data, resource)
    }

    fn post_algo(&self, resource: &Resource) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Algo, resource)
    }

    fn post_prediction(&self, resource: &Resource) -> Result<PostOutcome, RemoteError> {
        self.post(ResourceKind::Prediction, resource)
    }
}

/// Shared plumbing: base URL, credentials, HTTP client.
#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    user: Option<String>,
    password: Option<String>,
    client: Client,
}

impl Endpoint {
    fn new(service: &ServiceConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: service.base_url(),
            user: service.user.clone(),
            password: service.password.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    fn send(
        &self,
        method: &'static str,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<Response, RemoteError> {
        self.auth(builder)
            .send()
            .map_err(|source| RemoteError::Transport {
                method,
                url: url.to_string(),
                source,
            })
    }
}

/// Map a POST response status to an outcome.
pub fn classify_post(
    method: &'static str,
    url: &str,
    status: StatusCode,
    body: impl FnOnce() -> String,
) -> Result<PostOutcome, RemoteError> {
    if status.is_success() {
        Ok(PostOutcome::Created)
    } else if status == StatusCode::CONFLICT {
        Ok(PostOutcome::AlreadyExists)
    } else {
        Err(RemoteError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body: body(),
        })
    }
}

/// Storage service client (`POST /<kind>` multipart uploads).
#[derive(Debug, Clone)]
pub struct StorageClient {
    endpoint: Endpoint,
}

impl StorageClient {
    pub fn new(service: &ServiceConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            endpoint: Endpoint::new(service, timeout)?,
        })
    }
}

impl StorageApi for StorageClient {
    fn post(
        &self,
        kind: ResourceKind,
        resource: &Resource,
        blob: &Path,
    ) -> Result<PostOutcome, RemoteError> {
        let url = self.endpoint.url(kind.as_str());

        let size = std::fs::metadata(blob)
            .map_err(|source| RemoteError::Attachment {
                path: blob.display().to_string(),
                source,
            })?
            .len();
        let mut form = multipart::Form::new()
            .text("uuid", resource.id.to_string())
            .text("size", size.to_string());
        for (key, value) in &resource.fields {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
        let form = form
            .file("blob", blob)
            .map_err(|source| RemoteError::Attachment {
                path: blob.display().to_string(),
                source,
            })?;

        let resp = self
            .endpoint
            .send("POST", &url, self.endpoint.client.post(&url).multipart(form))?;
        let status = resp.status();
        classify_post("POST", &url, status, || resp.text().unwrap_or_default())
    }
}

/// Orchestrator client (`POST /<kind>` JSON, `GET /<uplet kind>`).
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    endpoint: Endpoint,
}

impl OrchestratorClient {
    pub fn new(service: &ServiceConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            endpoint: Endpoint::new(service, timeout)?,
        })
    }
}

impl OrchestratorApi for OrchestratorClient {
    fn post(&self, kind: ResourceKind, resource: &Resource) -> Result<PostOutcome, RemoteError> {
        let url = self.endpoint.url(kind.as_str());
        let resp = self
            .endpoint
            .send("POST", &url, self.endpoint.client.post(&url).json(resource))?;
        let status = resp.status();
        classify_post("POST", &url, status, || resp.text().unwrap_or_default())
    }

    fn get_list(&self, kind: UpletKind) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint.url(kind.as_str());
        let resp = self
            .endpoint
            .send("GET", &url, self.endpoint.client.get(&url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                method: "GET",
                url,
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|source| RemoteError::Transport {
                method: "GET",
                url,
                source,
            })
    }
}
