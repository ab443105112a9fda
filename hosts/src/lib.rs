//! Publish destinations and their HTTP clients.
//!
//! # Architecture
//!
//! The crate is organized around a host abstraction:
//!
//! - [`RepositoryHost`] - The collaborator boundary the workflow controller
//!   drives: destination identity, identity listing, repository creation
//! - [`github`] - GitHub REST v3 client serving github.com and GitHub
//!   Enterprise installations
//! - [`retry`] - Backoff policy applied to idempotent reads
//!
//! Hosts are authenticated at construction time; a constructed host is proof
//! of a usable credential and base address, so the controller never handles
//! tokens or URLs.
//!
//! # Error Handling
//!
//! Every fallible operation returns [`HostError`]. Its `Display` output is
//! the text a user should see: for API errors that is the server's own
//! message (e.g. "name already exists on this account"), extracted from the
//! response body with a size cap.

pub mod retry;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use slipway_types::{HostId, Identity, PublishRequest, PublishedRepository};

pub use slipway_types;

/// Canonical GitHub REST API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Bearer credential for a destination.
///
/// Note: `Debug` is manually implemented to redact the value, preventing
/// accidental credential disclosure in logs or error messages.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Errors from a publish destination.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The host answered with a non-success status. `message` is the
    /// server's own explanation when one could be extracted from the body,
    /// and is exactly what `Display` renders.
    #[error("{message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    /// No HTTP response was obtained.
    #[error("request failed after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    /// The host answered with a body this client could not interpret.
    #[error("unexpected response from host: {0}")]
    InvalidResponse(String),
    /// The configured host address could not be used.
    #[error("invalid host address: {0}")]
    InvalidBaseUrl(String),
}

/// A destination a local repository can be published to.
///
/// Implementations are handed to the controller as `Arc<dyn RepositoryHost>`
/// and already carry their credentials.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Stable identity of this destination.
    fn id(&self) -> &HostId;

    /// Human-readable destination name, used in window titles.
    fn title(&self) -> &str;

    /// List the identities able to own a new repository, viewer first.
    async fn identities(&self) -> Result<Vec<Identity>, HostError>;

    /// Create the repository described by a frozen publish request.
    ///
    /// Creation is not idempotent; implementations must send it exactly
    /// once.
    async fn publish(&self, request: &PublishRequest)
    -> Result<PublishedRepository, HostError>;
}

pub(crate) fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build configured HTTP client: {e}. Using defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    // GitHub rejects requests without a User-Agent.
    default_headers.insert("User-Agent", HeaderValue::from_static("slipway"));
    default_headers.insert(
        "Accept",
        HeaderValue::from_static("application/vnd.github+json"),
    );
    default_headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .default_headers(default_headers)
}

pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// GitHub REST v3 host implementation.
///
/// Serves both github.com ([`GitHubHost::dot_com`]) and GitHub Enterprise
/// installations ([`GitHubHost::enterprise`]).
///
/// # Endpoints
///
/// | Operation | Request |
/// |-----------|---------|
/// | viewer | `GET /user` |
/// | organizations | `GET /user/orgs` |
/// | create under viewer | `POST /user/repos` |
/// | create under org | `POST /orgs/{org}/repos` |
///
/// Reads go through [`retry::send_with_retry`]; creation is sent exactly
/// once.
///
/// [`GitHubHost::dot_com`]: github::GitHubHost::dot_com
/// [`GitHubHost::enterprise`]: github::GitHubHost::enterprise
pub mod github;
