use crate::retry::{self, RetryConfig, RetryOutcome};
use crate::{
    AccessToken, GITHUB_API_URL, HostError, RepositoryHost, http_client, read_capped_error_body,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use slipway_types::{
    HostId, Identity, IdentityId, IdentityKind, PublishRequest, PublishedRepository,
};
use url::Url;

/// A GitHub or GitHub Enterprise destination.
#[derive(Debug, Clone)]
pub struct GitHubHost {
    id: HostId,
    title: String,
    base: String,
    token: AccessToken,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl GitHubHost {
    /// Destination for github.com.
    #[must_use]
    pub fn dot_com(token: impl Into<AccessToken>) -> Self {
        Self {
            id: HostId::new("github.com"),
            title: "GitHub".to_string(),
            base: GITHUB_API_URL.to_string(),
            token: token.into(),
            client: http_client().clone(),
            retry: RetryConfig::default(),
        }
    }

    /// Destination for a GitHub Enterprise installation.
    ///
    /// `api_root` is the REST root of the installation, e.g.
    /// `https://ghe.example.com/api/v3`. The installation's hostname becomes
    /// both the destination id and its title.
    pub fn enterprise(
        api_root: impl Into<String>,
        token: impl Into<AccessToken>,
    ) -> Result<Self, HostError> {
        let base = api_root.into().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base).map_err(|e| HostError::InvalidBaseUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HostError::InvalidBaseUrl(format!(
                "unsupported scheme {:?}",
                parsed.scheme()
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| HostError::InvalidBaseUrl("address has no host".to_string()))?;

        Ok(Self {
            id: HostId::new(host),
            title: host.to_string(),
            base,
            token: token.into(),
            client: http_client().clone(),
            retry: RetryConfig::default(),
        })
    }

    /// Replace the read retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, HostError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base);
        let outcome = retry::send_with_retry(
            || {
                self.client
                    .get(&url)
                    .bearer_auth(self.token.expose_secret())
            },
            &self.retry,
        )
        .await;

        let response = require_success(outcome).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| HostError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RepositoryHost for GitHubHost {
    fn id(&self) -> &HostId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    async fn identities(&self) -> Result<Vec<Identity>, HostError> {
        let viewer = self.get_json::<UserPayload>("/user").await?;
        let orgs = self.get_json::<Vec<OrgPayload>>("/user/orgs").await?;

        let mut identities = Vec::with_capacity(1 + orgs.len());
        identities.push(viewer.into_identity());
        identities.extend(orgs.into_iter().map(OrgPayload::into_identity));
        Ok(identities)
    }

    async fn publish(
        &self,
        request: &PublishRequest,
    ) -> Result<PublishedRepository, HostError> {
        let owner = request.owner();
        let url = match owner.kind {
            IdentityKind::User => format!("{}/user/repos", self.base),
            IdentityKind::Organization => format!("{}/orgs/{}/repos", self.base, owner.login),
        };
        let body = json!({
            "name": request.name(),
            "description": request.description(),
            "private": request.private(),
        });

        // Creation is not idempotent, so this is a single attempt with no
        // retry regardless of the failure mode.
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|source| HostError::Network {
                attempts: 1,
                source,
            })?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let payload: RepoPayload = response
            .json()
            .await
            .map_err(|e| HostError::InvalidResponse(e.to_string()))?;
        Ok(payload.into_published())
    }
}

async fn require_success(outcome: RetryOutcome) -> Result<reqwest::Response, HostError> {
    match outcome {
        RetryOutcome::Success(response) => Ok(response),
        RetryOutcome::HttpError(response) => Err(api_error(response).await),
        RetryOutcome::ConnectionError { attempts, source } => {
            Err(HostError::Network { attempts, source })
        }
        RetryOutcome::NonRetryable(source) => Err(HostError::Network {
            attempts: 1,
            source,
        }),
    }
}

async fn api_error(response: reqwest::Response) -> HostError {
    let status = response.status();
    let body = read_capped_error_body(response).await;
    HostError::Api {
        status,
        message: api_error_message(status, &body),
    }
}

/// Extract the server's own explanation from a GitHub error body.
///
/// GitHub reports `{"message": ..., "errors": [...]}`. The per-field error
/// carries the text worth showing ("name already exists on this account"),
/// so it is appended to the summary when present. Non-JSON bodies fall back
/// to the raw (capped) text.
fn api_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorPayload>(body) {
        let detail = payload.errors.into_iter().find_map(|e| e.message);
        return match detail {
            Some(detail) => format!("{}: {detail}", payload.message.trim_end_matches('.')),
            None => payload.message,
        };
    }
    format!("API error {status}: {body}")
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: u64,
    login: String,
    avatar_url: Option<String>,
    plan: Option<PlanPayload>,
}

#[derive(Debug, Deserialize)]
struct PlanPayload {
    private_repos: u64,
}

impl UserPayload {
    fn into_identity(self) -> Identity {
        Identity {
            id: IdentityId::new(self.id),
            login: self.login,
            kind: IdentityKind::User,
            avatar_url: self.avatar_url,
            // Plan info is absent for some token scopes; absence fails open
            // and the server remains the authority on a private create.
            owns_private: self.plan.is_none_or(|p| p.private_repos > 0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrgPayload {
    id: u64,
    login: String,
    avatar_url: Option<String>,
}

impl OrgPayload {
    fn into_identity(self) -> Identity {
        Identity {
            id: IdentityId::new(self.id),
            login: self.login,
            kind: IdentityKind::Organization,
            avatar_url: self.avatar_url,
            // The org listing carries no plan info. Fail open here too.
            owns_private: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    full_name: String,
    clone_url: String,
}

impl RepoPayload {
    fn into_published(self) -> PublishedRepository {
        PublishedRepository {
            name_with_owner: self.full_name,
            clone_url: self.clone_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
