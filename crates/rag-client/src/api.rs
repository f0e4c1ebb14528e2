use std::time::Duration;

use async_trait::async_trait;
use rag_types::{
    permits, Action, BackendErrorBody, ConsoleError, ConsoleResult, CreateOrgRequest,
    CreateUserRequest, CreatedUser, DeletedUser, OrgList, OrgUser, Organization, Role, Session,
    TokenGrant, UserList, UserTarget,
};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::guard::{Authenticator, SessionGuard};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the RAG backend lives and how long to wait for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn base_url(&self) -> ConsoleResult<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| ConsoleError::Network(format!("invalid backend url {}: {e}", self.base_url)))
    }

    pub fn http_client(&self) -> ConsoleResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ConsoleError::Network(format!("failed to build http client: {e}")))
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> ConsoleResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConsoleError::Network(format!("backend url {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn network_error(e: reqwest::Error) -> ConsoleError {
    if e.is_timeout() {
        ConsoleError::Network("backend did not respond in time".into())
    } else {
        ConsoleError::Network(e.to_string())
    }
}

/// Maps a non-success backend response onto the console error taxonomy.
pub fn error_from_status(status: StatusCode, body: &str) -> ConsoleError {
    let messages = BackendErrorBody::messages(body);
    let first = || {
        messages
            .first()
            .cloned()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string())
    };
    match status {
        StatusCode::UNAUTHORIZED => ConsoleError::Authentication(first()),
        StatusCode::FORBIDDEN => ConsoleError::Authorization(first()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            if messages.is_empty() {
                ConsoleError::validation("invalid request")
            } else {
                ConsoleError::Validation(messages.clone())
            }
        }
        _ => ConsoleError::Rejected {
            status: status.as_u16(),
            message: if messages.is_empty() {
                first()
            } else {
                messages.join("; ")
            },
        },
    }
}

/// `POST /token`, form encoded.
pub struct TokenEndpoint {
    http: reqwest::Client,
    base: Url,
}

impl TokenEndpoint {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl Authenticator for TokenEndpoint {
    async fn authenticate(&self, username: &str, password: &str) -> ConsoleResult<Session> {
        let url = endpoint(&self.base, &["token"])?;
        debug!("POST {url} for {username}");
        let response = self
            .http
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                // The backend answers bad credentials with 400.
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    let message = BackendErrorBody::messages(&body)
                        .into_iter()
                        .next()
                        .unwrap_or_else(|| "Incorrect username or password".into());
                    ConsoleError::Authentication(message)
                }
                _ => error_from_status(status, &body),
            });
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| ConsoleError::Network(format!("invalid token response: {e}")))?;
        grant.into_session(username).ok_or_else(|| {
            ConsoleError::Authentication("login response did not contain a usable token".into())
        })
    }
}

/// REST client for the backend. Reads the bearer from the guard when each
/// request is built, so a completed logout is seen by every later call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    guard: SessionGuard,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base: Url, guard: SessionGuard) -> Self {
        Self { http, base, guard }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub async fn list_orgs(&self) -> ConsoleResult<Vec<Organization>> {
        let list: OrgList = self.send(Method::GET, &["orgs"], None::<&()>).await?;
        Ok(list.orgs)
    }

    /// Validates locally, then creates the organization. Requires admin.
    pub async fn create_org(&self, org_id: &str, org_name: &str) -> ConsoleResult<Organization> {
        let request = CreateOrgRequest::validate(org_id, org_name)?;
        self.require(Action::CreateOrg, None)?;
        self.send(Method::POST, &["admin", "orgs"], Some(&request)).await
    }

    pub async fn list_users(&self, org_id: &str) -> ConsoleResult<Vec<OrgUser>> {
        let list: UserList = self
            .send(Method::GET, &["orgs", org_id, "users"], None::<&()>)
            .await?;
        Ok(list.users)
    }

    /// Validates fields and the role ceiling locally, then creates the user.
    pub async fn create_user(
        &self,
        org_id: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> ConsoleResult<CreatedUser> {
        let request =
            CreateUserRequest::validate(username, password, role, self.guard.current_role())?;
        self.require(Action::CreateUser, Some(role))?;
        self.send(Method::POST, &["orgs", org_id, "users"], Some(&request))
            .await
    }

    pub async fn delete_user(&self, org_id: &str, username: &str) -> ConsoleResult<DeletedUser> {
        let target = UserTarget::validate(org_id, username)?;
        self.require(Action::DeleteUser, None)?;
        self.send(
            Method::DELETE,
            &["orgs", &target.org_id, "users", &target.username],
            None::<&()>,
        )
        .await
    }

    /// Advisory gate; the backend re-checks every mutation.
    fn require(&self, action: Action, target: Option<Role>) -> ConsoleResult<()> {
        let role = self.guard.current_role();
        if permits(role, action, target) {
            return Ok(());
        }
        Err(match role {
            None => ConsoleError::Authentication("Not logged in".into()),
            Some(role) => ConsoleError::Authorization(format!(
                "{} role may not {}",
                role.label(),
                action.as_str().replace('_', " ")
            )),
        })
    }

    async fn send<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> ConsoleResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = endpoint(&self.base, segments)?;
        let bearer = self.guard.bearer();
        debug!(
            "{method} {url} (authenticated: {})",
            bearer.is_some()
        );

        let mut request = self.http.request(method, url);
        if let Some(token) = &bearer {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ConsoleError::Network(format!("invalid response body: {e}")));
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = &bearer {
                self.guard.invalidate(token);
            }
        }
        Err(error_from_status(status, &text))
    }
}
