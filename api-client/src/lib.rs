use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use lab47_common::constants::{SESSION_TOKEN_USER, USER_AGENT};
use lab47_common::models::{
    account::{AccountInfo, TokenResponse},
    credit::{CreditAddRequest, CreditAddResponse},
    machine::{MachineAccountCreateRequest, MachineAccountCreateResponse},
    namespace::ListNamespaces,
    repo::RepoSettingsApply,
    token::{PersonalTokenRequest, PersonalTokenResponse},
};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method, Response,
};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;

#[cfg(feature = "tracing")]
mod middleware;
#[cfg(feature = "tracing")]
use tracing::trace;

#[cfg(feature = "tracing")]
use crate::middleware::LoggingMiddleware;

pub mod error;
pub mod util;
pub use error::{ApiError, RemoteError};
pub use util::{ParsedJson, ToBodyContent};

/// Where the OIDC issuer hands out personal tokens for the signed-in account
pub const PERSONAL_TOKEN_URL: &str = "https://allow.pub/api/v1/personal-token";

/// Single entry point for every call to the account and registry service.
///
/// Each call is one request: no retries, no shared state beyond the base URL.
#[derive(Clone)]
pub struct LabApiClient {
    pub client: ClientWithMiddleware,
    pub api_url: String,
}

impl LabApiClient {
    pub fn new(
        api_url: String,
        headers: Option<HeaderMap>,
        timeout: Option<u64>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(headers) = headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .timeout(Duration::from_secs(timeout.unwrap_or(60)))
            .build()
            .map_err(ApiError::Client)?;

        let builder = reqwest_middleware::ClientBuilder::new(client);

        #[cfg(feature = "tracing")]
        let builder = builder.with(LoggingMiddleware);

        let client = builder.build();

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve `path` against the base URL. Absolute URLs are used as they are.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.api_url, path)
        }
    }

    /// Issue exactly one request.
    ///
    /// A body is JSON encoded and marks the request as `application/json`.
    /// `headers` are applied last, so they win over anything set here,
    /// including `Authorization`. Only transport failures are reported here;
    /// use [`ToBodyContent`] on the response to check the status and decode.
    pub async fn perform<T: Serialize>(
        &self,
        method: Method,
        path: impl AsRef<str>,
        headers: Option<HeaderMap>,
        body: Option<T>,
    ) -> Result<Response, ApiError> {
        let path = path.as_ref();
        let mut builder = self.client.request(method, self.url(path));

        if let Some(body) = body {
            let body = serde_json::to_vec(&body).map_err(ApiError::Encode)?;
            #[cfg(feature = "tracing")]
            trace!(bytes = body.len(), "Outgoing body");
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }

        builder.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })
    }

    pub async fn post<T: Serialize>(
        &self,
        path: impl AsRef<str>,
        body: Option<T>,
    ) -> Result<Response, ApiError> {
        self.perform(Method::POST, path, None, body).await
    }

    pub async fn get(&self, path: impl AsRef<str>) -> Result<Response, ApiError> {
        self.perform(Method::GET, path, None, Option::<()>::None)
            .await
    }

    pub async fn token_post<T: Serialize>(
        &self,
        token: &str,
        path: impl AsRef<str>,
        body: Option<T>,
    ) -> Result<Response, ApiError> {
        let headers = session_headers(token)?;
        self.perform(Method::POST, path, Some(headers), body).await
    }

    pub async fn token_put<T: Serialize>(
        &self,
        token: &str,
        path: impl AsRef<str>,
        body: Option<T>,
    ) -> Result<Response, ApiError> {
        let headers = session_headers(token)?;
        self.perform(Method::PUT, path, Some(headers), body).await
    }

    pub async fn token_get(&self, token: &str, path: impl AsRef<str>) -> Result<Response, ApiError> {
        let headers = session_headers(token)?;
        self.perform(Method::GET, path, Some(headers), Option::<()>::None)
            .await
    }

    /// GET authenticated with the account's own email and password. Only the
    /// initial token exchange uses this.
    pub async fn credential_get(
        &self,
        email: &str,
        password: &str,
        path: impl AsRef<str>,
    ) -> Result<Response, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, basic_auth(email, password)?);
        self.perform(Method::GET, path, Some(headers), Option::<()>::None)
            .await
    }

    pub async fn create_account(
        &self,
        account: &AccountInfo,
    ) -> Result<ParsedJson<TokenResponse>, ApiError> {
        self.post("/api/v1/account", Some(account))
            .await?
            .to_json()
            .await
    }

    pub async fn fetch_token(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ParsedJson<TokenResponse>, ApiError> {
        self.credential_get(email, password, "/api/v1/token")
            .await?
            .to_json()
            .await
    }

    pub async fn list_namespaces(&self, token: &str) -> Result<ParsedJson<ListNamespaces>, ApiError> {
        self.token_get(token, "/api/v1/namespaces")
            .await?
            .to_json()
            .await
    }

    pub async fn create_machine_account(
        &self,
        token: &str,
        namespace: &str,
        req: &MachineAccountCreateRequest,
    ) -> Result<ParsedJson<MachineAccountCreateResponse>, ApiError> {
        let path = format!("/api/v1/namespace/{namespace}/machine-account");

        self.token_put(token, path, Some(req))
            .await?
            .to_json()
            .await
    }

    pub async fn add_credit(
        &self,
        token: &str,
        req: &CreditAddRequest,
    ) -> Result<ParsedJson<CreditAddResponse>, ApiError> {
        self.token_put(token, "/api/v1/credit/add", Some(req))
            .await?
            .to_json()
            .await
    }

    /// `full_name` is `namespace/repo`
    pub async fn create_repo(&self, token: &str, full_name: &str) -> Result<(), ApiError> {
        let path = format!("/vcr/v1/repo/{full_name}");

        self.token_post(token, path, Option::<()>::None)
            .await?
            .to_empty()
            .await
    }

    pub async fn update_repo_settings(
        &self,
        token: &str,
        full_name: &str,
        settings: &RepoSettingsApply,
    ) -> Result<(), ApiError> {
        let path = format!("/vcr/v1/repo/{full_name}/update-settings");

        self.token_put(token, path, Some(settings))
            .await?
            .to_empty()
            .await
    }

    pub async fn personal_token(
        &self,
        token: &str,
    ) -> Result<ParsedJson<PersonalTokenResponse>, ApiError> {
        self.token_post(token, PERSONAL_TOKEN_URL, Some(PersonalTokenRequest::default()))
            .await?
            .to_json()
            .await
    }
}

/// `Basic base64(user:pass)`, marked sensitive so it is redacted from debug output
pub fn basic_auth(user: &str, password: &str) -> Result<HeaderValue, ApiError> {
    let encoded = STANDARD.encode(format!("{user}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
    value.set_sensitive(true);

    Ok(value)
}

fn session_headers(token: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, basic_auth(SESSION_TOKEN_USER, token)?);

    Ok(headers)
}
