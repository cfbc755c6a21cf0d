//! API client for the MultiPrints REST backend.
//!
//! This module provides the `ApiClient` struct for the authentication
//! endpoints and authenticated reads of the current account.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ApiError, AuthBackend};
use crate::auth::AuthError;
use crate::models::{
    BackendUser, LoginCredentials, LoginResponse, RefreshRequest, RefreshResponse, TokenGrant,
};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the backend API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) reads.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    admin: Option<BackendUser>,
    #[serde(default)]
    user: Option<BackendUser>,
}

/// API client for the MultiPrints backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    /// Single POST, no retries.
    async fn post_once<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = Self::check_response(request.send().await?).await?;
        Self::parse_json(response, url).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.client.get(url).bearer_auth(token).send().await?;

            if response.status().as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let response = Self::check_response(response).await?;
            return Self::parse_json(response, url).await;
        }
    }

    /// Authenticate and return the issued tokens
    pub async fn authenticate(&self, credentials: &LoginCredentials) -> Result<TokenGrant, ApiError> {
        let url = self.url("/auth/login");
        debug!(email = %credentials.email, "Sending login request");
        let response: LoginResponse = self.post_once(&url, None, credentials).await?;
        Ok(response.into_grant())
    }

    /// Exchange a renewal token for a new bearer token.
    ///
    /// The renewal token goes in the body and as the bearer, since the
    /// backend's refresh route authenticates with the refresh JWT itself.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        let url = self.url("/auth/refresh");
        let body = RefreshRequest { refresh_token };
        let response: RefreshResponse = self.post_once(&url, Some(refresh_token), &body).await?;
        Ok(response.into_grant())
    }

    /// Fetch the account behind `token` (`GET /auth/me`)
    pub async fn current_account(&self, token: &str) -> Result<BackendUser, ApiError> {
        let url = self.url("/auth/me");
        let response: AccountResponse = self.get(&url, token).await?;
        response
            .admin
            .or(response.user)
            .ok_or_else(|| ApiError::InvalidResponse("account response has no admin or user".to_string()))
    }
}

impl AuthBackend for ApiClient {
    fn login<'a>(&'a self, credentials: &'a LoginCredentials) -> BoxFuture<'a, Result<TokenGrant, AuthError>> {
        async move { self.authenticate(credentials).await.map_err(AuthError::from) }.boxed()
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenGrant, AuthError>> {
        async move { self.refresh_token(refresh_token).await.map_err(AuthError::from) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api/v1/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api/v1");
        assert_eq!(client.url("/auth/login"), "http://localhost:5000/api/v1/auth/login");
    }

    #[test]
    fn test_parse_account_response() {
        let json = r#"{"admin": {"id": "9f1c", "username": "owner", "email": "owner@multiprints.co.ke", "role": "owner", "is_active": true, "last_login": "2024-05-01T10:00:00"}}"#;
        let resp: AccountResponse = serde_json::from_str(json).expect("Failed to parse account test JSON");
        let account = resp.admin.expect("admin present");
        assert_eq!(account.role.as_deref(), Some("owner"));
        assert_eq!(account.is_active, Some(true));
    }

    #[test]
    fn test_refresh_request_body() {
        let body = serde_json::to_value(RefreshRequest { refresh_token: "r.t.x" }).unwrap();
        assert_eq!(body, serde_json::json!({"refresh_token": "r.t.x"}));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_failure() {
        // Port 9 (discard) on localhost is not expected to speak HTTP.
        let client = ApiClient::new("http://127.0.0.1:9", 2).unwrap();
        let err = AuthBackend::login(&client, &LoginCredentials::new("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NetworkFailure(_)));
    }
}
