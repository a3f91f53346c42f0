//! API client for the Quadrobobr backend.
//!
//! `ApiClient` performs the unauthenticated login exchange. `AuthorizedClient`
//! wraps every protected request: it attaches the bearer token held by the
//! session and ends the session when the server answers 401.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Identity, SessionManager};

use super::{ApiError, AuthError};

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/api/auth/login";

/// Unread contact-form messages, shown as a badge in the sidebar
const UNREAD_COUNT_PATH: &str = "/api/contact-forms/unread-count";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
    admin: Option<serde_json::Value>,
}

/// Credential and identity issued by a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub access_token: String,
    pub identity: Identity,
    /// The `admin` object exactly as the server sent it
    pub identity_json: serde_json::Value,
}

impl LoginResponse {
    fn into_grant(self) -> Result<LoginGrant, AuthError> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;

        let admin = self
            .admin
            .ok_or_else(|| AuthError::MalformedResponse("missing admin".to_string()))?;
        if !admin.is_object() {
            return Err(AuthError::MalformedResponse(
                "admin is not an object".to_string(),
            ));
        }
        let identity = Identity::deserialize(&admin)
            .map_err(|e| AuthError::MalformedResponse(format!("invalid admin: {}", e)))?;

        Ok(LoginGrant {
            access_token,
            identity,
            identity_json: admin,
        })
    }
}

/// API client for the Quadrobobr backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create an authorized client for `session`, sharing the connection pool.
    pub fn authorized(&self, session: Arc<SessionManager>) -> AuthorizedClient {
        AuthorizedClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session,
        }
    }

    /// Exchange an email/password pair for a credential and identity.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthError::NetworkUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            info!(status = status.as_u16(), "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkUnavailable(e.to_string()))?;
        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        parsed.into_grant()
    }
}

/// Request wrapper for protected endpoints.
#[derive(Clone)]
pub struct AuthorizedClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl AuthorizedClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Attach the bearer token and send. Nothing is sent without a token.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self
            .session
            .token()
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::NotAuthenticated)?;
        let response = request.bearer_auth(&token).send().await?;
        self.check_response(response, &token).await
    }

    /// Check if response is successful, returning an error with body if not.
    /// A 401 ends the session before the error is returned, unless a newer
    /// login has already replaced `token`.
    async fn check_response(&self, response: Response, token: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            if self.session.logout_if_token(token) {
                warn!(url = %response.url(), "Token rejected by server, signed out");
            }
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(e.to_string())
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(self.client.get(&url)).await?;
        Self::parse_json(response, &url).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(self.client.post(&url).json(body)).await?;
        Self::parse_json(response, &url).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(self.client.put(&url).json(body)).await?;
        Self::parse_json(response, &url).await
    }

    /// Delete a resource. The response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Number of unread contact-form messages
    pub async fn unread_message_count(&self) -> Result<u64, ApiError> {
        self.get(UNREAD_COUNT_PATH).await
    }
}
