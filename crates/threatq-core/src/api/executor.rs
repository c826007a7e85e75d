//! Authenticated request execution against the ThreatQ API.
//!
//! Every outbound call goes through `AuthenticatedRequestExecutor::execute`,
//! which makes sure a bearer token is available, sends the request, and on a
//! 401 drops the cached token and tries again with a fresh login. The number
//! of attempts per logical request is capped so a server that rejects every
//! token cannot cause an endless login loop.
//!
//! A 401 is the only status treated as "token expired". A server answering
//! 403 for a stale token will surface as `ApiError::UnexpectedStatus`.

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::auth::SessionManager;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of attempts (and therefore logins) for one logical request.
pub const MAX_AUTH_RETRIES: u32 = 2;

/// Token endpoint, relative to the server URL
const TOKEN_PATH: &str = "/api/token";

/// Statuses this API uses for success: 200 (get/update), 201 (create), 204 (delete)
const EXPECTED_STATUSES: [StatusCode; 3] =
    [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT];

// ============================================================================
// Request / Response Types
// ============================================================================

/// Server location and login material for one ThreatQ account.
#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
}

impl Credentials {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            client_id: client_id.into(),
        }
    }

    /// Join an API path onto the configured server URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Description of a single API call, replayable across auth retries.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful response: status plus the decoded JSON body (`Null` when empty).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body into a typed response
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response body: {}", e)))
    }
}

/// Steps of one authenticated request.
enum AuthState {
    NeedToken,
    Authenticating,
    Requesting(String),
    /// Holds the token the server rejected
    Retrying(String),
    Done(ApiResponse),
    Failed(ApiError),
}

// ============================================================================
// Executor
// ============================================================================

/// Wraps requests with "ensure token, execute, retry once on 401" semantics.
/// Clone is cheap - the HTTP client and session cache are both shared.
#[derive(Clone)]
pub struct AuthenticatedRequestExecutor {
    client: Client,
    sessions: Arc<SessionManager>,
    max_attempts: u32,
}

impl AuthenticatedRequestExecutor {
    pub fn new(client: Client, sessions: Arc<SessionManager>) -> Self {
        Self {
            client,
            sessions,
            max_attempts: MAX_AUTH_RETRIES,
        }
    }

    /// Override the attempt ceiling (minimum 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run `spec` with a valid bearer token, re-authenticating on 401.
    pub async fn execute(
        &self,
        creds: &Credentials,
        spec: &RequestSpec,
    ) -> Result<ApiResponse, ApiError> {
        let mut attempt: u32 = 0;
        let mut state = AuthState::NeedToken;

        loop {
            state = match state {
                AuthState::NeedToken => {
                    if attempt >= self.max_attempts {
                        AuthState::Failed(ApiError::RetriesExhausted { attempts: attempt })
                    } else {
                        match self.sessions.get_session(&creds.username, &creds.password) {
                            Some(token) => AuthState::Requesting(token),
                            None => AuthState::Authenticating,
                        }
                    }
                }
                AuthState::Authenticating => match self.login(creds).await {
                    Ok(token) => {
                        self.sessions
                            .set_session(&creds.username, &creds.password, token.clone());
                        AuthState::Requesting(token)
                    }
                    Err(e) => AuthState::Failed(e),
                },
                AuthState::Requesting(token) => match self.send(creds, spec, &token).await {
                    Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                        AuthState::Retrying(token)
                    }
                    Ok(response) => match Self::into_api_response(response).await {
                        Ok(response) => AuthState::Done(response),
                        Err(e) => AuthState::Failed(e),
                    },
                    Err(e) => AuthState::Failed(e),
                },
                AuthState::Retrying(rejected) => {
                    self.sessions
                        .clear_session_if(&creds.username, &creds.password, &rejected);
                    attempt += 1;
                    warn!(
                        method = %spec.method,
                        path = %spec.path,
                        attempt = attempt,
                        "Token rejected, re-authenticating"
                    );
                    AuthState::NeedToken
                }
                AuthState::Done(response) => return Ok(response),
                AuthState::Failed(e) => return Err(e),
            };
        }
    }

    /// Exchange credentials for a bearer token via the password grant
    async fn login(&self, creds: &Credentials) -> Result<String, ApiError> {
        debug!(username = %creds.username, "Requesting ThreatQ access token");

        let body = json!({
            "email": creds.username,
            "password": creds.password,
            "grant_type": "password",
            "client_id": creds.client_id,
        });

        let response = self
            .client
            .post(creds.endpoint(TOKEN_PATH))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::ConnectionError)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::ConnectionError)?;

        if status != StatusCode::OK {
            return Err(ApiError::from_login_status(status, text));
        }

        let token = serde_json::from_str::<Value>(&text).ok().and_then(|v| {
            v.get("access_token")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        token.ok_or(ApiError::MalformedLoginResponse { body: text })
    }

    async fn send(
        &self,
        creds: &Credentials,
        spec: &RequestSpec,
        token: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let url = creds.endpoint(&spec.path);
        trace!(method = %spec.method, url = %url, "Sending ThreatQ request");

        let mut request = self
            .client
            .request(spec.method.clone(), &url)
            .bearer_auth(token);

        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(ref body) = spec.body {
            request = request.json(body);
        }

        request.send().await.map_err(ApiError::ConnectionError)
    }

    /// Check the status against the expected set and decode the body
    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let text = response.text().await.map_err(ApiError::ConnectionError)?;

        if !EXPECTED_STATUSES.contains(&status) {
            return Err(ApiError::UnexpectedStatus { status, body: text });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
            })?
        };

        Ok(ApiResponse { status, body })
    }
}
