//! HTTP client for the FoodShare service.
//!
//! Single choke point for outbound calls: attaches the stored bearer token,
//! enforces the configured request timeout, classifies failures into one
//! error taxonomy, and clears the session when the service rejects the
//! credential. Callers never touch the token directly.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::identity::{Identity, LoginCredentials, RegisterProfile};
use crate::session::SessionStore;

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Rejected input, before dispatch or as HTTP 400/422
    Validation,
    /// Rejected or expired credential (HTTP 401, failed sign-in, superseded sign-in)
    Auth,
    /// Request exceeded the configured time bound
    Timeout,
    /// Connection failure before a response arrived
    Network,
    /// Any other non-success HTTP status (5xx and friends)
    Server,
    /// Success status with a body that could not be interpreted
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::Auth => write!(f, "auth"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Server => write!(f, "server"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the API client with kind and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Auth, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Classifies a non-success HTTP response.
    ///
    /// 401 is the authentication-failure class; 400 and 422 are validation
    /// failures; everything else passes through as a server error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => ApiErrorKind::Auth,
            400 | 422 => ApiErrorKind::Validation,
            _ => ApiErrorKind::Server,
        };

        let message = match extract_error_message(body) {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };

        Self {
            kind,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
            status: Some(status),
        }
    }

    /// True when the caller should treat the session as ended and re-authenticate.
    pub fn is_auth(&self) -> bool {
        self.kind == ApiErrorKind::Auth
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Pulls a human-readable message out of an error body.
///
/// Accepts the shapes the service is known to emit: a `detail` string,
/// a `message` string, or a nested `error.message`.
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = json.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    json.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(std::string::ToString::to_string)
}

/// A normalized successful authentication response.
#[derive(Debug, Clone)]
pub struct AuthSuccess {
    /// The bearer token to store
    pub token: String,
    /// The identity to store
    pub user: Identity,
    /// The response body exactly as received, for the caller
    pub raw: Value,
}

/// Normalizes the varying response shapes of the auth endpoints.
///
/// Token priority: `access_token`, then `token`, then `accessToken`.
/// Identity: the `user` field when present, else the whole body.
fn normalize_auth_response(raw: Value) -> ApiResult<AuthSuccess> {
    let token = ["access_token", "token", "accessToken"]
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .filter(|t| !t.is_empty())
        .map(std::string::ToString::to_string)
        .ok_or_else(|| ApiError::parse("Auth response did not contain a token"))?;

    let user = match raw.get("user") {
        Some(user) => Identity::from_value(user.clone()),
        None => Identity::from_value(raw.clone()),
    }
    .ok_or_else(|| ApiError::parse("Auth response did not contain a user record"))?;

    Ok(AuthSuccess { token, user, raw })
}

/// FoodShare API client.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Creates a new client against the configured base URL.
    ///
    /// The base address and timeout are read once here; there is no
    /// per-request override.
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self> {
        let base_url = config.resolve_base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    /// The resolved base URL this client dispatches against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generic authenticated call.
    ///
    /// Attaches the stored bearer token when one is present; calls made
    /// before any login go out without a credential. When the service
    /// answers 401 the session is cleared before the error is returned,
    /// so the caller sees both the ended session and a distinguishable
    /// auth-kind error. All other failures pass through untouched.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let token = self.session.token();
        let result = self.dispatch(method, path, body, token.as_deref()).await;

        if let Err(err) = &result
            && err.is_auth()
        {
            tracing::debug!(path, "credential rejected, clearing session");
            self.session.logout();
        }

        result
    }

    /// Signs in. Never attaches a credential and never clears the session:
    /// a rejected login must leave any existing state untouched.
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthSuccess> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| ApiError::parse(format!("Failed to encode credentials: {e}")))?;
        let raw = self
            .dispatch(Method::POST, "/auth/login", Some(&body), None)
            .await?;
        normalize_auth_response(raw)
    }

    /// Creates an account. Same contract as [`Self::login`].
    pub async fn register(&self, profile: &RegisterProfile) -> ApiResult<AuthSuccess> {
        let body = serde_json::to_value(profile)
            .map_err(|e| ApiError::parse(format!("Failed to encode profile: {e}")))?;
        let raw = self
            .dispatch(Method::POST, "/auth/register", Some(&body), None)
            .await?;
        normalize_auth_response(raw)
    }

    /// Listings near the account's location. The payload shape is the
    /// service's concern; it passes through opaquely.
    pub async fn nearby_listings(&self) -> ApiResult<Value> {
        self.send(Method::GET, "/listings/nearby", None).await
    }

    /// Publishes a surplus-food listing.
    pub async fn create_listing(&self, listing: &Value) -> ApiResult<Value> {
        self.send(Method::POST, "/listings", Some(listing)).await
    }

    /// Claims a listing by id.
    pub async fn claim_listing(&self, listing_id: &str) -> ApiResult<Value> {
        self.send(Method::POST, &format!("/listings/{listing_id}/claim"), None)
            .await
    }

    /// Performs one request with no session side effects.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<Value> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.http.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::timeout(format!("Request to {path} timed out"))
            } else {
                ApiError::network(format!("Request to {path} failed: {err}"))
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::timeout(format!("Request to {path} timed out"))
            } else {
                ApiError::network(format!("Failed to read response from {path}: {err}"))
            }
        })?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|err| ApiError::parse(format!("Unparseable response from {path}: {err}")))
    }
}
