//! Broker API client
//!
//! The frontend owns no user data; every identity decision goes through the
//! broker. `BackendApi` is the seam the session gate and the auth handlers
//! call, and `HttpBackend` is the reqwest implementation built from
//! [`BackendConfig`].
//!
//! Any non-2xx status is a [`BackendError::Rejected`]. Connection failures,
//! timeouts and undecodable success bodies are [`BackendError::Unavailable`].

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum_extra::extract::cookie::CookieJar;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::models::{
    ApiResponse, TokensResult, UserModel, CSRF_HEADER, CSRF_TOKEN_COOKIE, SESSION_TOKEN_COOKIE,
};
use crate::services::cookie_parser::extract_tokens_from_headers;

/// Status reported for failures that never got an HTTP status
pub const DEFAULT_FAILURE_STATUS: u16 = 400;

/// Errors from calling the broker API
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network error, timeout, or a response that could not be decoded
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The broker answered with a non-success status
    #[error("Backend rejected request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },
}

impl BackendError {
    /// Status to report to the browser, 400 when the broker never sent one.
    pub fn status_or_default(&self) -> StatusCode {
        let code = match self {
            Self::Rejected { status, .. } => *status,
            Self::Unavailable(_) => DEFAULT_FAILURE_STATUS,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    /// Broker-supplied message, or `default` when there is none.
    pub fn message_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => message.as_str(),
            _ => default,
        }
    }
}

/// Session credentials forwarded to the broker on authenticated calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    pub session_token: Option<String>,
    pub csrf_token: Option<String>,
}

impl AuthHeaders {
    /// Read the session and CSRF cookies from the incoming request.
    pub fn from_jar(jar: &CookieJar) -> Self {
        Self {
            session_token: jar.get(SESSION_TOKEN_COOKIE).map(|c| c.value().to_string()),
            csrf_token: jar.get(CSRF_TOKEN_COOKIE).map(|c| c.value().to_string()),
        }
    }

    /// Whether both halves of a session are present
    pub fn is_complete(&self) -> bool {
        self.session_token.is_some() && self.csrf_token.is_some()
    }

    /// Value of the `Cookie` header sent upstream
    pub fn cookie_header(&self) -> Option<String> {
        self.session_token
            .as_ref()
            .map(|token| format!("{}={}", SESSION_TOKEN_COOKIE, token))
    }
}

/// Login form, also the JSON body of `POST /login`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form, also the JSON body of `POST /register`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Result of a successful `POST /login`
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub body: ApiResponse<UserModel>,
    /// Session and CSRF tokens parsed from the `Set-Cookie` headers
    pub tokens: TokensResult,
}

/// Operations the frontend needs from the broker
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /user/{id}` with the forwarded session credentials
    async fn get_user(
        &self,
        user_id: &str,
        auth: &AuthHeaders,
    ) -> Result<ApiResponse<UserModel>, BackendError>;

    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError>;

    /// `POST /logout` with the forwarded session credentials
    async fn logout(&self, auth: &AuthHeaders) -> Result<(), BackendError>;

    /// `POST /register`
    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<ApiResponse<UserModel>, BackendError>;
}

/// reqwest-backed broker client
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client with the configured base URL and request timeout.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| BackendError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(builder: RequestBuilder, auth: &AuthHeaders) -> RequestBuilder {
        let mut builder = builder;
        if let Some(cookie) = auth.cookie_header() {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(csrf) = &auth.csrf_token {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        builder
    }

    async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ApiResponse<serde_json::Value>>(&body).ok())
            .map(|envelope| envelope.message);

        Err(BackendError::Rejected { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>, BackendError> {
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn get_user(
        &self,
        user_id: &str,
        auth: &AuthHeaders,
    ) -> Result<ApiResponse<UserModel>, BackendError> {
        let url = self.url(&format!("/user/{}", urlencoding::encode(user_id)));
        let response = Self::send(Self::with_auth(self.client.get(url), auth)).await?;
        Self::decode(response).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        let response = Self::send(self.client.post(self.url("/login")).json(request)).await?;

        let tokens = extract_tokens_from_headers(response.headers());
        let body = Self::decode(response).await?;

        Ok(LoginResponse { body, tokens })
    }

    async fn logout(&self, auth: &AuthHeaders) -> Result<(), BackendError> {
        let builder = self.client.post(self.url("/logout")).json(&serde_json::json!({}));
        Self::send(Self::with_auth(builder, auth)).await?;
        Ok(())
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<ApiResponse<UserModel>, BackendError> {
        let response = Self::send(self.client.post(self.url("/register")).json(request)).await?;
        Self::decode(response).await
    }
}
