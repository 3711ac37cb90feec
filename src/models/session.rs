//! Session cookie model

use chrono::{DateTime, Utc};

/// Name of the backend session credential cookie
pub const SESSION_TOKEN_COOKIE: &str = "session_token";
/// Name of the anti-forgery token cookie
pub const CSRF_TOKEN_COOKIE: &str = "csrf_token";
/// Name of the local identity hint cookie
pub const USER_ID_COOKIE: &str = "userid";
/// Header the backend reads the CSRF token from
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// A cookie parsed from an upstream `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            http_only: false,
        }
    }
}

/// Session tokens extracted from a login response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokensResult {
    pub csrf_token: Option<Cookie>,
    pub session_token: Option<Cookie>,
}

impl TokensResult {
    /// Both tokens, only when the backend issued both.
    pub fn both(self) -> Option<(Cookie, Cookie)> {
        match (self.session_token, self.csrf_token) {
            (Some(session), Some(csrf)) => Some((session, csrf)),
            _ => None,
        }
    }
}
