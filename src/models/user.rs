//! User model
//!
//! The user record and response envelope returned by the broker API.
//! This layer never interprets the user beyond showing it on pages, so the
//! timestamps stay as the strings the backend sent.

use serde::{Deserialize, Serialize};

/// User as returned by the broker's `/user/{id}` and `/login` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModel {
    /// User ID (UUID string)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Username
    #[serde(default)]
    pub username: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
    /// Last time the backend saw activity for this user
    #[serde(default)]
    pub last_activity: String,
}

/// Response envelope shared by every broker endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Take the payload if the backend reported success and sent one.
    pub fn into_data(self) -> Option<T> {
        if self.error {
            None
        } else {
            self.data
        }
    }
}
