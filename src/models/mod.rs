//! Data models
//!
//! - Broker API types (user record, response envelope)
//! - Session cookies parsed from upstream responses

mod session;
mod user;

pub use session::{
    Cookie, TokensResult, CSRF_HEADER, CSRF_TOKEN_COOKIE, SESSION_TOKEN_COOKIE, USER_ID_COOKIE,
};
pub use user::{ApiResponse, UserModel};
