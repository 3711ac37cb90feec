//! Services layer - Broker access and cookie handling
//!
//! - `backend`: typed client for the broker API
//! - `cookie_parser`: `Set-Cookie` parsing for login responses

pub mod backend;
pub mod cookie_parser;

pub use backend::{
    AuthHeaders, BackendApi, BackendError, HttpBackend, LoginRequest, LoginResponse,
    RegisterRequest,
};
pub use cookie_parser::{extract_tokens, extract_tokens_from_headers, parse_set_cookie};
