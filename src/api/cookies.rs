//! Cookies issued to the browser
//!
//! `session_token` and `csrf_token` mirror what the broker issued on login;
//! `userid` is the local identity hint read by the session gate.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

use crate::models::{self, CSRF_TOKEN_COOKIE, SESSION_TOKEN_COOKIE, USER_ID_COOKIE};
use crate::services::cookie_parser::parse_set_cookie;

const SESSION_COOKIES: [&str; 3] = [SESSION_TOKEN_COOKIE, CSRF_TOKEN_COOKIE, USER_ID_COOKIE];

/// Re-issue a broker cookie under this origin, keeping its expiry and
/// http-only flag.
pub fn from_upstream(cookie: &models::Cookie, secure: bool) -> Cookie<'static> {
    let mut builder = Cookie::build((cookie.name.clone(), cookie.value.clone()))
        .path("/")
        .http_only(cookie.http_only)
        .secure(secure)
        .same_site(SameSite::Lax);

    if let Some(expires) = cookie
        .expires
        .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.timestamp()).ok())
    {
        builder = builder.expires(expires);
    }

    builder.build()
}

/// Identity hint cookie. Always readable by scripts.
pub fn user_id_cookie(user_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((USER_ID_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Create removal cookie.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Expire `session_token`, `csrf_token` and `userid` together.
///
/// Removals are added unconditionally so the browser drops all three even
/// when the request only carried some of them.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    SESSION_COOKIES
        .into_iter()
        .fold(jar, |jar, name| jar.add(removal_cookie(name)))
}

/// Expire the session cookies on an already built response.
///
/// Cookies the response sets itself are left alone, so a handler that just
/// started a new session (login) is not undone by the cleanup.
pub fn clear_session_unless_set(response: Response) -> Response {
    let set_by_handler: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse_set_cookie)
        .map(|cookie| cookie.name)
        .collect();

    let removals = SESSION_COOKIES
        .into_iter()
        .filter(|name| !set_by_handler.iter().any(|set| set.as_str() == *name))
        .fold(CookieJar::new(), |jar, name| jar.add(removal_cookie(name)));

    (removals, response).into_response()
}
