//! Set-Cookie header parsing
//!
//! Turns the raw `Set-Cookie` values of a broker login response into the
//! session and CSRF tokens this frontend re-issues to the browser.
//!
//! Only `Expires` and `HttpOnly` are read from the attributes; Path, Secure,
//! SameSite, Domain and Max-Age are ignored. Malformed entries are skipped,
//! so parsing never fails.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{Cookie, TokensResult, CSRF_TOKEN_COOKIE, SESSION_TOKEN_COOKIE};

/// Extract the session and CSRF tokens from raw `Set-Cookie` values.
///
/// `None` and an empty collection both yield a result with two absent tokens.
/// When a token name appears more than once, the last occurrence wins.
pub fn extract_tokens<I>(set_cookies: Option<I>) -> TokensResult
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut tokens = TokensResult::default();

    for raw in set_cookies.into_iter().flatten() {
        let Some(cookie) = parse_set_cookie(raw.as_ref()) else {
            continue;
        };

        match cookie.name.as_str() {
            CSRF_TOKEN_COOKIE => tokens.csrf_token = Some(cookie),
            SESSION_TOKEN_COOKIE => tokens.session_token = Some(cookie),
            _ => {}
        }
    }

    tokens
}

/// Extract tokens from every `Set-Cookie` header in a response header map.
///
/// Values that are not valid UTF-8 are treated as malformed and skipped.
pub fn extract_tokens_from_headers(headers: &HeaderMap) -> TokensResult {
    let values: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    extract_tokens(Some(values))
}

/// Parse a single `Set-Cookie` value.
///
/// Returns `None` when the `name=value` pair has no `=`.
pub fn parse_set_cookie(raw: &str) -> Option<Cookie> {
    let (pair, attributes) = match raw.split_once(';') {
        Some((pair, rest)) => (pair, Some(rest)),
        None => (raw, None),
    };

    // Values may themselves contain '=', so only the first one separates.
    let (name, value) = pair.split_once('=')?;
    let mut cookie = Cookie::new(name.trim(), value);

    for attr in attributes.into_iter().flat_map(|a| a.split(';')).map(str::trim) {
        let lower = attr.to_ascii_lowercase();
        if lower.starts_with("expires=") {
            cookie.expires = parse_cookie_date(&attr["expires=".len()..]);
        } else if lower == "httponly" {
            cookie.http_only = true;
        }
    }

    Some(cookie)
}

/// Parse an `Expires` attribute value.
///
/// Accepts the IMF-fixdate form servers emit (`Wed, 21 Oct 2015 07:28:00 GMT`),
/// the older Netscape form with dashes, and RFC 3339.
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    #[test]
    fn test_session_token_keeps_embedded_equals() {
        let tokens = extract_tokens(Some([
            "session_token=abc=def; Expires=Wed, 21 Oct 2026 07:28:00 GMT; HttpOnly",
        ]));

        let session = tokens.session_token.unwrap();
        assert_eq!(session.name, "session_token");
        assert_eq!(session.value, "abc=def");
        assert!(session.http_only);
        assert_eq!(
            session.expires,
            Some(Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap())
        );
        assert!(tokens.csrf_token.is_none());
    }

    #[test]
    fn test_both_tokens_and_unrelated_cookies() {
        let headers = vec![
            "theme=dark; Path=/".to_string(),
            "session_token=s3ss10n; Path=/; HttpOnly; SameSite=Lax".to_string(),
            "tracking=xyz".to_string(),
            "csrf_token=c5rf; Path=/; SameSite=Lax".to_string(),
        ];

        let tokens = extract_tokens(Some(headers));

        let session = tokens.session_token.unwrap();
        let csrf = tokens.csrf_token.unwrap();
        assert_eq!(session.value, "s3ss10n");
        assert!(session.http_only);
        assert_eq!(csrf.value, "c5rf");
        assert!(!csrf.http_only);
    }

    #[test]
    fn test_absent_and_empty_collections() {
        assert_eq!(extract_tokens(None::<Vec<String>>), TokensResult::default());
        assert_eq!(extract_tokens(Some(Vec::<&str>::new())), TokensResult::default());
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let tokens = extract_tokens(Some(["session_token", "; HttpOnly", "csrf_token=ok"]));
        assert!(tokens.session_token.is_none());
        assert_eq!(tokens.csrf_token.unwrap().value, "ok");
    }

    #[test]
    fn test_attributes_are_case_insensitive() {
        let cookie =
            parse_set_cookie("csrf_token=v; EXPIRES=Thu, 01 Jan 2026 00:00:00 GMT; httpONLY")
                .unwrap();
        assert!(cookie.http_only);
        assert_eq!(
            cookie.expires,
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_netscape_expires_format() {
        let cookie =
            parse_set_cookie("session_token=v; expires=Thu, 01-Jan-2026 00:00:00 GMT").unwrap();
        assert_eq!(
            cookie.expires,
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparseable_expires_is_absent() {
        let cookie = parse_set_cookie("session_token=v; Expires=someday; HttpOnly").unwrap();
        assert!(cookie.expires.is_none());
        assert!(cookie.http_only);
    }

    #[test]
    fn test_ignored_attributes() {
        let cookie = parse_set_cookie(
            "session_token=v; Path=/; Domain=example.com; Secure; SameSite=Strict; Max-Age=60",
        )
        .unwrap();
        assert_eq!(cookie, Cookie::new("session_token", "v"));
    }

    #[test]
    fn test_httponly_with_value_is_not_a_flag() {
        let cookie = parse_set_cookie("session_token=v; HttpOnly=false").unwrap();
        assert!(!cookie.http_only);
    }

    #[test]
    fn test_empty_value_is_kept() {
        let cookie = parse_set_cookie("csrf_token=; Path=/").unwrap();
        assert_eq!(cookie.value, "");
    }

    #[test]
    fn test_last_duplicate_wins() {
        let tokens = extract_tokens(Some(["session_token=first", "session_token=second"]));
        assert_eq!(tokens.session_token.unwrap().value, "second");
    }

    #[test]
    fn test_extract_from_header_map() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("session_token=a=b; HttpOnly"),
        );
        headers.append(header::SET_COOKIE, HeaderValue::from_static("csrf_token=c"));
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_bytes(b"csrf_token=\xff").unwrap(),
        );
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let (session, csrf) = extract_tokens_from_headers(&headers).both().unwrap();
        assert_eq!(session.value, "a=b");
        assert_eq!(csrf.value, "c");
    }
}
