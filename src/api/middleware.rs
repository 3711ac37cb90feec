//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The session gate run in front of every route
//! - The `CurrentUser` extractor and the error type handlers return
//!
//! The gate keeps no state between requests. When a `userid` cookie is present
//! it asks the broker who the session belongs to, exactly once per request.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::cookies;
use crate::config::SessionConfig;
use crate::models::{ApiResponse, UserModel, USER_ID_COOKIE};
use crate::services::backend::{AuthHeaders, BackendApi, BackendError};
use crate::theme::{ThemeEngine, ThemeError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn BackendApi>,
    pub theme_engine: Arc<ThemeEngine>,
    pub session: Arc<SessionConfig>,
}

/// Signed-in user attached to the request by the session gate
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

/// Errors returned by page handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No valid session; answered with a redirect to the login page
    #[error("Not authenticated")]
    Unauthenticated { redirect_to: String },

    /// A page template could not be rendered
    #[error(transparent)]
    Render(#[from] ThemeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated { redirect_to } => Redirect::to(&redirect_to).into_response(),
            Self::Render(e) => {
                tracing::error!(error = %e, "Page render failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(ThemeEngine::simple_error_page("page", &e.to_string())),
                )
                    .into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated {
                redirect_to: state.session.login_path.clone(),
            })
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Whether `path` is on the public allow-list, exactly or with one trailing slash.
pub fn is_public_route(path: &str, public_routes: &[String]) -> bool {
    public_routes.iter().any(|route| {
        path == route
            || path
                .strip_suffix('/')
                .is_some_and(|trimmed| trimmed == route)
    })
}

/// Outcome of the session gate for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// No identity cookie on a public route: pass through untouched
    PublicBypass,
    /// The broker confirmed the session: pass through with the user attached
    Authenticated(UserModel),
    /// Stale session on a public route: pass through, clearing the session cookies
    ClearAndForward,
    /// Redirect to login, clearing the session cookies if there was a stale session
    Unauthenticated { clear_cookies: bool },
}

/// Decide what to do with a request.
///
/// `lookup` is `None` when the request had no identity cookie, so no broker
/// call was made.
pub fn decide(
    is_public: bool,
    lookup: Option<Result<ApiResponse<UserModel>, BackendError>>,
) -> GateDecision {
    let Some(lookup) = lookup else {
        return if is_public {
            GateDecision::PublicBypass
        } else {
            GateDecision::Unauthenticated {
                clear_cookies: false,
            }
        };
    };

    match lookup.map(ApiResponse::into_data) {
        Ok(Some(user)) => GateDecision::Authenticated(user),
        Ok(None) | Err(_) if is_public => GateDecision::ClearAndForward,
        Ok(None) | Err(_) => GateDecision::Unauthenticated {
            clear_cookies: true,
        },
    }
}

/// Session gate middleware
///
/// Runs before every route. Attaches [`CurrentUser`] when the broker confirms
/// the session, otherwise expires `session_token`, `csrf_token` and `userid`
/// and redirects non-public requests to the login page.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let is_public = is_public_route(&path, &state.session.public_routes);

    let lookup = match jar.get(USER_ID_COOKIE) {
        Some(user_id) => {
            let auth = AuthHeaders::from_jar(&jar);
            if !auth.is_complete() {
                tracing::debug!(path = %path, "Identity cookie without complete session tokens");
            }
            let result = state.backend.get_user(user_id.value(), &auth).await;
            if let Err(e) = &result {
                tracing::warn!(path = %path, error = %e, "User lookup failed");
            }
            Some(result)
        }
        None => None,
    };

    let decision = decide(is_public, lookup);
    tracing::debug!(path = %path, is_public, decision = ?decision, "Session gate decision");

    let unauthenticated = || AppError::Unauthenticated {
        redirect_to: state.session.login_path.clone(),
    };

    match decision {
        GateDecision::PublicBypass => next.run(request).await,
        GateDecision::Authenticated(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        GateDecision::ClearAndForward => {
            let response = next.run(request).await;
            cookies::clear_session_unless_set(response)
        }
        GateDecision::Unauthenticated { clear_cookies: true } => {
            (cookies::clear_session(jar), unauthenticated()).into_response()
        }
        GateDecision::Unauthenticated {
            clear_cookies: false,
        } => unauthenticated().into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> Vec<String> {
        ["/", "/login", "/register", "/about"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn user() -> UserModel {
        serde_json::from_value(serde_json::json!({"id": "u-1", "username": "ada"})).unwrap()
    }

    fn envelope(error: bool, data: Option<UserModel>) -> ApiResponse<UserModel> {
        ApiResponse {
            error,
            message: String::new(),
            data,
        }
    }

    #[test]
    fn test_public_route_matching() {
        let routes = routes();
        assert!(is_public_route("/", &routes));
        assert!(is_public_route("/about", &routes));
        assert!(is_public_route("/about/", &routes));
        assert!(is_public_route("/login/", &routes));
        assert!(!is_public_route("/dashboard", &routes));
        assert!(!is_public_route("/about/team", &routes));
        assert!(!is_public_route("/about//", &routes));
        assert!(!is_public_route("/aboutx", &routes));
        assert!(!is_public_route("//", &routes));
    }

    #[test]
    fn test_no_identity_on_public_route_bypasses() {
        assert_eq!(decide(true, None), GateDecision::PublicBypass);
    }

    #[test]
    fn test_no_identity_on_private_route_is_unauthenticated() {
        assert_eq!(
            decide(false, None),
            GateDecision::Unauthenticated {
                clear_cookies: false
            }
        );
    }

    #[test]
    fn test_confirmed_user_is_authenticated() {
        for is_public in [true, false] {
            assert_eq!(
                decide(is_public, Some(Ok(envelope(false, Some(user()))))),
                GateDecision::Authenticated(user())
            );
        }
    }

    #[test]
    fn test_missing_user_data_clears_session() {
        assert_eq!(
            decide(false, Some(Ok(envelope(false, None)))),
            GateDecision::Unauthenticated {
                clear_cookies: true
            }
        );
        assert_eq!(
            decide(true, Some(Ok(envelope(false, None)))),
            GateDecision::ClearAndForward
        );
    }

    #[test]
    fn test_error_envelope_clears_session() {
        assert_eq!(
            decide(false, Some(Ok(envelope(true, Some(user()))))),
            GateDecision::Unauthenticated {
                clear_cookies: true
            }
        );
    }

    #[test]
    fn test_backend_failure_clears_session() {
        let unavailable = || Err(BackendError::Unavailable("timeout".to_string()));
        assert_eq!(
            decide(false, Some(unavailable())),
            GateDecision::Unauthenticated {
                clear_cookies: true
            }
        );
        assert_eq!(decide(true, Some(unavailable())), GateDecision::ClearAndForward);

        let rejected = Err(BackendError::Rejected {
            status: 401,
            message: Some("invalid session".to_string()),
        });
        assert_eq!(
            decide(false, Some(rejected)),
            GateDecision::Unauthenticated {
                clear_cookies: true
            }
        );
    }

    #[test]
    fn test_unauthenticated_error_redirects() {
        let response = AppError::Unauthenticated {
            redirect_to: "/login".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[test]
    fn test_render_error_is_internal() {
        let response = AppError::Render(ThemeError::NotFound("x.html".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
