//! Authentication pages and form actions
//!
//! - GET/POST /login - Log in through the broker and store its session cookies
//! - GET/POST /register - Create an account
//! - GET/POST /logout - End the session
//!
//! Failed form submissions re-render the form with the submitted values,
//! never the password.

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::cookies;
use crate::api::middleware::{AppError, AppState, CurrentUser};
use crate::api::pages::render;
use crate::services::backend::{AuthHeaders, LoginRequest, RegisterRequest};

const LOGIN_FAILED: &str = "Login failed. Please try again.";
const LOGIN_NO_USER: &str = "Login failed, please try again";
const REGISTER_FAILED: &str = "Registration failed. Please try again.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout).post(logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    #[serde(default)]
    pub registered: Option<String>,
}

/// Login form values shown back to the user
#[derive(Debug, Default, Serialize)]
struct LoginFormEcho<'a> {
    email: &'a str,
}

/// Registration form values shown back to the user
#[derive(Debug, Default, Serialize)]
struct RegisterFormEcho<'a> {
    name: &'a str,
    email: &'a str,
    username: &'a str,
}

fn form_context<T: Serialize>(form: &T, error: Option<&str>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("form", form);
    if let Some(error) = error {
        context.insert("error", error);
    }
    context
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    uri: Uri,
    user: Option<CurrentUser>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::temporary("/").into_response());
    }

    let mut context = form_context(&LoginFormEcho::default(), None);
    context.insert("registered", &(query.registered.as_deref() == Some("true")));
    Ok(render(&state, "login.html", &uri, None, &context)?.into_response())
}

/// POST /login
///
/// Stores `session_token` and `csrf_token` only when the broker issued both,
/// and `userid` from the returned user.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    Form(form): Form<LoginRequest>,
) -> Result<Response, AppError> {
    let echo = LoginFormEcho { email: &form.email };

    let response = match state.backend.login(&form).await {
        Ok(response) => response,
        Err(e) => {
            tracing::info!(error = %e, "Login rejected");
            let context = form_context(&echo, Some(e.message_or(LOGIN_FAILED)));
            let page = render(&state, "login.html", &uri, None, &context)?;
            return Ok((e.status_or_default(), page).into_response());
        }
    };

    let tokens = response.tokens;
    let Some(user) = response.body.into_data() else {
        tracing::warn!("Login response carried no user");
        let context = form_context(&echo, Some(LOGIN_NO_USER));
        let page = render(&state, "login.html", &uri, None, &context)?;
        return Ok((StatusCode::NOT_IMPLEMENTED, page).into_response());
    };

    let secure = state.session.secure_cookies;
    let mut jar = jar.add(cookies::user_id_cookie(&user.id, secure));
    match tokens.both() {
        Some((session, csrf)) => {
            jar = jar
                .add(cookies::from_upstream(&session, secure))
                .add(cookies::from_upstream(&csrf, secure));
        }
        None => tracing::warn!(user_id = %user.id, "Login response did not issue both session tokens"),
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /register
async fn register_page(
    State(state): State<AppState>,
    uri: Uri,
    user: Option<CurrentUser>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::temporary("/").into_response());
    }

    let context = form_context(&RegisterFormEcho::default(), None);
    Ok(render(&state, "register.html", &uri, None, &context)?.into_response())
}

/// POST /register
async fn register(
    State(state): State<AppState>,
    uri: Uri,
    Form(form): Form<RegisterRequest>,
) -> Result<Response, AppError> {
    let (status, message) = match state.backend.register(&form).await {
        Ok(body) if !body.error => {
            tracing::info!(username = %form.username, "User registered");
            return Ok(Redirect::to("/login?registered=true").into_response());
        }
        Ok(body) => {
            let message = if body.message.is_empty() {
                REGISTER_FAILED.to_string()
            } else {
                body.message
            };
            (StatusCode::BAD_REQUEST, message)
        }
        Err(e) => (e.status_or_default(), e.message_or(REGISTER_FAILED).to_string()),
    };

    tracing::info!(username = %form.username, status = %status, "Registration rejected");
    let echo = RegisterFormEcho {
        name: &form.name,
        email: &form.email,
        username: &form.username,
    };
    let context = form_context(&echo, Some(&message));
    let page = render(&state, "register.html", &uri, None, &context)?;
    Ok((status, page).into_response())
}

/// GET|POST /logout
///
/// Local cookies are cleared whatever the broker answers.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let auth = AuthHeaders::from_jar(&jar);
    if let Err(e) = state.backend.logout(&auth).await {
        tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
    }

    (
        cookies::clear_session(jar),
        Redirect::to(&state.session.login_path),
    )
        .into_response()
}
