//! Server-rendered pages

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use crate::api::middleware::{AppError, AppState, CurrentUser};
use crate::theme::StandardTemplateVars;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/dashboard", get(dashboard))
}

/// Render `template` with the standard page variables added.
pub(crate) fn render(
    state: &AppState,
    template: &str,
    uri: &Uri,
    user: Option<CurrentUser>,
    context: &TeraContext,
) -> Result<Html<String>, AppError> {
    let vars = StandardTemplateVars::new(uri.path(), user.map(|CurrentUser(u)| u));
    let html = state
        .theme_engine
        .render_with_standard_vars(template, context, &vars)?;
    Ok(Html(html))
}

async fn index(
    State(state): State<AppState>,
    uri: Uri,
    user: Option<CurrentUser>,
) -> Result<Html<String>, AppError> {
    render(&state, "index.html", &uri, user, &TeraContext::new())
}

async fn about(
    State(state): State<AppState>,
    uri: Uri,
    user: Option<CurrentUser>,
) -> Result<Html<String>, AppError> {
    render(&state, "about.html", &uri, user, &TeraContext::new())
}

async fn dashboard(
    State(state): State<AppState>,
    uri: Uri,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    render(&state, "dashboard.html", &uri, Some(user), &TeraContext::new())
}

/// Fallback for unknown paths. Only reached by signed-in users, since the
/// gate redirects everyone else away from non-public paths.
pub async fn not_found(
    State(state): State<AppState>,
    uri: Uri,
    user: Option<CurrentUser>,
) -> impl IntoResponse {
    let vars = StandardTemplateVars::new(uri.path(), user.map(|CurrentUser(u)| u));
    let mut context = TeraContext::new();
    context.insert("error_message", &format!("Page not found: {}", uri.path()));
    vars.apply(&mut context);

    let html = state.theme_engine.render_with_fallback("error.html", &context);
    (StatusCode::NOT_FOUND, Html(html))
}
