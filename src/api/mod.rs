//! HTTP layer - pages, form actions and the session gate
//!
//! It includes:
//! - Public pages (home, about) and the protected dashboard
//! - Login, registration and logout
//! - The session gate that runs in front of every route

pub mod auth;
pub mod cookies;
pub mod middleware;
pub mod pages;


use axum::{middleware as axum_middleware, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use middleware::{AppError, AppState, CurrentUser};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .fallback(pages::not_found)
        .layer(
            ServiceBuilder::new()
                // Outermost, so gate redirects are traced too
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::session_gate,
                )),
        )
        .with_state(state)
}
