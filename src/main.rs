//! qpgen-web - server-rendered frontend for the question paper generator

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qpgen_web::{
    api::{self, AppState},
    config::Config,
    services::backend::HttpBackend,
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qpgen_web=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting qpgen-web...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!(backend = %config.backend.base_url, "Configuration loaded");

    let backend = HttpBackend::new(&config.backend)?;

    let theme_engine = ThemeEngine::new(config.theme.path.as_deref())?;
    match &config.theme.path {
        Some(path) => tracing::info!("Theme engine initialized with overrides from {}", path.display()),
        None => tracing::info!("Theme engine initialized with embedded templates"),
    }

    let state = AppState {
        backend: Arc::new(backend),
        theme_engine: Arc::new(theme_engine),
        session: Arc::new(config.session.clone()),
    };

    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
