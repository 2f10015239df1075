use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use docchat::config::AppConfig;
use docchat::middleware::session::session_middleware;
use docchat::routes::{auth, chat, documents, health};
use docchat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded (env: {})",
        std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into())
    );

    if config.auth.password.is_empty() {
        tracing::warn!("auth.password is empty; set APP__AUTH__PASSWORD before exposing this service");
    }
    if config.llm.api_key.is_empty() {
        tracing::warn!("llm.api_key is empty; uploads and questions will fail until APP__LLM__API_KEY is set");
    }

    let state = AppState::new(config.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Health stays outside the session middleware so probes don't mint sessions
    let public_routes = Router::new().route("/api/health", get(health::health_check));

    let session_routes = Router::new()
        .route("/api/session", get(auth::status))
        .route("/api/session/unlock", post(auth::unlock))
        .route("/api/documents", post(documents::process))
        .route("/api/chat", post(chat::ask).get(chat::transcript))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(documents::MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
