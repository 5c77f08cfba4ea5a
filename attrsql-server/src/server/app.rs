use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use attrsql::{GenerationOptions, Translator};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::handlers::{health, page, sessions};
use super::session::SessionManager;

/// Idle sessions are dropped after this long.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub translator: Translator,
    pub options: GenerationOptions,
}

impl AppState {
    pub fn new(translator: Translator, options: GenerationOptions) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new()),
            translator,
            options,
        }
    }
}

pub fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .map_err(|e| anyhow!("Invalid CORS origin: {}", e))?,
            )
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any)
            .allow_credentials(false),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any)
            .allow_credentials(false),
    };

    let app = Router::new()
        .route("/", get(page::index))
        .route("/health", get(health::health_check))
        .route("/api/template", get(sessions::download_template))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/upload", post(sessions::upload_csv))
        .route("/api/sessions/:id/rows", post(sessions::add_row))
        .route(
            "/api/sessions/:id/rows/:index",
            put(sessions::edit_cell).delete(sessions::delete_row),
        )
        .route("/api/sessions/:id/generate", post(sessions::generate))
        .route("/api/sessions/:id/export", get(sessions::export_csv))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

/// Periodically drop sessions nobody has touched for an hour.
fn spawn_session_cleanup(sessions: Arc<SessionManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            tracing::debug!("Running periodic session cleanup");
            sessions.cleanup_inactive_sessions(SESSION_IDLE_TIMEOUT);
        }
    });
}

pub async fn start_server(
    port: u16,
    cors_origin: Option<&str>,
    translator: Translator,
    options: GenerationOptions,
) -> Result<()> {
    let state = AppState::new(translator, options);
    spawn_session_cleanup(state.sessions.clone());

    let app = create_app(state, cors_origin)?;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
