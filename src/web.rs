use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::ServerConfig;
use crate::session::Session;

/// The full HTTP application, `/api` routes over one shared session
pub fn app(session: Arc<Session>, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = server.max_upload_mb as usize * 1024 * 1024;

    Router::new()
        .nest("/api", api::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(session)
}

pub async fn run(session: Arc<Session>, server: &ServerConfig) -> anyhow::Result<()> {
    let app = app(session, server);

    let addr = format!("0.0.0.0:{}", server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server running at http://localhost:{}", server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;
    Ok(())
}
