//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Build the router for the daemon's HTTP endpoint
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Manual test endpoints
        .route("/add", post(api::add_test_accessory))
        .route("/remove", post(api::remove_test_accessories))
        // API routes
        .route("/api/accessories", get(api::list_accessories))
        .route("/api/accessories/{id}", get(api::get_accessory))
        .route(
            "/api/accessories/{id}/characteristics/{name}",
            get(api::read_characteristic).put(api::write_characteristic),
        )
        .route("/api/sync", post(api::trigger_sync))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
