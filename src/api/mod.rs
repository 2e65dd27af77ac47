use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

mod tmdb;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().nest("/tmdb", tmdb::routes())
}

// Root handler
async fn root_handler() -> &'static str {
    "SkyHook TMDB Gateway"
}

/// Full application router with middleware and state applied
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler).head(root_handler))
        .route("/health", get(|| async { "OK" }))
        .merge(routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
