//! Router assembly for the relay.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the router: `/ws` for peers, `/health` for probes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handlers::relay::upgrade))
        .route("/health", get(handlers::health::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
