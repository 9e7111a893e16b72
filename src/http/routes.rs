use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Pairing lifecycle
        .route("/pairing/status", get(handlers::pairing_status))
        .route("/pairing/code", post(handlers::generate_code))
        .route("/pairing/connect", post(handlers::connect))
        .route("/pairing/disconnect", post(handlers::disconnect))
        // Control channel
        .route("/pairing/commands", post(handlers::send_command))
        // The browser UI calls in from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
