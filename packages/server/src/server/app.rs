//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{health_handler, send_to_all_handler, send_to_user_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    // CORS configuration - the mobile app calls these endpoints directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/send-to-all", post(send_to_all_handler))
        .route("/send-to-user", post(send_to_user_handler))
        // Health check (no body, probed by the hosting platform)
        .route("/health", get(health_handler))
        .layer(Extension(AppState { deps }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
