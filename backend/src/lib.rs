//! Plant Inventory - Backend Library
//!
//! Request, approval, issuance and claim tracking for plant consumables,
//! backed by a per-batch stock ledger. The `pim-server` binary wires these
//! modules to configuration and a listener.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use axum::{routing::get, Router};
use shared::InventoryPolicy;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
use services::NotificationService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub policy: Arc<InventoryPolicy>,
    pub notifications: NotificationService,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Plant Inventory API v1.0"
}

/// Liveness check
async fn health_check() -> &'static str {
    "OK"
}
