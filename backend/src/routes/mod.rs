//! Route definitions for the Plant Inventory API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory core
        .nest("/inventory", inventory_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/requests", request_routes(state.clone()))
        .nest("/stock", stock_routes(state.clone()))
        .nest("/alerts", alert_routes(state))
}

/// Request lifecycle routes
fn request_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_my_requests).post(handlers::create_request),
        )
        .route("/department", get(handlers::list_department_requests))
        .route("/pending-issuance", get(handlers::list_pending_issuance))
        .route("/usage", get(handlers::get_past_usage))
        .route("/history", get(handlers::get_issued_history))
        .route("/:request_id/approve", put(handlers::approve_request))
        .route("/:request_id/reject", put(handlers::reject_request))
        .route("/:request_id/issue", put(handlers::issue_request))
        .route("/:request_id/claim", put(handlers::claim_request))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Batch ledger routes
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_stock_status).post(handlers::add_stock_batch),
        )
        .route("/balance", get(handlers::get_item_balance))
        .route("/items", get(handlers::list_items))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Alert routes
fn alert_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/claims", get(handlers::get_claim_alerts))
        .route("/stock", get(handlers::get_stock_alerts))
        .route("/sweep", post(handlers::run_claim_sweep))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
