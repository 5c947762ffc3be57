//! Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{create_checkout, create_portal, health_check, pro_status, stripe_webhook};
use crate::origin::origin_guard;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = state.origins.cors_layer();

    Router::new()
        // Health
        .route("/", get(health_check))

        // Billing
        .route("/api/create-checkout-session", post(create_checkout))
        .route("/api/pro-status", get(pro_status))
        .route("/api/create-portal-session", post(create_portal))
        .route("/api/webhook", post(stripe_webhook))

        // Outermost last: trace, then origin guard, then CORS headers
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
