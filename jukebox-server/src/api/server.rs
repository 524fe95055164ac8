//! HTTP server setup and routing
//!
//! Builds the Axum router over the shared application context. The
//! webhook route carries its own small body limit; everything under
//! /api/admin sits behind the operator-password middleware.

use crate::config::Config;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted webhook payload size (bytes)
const WEBHOOK_MAX_BODY_BYTES: usize = 65536;

/// Shared application context passed to all handlers
///
/// Cloning is cheap: the pool is reference-counted and the config is
/// small. Constructed once in main and handed to the router.
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: SqlitePool,
    pub config: Config,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    let admin_routes = Router::new()
        .route("/next", post(super::handlers::next_song))
        .route("/previous", post(super::handlers::previous_song))
        .route("/refill", post(super::handlers::refill))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            super::auth::require_admin,
        ));

    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Public read endpoints
        .route("/api/library", get(super::handlers::get_library))
        .route("/api/queue", get(super::handlers::get_queue))
        .route("/api/party", get(super::handlers::get_party))
        // Admission endpoints
        .route("/api/request", post(super::handlers::kiosk_request))
        .route(
            "/api/request/emergency",
            post(super::handlers::emergency_request),
        )
        .route(
            "/api/payments/webhook",
            post(super::handlers::payment_webhook)
                .route_layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY_BYTES)),
        )
        // Operator auth
        .route("/api/auth/verify", post(super::handlers::verify_password))
        // Protected admin endpoints
        .nest("/api/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
