//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, item_types, products, rankings, recycling, redemptions, stores, users};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for ranking endpoints.
/// Leaderboards are read-only and served to dashboards, so they carry a
/// higher limit than the mutating API. The ranking router sits beside the
/// general API router, not inside it, so this limit is the only one that
/// applies to ranking requests.
const RANKING_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Users
/// - `POST /v1/users` - Register user
/// - `GET /v1/users/:user_id` - Get user profile
/// - `DELETE /v1/users/:user_id` - Deactivate user
///
/// ## Stores & Products
/// - `POST /v1/stores`, `GET /v1/stores`, `GET /v1/stores/:store_id`
/// - `GET /v1/stores/:store_id/products` - Products of one store
/// - `POST /v1/products`, `GET /v1/products`, `GET /v1/products/:product_id`
/// - `GET /v1/products/search?q=` - Search products by name or description
/// - `POST /v1/item-types`, `GET /v1/item-types`
///
/// ## Ledger
/// - `POST /v1/redemptions` - Exchange points for a product
/// - `POST /v1/redemptions/verify` - Pre-flight redemption check
/// - `GET /v1/redemptions/user/:user_id` - Redemption history
/// - `GET /v1/redemptions/store/:store_id` - Redemptions taken at a store
/// - `POST /v1/recycling` - Register a recycling deposit
/// - `GET /v1/recycling/user/:user_id` - Recycling history
/// - `GET /v1/recycling/store/:store_id` - Deposits taken at a store
/// - `GET /v1/recycling/stats` - Totals across all deposits
///
/// ## Rankings (read-heavy, higher concurrency limit)
/// - `GET /v1/rankings/users` - Users by points balance
/// - `GET /v1/rankings/stores` - Stores by redeemed points
/// - `GET /v1/rankings/users/:user_id` - One user's rank
/// - `GET /v1/rankings/stats` - Leaderboard summary statistics
/// - `POST /v1/rankings/history` - Record a ranking snapshot
/// - `GET /v1/rankings/history/:user_id` - Snapshot history
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Ranking routes get their own concurrency limit.
    let ranking_routes = Router::new()
        .route("/users", get(rankings::users_leaderboard))
        .route("/users/:user_id", get(rankings::user_rank))
        .route("/stores", get(rankings::stores_leaderboard))
        .route("/stats", get(rankings::ranking_stats))
        .route("/history", post(rankings::record_history_snapshot))
        .route("/history/:user_id", get(rankings::list_user_snapshots))
        .layer(ConcurrencyLimitLayer::new(RANKING_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users", post(users::create_user))
        .route("/users/:user_id", get(users::get_user))
        .route("/users/:user_id", delete(users::deactivate_user))
        // Stores
        .route("/stores", post(stores::create_store))
        .route("/stores", get(stores::list_stores))
        .route("/stores/:store_id", get(stores::get_store))
        .route("/stores/:store_id/products", get(stores::list_store_products))
        // Products
        .route("/products", post(products::create_product))
        .route("/products", get(products::list_products))
        .route("/products/search", get(products::search_products))
        .route("/products/:product_id", get(products::get_product))
        // Item types
        .route("/item-types", post(item_types::create_item_type))
        .route("/item-types", get(item_types::list_item_types))
        // Redemptions
        .route("/redemptions", post(redemptions::redeem))
        .route("/redemptions/verify", post(redemptions::verify_redemption))
        .route(
            "/redemptions/user/:user_id",
            get(redemptions::list_user_redemptions),
        )
        .route(
            "/redemptions/store/:store_id",
            get(redemptions::list_store_redemptions),
        )
        // Recycling
        .route("/recycling", post(recycling::register_recycling))
        .route(
            "/recycling/user/:user_id",
            get(recycling::list_user_recycling),
        )
        .route(
            "/recycling/store/:store_id",
            get(recycling::list_store_recycling),
        )
        .route("/recycling/stats", get(recycling::recycling_stats))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    // Ranking routes sit beside the general API routes so their limit is
    // not capped by the general one.
    let v1_routes = Router::new()
        .merge(api_routes)
        .nest("/rankings", ranking_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", v1_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
