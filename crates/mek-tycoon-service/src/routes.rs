//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    accounts, admin, auth, campaigns, essence, gold, health, leaderboard, meks, webhooks,
};
use crate::state::AppState;

/// Maximum concurrent requests for player API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent requests for admin endpoints.
const ADMIN_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/auth/nonce` - Issue a sign-in nonce
/// - `POST /v1/auth/verify` - Verify a signed nonce, issue a session
/// - `GET /v1/leaderboard/{category}` - Cached top N
/// - `GET /v1/campaigns/{id}` - Campaign counters
///
/// ## Player (session JWT)
/// - `POST /v1/accounts`, `GET /v1/accounts/me`
/// - `PUT /v1/accounts/me/company-name`, `POST /v1/accounts/me/verify`
/// - `GET /v1/gold`, `POST /v1/gold/collect`, `POST /v1/gold/checkpoint`, `POST /v1/gold/spend`
/// - `GET /v1/meks`, `POST /v1/meks/{n}/slot|unslot|level-up`
/// - `GET /v1/essence`, `POST /v1/essence/slots/{n}/slot|unslot|swap|unlock`
/// - `POST /v1/campaigns/{id}/reservations`, `GET /v1/campaigns/{id}/reservations/me`
/// - `POST /v1/reservations/{id}/release`, `POST /v1/reservations/{id}/payment-window`
///
/// ## Admin (`X-Admin-Key`)
/// - `/v1/admin/...` - campaigns, tenure, gold curve, essence, leaderboard, cleanup
///
/// ## Webhooks (service API key)
/// - `POST /webhooks/payments` - Payment completion
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route(
            "/campaigns",
            post(admin::create_campaign).get(admin::list_campaigns),
        )
        .route("/campaigns/cleanup", post(admin::cleanup_all_campaigns))
        .route(
            "/campaigns/:id",
            get(admin::get_campaign).patch(admin::update_campaign),
        )
        .route(
            "/campaigns/:id/inventory",
            post(admin::populate_inventory).delete(admin::clear_inventory),
        )
        .route("/campaigns/:id/activate", post(admin::activate_campaign))
        .route("/campaigns/:id/deactivate", post(admin::deactivate_campaign))
        .route("/campaigns/:id/reservations", get(admin::list_reservations))
        .route("/campaigns/:id/cleanup", post(admin::cleanup_campaign))
        .route(
            "/reservations/:id/complete",
            post(admin::complete_reservation),
        )
        .route(
            "/tenure/settings",
            get(admin::get_tenure_settings).put(admin::put_tenure_settings),
        )
        .route(
            "/tenure/buffs",
            get(admin::list_buffs).post(admin::create_buff),
        )
        .route("/tenure/buffs/:id", delete(admin::delete_buff))
        .route(
            "/gold-rate-curve",
            get(admin::get_gold_rate_curve).put(admin::put_gold_rate_curve),
        )
        .route(
            "/essence/config",
            get(essence::get_config).put(essence::put_config),
        )
        .route("/essence/checkpoint", post(essence::checkpoint))
        .route("/essence/:wallet/add", post(essence::add_essence))
        .route("/essence/:wallet/buffs", put(essence::set_buff))
        .route("/leaderboard/refresh", post(admin::refresh_leaderboard))
        .route("/leaderboard", delete(admin::clear_leaderboard))
        .route("/cleanup/mock-accounts", post(admin::delete_mock_accounts))
        .route(
            "/cleanup/zero-mek-accounts",
            post(admin::delete_zero_mek_accounts),
        )
        .route(
            "/accounts/:wallet/reset-verification",
            post(admin::reset_verification),
        )
        .layer(ConcurrencyLimitLayer::new(ADMIN_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Auth
        .route("/auth/nonce", post(auth::issue_nonce))
        .route("/auth/verify", post(auth::verify_signature))
        // Accounts
        .route("/accounts", post(accounts::connect))
        .route("/accounts/me", get(accounts::get_account))
        .route("/accounts/me/company-name", put(accounts::set_company_name))
        .route("/accounts/me/verify", post(accounts::verify_ownership))
        // Gold
        .route("/gold", get(gold::get_gold))
        .route("/gold/collect", post(gold::collect))
        .route("/gold/checkpoint", post(gold::checkpoint))
        .route("/gold/spend", post(gold::spend))
        // Meks
        .route("/meks", get(meks::list_meks))
        .route("/meks/:mek/slot", post(meks::slot_mek))
        .route("/meks/:mek/unslot", post(meks::unslot_mek))
        .route("/meks/:mek/level-up", post(meks::level_up))
        // Essence
        .route("/essence", get(essence::get_essence))
        .route("/essence/slots/:slot/slot", post(essence::slot_mek))
        .route("/essence/slots/:slot/unslot", post(essence::unslot_mek))
        .route("/essence/slots/:slot/swap", post(essence::swap_mek))
        .route("/essence/slots/:slot/unlock", post(essence::unlock_slot))
        // Leaderboard
        .route("/leaderboard/:category", get(leaderboard::get_leaderboard))
        // Campaigns
        .route("/campaigns/:id", get(campaigns::get_campaign))
        .route(
            "/campaigns/:id/reservations",
            post(campaigns::create_reservation),
        )
        .route(
            "/campaigns/:id/reservations/me",
            get(campaigns::my_reservation),
        )
        .route(
            "/reservations/:id/release",
            post(campaigns::release_reservation),
        )
        .route(
            "/reservations/:id/payment-window",
            post(campaigns::payment_window),
        )
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by the payment provider)
        .route("/webhooks/payments", post(webhooks::payment_webhook))
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
