//! Router assembly

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::expose_error_debug;
use crate::handlers::{analytics, auth, health, market, projects};
use crate::AppState;

pub const API_BASE: &str = "/api/v1";

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/auth/nonce", post(auth::request_nonce))
        .route("/auth/verify", post(auth::verify_signature))
        .route("/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/auth/logout", post(auth::logout))
        // Projects
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route("/projects/user/my-projects", get(projects::my_projects))
        .route("/projects/stats/project-stats", get(projects::project_stats))
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{project_id}/verify", patch(projects::verify_project))
        .route("/projects/{project_id}/reject", patch(projects::reject_project))
        .route("/projects/{project_id}/issue", post(projects::issue_credits))
        // Market
        .route("/market/listings", get(market::get_listings))
        .route("/market/listings/{listing_id}", delete(market::cancel_listing))
        .route("/market/overview", get(market::get_overview))
        .route("/market/volume", get(market::get_volume))
        .route("/market/list", post(market::list_credits))
        .route("/market/purchase/{listing_id}", post(market::purchase_credits))
        .route("/market/portfolio", get(market::get_portfolio))
        .route("/market/transactions", get(market::get_transactions))
        .route("/market/user/listings", get(market::get_user_listings))
        // Analytics
        .route("/analytics/performance", get(analytics::get_performance))
        .route("/analytics/generate-metrics", post(analytics::generate_metrics))
        .route(
            "/analytics/environmental-impact",
            get(analytics::get_environmental_impact),
        )
        .route("/analytics/user", get(analytics::get_user_analytics))
        .route("/analytics/platform", get(analytics::get_platform_analytics))
}

fn cors_layer(allow_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_origin == "*" {
        return cors.allow_origin(Any);
    }
    match HeaderValue::from_str(allow_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(origin = allow_origin, "Invalid CORS origin, allowing any");
            cors.allow_origin(Any)
        }
    }
}

/// Full application router: API under `/api/v1`, JSON 404 for everything else.
pub fn create_router(state: AppState, cors_allow_origin: &str) -> Router {
    Router::new()
        .nest(API_BASE, api_routes())
        .fallback(health::not_found)
        .layer(middleware::map_response_with_state(
            state.verbose_errors,
            expose_error_debug,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allow_origin))
        .with_state(state)
}
