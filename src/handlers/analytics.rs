//! Analytics Handlers
//!
//! Performance metrics served here are synthetic demo data. Responses carry
//! `synthetic: true` so clients never mistake them for telemetry.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::AuthUser;
use crate::models::analytics::{
    EnvironmentalImpact, MetricPoint, PerformanceQuery, PerformanceResponse, PlatformAnalytics,
    UserAnalytics,
};
use crate::services::analytics;
use crate::AppState;

/// GET /api/v1/analytics/performance?days=N
///
/// `days` defaults to 30 and must be within 1..=365.
pub async fn get_performance(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> AppResult<Json<PerformanceResponse>> {
    let Query(query) = query?;
    let days = query.validate().map_err(AppError::InvalidInput)?;

    let metrics = analytics::performance_trends(&state.db, days, Utc::now()).await;
    Ok(Json(PerformanceResponse {
        days,
        synthetic: true,
        metrics,
    }))
}

/// POST /api/v1/analytics/generate-metrics (admin only)
pub async fn generate_metrics(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<(StatusCode, Json<MetricPoint>)> {
    caller.require_admin()?;
    let metric = analytics::generate_metric(&state.db).await?;
    Ok((StatusCode::CREATED, Json(MetricPoint::from(metric))))
}

/// GET /api/v1/analytics/environmental-impact
pub async fn get_environmental_impact(State(state): State<AppState>) -> Json<EnvironmentalImpact> {
    Json(state.market.environmental_impact().await)
}

/// GET /api/v1/analytics/user
pub async fn get_user_analytics(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Json<UserAnalytics> {
    Json(analytics::user_analytics(&state.db, &caller.wallet, Utc::now()).await)
}

/// GET /api/v1/analytics/platform
pub async fn get_platform_analytics(
    State(state): State<AppState>,
) -> AppResult<Json<PlatformAnalytics>> {
    Ok(Json(
        analytics::platform_analytics(&state.db, state.gateway.as_ref()).await?,
    ))
}
