//! Marketplace Handlers
//!
//! Reads come from the Query/Aggregation Service. Writes go through the
//! Reconciliation Flow: once the chain write is mined the response is a
//! success, and the `mirror` field reports whether the ledger row landed.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::AuthUser;
use crate::models::market::{
    CancelListingResponse, ListCreditsRequest, ListCreditsResponse, ListingsResponse,
    MarketOverview, Portfolio, PurchaseCreditsRequest, PurchaseCreditsResponse,
    TransactionsQuery, TransactionsResponse, VolumeQuery, VolumeResponse,
};
use crate::AppState;

/// Get all active on-chain listings
///
/// GET /api/v1/market/listings
///
/// # Response
///
/// ```json
/// {
///   "listings": [
///     {
///       "id": 7,
///       "seller": "0x5290...9ee7",
///       "amount": "100",
///       "pricePerCredit": "0.01",
///       "active": true,
///       "listingDate": "2026-03-01T12:00:00Z"
///     }
///   ],
///   "count": 1
/// }
/// ```
pub async fn get_listings(State(state): State<AppState>) -> AppResult<Json<ListingsResponse>> {
    let listings = state.market.active_listings().await?;
    Ok(Json(ListingsResponse {
        count: listings.len(),
        listings,
    }))
}

/// GET /api/v1/market/overview
pub async fn get_overview(State(state): State<AppState>) -> AppResult<Json<MarketOverview>> {
    Ok(Json(state.market.overview().await?))
}

/// Completed purchase volume per UTC day
///
/// GET /api/v1/market/volume?timeframe=24h|7d|30d|1y
pub async fn get_volume(
    State(state): State<AppState>,
    query: Result<Query<VolumeQuery>, QueryRejection>,
) -> AppResult<Json<VolumeResponse>> {
    let Query(query) = query?;
    let timeframe = query.timeframe.unwrap_or_default();
    let data = state.market.trading_volume(timeframe, Utc::now()).await;
    Ok(Json(VolumeResponse { timeframe, data }))
}

/// Offer credits for sale
///
/// POST /api/v1/market/list
///
/// # Request
///
/// ```json
/// { "amount": "100", "pricePerCredit": "0.01" }
/// ```
pub async fn list_credits(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<ListCreditsRequest>, JsonRejection>,
) -> AppResult<Json<ListCreditsResponse>> {
    let Json(request) = payload?;
    let outcome = state
        .reconciler
        .list_credits(&caller.wallet, request.amount, request.price_per_credit)
        .await?;

    info!(
        listing_id = outcome.receipt.listing_id,
        stage = %outcome.stage,
        mirrored = outcome.mirror.is_mirrored(),
        "List request completed"
    );

    Ok(Json(ListCreditsResponse {
        success: true,
        listing_id: outcome.receipt.listing_id,
        amount: outcome.amount,
        price_per_credit: outcome.price_per_credit,
        tx: outcome.receipt.tx,
        mirror: outcome.mirror,
    }))
}

/// Buy a listing outright
///
/// POST /api/v1/market/purchase/{listing_id}
///
/// `totalPrice` is sent as the call value and must cover
/// `amount * pricePerCredit`.
pub async fn purchase_credits(
    State(state): State<AppState>,
    caller: AuthUser,
    listing_id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<PurchaseCreditsRequest>, JsonRejection>,
) -> AppResult<Json<PurchaseCreditsResponse>> {
    let Path(listing_id) = listing_id?;
    let Json(request) = payload?;
    let outcome = state
        .reconciler
        .purchase_credits(&caller.wallet, listing_id, request.total_price)
        .await?;

    info!(
        listing_id,
        stage = %outcome.stage,
        mirrored = outcome.mirror.is_mirrored(),
        "Purchase request completed"
    );

    let receipt = outcome.receipt;
    Ok(Json(PurchaseCreditsResponse {
        success: true,
        listing_id: receipt.listing_id,
        buyer: receipt.buyer,
        seller: receipt.seller,
        amount: receipt.amount,
        total_price: receipt.total_price,
        tx: receipt.tx,
        mirror: outcome.mirror,
    }))
}

/// DELETE /api/v1/market/listings/{listing_id}
pub async fn cancel_listing(
    State(state): State<AppState>,
    caller: AuthUser,
    listing_id: Result<Path<u64>, PathRejection>,
) -> AppResult<Json<CancelListingResponse>> {
    let Path(listing_id) = listing_id?;
    let outcome = state.reconciler.cancel_listing(&caller.wallet, listing_id).await?;

    Ok(Json(CancelListingResponse {
        success: true,
        listing_id: outcome.receipt.listing_id,
        tx: outcome.receipt.tx,
    }))
}

/// GET /api/v1/market/portfolio
pub async fn get_portfolio(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Portfolio>> {
    Ok(Json(state.market.portfolio(&caller.wallet).await?))
}

/// Caller's completed transactions, newest first
///
/// GET /api/v1/market/transactions?type=sent|received|all&limit=N
pub async fn get_transactions(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> AppResult<Json<TransactionsResponse>> {
    let Query(query) = query?;
    let (direction, limit) = query.validate().map_err(AppError::InvalidInput)?;

    let transactions = state
        .market
        .user_transactions(&caller.wallet, direction, limit)
        .await;
    Ok(Json(TransactionsResponse {
        count: transactions.len(),
        transactions,
    }))
}

/// GET /api/v1/market/user/listings
pub async fn get_user_listings(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<ListingsResponse>> {
    let listings = state.market.user_listings(&caller.wallet).await?;
    Ok(Json(ListingsResponse {
        count: listings.len(),
        listings,
    }))
}
