//! Auth Handlers
//!
//! Wallet sign-in, profile and logout, plus the `AuthUser` session extractor.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use tracing::debug;

use crate::entities::sea_orm_active_enums::UserRole;
use crate::entities::users;
use crate::error::{AppError, AppResult};
use crate::models::address::WalletAddress;
use crate::models::auth::{
    LogoutResponse, NonceRequest, NonceResponse, SessionResponse, UpdateProfileRequest,
    UserView, VerifyRequest,
};
use crate::services::{auth, user_service};
use crate::AppState;

/// The signed-in caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
    pub wallet: WalletAddress,
    pub token: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.user.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?
            .to_string();

        let user = auth::authenticate(&state.db, &token).await?;
        let wallet = WalletAddress::parse(&user.wallet_address)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        debug!(wallet = %wallet, "Session resolved");

        Ok(Self { user, wallet, token })
    }
}

/// POST /api/v1/auth/nonce
///
/// Issues a one-time challenge. The client signs `message` with the wallet
/// (EIP-191 personal_sign) and posts the signature to `/auth/verify`.
pub async fn request_nonce(
    State(state): State<AppState>,
    payload: Result<Json<NonceRequest>, JsonRejection>,
) -> AppResult<Json<NonceResponse>> {
    let Json(request) = payload?;
    let challenge =
        auth::issue_challenge(&state.db, &request.wallet_address, state.auth.nonce_ttl).await?;
    Ok(Json(challenge))
}

/// POST /api/v1/auth/verify
pub async fn verify_signature(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<SessionResponse>> {
    let Json(request) = payload?;
    let session = auth::verify_challenge(
        &state.db,
        &request.wallet_address,
        &request.signature,
        state.auth.session_ttl,
    )
    .await?;
    Ok(Json(session))
}

/// GET /api/v1/auth/profile
pub async fn get_profile(caller: AuthUser) -> Json<UserView> {
    Json(UserView::from(caller.user))
}

/// PUT /api/v1/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(request) = payload?;
    let updated = user_service::update_profile(&state.db, caller.user, request).await?;
    Ok(Json(UserView::from(updated)))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<LogoutResponse>> {
    auth::revoke_session(&state.db, &caller.token).await?;
    Ok(Json(LogoutResponse { success: true }))
}
