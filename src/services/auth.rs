//! Wallet sign-in: nonce challenges, EIP-191 signature recovery and bearer sessions

use alloy::primitives::PrimitiveSignature;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::auth_challenges::{self, Entity as AuthChallenges};
use crate::entities::sessions::{self, Entity as Sessions};
use crate::entities::users;
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::auth::{NonceResponse, SessionResponse, UserView};
use crate::services::user_service;

const SIGN_IN_PREFIX: &str = "Please sign this nonce to authenticate: ";

/// Lifetimes of sign-in challenges and bearer sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    pub nonce_ttl: Duration,
    pub session_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            nonce_ttl: Duration::from_secs(300),
            session_ttl: Duration::from_secs(168 * 3600),
        }
    }
}

/// Text the wallet signs for `nonce`.
pub fn sign_in_message(nonce: &str) -> String {
    format!("{}{}", SIGN_IN_PREFIX, nonce)
}

fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AppError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal("TTL out of range".to_string()))
}

/// Recover the address that produced a personal_sign signature over `message`.
pub fn recover_signer(message: &str, signature: &str) -> Result<WalletAddress, AppError> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw)
        .map_err(|_| AppError::Auth("Signature is not valid hex".to_string()))?;
    if bytes.len() != 65 {
        return Err(AppError::Auth("Signature must be 65 bytes".to_string()));
    }

    let signature = PrimitiveSignature::try_from(bytes.as_slice())
        .map_err(|e| AppError::Auth(format!("Malformed signature: {}", e)))?;
    let recovered = signature
        .recover_address_from_msg(message)
        .map_err(|e| AppError::Auth(format!("Signature recovery failed: {}", e)))?;

    WalletAddress::parse(&recovered.to_string()).map_err(|e| AppError::Internal(e.to_string()))
}

/// Store a fresh challenge for `wallet` and return the message to sign.
pub async fn issue_challenge(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
    ttl: Duration,
) -> Result<NonceResponse, AppError> {
    let now = Utc::now();
    let expires_at = expiry(now, ttl)?;
    let nonce = generate_nonce();

    auth_challenges::ActiveModel {
        wallet_address: Set(wallet.as_str().to_string()),
        nonce: Set(nonce.clone()),
        consumed: Set(false),
        expires_at: Set(expires_at.fixed_offset()),
        created_at: Set(now.fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(wallet = %wallet, "Auth challenge issued");

    Ok(NonceResponse {
        message: sign_in_message(&nonce),
        nonce,
        expires_at,
    })
}

/// Check the signature against the newest open challenge and open a session.
///
/// # Errors
///
/// `Auth` if there is no open challenge, the signature is malformed, or it
/// was produced by a different address.
pub async fn verify_challenge(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
    signature: &str,
    session_ttl: Duration,
) -> Result<SessionResponse, AppError> {
    let now = Utc::now();

    let challenge = AuthChallenges::find()
        .filter(auth_challenges::Column::WalletAddress.eq(wallet.as_str()))
        .filter(auth_challenges::Column::Consumed.eq(false))
        .filter(auth_challenges::Column::ExpiresAt.gt(now.fixed_offset()))
        .order_by_desc(auth_challenges::Column::CreatedAt)
        .order_by_desc(auth_challenges::Column::Id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Auth("No pending challenge; request a new nonce".to_string()))?;

    let signer = recover_signer(&sign_in_message(&challenge.nonce), signature)?;
    if &signer != wallet {
        warn!(wallet = %wallet, recovered = %signer, "Signature does not match claimed wallet");
        return Err(AppError::Auth("Signature does not match wallet address".to_string()));
    }

    let mut consumed = challenge.into_active_model();
    consumed.consumed = Set(true);
    consumed.update(db).await?;

    let user = user_service::record_login(db, wallet).await?;
    if !user.is_active {
        return Err(AppError::Auth("Account is disabled".to_string()));
    }

    let token = generate_token();
    let expires_at = expiry(now, session_ttl)?;
    sessions::ActiveModel {
        token: Set(token.clone()),
        wallet_address: Set(wallet.as_str().to_string()),
        revoked: Set(false),
        expires_at: Set(expires_at.fixed_offset()),
        created_at: Set(now.fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(wallet = %wallet, user_id = user.id, "Wallet signed in");

    Ok(SessionResponse {
        token,
        expires_at,
        user: UserView::from(user),
    })
}

/// Resolve a bearer token to its active user.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<users::Model, AppError> {
    let now = Utc::now().fixed_offset();

    let session = Sessions::find()
        .filter(sessions::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid session token".to_string()))?;

    if session.revoked || session.expires_at <= now {
        return Err(AppError::Auth("Session expired".to_string()));
    }

    let wallet = WalletAddress::parse(&session.wallet_address)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let user = user_service::find_by_wallet(db, &wallet)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

    if !user.is_active {
        return Err(AppError::Auth("Account is disabled".to_string()));
    }
    Ok(user)
}

pub async fn revoke_session(db: &DatabaseConnection, token: &str) -> Result<(), AppError> {
    if let Some(session) = Sessions::find()
        .filter(sessions::Column::Token.eq(token))
        .one(db)
        .await?
    {
        let wallet = session.wallet_address.clone();
        let mut active = session.into_active_model();
        active.revoked = Set(true);
        active.update(db).await?;
        info!(wallet = %wallet, "Session revoked");
    }
    Ok(())
}

/// Rows removed by one `purge_stale` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgedAuthRows {
    pub challenges: u64,
    pub sessions: u64,
}

/// Delete challenges that are consumed or past expiry, and sessions that
/// are revoked or past expiry, as of `now`.
pub async fn purge_stale(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<PurgedAuthRows, DbErr> {
    let now = now.fixed_offset();

    let challenges = AuthChallenges::delete_many()
        .filter(
            Condition::any()
                .add(auth_challenges::Column::Consumed.eq(true))
                .add(auth_challenges::Column::ExpiresAt.lte(now)),
        )
        .exec(db)
        .await?
        .rows_affected;

    let sessions = Sessions::delete_many()
        .filter(
            Condition::any()
                .add(sessions::Column::Revoked.eq(true))
                .add(sessions::Column::ExpiresAt.lte(now)),
        )
        .exec(db)
        .await?
        .rows_affected;

    debug!(challenges, sessions, "Stale auth rows purged");
    Ok(PurgedAuthRows {
        challenges,
        sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    #[test]
    fn test_message_format() {
        assert_eq!(
            sign_in_message("abc123"),
            "Please sign this nonce to authenticate: abc123"
        );
    }

    #[test]
    fn test_recover_matches_signer() {
        let signer = PrivateKeySigner::random();
        let message = sign_in_message("deadbeef");
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
        let encoded = format!("0x{}", hex::encode(signature.as_bytes()));

        let recovered = recover_signer(&message, &encoded).unwrap();
        let expected = WalletAddress::parse(&signer.address().to_string()).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_recover_other_message_differs() {
        let signer = PrivateKeySigner::random();
        let signature = signer
            .sign_message_sync(sign_in_message("one").as_bytes())
            .unwrap();
        let encoded = hex::encode(signature.as_bytes());

        let recovered = recover_signer(&sign_in_message("two"), &encoded);
        let expected = WalletAddress::parse(&signer.address().to_string()).unwrap();
        assert!(recovered.map(|r| r != expected).unwrap_or(true));
    }

    #[test]
    fn test_rejects_malformed_signatures() {
        assert!(matches!(recover_signer("m", "0xzz"), Err(AppError::Auth(_))));
        assert!(matches!(recover_signer("m", "0x1234"), Err(AppError::Auth(_))));
    }

    #[test]
    fn test_nonce_and_token_shape() {
        assert_eq!(generate_nonce().len(), 32);
        assert_eq!(generate_token().len(), 64);
        assert_ne!(generate_token(), generate_token());
    }
}
