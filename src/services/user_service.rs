//! Ledger Store operations for users

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entities::sea_orm_active_enums::UserRole;
use crate::entities::users::{self, Entity as Users};
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::auth::UpdateProfileRequest;

/// Display name given to wallets on first sign-in, e.g. `user_529084`.
pub fn default_username(wallet: &WalletAddress) -> String {
    format!("user_{}", &wallet.as_str()[2..8])
}

pub async fn find_by_wallet(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
) -> Result<Option<users::Model>, DbErr> {
    Users::find()
        .filter(users::Column::WalletAddress.eq(wallet.as_str()))
        .one(db)
        .await
}

/// Create the user on first sign-in, otherwise refresh `last_login`.
pub async fn record_login(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
) -> Result<users::Model, AppError> {
    let now = Utc::now().fixed_offset();

    match find_by_wallet(db, wallet).await? {
        Some(user) => {
            let mut active = user.into_active_model();
            active.last_login = Set(Some(now));
            Ok(active.update(db).await?)
        }
        None => {
            let user = users::ActiveModel {
                wallet_address: Set(wallet.as_str().to_string()),
                username: Set(Some(default_username(wallet))),
                email: Set(None),
                role: Set(UserRole::Trader),
                company: Set(None),
                profile_image: Set(None),
                is_active: Set(true),
                last_login: Set(Some(now)),
                ..Default::default()
            }
            .insert(db)
            .await?;

            info!(wallet = %wallet, user_id = user.id, "New user registered");
            Ok(user)
        }
    }
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user: users::Model,
    request: UpdateProfileRequest,
) -> Result<users::Model, AppError> {
    request.validate().map_err(AppError::Validation)?;

    let mut active = user.into_active_model();
    if let Some(username) = request.username {
        active.username = Set(Some(username.trim().to_string()));
    }
    if let Some(email) = request.email {
        active.email = Set(Some(email.trim().to_lowercase()));
    }
    if let Some(company) = request.company {
        active.company = Set(Some(company));
    }

    let updated = active.update(db).await?;
    info!(wallet = %updated.wallet_address, "Profile updated");
    Ok(updated)
}

pub async fn count_users(db: &DatabaseConnection) -> Result<u64, DbErr> {
    Users::find().count(db).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_username() {
        let wallet = WalletAddress::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        assert_eq!(default_username(&wallet), "user_529084");
    }
}
