//! Wallet sign-in challenges and the bearer sessions issued for them.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthChallenges::Table)
                    .if_not_exists()
                    .col(pk_auto(AuthChallenges::Id))
                    .col(string_len(AuthChallenges::WalletAddress, 42))
                    .col(string_len(AuthChallenges::Nonce, 64))
                    .col(boolean(AuthChallenges::Consumed).default(false))
                    .col(timestamp_with_time_zone(AuthChallenges::ExpiresAt))
                    .col(timestamp_with_time_zone(AuthChallenges::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_challenges_wallet_address")
                    .table(AuthChallenges::Table)
                    .col(AuthChallenges::WalletAddress)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(pk_auto(Sessions::Id))
                    .col(string_len_uniq(Sessions::Token, 64))
                    .col(string_len(Sessions::WalletAddress, 42))
                    .col(boolean(Sessions::Revoked).default(false))
                    .col(timestamp_with_time_zone(Sessions::ExpiresAt))
                    .col(timestamp_with_time_zone(Sessions::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthChallenges::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuthChallenges {
    Table,
    Id,
    WalletAddress,
    Nonce,
    Consumed,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    Token,
    WalletAddress,
    Revoked,
    ExpiresAt,
    CreatedAt,
}
