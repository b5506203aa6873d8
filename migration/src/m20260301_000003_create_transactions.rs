//! Off-chain mirror of on-chain listing/purchase events.
//!
//! Counterparty addresses are not foreign keys: a buyer may transact on-chain
//! without ever signing in here, and the mirror insert must not fail for it.

use sea_orm_migration::{prelude::*, schema::*};

use crate::amount_column;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(string_len_null(Transactions::TransactionHash, 66).unique_key())
                    .col(string_len(Transactions::FromAddress, 42))
                    .col(string_len(Transactions::ToAddress, 42))
                    .col(amount_column(manager, Transactions::Amount))
                    .col(amount_column(manager, Transactions::Price))
                    .col(amount_column(manager, Transactions::TotalValue))
                    .col(string_len(Transactions::TransactionType, 16))
                    .col(string_len(Transactions::Status, 16).default("pending"))
                    .col(big_integer_null(Transactions::BlockNumber))
                    .col(big_integer_null(Transactions::GasUsed))
                    .col(string_len_null(Transactions::ProjectId, 50))
                    .col(big_integer_null(Transactions::ListingId))
                    .col(json_null(Transactions::Metadata))
                    .col(timestamp_with_time_zone(Transactions::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Transactions::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_transactions_from_address", Transactions::FromAddress),
            ("idx_transactions_to_address", Transactions::ToAddress),
            ("idx_transactions_type", Transactions::TransactionType),
            ("idx_transactions_status", Transactions::Status),
            ("idx_transactions_created_at", Transactions::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Transactions::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    TransactionHash,
    FromAddress,
    ToAddress,
    Amount,
    Price,
    TotalValue,
    TransactionType,
    Status,
    BlockNumber,
    GasUsed,
    ProjectId,
    ListingId,
    Metadata,
    CreatedAt,
    UpdatedAt,
}
