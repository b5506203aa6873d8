//! Carbon offset projects owned by a registered wallet.

use sea_orm_migration::{prelude::*, schema::*};

use crate::amount_column;

use crate::m20260301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(pk_auto(Projects::Id))
                    .col(string_len_uniq(Projects::ProjectId, 50))
                    .col(string_len(Projects::Name, 200))
                    .col(text_null(Projects::Description))
                    .col(string_len(Projects::Location, 100))
                    .col(string_len(Projects::ProjectType, 32))
                    .col(string_len(Projects::Methodology, 32))
                    .col(string_len(Projects::VerificationBody, 32))
                    .col(big_integer(Projects::TotalCredits).default(0))
                    .col(big_integer(Projects::CreditsIssued).default(0))
                    .col(amount_column(manager, Projects::Co2Reduction).default(0))
                    .col(amount_column(manager, Projects::AreaProtected).default(0))
                    .col(string_len(Projects::Status, 16).default("pending"))
                    .col(integer(Projects::VintageYear))
                    .col(string_len_null(Projects::ImageUrl, 500))
                    .col(timestamp_with_time_zone_null(Projects::VerificationDate))
                    .col(string_len_null(Projects::VerifierAddress, 42))
                    .col(string_len(Projects::OwnerAddress, 42))
                    .col(timestamp_with_time_zone(Projects::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Projects::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_owner_address")
                            .from(Projects::Table, Projects::OwnerAddress)
                            .to(Users::Table, Users::WalletAddress)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_projects_project_type", Projects::ProjectType),
            ("idx_projects_status", Projects::Status),
            ("idx_projects_vintage_year", Projects::VintageYear),
            ("idx_projects_owner_address", Projects::OwnerAddress),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Projects::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    Location,
    ProjectType,
    Methodology,
    VerificationBody,
    TotalCredits,
    CreditsIssued,
    #[sea_orm(iden = "co2_reduction")]
    Co2Reduction,
    AreaProtected,
    Status,
    VintageYear,
    ImageUrl,
    VerificationDate,
    VerifierAddress,
    OwnerAddress,
    CreatedAt,
    UpdatedAt,
}
