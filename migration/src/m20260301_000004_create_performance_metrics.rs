//! Synthetic platform health snapshots, one row per generation tick.

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
                    .table(PerformanceMetrics::Table)
                    .if_not_exists()
                    .col(pk_auto(PerformanceMetrics::Id))
                    .col(timestamp_with_time_zone(PerformanceMetrics::Timestamp).default(Expr::current_timestamp()))
                    .col(double(PerformanceMetrics::Transparency))
                    .col(double(PerformanceMetrics::Latency))
                    .col(double(PerformanceMetrics::Throughput))
                    .col(double(PerformanceMetrics::Uptime))
                    .col(double(PerformanceMetrics::ConsensusEfficiency))
                    .col(double(PerformanceMetrics::CreditAccuracy))
                    .col(double(PerformanceMetrics::FraudDetection))
                    .col(big_integer(PerformanceMetrics::ActiveUsers).default(0))
                    .col(big_integer(PerformanceMetrics::DailyTransactions).default(0))
                    .col(amount_column(manager, PerformanceMetrics::TotalVolume).default(0))
                    .col(timestamp_with_time_zone(PerformanceMetrics::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_performance_metrics_timestamp")
                    .table(PerformanceMetrics::Table)
                    .col(PerformanceMetrics::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PerformanceMetrics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PerformanceMetrics {
    Table,
    Id,
    Timestamp,
    Transparency,
    Latency,
    Throughput,
    Uptime,
    ConsensusEfficiency,
    CreditAccuracy,
    FraudDetection,
    ActiveUsers,
    DailyTransactions,
    TotalVolume,
    CreatedAt,
}
