//! Analytics: synthetic performance metrics, per-user and platform views
//!
//! Performance metrics are demo data. Each sample is random jitter around
//! fixed baselines; nothing here is measured.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, warn};

use crate::entities::performance_metrics::{self, Entity as PerformanceMetrics};
use crate::entities::projects::{self, Entity as Projects};
use crate::entities::sea_orm_active_enums::ProjectStatus;
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::analytics::{
    MetricPoint, PlatformAnalytics, PortfolioValue, TransactionStats, UserAnalytics,
};
use crate::models::market::TransactionDirection;
use crate::services::chain_gateway::ChainGateway;
use crate::services::market_query::{degrade, group_by_day};
use crate::services::transaction_store;
use crate::services::user_service;

/// Days of history in the per-user trading chart
pub const USER_HISTORY_DAYS: i64 = 30;

/// One synthetic reading of the platform health indicators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSample {
    pub transparency: f64,
    pub latency: f64,
    pub throughput: f64,
    pub uptime: f64,
    pub consensus_efficiency: f64,
    pub credit_accuracy: f64,
    pub fraud_detection: f64,
}

fn jitter<R: Rng>(rng: &mut R, base: f64, spread: f64) -> f64 {
    base + rng.gen_range(-spread..spread)
}

fn percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

impl SyntheticSample {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            transparency: percent(jitter(rng, 95.5, 1.0)),
            latency: jitter(rng, 2.3, 0.25).max(0.0),
            throughput: jitter(rng, 15.2, 1.5).max(0.0),
            uptime: percent(99.9 - rng.gen_range(0.0..0.5)),
            consensus_efficiency: percent(jitter(rng, 98.2, 0.5)),
            credit_accuracy: percent(jitter(rng, 97.8, 0.75)),
            fraud_detection: percent(jitter(rng, 96.5, 1.0)),
        }
    }
}

/// Metrics recorded within the last `days`, oldest first.
pub async fn performance_trends(
    db: &DatabaseConnection,
    days: i64,
    now: DateTime<Utc>,
) -> Vec<MetricPoint> {
    let since = (now - Duration::days(days)).fixed_offset();

    match PerformanceMetrics::find()
        .filter(performance_metrics::Column::Timestamp.gte(since))
        .order_by_asc(performance_metrics::Column::Timestamp)
        .all(db)
        .await
    {
        Ok(rows) => rows.into_iter().map(MetricPoint::from).collect(),
        Err(e) => {
            warn!(error = %e, "Failed to load performance metrics");
            Vec::new()
        }
    }
}

/// Record one synthetic metric row using live platform counters.
pub async fn generate_metric(
    db: &DatabaseConnection,
) -> Result<performance_metrics::Model, AppError> {
    let sample = SyntheticSample::generate(&mut rand::thread_rng());
    let now = Utc::now();

    let active_users = user_service::count_users(db).await?;
    let daily_transactions =
        transaction_store::count_completed_since(db, now - Duration::hours(24)).await?;
    let totals = transaction_store::purchase_totals(db).await?;

    let metric = performance_metrics::ActiveModel {
        timestamp: Set(now.fixed_offset()),
        transparency: Set(sample.transparency),
        latency: Set(sample.latency),
        throughput: Set(sample.throughput),
        uptime: Set(sample.uptime),
        consensus_efficiency: Set(sample.consensus_efficiency),
        credit_accuracy: Set(sample.credit_accuracy),
        fraud_detection: Set(sample.fraud_detection),
        active_users: Set(active_users as i64),
        daily_transactions: Set(daily_transactions as i64),
        total_volume: Set(totals.volume),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        metric_id = metric.id,
        synthetic = true,
        active_users,
        daily_transactions,
        total_volume = %metric.total_volume,
        "Synthetic performance metric recorded"
    );
    Ok(metric)
}

pub async fn user_analytics(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
    now: DateTime<Utc>,
) -> UserAnalytics {
    let transactions = degrade(
        "user_transactions",
        transaction_store::for_wallet(db, wallet, TransactionDirection::All, None).await,
    );

    let total_volume: Decimal = transactions.iter().map(|tx| tx.total_value).sum();
    let price_sum: Decimal = transactions.iter().map(|tx| tx.price).sum();
    let average_price = if transactions.is_empty() {
        Decimal::ZERO
    } else {
        (price_sum / Decimal::from(transactions.len() as u64)).normalize()
    };
    let last_transaction = transactions
        .iter()
        .map(|tx| tx.created_at.with_timezone(&Utc))
        .max();

    let invested = degrade(
        "invested",
        transaction_store::purchase_totals_for(db, wallet, TransactionDirection::Received).await,
    );
    let returned = degrade(
        "returned",
        transaction_store::purchase_totals_for(db, wallet, TransactionDirection::Sent).await,
    );

    let since = now - Duration::days(USER_HISTORY_DAYS);
    let history = degrade(
        "trading_history",
        transaction_store::purchases_since(db, since, Some(wallet)).await,
    );

    let volumes = degrade(
        "volume_by_wallet",
        transaction_store::purchase_volume_by_wallet(db).await,
    );
    let own = volumes.get(wallet.as_str()).copied().unwrap_or_default();
    let rank = 1 + volumes.values().filter(|v| **v > own).count() as u64;

    UserAnalytics {
        wallet_address: wallet.to_string(),
        transaction_stats: TransactionStats {
            total_transactions: transactions.len() as u64,
            total_volume: total_volume.normalize(),
            average_price,
            last_transaction,
        },
        portfolio: PortfolioValue {
            total_invested: invested.volume,
            total_returned: returned.volume,
            net_value: returned.volume - invested.volume,
        },
        trading_history: group_by_day(&history),
        rank,
    }
}

pub async fn platform_analytics(
    db: &DatabaseConnection,
    gateway: &dyn ChainGateway,
) -> Result<PlatformAnalytics, AppError> {
    let chain = gateway.get_platform_stats().await?;

    let total_users = degrade("total_users", user_service::count_users(db).await);
    let total_projects = degrade("total_projects", Projects::find().count(db).await);
    let verified_projects = degrade(
        "verified_projects",
        Projects::find()
            .filter(projects::Column::Status.eq(ProjectStatus::Verified))
            .count(db)
            .await,
    );

    Ok(PlatformAnalytics {
        chain,
        total_users,
        total_projects,
        verified_projects,
    })
}
