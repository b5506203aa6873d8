use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::performance_metrics;
use crate::entities::sea_orm_active_enums::ProjectType;
use crate::models::market::VolumePoint;
use crate::services::chain_gateway::PlatformStats;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceQuery {
    pub days: Option<i64>,
}

impl PerformanceQuery {
    pub const DEFAULT_DAYS: i64 = 30;

    pub fn validate(&self) -> Result<i64, String> {
        let days = self.days.unwrap_or(Self::DEFAULT_DAYS);
        if !(1..=365).contains(&days) {
            return Err("days must be between 1 and 365".to_string());
        }
        Ok(days)
    }
}

/// Synthetic performance snapshot; values are demo data, not telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub transparency: f64,
    pub latency: f64,
    pub throughput: f64,
    pub uptime: f64,
    pub consensus_efficiency: f64,
    pub credit_accuracy: f64,
    pub fraud_detection: f64,
    pub active_users: i64,
    pub daily_transactions: i64,
    pub total_volume: Decimal,
    pub overall_score: f64,
}

impl From<performance_metrics::Model> for MetricPoint {
    fn from(metric: performance_metrics::Model) -> Self {
        let overall_score = metric.overall_score();
        Self {
            timestamp: metric.timestamp.with_timezone(&Utc),
            transparency: metric.transparency,
            latency: metric.latency,
            throughput: metric.throughput,
            uptime: metric.uptime,
            consensus_efficiency: metric.consensus_efficiency,
            credit_accuracy: metric.credit_accuracy,
            fraud_detection: metric.fraud_detection,
            active_users: metric.active_users,
            daily_transactions: metric.daily_transactions,
            total_volume: metric.total_volume,
            overall_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub days: i64,
    pub synthetic: bool,
    pub metrics: Vec<MetricPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactByType {
    pub project_type: ProjectType,
    pub project_count: u64,
    pub co2_reduction: Decimal,
    pub area_protected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    pub by_type: Vec<ImpactByType>,
    pub total_co2_reduction: Decimal,
    pub total_area_protected: Decimal,
    pub verified_projects: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub total_transactions: u64,
    pub total_volume: Decimal,
    pub average_price: Decimal,
    pub last_transaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValue {
    pub total_invested: Decimal,
    pub total_returned: Decimal,
    pub net_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    pub wallet_address: String,
    pub transaction_stats: TransactionStats,
    pub portfolio: PortfolioValue,
    pub trading_history: Vec<VolumePoint>,
    /// 1 + number of wallets with strictly greater completed volume
    pub rank: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAnalytics {
    pub chain: PlatformStats,
    pub total_users: u64,
    pub total_projects: u64,
    pub verified_projects: u64,
}
