//! SeaORM Entity for synthetic platform performance snapshots
//!
//! These rows are demo data: values are jittered around fixed baselines and
//! are not derived from consensus telemetry.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use super::checks::{check_non_negative, check_percentage, current, violation};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "performance_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub timestamp: DateTimeWithTimeZone,
    pub transparency: f64,
    /// Seconds
    pub latency: f64,
    /// Transactions per second
    pub throughput: f64,
    pub uptime: f64,
    pub consensus_efficiency: f64,
    pub credit_accuracy: f64,
    pub fraud_detection: f64,
    pub active_users: i64,
    pub daily_transactions: i64,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub total_volume: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Mean of the five percentage-scale health indicators.
    pub fn overall_score(&self) -> f64 {
        (self.transparency
            + self.uptime
            + self.consensus_efficiency
            + self.credit_accuracy
            + self.fraud_detection)
            / 5.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        check_percentage("transparency", &self.transparency)?;
        check_percentage("uptime", &self.uptime)?;
        check_percentage("consensus_efficiency", &self.consensus_efficiency)?;
        check_percentage("credit_accuracy", &self.credit_accuracy)?;
        check_percentage("fraud_detection", &self.fraud_detection)?;
        check_non_negative("total_volume", &self.total_volume)?;

        for (field, value) in [("latency", &self.latency), ("throughput", &self.throughput)] {
            if current(value).is_some_and(|v| *v < 0.0) {
                return Err(violation(format!("{} must not be negative", field)));
            }
        }
        for (field, value) in [
            ("active_users", &self.active_users),
            ("daily_transactions", &self.daily_transactions),
        ] {
            if current(value).is_some_and(|v| *v < 0) {
                return Err(violation(format!("{} must not be negative", field)));
            }
        }

        if insert {
            let now = Utc::now().fixed_offset();
            if current(&self.timestamp).is_none() {
                self.timestamp = Set(now);
            }
            if current(&self.created_at).is_none() {
                self.created_at = Set(now);
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_overall_score_averages_percentages() {
        let now = Utc::now().fixed_offset();
        let metric = Model {
            id: 1,
            timestamp: now,
            transparency: 90.0,
            latency: 2.0,
            throughput: 15.0,
            uptime: 100.0,
            consensus_efficiency: 95.0,
            credit_accuracy: 85.0,
            fraud_detection: 80.0,
            active_users: 3,
            daily_transactions: 1,
            total_volume: Decimal::ZERO,
            created_at: now,
        };
        assert!((metric.overall_score() - 90.0).abs() < f64::EPSILON);
    }
}
