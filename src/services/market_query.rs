//! Query/Aggregation Service: read-only views over the chain and the Ledger Store
//!
//! Chain reads are authoritative and their failures fail the view. Store
//! aggregates degrade to zero/empty on error, since "no rows yet" and "store
//! hiccup" look the same to a dashboard.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entities::projects::{self, Entity as Projects};
use crate::entities::sea_orm_active_enums::{ProjectStatus, ProjectType};
use crate::entities::transactions;
use crate::entities::users::{self, Entity as Users};
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::analytics::{EnvironmentalImpact, ImpactByType};
use crate::models::market::{
    MarketOverview, Portfolio, Timeframe, TransactionDirection, TransactionView, VolumePoint,
};
use crate::services::chain_gateway::{ChainGateway, Listing};
use crate::services::transaction_store;

/// Completed transactions shown in the market overview
pub const RECENT_TRANSACTIONS: u64 = 5;

#[derive(Clone)]
pub struct MarketQueryService {
    gateway: Arc<dyn ChainGateway>,
    db: DatabaseConnection,
}

impl MarketQueryService {
    pub fn new(gateway: Arc<dyn ChainGateway>, db: DatabaseConnection) -> Self {
        Self { gateway, db }
    }

    pub async fn active_listings(&self) -> Result<Vec<Listing>, AppError> {
        Ok(self.gateway.get_active_listings().await?)
    }

    /// Every listing the wallet created, active or not.
    pub async fn user_listings(&self, wallet: &WalletAddress) -> Result<Vec<Listing>, AppError> {
        Ok(self.gateway.get_user_listings(wallet).await?)
    }

    pub async fn overview(&self) -> Result<MarketOverview, AppError> {
        let platform_stats = self.gateway.get_platform_stats().await?;
        let listings = self.gateway.get_active_listings().await?;

        let totals = degrade(
            "purchase_totals",
            transaction_store::purchase_totals(&self.db).await,
        );
        let recent = degrade(
            "recent_transactions",
            transaction_store::recent_completed(&self.db, RECENT_TRANSACTIONS).await,
        );

        Ok(MarketOverview {
            platform_stats,
            active_listings: listings.len(),
            total_volume: totals.volume,
            average_price: totals.average_price(),
            completed_purchases: totals.count,
            recent_transactions: self.with_usernames(recent).await,
        })
    }

    pub async fn portfolio(&self, wallet: &WalletAddress) -> Result<Portfolio, AppError> {
        let balance = self.gateway.get_balance(wallet).await?;
        let active_listings: Vec<Listing> = self
            .gateway
            .get_active_listings()
            .await?
            .into_iter()
            .filter(|listing| &listing.seller == wallet)
            .collect();

        let purchased = degrade(
            "purchased_totals",
            transaction_store::purchase_totals_for(&self.db, wallet, TransactionDirection::Received)
                .await,
        );
        let sold = degrade(
            "sold_totals",
            transaction_store::purchase_totals_for(&self.db, wallet, TransactionDirection::Sent)
                .await,
        );

        Ok(Portfolio {
            wallet_address: wallet.clone(),
            balance,
            active_listings,
            total_purchased: purchased.volume,
            total_sold: sold.volume,
            net_performance: purchased.volume - sold.volume,
        })
    }

    /// Completed purchase volume per UTC day inside the trailing window.
    pub async fn trading_volume(&self, timeframe: Timeframe, now: DateTime<Utc>) -> Vec<VolumePoint> {
        let rows = degrade(
            "trading_volume",
            transaction_store::purchases_since(&self.db, timeframe.since(now), None).await,
        );
        debug!(timeframe = %timeframe, rows = rows.len(), "Aggregating trading volume");
        group_by_day(&rows)
    }

    /// The wallet's completed transactions with counterparty names attached.
    pub async fn user_transactions(
        &self,
        wallet: &WalletAddress,
        direction: TransactionDirection,
        limit: u64,
    ) -> Vec<TransactionView> {
        let rows = degrade(
            "user_transactions",
            transaction_store::for_wallet(&self.db, wallet, direction, Some(limit)).await,
        );
        self.with_usernames(rows).await
    }

    /// CO2 and area totals over verified projects, grouped by project type.
    pub async fn environmental_impact(&self) -> EnvironmentalImpact {
        let rows = degrade("environmental_impact", self.impact_rows().await);

        let by_type: Vec<ImpactByType> = rows
            .into_iter()
            .map(|(project_type, count, co2, area)| ImpactByType {
                project_type,
                project_count: count.max(0) as u64,
                co2_reduction: co2.unwrap_or_default().normalize(),
                area_protected: area.unwrap_or_default().normalize(),
            })
            .collect();

        EnvironmentalImpact {
            total_co2_reduction: by_type.iter().map(|g| g.co2_reduction).sum(),
            total_area_protected: by_type.iter().map(|g| g.area_protected).sum(),
            verified_projects: by_type.iter().map(|g| g.project_count).sum(),
            by_type,
        }
    }

    async fn impact_rows(
        &self,
    ) -> Result<Vec<(ProjectType, i64, Option<Decimal>, Option<Decimal>)>, DbErr> {
        Projects::find()
            .select_only()
            .column(projects::Column::ProjectType)
            .column_as(projects::Column::Id.count(), "project_count")
            .column_as(projects::Column::Co2Reduction.sum(), "co2_reduction")
            .column_as(projects::Column::AreaProtected.sum(), "area_protected")
            .filter(projects::Column::Status.eq(ProjectStatus::Verified))
            .group_by(projects::Column::ProjectType)
            .order_by_asc(projects::Column::ProjectType)
            .into_tuple()
            .all(&self.db)
            .await
    }

    async fn with_usernames(&self, rows: Vec<transactions::Model>) -> Vec<TransactionView> {
        let addresses: HashSet<String> = rows
            .iter()
            .flat_map(|tx| [tx.from_address.clone(), tx.to_address.clone()])
            .collect();

        let names: HashMap<String, String> = if addresses.is_empty() {
            HashMap::new()
        } else {
            degrade(
                "usernames",
                Users::find()
                    .filter(users::Column::WalletAddress.is_in(addresses))
                    .all(&self.db)
                    .await,
            )
            .into_iter()
            .filter_map(|user| user.username.map(|name| (user.wallet_address, name)))
            .collect()
        };

        rows.into_iter()
            .map(|tx| {
                let mut view = TransactionView::from(tx);
                view.from_username = names.get(&view.from_address).cloned();
                view.to_username = names.get(&view.to_address).cloned();
                view
            })
            .collect()
    }
}

/// Fold completed purchases into per-day points, oldest day first.
pub fn group_by_day(rows: &[transactions::Model]) -> Vec<VolumePoint> {
    let mut days: BTreeMap<NaiveDate, (Decimal, u64, Decimal)> = BTreeMap::new();

    for tx in rows {
        let day = tx.created_at.with_timezone(&Utc).date_naive();
        let entry = days.entry(day).or_insert((Decimal::ZERO, 0, Decimal::ZERO));
        entry.0 += tx.total_value;
        entry.1 += 1;
        entry.2 += tx.price;
    }

    days.into_iter()
        .map(|(date, (volume, count, price_sum))| VolumePoint {
            date,
            volume: volume.normalize(),
            transaction_count: count,
            average_price: (price_sum / Decimal::from(count)).normalize(),
        })
        .collect()
}

/// Read-path fallback: log the store error and carry on with an empty value.
pub(crate) fn degrade<T: Default>(what: &'static str, result: Result<T, DbErr>) -> T {
    result.unwrap_or_else(|e| {
        warn!(query = what, error = %e, "Store read failed, using empty result");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::{TransactionStatus, TransactionType};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn purchase(id: i32, at: DateTime<Utc>, amount: Decimal, price: Decimal) -> transactions::Model {
        transactions::Model {
            id,
            transaction_hash: None,
            from_address: format!("0x{:040x}", 1),
            to_address: format!("0x{:040x}", 2),
            amount,
            price,
            total_value: amount * price,
            transaction_type: TransactionType::Purchase,
            status: TransactionStatus::Completed,
            block_number: None,
            gas_used: None,
            project_id: None,
            listing_id: None,
            metadata: None,
            created_at: at.fixed_offset(),
            updated_at: at.fixed_offset(),
        }
    }

    #[test]
    fn test_group_by_day_orders_and_averages() {
        let rows = vec![
            purchase(1, Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap(), dec!(10), dec!(0.5)),
            purchase(2, Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(), dec!(4), dec!(0.25)),
            purchase(3, Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap(), dec!(2), dec!(1.5)),
        ];

        let points = group_by_day(&rows);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(points[0].volume, dec!(1));
        assert_eq!(points[1].transaction_count, 2);
        assert_eq!(points[1].volume, dec!(8));
        assert_eq!(points[1].average_price, dec!(1));
    }

    #[test]
    fn test_group_by_day_empty() {
        assert!(group_by_day(&[]).is_empty());
    }
}
