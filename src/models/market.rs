use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::sea_orm_active_enums::{TransactionStatus, TransactionType};
use crate::entities::transactions;
use crate::models::address::WalletAddress;
use crate::services::chain_gateway::{Listing, MinedTx, PlatformStats};

/// Request body for POST /market/list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCreditsRequest {
    pub amount: Decimal,
    pub price_per_credit: Decimal,
}

/// Request body for POST /market/purchase/:listingId
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCreditsRequest {
    pub total_price: Decimal,
}

/// Outcome of the ledger-mirror step of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MirrorStatus {
    Mirrored {
        #[serde(rename = "transactionId")]
        transaction_id: i32,
    },
    Failed {
        reason: String,
    },
}

impl MirrorStatus {
    pub fn is_mirrored(&self) -> bool {
        matches!(self, MirrorStatus::Mirrored { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCreditsResponse {
    pub success: bool,
    pub listing_id: u64,
    pub amount: Decimal,
    pub price_per_credit: Decimal,
    #[serde(flatten)]
    pub tx: MinedTx,
    pub mirror: MirrorStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCreditsResponse {
    pub success: bool,
    pub listing_id: u64,
    pub buyer: WalletAddress,
    pub seller: WalletAddress,
    pub amount: Decimal,
    pub total_price: Decimal,
    #[serde(flatten)]
    pub tx: MinedTx,
    pub mirror: MirrorStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelListingResponse {
    pub success: bool,
    pub listing_id: u64,
    #[serde(flatten)]
    pub tx: MinedTx,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
    pub count: usize,
}

/// Mirrored transaction as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: i32,
    pub transaction_hash: Option<String>,
    pub from_address: String,
    pub to_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_username: Option<String>,
    pub amount: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub project_id: Option<String>,
    pub listing_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<transactions::Model> for TransactionView {
    fn from(tx: transactions::Model) -> Self {
        Self {
            id: tx.id,
            transaction_hash: tx.transaction_hash,
            from_address: tx.from_address,
            to_address: tx.to_address,
            from_username: None,
            to_username: None,
            amount: tx.amount,
            price: tx.price,
            total_value: tx.total_value,
            transaction_type: tx.transaction_type,
            status: tx.status,
            block_number: tx.block_number,
            gas_used: tx.gas_used,
            project_id: tx.project_id,
            listing_id: tx.listing_id,
            created_at: tx.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub platform_stats: PlatformStats,
    pub active_listings: usize,
    pub total_volume: Decimal,
    pub average_price: Decimal,
    pub completed_purchases: u64,
    pub recent_transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub wallet_address: WalletAddress,
    pub balance: Decimal,
    pub active_listings: Vec<Listing>,
    pub total_purchased: Decimal,
    pub total_sold: Decimal,
    pub net_performance: Decimal,
}

/// Trailing window for volume aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl Timeframe {
    pub fn window(self) -> Duration {
        match self {
            Timeframe::Day => Duration::hours(24),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
            Timeframe::Year => Duration::days(365),
        }
    }

    /// Start of the window ending at `now`.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
            Timeframe::Year => "1y",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Timeframe::Day),
            "7d" => Ok(Timeframe::Week),
            "30d" => Ok(Timeframe::Month),
            "1y" => Ok(Timeframe::Year),
            other => Err(format!(
                "Invalid timeframe '{}': expected one of 24h, 7d, 30d, 1y",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeQuery {
    pub timeframe: Option<Timeframe>,
}

/// One UTC calendar day of completed purchase activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumePoint {
    pub date: NaiveDate,
    pub volume: Decimal,
    pub transaction_count: u64,
    pub average_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub timeframe: Timeframe,
    pub data: Vec<VolumePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    Sent,
    Received,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde(rename = "type")]
    pub direction: Option<TransactionDirection>,
    pub limit: Option<u64>,
}

impl TransactionsQuery {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn validate(&self) -> Result<(TransactionDirection, u64), String> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {}", Self::MAX_LIMIT));
        }
        Ok((self.direction.unwrap_or_default(), limit))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionView>,
    pub count: usize,
}
