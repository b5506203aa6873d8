//! Chain Gateway: the single point of contact with the ledger contract
//!
//! The trait is the seam the rest of the backend depends on. The production
//! implementation lives in `contract_gateway`; tests substitute a mock. A
//! gateway holds no business state: every read goes to the chain and every
//! write returns only after the transaction is mined (or has timed out).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::address::WalletAddress;

/// Failures surfaced by the ledger, classified for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("ledger node unavailable: {0}")]
    Unavailable(String),
    #[error("transaction not mined within {0:?}")]
    Timeout(Duration),
    #[error("contract call failed: {0}")]
    CallError(String),
    #[error("insufficient credit balance: {0}")]
    InsufficientBalance(String),
    #[error("insufficient payment: {0}")]
    InsufficientPayment(String),
    #[error("listing {0} is not active")]
    ListingInactive(u64),
    #[error("caller is not the seller of listing {0}")]
    NotListingOwner(u64),
}

/// One sell offer as held by the ledger contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: u64,
    pub seller: WalletAddress,
    pub amount: Decimal,
    pub price_per_credit: Decimal,
    pub active: bool,
    pub listing_date: DateTime<Utc>,
}

/// Mining details of a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinedTx {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReceipt {
    /// Id assigned by the contract, read from `CreditsListed`
    pub listing_id: u64,
    /// Contract address that now escrows the listed credits
    pub escrow_address: WalletAddress,
    pub tx: MinedTx,
}

/// Settlement as reported by the `CreditsPurchased` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub listing_id: u64,
    pub buyer: WalletAddress,
    pub seller: WalletAddress,
    pub amount: Decimal,
    pub total_price: Decimal,
    pub tx: MinedTx,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReceipt {
    pub listing_id: u64,
    pub tx: MinedTx,
}

/// Aggregate counters maintained by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_supply: Decimal,
    pub credits_issued: u64,
    pub transactions: u64,
    pub active_listings_count: u64,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Decimal credit balance of `address`.
    async fn get_balance(&self, address: &WalletAddress) -> Result<Decimal, ChainError>;

    /// Active listings in contract id order; inactive ids are dropped.
    async fn get_active_listings(&self) -> Result<Vec<Listing>, ChainError>;

    /// Every listing ever created by `address`, active or not.
    async fn get_user_listings(&self, address: &WalletAddress) -> Result<Vec<Listing>, ChainError>;

    async fn list_credits(
        &self,
        seller: &WalletAddress,
        amount: Decimal,
        price_per_credit: Decimal,
    ) -> Result<ListingReceipt, ChainError>;

    /// `total_price` is the value attached to the payable call.
    async fn purchase_credits(
        &self,
        buyer: &WalletAddress,
        listing_id: u64,
        total_price: Decimal,
    ) -> Result<PurchaseReceipt, ChainError>;

    async fn cancel_listing(
        &self,
        seller: &WalletAddress,
        listing_id: u64,
    ) -> Result<CancelReceipt, ChainError>;

    async fn get_platform_stats(&self) -> Result<PlatformStats, ChainError>;
}

/// Map a revert message onto the business-rule errors the contract raises.
///
/// `listing_id` is the listing the call targeted, if any; listing-specific
/// reverts without one fall back to `CallError`.
pub fn classify_revert(message: &str, listing_id: Option<u64>) -> ChainError {
    let lower = message.to_lowercase();

    if lower.contains("insufficient balance") {
        return ChainError::InsufficientBalance(message.to_string());
    }
    if lower.contains("insufficient payment") || lower.contains("incorrect payment") {
        return ChainError::InsufficientPayment(message.to_string());
    }
    if let Some(id) = listing_id {
        if lower.contains("not active") || lower.contains("inactive") {
            return ChainError::ListingInactive(id);
        }
        if lower.contains("not the seller")
            || lower.contains("only seller")
            || lower.contains("not listing owner")
        {
            return ChainError::NotListingOwner(id);
        }
    }

    ChainError::CallError(message.to_string())
}

/// Default wait for a submitted write to be mined.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(120);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_business_reverts() {
        assert_eq!(
            classify_revert("execution reverted: Insufficient balance", None),
            ChainError::InsufficientBalance("execution reverted: Insufficient balance".into())
        );
        assert_eq!(
            classify_revert("execution reverted: Listing not active", Some(7)),
            ChainError::ListingInactive(7)
        );
        assert_eq!(
            classify_revert("VM Exception: revert Not the seller", Some(3)),
            ChainError::NotListingOwner(3)
        );
        assert!(matches!(
            classify_revert("execution reverted: Insufficient payment", Some(1)),
            ChainError::InsufficientPayment(_)
        ));
    }

    #[test]
    fn test_listing_reverts_need_a_listing() {
        assert!(matches!(
            classify_revert("execution reverted: Listing not active", None),
            ChainError::CallError(_)
        ));
    }

    #[test]
    fn test_unknown_revert_is_call_error() {
        assert!(matches!(
            classify_revert("out of gas", Some(1)),
            ChainError::CallError(_)
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ChainError::ListingInactive(4).to_string(), "listing 4 is not active");
        assert!(ChainError::Timeout(Duration::from_secs(5))
            .to_string()
            .contains("not mined"));
    }
}
