//! Reconciliation Flow: one chain write followed by one Ledger Store mirror
//!
//! The chain is the source of truth. A write that was mined is always
//! reported as successful; if the mirror insert then fails the outcome
//! carries `MirrorStatus::Failed` and an error-level log line tagged
//! `mirror_failed = true` for out-of-band reconciliation. The mirror step is
//! never retried here.

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::entities::sea_orm_active_enums::{TransactionStatus, TransactionType};
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::market::MirrorStatus;
use crate::services::chain_gateway::{
    CancelReceipt, ChainGateway, ListingReceipt, MinedTx, PurchaseReceipt,
};
use crate::services::transaction_store::{self, NewTransaction};

/// Progress of a single write attempt.
///
/// `Validated -> ChainSubmitted -> ChainMined -> StoreMirrored`, with
/// `ChainFailed` and `MirrorFailed` as the two failure exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Validated,
    ChainSubmitted,
    ChainMined,
    StoreMirrored,
    ChainFailed,
    MirrorFailed,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStage::Validated => "validated",
            WriteStage::ChainSubmitted => "chain_submitted",
            WriteStage::ChainMined => "chain_mined",
            WriteStage::StoreMirrored => "store_mirrored",
            WriteStage::ChainFailed => "chain_failed",
            WriteStage::MirrorFailed => "mirror_failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub receipt: ListingReceipt,
    pub amount: Decimal,
    pub price_per_credit: Decimal,
    pub mirror: MirrorStatus,
    pub stage: WriteStage,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub receipt: PurchaseReceipt,
    pub mirror: MirrorStatus,
    pub stage: WriteStage,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub receipt: CancelReceipt,
    pub stage: WriteStage,
}

#[derive(Clone)]
pub struct ReconciliationFlow {
    gateway: Arc<dyn ChainGateway>,
    db: DatabaseConnection,
}

impl ReconciliationFlow {
    pub fn new(gateway: Arc<dyn ChainGateway>, db: DatabaseConnection) -> Self {
        Self { gateway, db }
    }

    /// List credits for sale and mirror the escrow transfer.
    ///
    /// # Errors
    ///
    /// `InvalidInput` before any chain call if `amount` or `price_per_credit`
    /// is not positive; otherwise the gateway's error, untouched.
    pub async fn list_credits(
        &self,
        seller: &WalletAddress,
        amount: Decimal,
        price_per_credit: Decimal,
    ) -> Result<ListOutcome, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("amount must be greater than 0".to_string()));
        }
        if price_per_credit <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "pricePerCredit must be greater than 0".to_string(),
            ));
        }
        debug!(stage = %WriteStage::Validated, seller = %seller, %amount, %price_per_credit, "List request validated");

        info!(stage = %WriteStage::ChainSubmitted, seller = %seller, %amount, %price_per_credit, "Submitting listCredits");
        let receipt = self
            .gateway
            .list_credits(seller, amount, price_per_credit)
            .await
            .map_err(|e| {
                warn!(stage = %WriteStage::ChainFailed, seller = %seller, error = %e, "listCredits failed");
                AppError::from(e)
            })?;
        info!(
            stage = %WriteStage::ChainMined,
            listing_id = receipt.listing_id,
            tx_hash = %receipt.tx.tx_hash,
            "Listing mined"
        );

        let mirror = self
            .mirror(
                NewTransaction {
                    from_address: seller.clone(),
                    to_address: receipt.escrow_address.clone(),
                    amount,
                    price: price_per_credit,
                    transaction_type: TransactionType::Transfer,
                    status: TransactionStatus::Completed,
                    mined: Some(receipt.tx.clone()),
                    project_id: None,
                    listing_id: Some(receipt.listing_id),
                    metadata: Some(json!({ "action": "list" })),
                },
                receipt.listing_id,
                &receipt.tx,
            )
            .await;

        Ok(ListOutcome {
            stage: stage_of(&mirror),
            receipt,
            amount,
            price_per_credit,
            mirror,
        })
    }

    /// Buy a listing outright and mirror the settlement read from the event.
    ///
    /// # Errors
    ///
    /// `InvalidInput` before any chain call if `total_price` is not positive;
    /// otherwise the gateway's error, untouched.
    pub async fn purchase_credits(
        &self,
        buyer: &WalletAddress,
        listing_id: u64,
        total_price: Decimal,
    ) -> Result<PurchaseOutcome, AppError> {
        if total_price <= Decimal::ZERO {
            return Err(AppError::InvalidInput("totalPrice must be greater than 0".to_string()));
        }
        debug!(stage = %WriteStage::Validated, buyer = %buyer, listing_id, %total_price, "Purchase request validated");

        info!(stage = %WriteStage::ChainSubmitted, buyer = %buyer, listing_id, "Submitting purchaseCredits");
        let receipt = self
            .gateway
            .purchase_credits(buyer, listing_id, total_price)
            .await
            .map_err(|e| {
                warn!(stage = %WriteStage::ChainFailed, listing_id, error = %e, "purchaseCredits failed");
                AppError::from(e)
            })?;
        info!(
            stage = %WriteStage::ChainMined,
            listing_id,
            tx_hash = %receipt.tx.tx_hash,
            amount = %receipt.amount,
            total_price = %receipt.total_price,
            "Purchase mined"
        );

        if &receipt.buyer != buyer {
            warn!(
                listing_id,
                requested_by = %buyer,
                event_buyer = %receipt.buyer,
                "Buyer in CreditsPurchased differs from caller; recording the event's"
            );
        }

        let mirror = self
            .mirror(
                NewTransaction {
                    from_address: receipt.seller.clone(),
                    to_address: receipt.buyer.clone(),
                    amount: receipt.amount,
                    price: unit_price(receipt.total_price, receipt.amount),
                    transaction_type: TransactionType::Purchase,
                    status: TransactionStatus::Completed,
                    mined: Some(receipt.tx.clone()),
                    project_id: None,
                    listing_id: Some(receipt.listing_id),
                    metadata: Some(json!({
                        "action": "purchase",
                        "totalPrice": receipt.total_price.to_string(),
                    })),
                },
                listing_id,
                &receipt.tx,
            )
            .await;

        Ok(PurchaseOutcome {
            stage: stage_of(&mirror),
            receipt,
            mirror,
        })
    }

    /// Cancel the seller's own listing. Nothing is mirrored.
    pub async fn cancel_listing(
        &self,
        seller: &WalletAddress,
        listing_id: u64,
    ) -> Result<CancelOutcome, AppError> {
        info!(stage = %WriteStage::ChainSubmitted, seller = %seller, listing_id, "Submitting cancelListing");
        let receipt = self
            .gateway
            .cancel_listing(seller, listing_id)
            .await
            .map_err(|e| {
                warn!(stage = %WriteStage::ChainFailed, listing_id, error = %e, "cancelListing failed");
                AppError::from(e)
            })?;
        info!(stage = %WriteStage::ChainMined, listing_id, tx_hash = %receipt.tx.tx_hash, "Listing cancelled");

        Ok(CancelOutcome {
            receipt,
            stage: WriteStage::ChainMined,
        })
    }

    async fn mirror(&self, row: NewTransaction, listing_id: u64, tx: &MinedTx) -> MirrorStatus {
        match transaction_store::insert(&self.db, row).await {
            Ok(model) => {
                info!(
                    stage = %WriteStage::StoreMirrored,
                    listing_id,
                    tx_hash = %tx.tx_hash,
                    transaction_id = model.id,
                    "Ledger mirror written"
                );
                MirrorStatus::Mirrored {
                    transaction_id: model.id,
                }
            }
            Err(e) => {
                error!(
                    stage = %WriteStage::MirrorFailed,
                    mirror_failed = true,
                    listing_id,
                    tx_hash = %tx.tx_hash,
                    block_number = ?tx.block_number,
                    error = %e,
                    "Chain write succeeded but ledger mirror failed; reconcile out-of-band"
                );
                MirrorStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn stage_of(mirror: &MirrorStatus) -> WriteStage {
    if mirror.is_mirrored() {
        WriteStage::StoreMirrored
    } else {
        WriteStage::MirrorFailed
    }
}

/// Per-credit price actually settled; zero when nothing was transferred.
fn unit_price(total_price: Decimal, amount: Decimal) -> Decimal {
    if amount.is_zero() {
        return Decimal::ZERO;
    }
    total_price
        .checked_div(amount)
        .map(|p| p.normalize())
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unit_price() {
        assert_eq!(unit_price(dec!(1.0), dec!(100)), dec!(0.01));
        assert_eq!(unit_price(dec!(5), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(WriteStage::MirrorFailed.to_string(), "mirror_failed");
        assert_eq!(WriteStage::ChainSubmitted.to_string(), "chain_submitted");
    }

    #[test]
    fn test_stage_follows_mirror() {
        assert_eq!(
            stage_of(&MirrorStatus::Mirrored { transaction_id: 1 }),
            WriteStage::StoreMirrored
        );
        assert_eq!(
            stage_of(&MirrorStatus::Failed { reason: "x".into() }),
            WriteStage::MirrorFailed
        );
    }
}
