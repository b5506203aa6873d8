//! Ledger Store operations for mirrored transactions
//!
//! Every write goes through the entity's `before_save`, so `total_value` is
//! always recomputed from `amount * price` here as well.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::entities::sea_orm_active_enums::{TransactionStatus, TransactionType};
use crate::entities::transactions::{self, Entity as Transactions};
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::market::TransactionDirection;
use crate::services::chain_gateway::MinedTx;

/// Fields of a transaction row before it is persisted.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub from_address: WalletAddress,
    pub to_address: WalletAddress,
    pub amount: Decimal,
    pub price: Decimal,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub mined: Option<MinedTx>,
    pub project_id: Option<String>,
    pub listing_id: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

/// Chain counters are u64; the columns are BIGINT.
fn to_column(field: &str, value: u64) -> Result<i64, DbErr> {
    i64::try_from(value)
        .map_err(|_| DbErr::Type(format!("{} {} does not fit a BIGINT column", field, value)))
}

pub async fn insert<C>(db: &C, new: NewTransaction) -> Result<transactions::Model, DbErr>
where
    C: ConnectionTrait,
{
    let (hash, block_number, gas_used) = match new.mined {
        Some(tx) => (
            Some(tx.tx_hash),
            tx.block_number.map(|b| to_column("block_number", b)).transpose()?,
            Some(to_column("gas_used", tx.gas_used)?),
        ),
        None => (None, None, None),
    };
    let listing_id = new
        .listing_id
        .map(|id| to_column("listing_id", id))
        .transpose()?;

    let row = transactions::ActiveModel {
        transaction_hash: Set(hash),
        from_address: Set(new.from_address.into()),
        to_address: Set(new.to_address.into()),
        amount: Set(new.amount),
        price: Set(new.price),
        transaction_type: Set(new.transaction_type),
        status: Set(new.status),
        block_number: Set(block_number),
        gas_used: Set(gas_used),
        project_id: Set(new.project_id),
        listing_id: Set(listing_id),
        metadata: Set(new.metadata),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(
        id = row.id,
        tx_type = ?row.transaction_type,
        total_value = %row.total_value,
        "Transaction row inserted"
    );
    Ok(row)
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<transactions::Model>, DbErr> {
    Transactions::find_by_id(id).one(db).await
}

pub async fn find_by_hash(
    db: &DatabaseConnection,
    tx_hash: &str,
) -> Result<Option<transactions::Model>, DbErr> {
    Transactions::find()
        .filter(transactions::Column::TransactionHash.eq(tx_hash.to_lowercase()))
        .one(db)
        .await
}

/// Move a pending row to its settled status, recording mining details if known.
///
/// # Errors
///
/// `NotFound` for an unknown id, `StoreConstraintViolation` if the row is
/// already in a terminal status.
pub async fn transition_status(
    db: &DatabaseConnection,
    id: i32,
    next: TransactionStatus,
    mined: Option<MinedTx>,
) -> Result<transactions::Model, AppError> {
    let row = find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

    if !row.status.can_transition_to(next) {
        return Err(AppError::StoreConstraintViolation(format!(
            "transaction {} cannot move from {:?} to {:?}",
            id, row.status, next
        )));
    }

    let previous = row.status;
    let mut active = row.into_active_model();
    active.status = Set(next);
    if let Some(tx) = mined {
        active.transaction_hash = Set(Some(tx.tx_hash));
        active.block_number = Set(tx.block_number.map(|b| to_column("block_number", b)).transpose()?);
        active.gas_used = Set(Some(to_column("gas_used", tx.gas_used)?));
    }

    let updated = active.update(db).await?;
    info!(id, from = ?previous, to = ?next, "Transaction status updated");
    Ok(updated)
}

/// Sum, count and summed unit price of completed purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeTotals {
    pub volume: Decimal,
    pub count: u64,
    pub price_sum: Decimal,
}

impl VolumeTotals {
    /// Mean per-credit price across the purchases.
    pub fn average_price(&self) -> Decimal {
        if self.count == 0 {
            Decimal::ZERO
        } else {
            (self.price_sum / Decimal::from(self.count)).normalize()
        }
    }
}

fn completed_purchases() -> Condition {
    Condition::all()
        .add(transactions::Column::TransactionType.eq(TransactionType::Purchase))
        .add(transactions::Column::Status.eq(TransactionStatus::Completed))
}

/// Rows where `wallet` is the sender (`from`), the receiver (`to`), or either.
fn party(wallet: &WalletAddress, direction: TransactionDirection) -> Condition {
    let address = wallet.as_str();
    match direction {
        TransactionDirection::Sent => {
            Condition::all().add(transactions::Column::FromAddress.eq(address))
        }
        TransactionDirection::Received => {
            Condition::all().add(transactions::Column::ToAddress.eq(address))
        }
        TransactionDirection::All => Condition::any()
            .add(transactions::Column::FromAddress.eq(address))
            .add(transactions::Column::ToAddress.eq(address)),
    }
}

async fn volume_totals(
    db: &DatabaseConnection,
    condition: Condition,
) -> Result<VolumeTotals, DbErr> {
    let totals: Option<(Option<Decimal>, i64, Option<Decimal>)> = Transactions::find()
        .select_only()
        .column_as(transactions::Column::TotalValue.sum(), "volume")
        .column_as(transactions::Column::Id.count(), "count")
        .column_as(transactions::Column::Price.sum(), "price_sum")
        .filter(condition)
        .into_tuple()
        .one(db)
        .await?;

    Ok(match totals {
        Some((volume, count, price_sum)) => VolumeTotals {
            volume: volume.unwrap_or_default().normalize(),
            count: count.max(0) as u64,
            price_sum: price_sum.unwrap_or_default(),
        },
        None => VolumeTotals::default(),
    })
}

pub async fn purchase_totals(db: &DatabaseConnection) -> Result<VolumeTotals, DbErr> {
    volume_totals(db, completed_purchases()).await
}

/// Completed purchases where `wallet` bought (`Received`), sold (`Sent`) or either.
pub async fn purchase_totals_for(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
    direction: TransactionDirection,
) -> Result<VolumeTotals, DbErr> {
    volume_totals(db, completed_purchases().add(party(wallet, direction))).await
}

/// Completed purchases created at or after `since`, oldest first.
pub async fn purchases_since(
    db: &DatabaseConnection,
    since: DateTime<Utc>,
    wallet: Option<&WalletAddress>,
) -> Result<Vec<transactions::Model>, DbErr> {
    let mut query = Transactions::find()
        .filter(completed_purchases())
        .filter(transactions::Column::CreatedAt.gte(since.fixed_offset()));

    if let Some(wallet) = wallet {
        query = query.filter(party(wallet, TransactionDirection::All));
    }

    query
        .order_by_asc(transactions::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn recent_completed(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<transactions::Model>, DbErr> {
    Transactions::find()
        .filter(transactions::Column::Status.eq(TransactionStatus::Completed))
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// The wallet's completed transactions, newest first; `None` returns all of them.
pub async fn for_wallet(
    db: &DatabaseConnection,
    wallet: &WalletAddress,
    direction: TransactionDirection,
    limit: Option<u64>,
) -> Result<Vec<transactions::Model>, DbErr> {
    Transactions::find()
        .filter(transactions::Column::Status.eq(TransactionStatus::Completed))
        .filter(party(wallet, direction))
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Completed purchase volume per wallet, counting both buyer and seller side.
pub async fn purchase_volume_by_wallet(
    db: &DatabaseConnection,
) -> Result<HashMap<String, Decimal>, DbErr> {
    let rows: Vec<(String, String, Decimal)> = Transactions::find()
        .select_only()
        .column(transactions::Column::FromAddress)
        .column(transactions::Column::ToAddress)
        .column(transactions::Column::TotalValue)
        .filter(completed_purchases())
        .into_tuple()
        .all(db)
        .await?;

    let mut volumes: HashMap<String, Decimal> = HashMap::new();
    for (from, to, value) in rows {
        if from != to {
            *volumes.entry(to).or_default() += value;
        }
        *volumes.entry(from).or_default() += value;
    }
    Ok(volumes)
}

pub async fn count_completed_since(
    db: &DatabaseConnection,
    since: DateTime<Utc>,
) -> Result<u64, DbErr> {
    Transactions::find()
        .filter(transactions::Column::Status.eq(TransactionStatus::Completed))
        .filter(transactions::Column::CreatedAt.gte(since.fixed_offset()))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_chain_counters_beyond_bigint_are_rejected() {
        assert_eq!(to_column("gas_used", 21_000).unwrap(), 21_000);
        assert_eq!(to_column("block_number", i64::MAX as u64).unwrap(), i64::MAX);
        assert!(matches!(to_column("listing_id", u64::MAX), Err(DbErr::Type(_))));
    }

    #[test]
    fn test_average_of_empty_totals_is_zero() {
        assert_eq!(VolumeTotals::default().average_price(), Decimal::ZERO);
    }

    #[test]
    fn test_average_price() {
        let totals = VolumeTotals {
            volume: dec!(30),
            count: 4,
            price_sum: dec!(3),
        };
        assert_eq!(totals.average_price(), dec!(0.75));
    }
}
