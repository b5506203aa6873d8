//! SeaORM Entity for the off-chain transaction mirror
//!
//! `total_value` is never trusted from the caller: it is recomputed from
//! `amount * price` on every save, reading the stored side when an update
//! changes only one of them.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use super::checks::{check_address, check_non_negative, current, violation};
use super::sea_orm_active_enums::{TransactionStatus, TransactionType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// On-chain hash; None while pending
    #[sea_orm(unique)]
    pub transaction_hash: Option<String>,
    pub from_address: String,
    pub to_address: String,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub total_value: Decimal,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub project_id: Option<String>,
    /// Ledger listing this row mirrors, for list/purchase events
    pub listing_id: Option<i64>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

fn is_valid_tx_hash(hash: &str) -> bool {
    hash.len() == 66
        && hash.starts_with("0x")
        && hash[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Row as currently stored, for updates that carry only one side of `amount * price`.
async fn stored_row<C>(db: &C, id: &ActiveValue<i32>) -> Result<Model, DbErr>
where
    C: ConnectionTrait,
{
    let id = *current(id).ok_or_else(|| violation("partial amount/price update requires the row id"))?;
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("transaction {}", id)))
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        check_address("from_address", &self.from_address)?;
        check_address("to_address", &self.to_address)?;
        check_non_negative("amount", &self.amount)?;
        check_non_negative("price", &self.price)?;

        if let Some(Some(hash)) = current(&self.transaction_hash) {
            if !is_valid_tx_hash(hash) {
                return Err(violation("transaction_hash must be 0x followed by 64 hex characters"));
            }
        }

        let pair = match (current(&self.amount).copied(), current(&self.price).copied()) {
            (Some(amount), Some(price)) => Some((amount, price)),
            _ if insert => return Err(violation("amount and price are required")),
            (None, None) => None,
            (amount, price) => {
                let stored = stored_row(db, &self.id).await?;
                Some((amount.unwrap_or(stored.amount), price.unwrap_or(stored.price)))
            }
        };

        match pair {
            Some((amount, price)) => {
                let total = amount
                    .checked_mul(price)
                    .ok_or_else(|| violation("amount * price overflows"))?;
                self.total_value = Set(total.normalize());
            }
            None if self.total_value.is_set() => {
                return Err(violation("total_value is derived and cannot be set directly"));
            }
            None => {}
        }

        let now = Utc::now().fixed_offset();
        if insert && current(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_format() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(is_valid_tx_hash(&hash));
        assert!(!is_valid_tx_hash("0xabc"));
        assert!(!is_valid_tx_hash(&format!("0x{}", "zz".repeat(32))));
    }
}
