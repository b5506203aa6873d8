//! Shared invariant checks for `ActiveModelBehavior::before_save` hooks.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue, DbErr, Value};

use crate::models::address::is_valid_wallet_address;

/// Prefix carried by every entity-level validation failure, so callers can
/// tell them apart from driver errors.
pub const CONSTRAINT_VIOLATION_PREFIX: &str = "constraint violation: ";

pub fn violation(message: impl std::fmt::Display) -> DbErr {
    DbErr::Custom(format!("{}{}", CONSTRAINT_VIOLATION_PREFIX, message))
}

/// The value a save would write, if the active model carries one.
pub fn current<T>(value: &ActiveValue<T>) -> Option<&T>
where
    T: Into<Value>,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
        ActiveValue::NotSet => None,
    }
}

pub fn check_address(field: &str, value: &ActiveValue<String>) -> Result<(), DbErr> {
    match current(value) {
        Some(address) if !is_valid_wallet_address(address) => Err(violation(format!(
            "{} must be a lowercase 0x-prefixed 40 hex character address",
            field
        ))),
        _ => Ok(()),
    }
}

pub fn check_non_negative(field: &str, value: &ActiveValue<Decimal>) -> Result<(), DbErr> {
    match current(value) {
        Some(v) if v.is_sign_negative() && !v.is_zero() => {
            Err(violation(format!("{} must not be negative", field)))
        }
        _ => Ok(()),
    }
}

pub fn check_percentage(field: &str, value: &ActiveValue<f64>) -> Result<(), DbErr> {
    match current(value) {
        Some(v) if !(0.0..=100.0).contains(v) => {
            Err(violation(format!("{} must be between 0 and 100", field)))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_check_address() {
        let good = ActiveValue::Set("0x00000000000000000000000000000000000000aa".to_string());
        assert!(check_address("owner", &good).is_ok());

        let upper = ActiveValue::Set("0x00000000000000000000000000000000000000AA".to_string());
        assert!(check_address("owner", &upper).is_err());

        assert!(check_address("owner", &ActiveValue::NotSet).is_ok());
    }

    #[test]
    fn test_check_non_negative() {
        assert!(check_non_negative("amount", &ActiveValue::Set(dec!(0))).is_ok());
        assert!(check_non_negative("amount", &ActiveValue::Set(dec!(-0.5))).is_err());
    }

    #[test]
    fn test_violation_is_tagged() {
        match violation("boom") {
            DbErr::Custom(msg) => assert!(msg.starts_with(CONSTRAINT_VIOLATION_PREFIX)),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
