//! Conversion between ledger base units (18-decimal integers) and decimals
//!
//! The ledger contract stores credits and ETH prices as `uint256` in the
//! smallest denomination. Everything above the Chain Gateway works with
//! `rust_decimal::Decimal`; these helpers are the only place the two meet.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Decimals used by both the credit token and ETH
pub const BASE_UNIT_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("negative amount {0} cannot be expressed in base units")]
    Negative(Decimal),
    #[error("base unit value {0} is too large to represent as a decimal")]
    OutOfRange(U256),
}

/// Decimal amount to base units. Digits beyond 18 decimal places are
/// truncated toward zero, matching `toWei` on a pre-rounded input.
pub fn to_base_units(amount: Decimal) -> Result<U256, UnitError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitError::Negative(amount));
    }

    let truncated = amount.trunc_with_scale(BASE_UNIT_DECIMALS);
    let mantissa = truncated.mantissa().unsigned_abs();
    let exponent = BASE_UNIT_DECIMALS - truncated.scale();

    Ok(U256::from(mantissa) * U256::from(10u64).pow(U256::from(exponent)))
}

/// Base units to a normalized decimal amount.
pub fn from_base_units(value: U256) -> Result<Decimal, UnitError> {
    let as_i128: i128 = i128::try_from(value).map_err(|_| UnitError::OutOfRange(value))?;
    Decimal::try_from_i128_with_scale(as_i128, BASE_UNIT_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| UnitError::OutOfRange(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_and_fractional_amounts() {
        assert_eq!(
            to_base_units(dec!(100)).unwrap(),
            U256::from(100_000_000_000_000_000_000u128)
        );
        assert_eq!(
            to_base_units(dec!(0.01)).unwrap(),
            U256::from(10_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units(Decimal::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_from_base_units_normalizes() {
        let price = from_base_units(U256::from(10_000_000_000_000_000u128)).unwrap();
        assert_eq!(price, dec!(0.01));
        assert_eq!(price.to_string(), "0.01");

        let whole = from_base_units(U256::from(2_500_000_000_000_000_000u128)).unwrap();
        assert_eq!(whole.to_string(), "2.5");
    }

    #[test]
    fn test_precision_beyond_18_places_is_truncated() {
        let tiny = dec!(0.0000000000000000019);
        assert_eq!(to_base_units(tiny).unwrap(), U256::from(1u8));
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(
            to_base_units(dec!(-1)),
            Err(UnitError::Negative(dec!(-1)))
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            from_base_units(U256::MAX),
            Err(UnitError::OutOfRange(_))
        ));
    }
}
