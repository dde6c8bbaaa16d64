//! Mathematical Utilities for the CDP Ledger
//!
//! Fixed-point prices, decimal normalization and the collateral-ratio
//! primitive shared by every entry check and by liquidation eligibility.
//!
//! ## Ratio pipeline
//!
//! ```text
//! collateral (asset decimals)
//!        │  scale to 8 decimals (floor on scale-down)
//!        ▼
//! normalized collateral ── × price.raw >> 32 ──► value (debt units)
//!                                                  │
//!                                                  ▼
//!                              ratio_bps = value * 10000 / debt
//! ```
//!
//! The inverse pipeline (`debt_to_collateral`) divides by the price first
//! and then rescales decimals the opposite way.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{bps::BPS_DENOMINATOR, fixed_point, oracle, token};
use crate::errors::{CdpError, CdpResult};

// ============ Fixed-Point Price ============

/// USD price of one base unit at 8-decimal normalization, expressed in
/// debt-token base units as a binary fixed-point fraction (denominator 2^32).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct FixedPointPrice {
    raw: u128,
}

impl FixedPointPrice {
    /// Wrap a raw fixed-point value
    pub const fn from_raw(raw: u128) -> Self {
        Self { raw }
    }

    /// Price of one whole asset unit quoted in 8-decimal USD.
    ///
    /// `1_0000_0000` ($1.00) maps to exactly 1.0, i.e. one normalized
    /// collateral unit is worth one debt base unit.
    pub fn from_usd(price_usd: u64) -> CdpResult<Self> {
        if price_usd == 0 || price_usd > oracle::MAX_PRICE_USD {
            return Err(CdpError::InvalidPrice { price: price_usd });
        }
        let raw = (price_usd as u128)
            .checked_mul(fixed_point::ONE_RAW)
            .ok_or(CdpError::Overflow)?
            / oracle::USD_ONE as u128;
        if raw == 0 {
            return Err(CdpError::InvalidPrice { price: price_usd });
        }
        Ok(Self { raw })
    }

    /// Raw fixed-point value
    pub const fn raw(&self) -> u128 {
        self.raw
    }

    /// Returns true for a zero price
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }
}

// ============ Decimal Normalization ============

/// 10^exp as u128
pub fn pow10(exp: u32) -> CdpResult<u128> {
    10u128.checked_pow(exp).ok_or(CdpError::Overflow)
}

/// Scale an asset amount to the debt token's decimal precision.
///
/// Scales up when the asset has fewer decimals, down (floor) when it has more.
pub fn normalize_to_debt_decimals(
    amount: u64,
    asset_decimals: u8,
    debt_decimals: u8,
) -> CdpResult<u128> {
    let amount = amount as u128;
    if asset_decimals < debt_decimals {
        amount
            .checked_mul(pow10((debt_decimals - asset_decimals) as u32)?)
            .ok_or(CdpError::Overflow)
    } else {
        Ok(amount / pow10((asset_decimals - debt_decimals) as u32)?)
    }
}

/// Inverse of [`normalize_to_debt_decimals`]: scale a debt-decimal amount
/// back to the asset's base unit.
pub fn denormalize_from_debt_decimals(
    amount: u128,
    asset_decimals: u8,
    debt_decimals: u8,
) -> CdpResult<u128> {
    if asset_decimals < debt_decimals {
        Ok(amount / pow10((debt_decimals - asset_decimals) as u32)?)
    } else {
        amount
            .checked_mul(pow10((asset_decimals - debt_decimals) as u32)?)
            .ok_or(CdpError::Overflow)
    }
}

// ============ Collateral Ratio ============

/// Value of `collateral_amount` in debt-token base units (widened)
pub fn collateral_value_wide(
    collateral_amount: u64,
    asset_decimals: u8,
    price: FixedPointPrice,
) -> CdpResult<u128> {
    let normalized = normalize_to_debt_decimals(collateral_amount, asset_decimals, token::DECIMALS)?;
    let scaled = normalized
        .checked_mul(price.raw())
        .ok_or(CdpError::Overflow)?;
    Ok(scaled >> fixed_point::FRACTIONAL_BITS)
}

/// Value of `collateral_amount` in debt-token base units
pub fn collateral_value(
    collateral_amount: u64,
    asset_decimals: u8,
    price: FixedPointPrice,
) -> CdpResult<u64> {
    let value = collateral_value_wide(collateral_amount, asset_decimals, price)?;
    u64::try_from(value).map_err(|_| CdpError::Overflow)
}

/// Individual collateral ratio in basis points
///
/// ratio_bps = floor(value * 10000 / debt). Zero debt yields `u64::MAX`.
pub fn collateral_ratio_bps(
    collateral_amount: u64,
    debt_amount: u64,
    asset_decimals: u8,
    price: FixedPointPrice,
) -> CdpResult<u64> {
    if debt_amount == 0 {
        return Ok(u64::MAX);
    }

    let value = collateral_value_wide(collateral_amount, asset_decimals, price)?;
    let ratio = value
        .checked_mul(BPS_DENOMINATOR as u128)
        .ok_or(CdpError::Overflow)?
        / debt_amount as u128;

    Ok(ratio.min(u64::MAX as u128) as u64)
}

/// Require `ratio_bps >= mcr_bps`. Skipped when `debt_amount == 0`.
pub fn check_collateral_ratio(
    collateral_amount: u64,
    debt_amount: u64,
    asset_decimals: u8,
    price: FixedPointPrice,
    mcr_bps: u64,
) -> CdpResult<()> {
    if debt_amount == 0 {
        return Ok(());
    }

    let ratio_bps = collateral_ratio_bps(collateral_amount, debt_amount, asset_decimals, price)?;
    if ratio_bps < mcr_bps {
        return Err(CdpError::InsufficientCollateral {
            ratio_bps,
            required_bps: mcr_bps,
        });
    }
    Ok(())
}

/// Convert a debt-token amount into collateral base units at `price`
pub fn debt_to_collateral(
    debt_amount: u64,
    asset_decimals: u8,
    price: FixedPointPrice,
) -> CdpResult<u64> {
    if price.is_zero() {
        return Err(CdpError::DivisionByZero);
    }

    let normalized = ((debt_amount as u128) << fixed_point::FRACTIONAL_BITS) / price.raw();
    let collateral = denormalize_from_debt_decimals(normalized, asset_decimals, token::DECIMALS)?;
    u64::try_from(collateral).map_err(|_| CdpError::Overflow)
}

// ============ Scalar Helpers ============

/// floor(a * b / c) with a widened intermediate
pub fn mul_div_floor(a: u64, b: u64, c: u64) -> CdpResult<u64> {
    if c == 0 {
        return Err(CdpError::DivisionByZero);
    }
    let result = (a as u128)
        .checked_mul(b as u128)
        .ok_or(CdpError::Overflow)?
        / c as u128;
    u64::try_from(result).map_err(|_| CdpError::Overflow)
}

/// floor(amount * bps / 10000)
pub fn bps_of(amount: u64, bps: u64) -> CdpResult<u64> {
    mul_div_floor(amount, bps, BPS_DENOMINATOR)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> CdpResult<u64> {
    a.checked_add(b).ok_or(CdpError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> CdpResult<u64> {
    a.checked_sub(b).ok_or(CdpError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD_1: u64 = 100_000_000;

    fn one_dollar() -> FixedPointPrice {
        FixedPointPrice::from_usd(USD_1).unwrap()
    }

    #[test]
    fn test_one_dollar_is_unity() {
        assert_eq!(one_dollar().raw(), fixed_point::ONE_RAW);
        assert_eq!(collateral_value(1_320, 8, one_dollar()).unwrap(), 1_320);
    }

    #[test]
    fn test_ratio_matches_open_example() {
        // 1320 collateral against 1015 debt at $1 = 13004 bps
        let ratio = collateral_ratio_bps(1_320, 1_015, 8, one_dollar()).unwrap();
        assert_eq!(ratio, 13_004);
        assert!(check_collateral_ratio(1_320, 1_015, 8, one_dollar(), 12_000).is_ok());
    }

    #[test]
    fn test_ratio_below_mcr() {
        let result = check_collateral_ratio(1_200, 1_015, 8, one_dollar(), 12_000);
        assert_eq!(
            result,
            Err(CdpError::InsufficientCollateral { ratio_bps: 11_822, required_bps: 12_000 })
        );
    }

    #[test]
    fn test_zero_debt_skips_check() {
        assert_eq!(collateral_ratio_bps(0, 0, 8, one_dollar()).unwrap(), u64::MAX);
        assert!(check_collateral_ratio(0, 0, 8, one_dollar(), 12_000).is_ok());
    }

    #[test]
    fn test_normalization_scales_both_ways() {
        // 6-decimal asset: 1.0 = 1_000_000 -> 100_000_000
        assert_eq!(normalize_to_debt_decimals(1_000_000, 6, 8).unwrap(), 100_000_000);
        // 18-decimal asset: floor on scale-down
        assert_eq!(
            normalize_to_debt_decimals(1_000_000_000_999_999_999, 18, 8).unwrap(),
            100_000_000
        );
        assert_eq!(denormalize_from_debt_decimals(100_000_000, 6, 8).unwrap(), 1_000_000);
        assert_eq!(
            denormalize_from_debt_decimals(100_000_000, 18, 8).unwrap(),
            1_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_value_with_mixed_decimals() {
        // 1 ETH (18 decimals) at $2,000 = 2,000 dUSD
        let price = FixedPointPrice::from_usd(2_000 * USD_1).unwrap();
        let value = collateral_value(1_000_000_000_000_000_000, 18, price).unwrap();
        assert_eq!(value, 2_000 * token::ONE);

        // 1 USDC (6 decimals) at $1 = 1 dUSD
        let value = collateral_value(1_000_000, 6, one_dollar()).unwrap();
        assert_eq!(value, token::ONE);
    }

    #[test]
    fn test_debt_to_collateral_inverse() {
        let price = FixedPointPrice::from_usd(2_000 * USD_1).unwrap();
        // 1,000 dUSD buys 0.5 ETH
        let collateral = debt_to_collateral(1_000 * token::ONE, 18, price).unwrap();
        assert_eq!(collateral, 500_000_000_000_000_000);

        // 6-decimal asset rounds down
        let collateral = debt_to_collateral(150, 6, one_dollar()).unwrap();
        assert_eq!(collateral, 1);
    }

    #[test]
    fn test_round_trip_never_gains() {
        let price = FixedPointPrice::from_usd(30_000_000).unwrap(); // $0.30
        for collateral in [1u64, 7, 999, 123_456_789] {
            let value = collateral_value(collateral, 8, price).unwrap();
            let back = debt_to_collateral(value, 8, price).unwrap();
            assert!(back <= collateral);
        }
    }

    #[test]
    fn test_invalid_prices() {
        assert_eq!(FixedPointPrice::from_usd(0), Err(CdpError::InvalidPrice { price: 0 }));
        assert!(FixedPointPrice::from_usd(oracle::MAX_PRICE_USD).is_ok());
        assert!(FixedPointPrice::from_usd(oracle::MAX_PRICE_USD + 1).is_err());
    }

    #[test]
    fn test_overflow_is_error() {
        let price = FixedPointPrice::from_usd(oracle::MAX_PRICE_USD).unwrap();
        // Value exceeds u64 in debt units
        assert_eq!(collateral_value(u64::MAX, 8, price), Err(CdpError::Overflow));
        assert_eq!(mul_div_floor(u64::MAX, 2, 1), Err(CdpError::Overflow));
        assert_eq!(mul_div_floor(1, 1, 0), Err(CdpError::DivisionByZero));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(1_000, 50).unwrap(), 5);
        assert_eq!(bps_of(199, 50).unwrap(), 0);
    }
}
