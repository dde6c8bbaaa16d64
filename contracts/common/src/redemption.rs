//! Redemption Calculator
//!
//! Pure computation of a redemption against a single provider's trove:
//! how much debt is actually redeemed, the collateral it buys at oracle
//! price, and the fee/gratuity split.
//!
//! ## Sizing rules
//!
//! - `max_redeemable = debt - liquidation_reserve`; requests at or above it
//!   redeem exactly `max_redeemable` and close the trove.
//! - Otherwise a request that would leave less than
//!   `minimum_debt + liquidation_reserve` is truncated so that exactly that
//!   floor remains.

use crate::{
    errors::{CdpError, CdpResult},
    math::{bps_of, debt_to_collateral, safe_add, safe_sub},
    types::{CollateralConfig, CollateralPosition},
    FixedPointPrice,
};

/// Redemption parameters of one collateral type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionParams {
    /// Collateral asset decimals
    pub asset_decimals: u8,
    /// Minimum debt of an open trove (excluding reserve)
    pub minimum_debt: u64,
    /// Liquidation reserve carried by the trove
    pub liquidation_reserve: u64,
    /// Fee to the protocol fee collector
    pub redemption_fee_bps: u64,
    /// Gratuity to the provider
    pub redemption_fee_gratuity_bps: u64,
}

impl From<&CollateralConfig> for RedemptionParams {
    fn from(config: &CollateralConfig) -> Self {
        Self {
            asset_decimals: config.decimals,
            minimum_debt: config.minimum_debt,
            liquidation_reserve: config.liquidation_reserve,
            redemption_fee_bps: config.redemption_fee_bps,
            redemption_fee_gratuity_bps: config.redemption_fee_gratuity_bps,
        }
    }
}

/// Result of a redemption calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionQuote {
    /// Debt token burned from the redeemer
    pub debt_redeemed: u64,
    /// Collateral bought at oracle price (before fees)
    pub collateral_redeemed: u64,
    /// Fee to the protocol fee collector
    pub redemption_fee: u64,
    /// Gratuity to the provider
    pub gratuity_fee: u64,
    /// Collateral paid to the redeemer
    pub collateral_to_redeemer: u64,
    /// Whether the trove is closed by this redemption
    pub closes_position: bool,
    /// Reserve burned from the reserve holder (closing path only)
    pub reserve_burned: u64,
    /// Leftover collateral refunded to the provider (closing path only)
    pub residual_collateral: u64,
    /// Collateral left in the trove
    pub remaining_collateral: u64,
    /// Debt left in the trove
    pub remaining_debt: u64,
}

/// Debt actually redeemed for `requested`, and whether it closes the trove
pub fn redeemable_amount(
    debt_amount: u64,
    requested: u64,
    params: &RedemptionParams,
) -> CdpResult<(u64, bool)> {
    let max_redeemable = safe_sub(debt_amount, params.liquidation_reserve)?;
    if requested >= max_redeemable {
        return Ok((max_redeemable, true));
    }

    let floor = safe_add(params.minimum_debt, params.liquidation_reserve)?;
    if debt_amount - requested < floor {
        return Ok((safe_sub(debt_amount, floor)?, false));
    }
    Ok((requested, false))
}

/// Calculate a redemption of `requested` debt against `position`
pub fn calculate_redemption(
    position: &CollateralPosition,
    requested: u64,
    min_collateral_out: u64,
    price: FixedPointPrice,
    params: &RedemptionParams,
) -> CdpResult<RedemptionQuote> {
    let (debt_redeemed, closes_position) =
        redeemable_amount(position.debt_amount, requested, params)?;

    let collateral_redeemed = debt_to_collateral(debt_redeemed, params.asset_decimals, price)?;
    // A surviving trove must keep some collateral behind its debt
    let exhausted = if closes_position {
        collateral_redeemed > position.collateral_amount
    } else {
        collateral_redeemed >= position.collateral_amount
    };
    if exhausted {
        return Err(CdpError::InsufficientCollateralBalance {
            available: position.collateral_amount,
            requested: collateral_redeemed,
        });
    }

    let redemption_fee = bps_of(collateral_redeemed, params.redemption_fee_bps)?;
    let gratuity_fee = bps_of(collateral_redeemed, params.redemption_fee_gratuity_bps)?;
    if redemption_fee == 0 || gratuity_fee == 0 {
        return Err(CdpError::FeeTooSmall);
    }

    let collateral_to_redeemer =
        safe_sub(safe_sub(collateral_redeemed, redemption_fee)?, gratuity_fee)?;
    if collateral_to_redeemer < min_collateral_out {
        return Err(CdpError::SlippageExceeded {
            collateral_out: collateral_to_redeemer,
            min_collateral_out,
        });
    }

    let left_collateral = safe_sub(position.collateral_amount, collateral_redeemed)?;
    let quote = if closes_position {
        RedemptionQuote {
            debt_redeemed,
            collateral_redeemed,
            redemption_fee,
            gratuity_fee,
            collateral_to_redeemer,
            closes_position,
            reserve_burned: params.liquidation_reserve,
            residual_collateral: left_collateral,
            remaining_collateral: 0,
            remaining_debt: 0,
        }
    } else {
        RedemptionQuote {
            debt_redeemed,
            collateral_redeemed,
            redemption_fee,
            gratuity_fee,
            collateral_to_redeemer,
            closes_position,
            reserve_burned: 0,
            residual_collateral: 0,
            remaining_collateral: left_collateral,
            remaining_debt: safe_sub(position.debt_amount, debt_redeemed)?,
        }
    };
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD_1: u64 = 100_000_000;

    fn params() -> RedemptionParams {
        RedemptionParams {
            asset_decimals: 8,
            minimum_debt: 100,
            liquidation_reserve: 10,
            redemption_fee_bps: 50,
            redemption_fee_gratuity_bps: 25,
        }
    }

    fn one_dollar() -> FixedPointPrice {
        FixedPointPrice::from_usd(USD_1).unwrap()
    }

    #[test]
    fn test_redeem_requested_amount() {
        let position = CollateralPosition::new(1_320, 1_015, 0);
        let quote = calculate_redemption(&position, 500, 0, one_dollar(), &params()).unwrap();

        assert_eq!(quote.debt_redeemed, 500);
        assert_eq!(quote.collateral_redeemed, 500);
        assert_eq!(quote.redemption_fee, 2);
        assert_eq!(quote.gratuity_fee, 1);
        assert_eq!(quote.collateral_to_redeemer, 497);
        assert!(!quote.closes_position);
        assert_eq!(quote.remaining_debt, 515);
        assert_eq!(quote.remaining_collateral, 820);
    }

    #[test]
    fn test_truncates_to_protect_minimum_debt() {
        // 1015 - 950 = 65 < 110, so only 905 is redeemed
        let (amount, closes) = redeemable_amount(1_015, 950, &params()).unwrap();
        assert_eq!(amount, 905);
        assert!(!closes);
    }

    #[test]
    fn test_over_request_closes_position() {
        let position = CollateralPosition::new(1_320, 1_015, 0);
        let quote = calculate_redemption(&position, 5_000, 0, one_dollar(), &params()).unwrap();

        assert_eq!(quote.debt_redeemed, 1_005);
        assert!(quote.closes_position);
        assert_eq!(quote.reserve_burned, 10);
        assert_eq!(quote.residual_collateral, 315);
        assert_eq!(quote.remaining_collateral, 0);
        assert_eq!(quote.remaining_debt, 0);
    }

    #[test]
    fn test_fee_too_small() {
        let position = CollateralPosition::new(1_320, 1_015, 0);
        // 100 collateral * 25 bps rounds to zero gratuity
        let result = calculate_redemption(&position, 100, 0, one_dollar(), &params());
        assert_eq!(result, Err(CdpError::FeeTooSmall));
    }

    #[test]
    fn test_slippage() {
        let position = CollateralPosition::new(1_320, 1_015, 0);
        let result = calculate_redemption(&position, 500, 498, one_dollar(), &params());
        assert_eq!(
            result,
            Err(CdpError::SlippageExceeded { collateral_out: 497, min_collateral_out: 498 })
        );
    }

    #[test]
    fn test_underwater_position_cannot_cover_redemption() {
        let position = CollateralPosition::new(400, 1_015, 0);
        let result = calculate_redemption(&position, 500, 0, one_dollar(), &params());
        assert_eq!(
            result,
            Err(CdpError::InsufficientCollateralBalance { available: 400, requested: 500 })
        );
    }

    #[test]
    fn test_partial_redemption_cannot_empty_position() {
        // At $0.50, 660 debt buys exactly the 1320 collateral
        let position = CollateralPosition::new(1_320, 1_015, 0);
        let half_dollar = FixedPointPrice::from_usd(50_000_000).unwrap();
        let result = calculate_redemption(&position, 660, 0, half_dollar, &params());
        assert_eq!(
            result,
            Err(CdpError::InsufficientCollateralBalance { available: 1_320, requested: 1_320 })
        );

        let quote = calculate_redemption(&position, 600, 0, half_dollar, &params()).unwrap();
        assert!(!quote.closes_position);
        assert_eq!(quote.remaining_collateral, 120);
        assert_eq!(quote.remaining_debt, 415);
    }
}
