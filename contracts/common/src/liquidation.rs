//! Liquidation Calculator
//!
//! Pure functions from (position, price, config) to a distribution of the
//! seized collateral among liquidator, protocol and original owner.
//!
//! ## Liquidation Flow
//!
//! ```text
//! ratio_bps < liquidation_threshold ?
//!                 │ no ──► CannotLiquidate
//!                 ▼ yes
//!         ratio_bps <= 100% ?
//!         ┌──────┴───────┐
//!         ▼ yes          ▼ no
//! ┌───────────────┐ ┌──────────────────────────────────┐
//! │ UNDERWATER    │ │ PENALIZED                        │
//! │ liquidator    │ │ penalty = value - debt  (≤ 100%+p)│
//! │ takes all     │ │         = debt * p      (else)   │
//! │ collateral    │ │ protocol fee = penalty * fee_bps │
//! └───────────────┘ │ owner gets any surplus           │
//!                   └──────────────────────────────────┘
//! ```
//!
//! Full liquidations also hand the liquidation reserve to the liquidator.
//! Partial liquidations are sized in 0.1%-of-debt chunks and leave the
//! reserve with the position.

use log::debug;

use crate::{
    constants::{bps::PAR_RATIO_BPS, liquidation::PARTIAL_CHUNK_DIVISOR},
    errors::{CdpError, CdpResult},
    math::{bps_of, collateral_ratio_bps, collateral_value, debt_to_collateral, mul_div_floor, safe_add, safe_sub},
    types::{CollateralConfig, CollateralPosition},
    FixedPointPrice,
};

/// Liquidation parameters of one collateral type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationParams {
    /// Collateral asset decimals
    pub asset_decimals: u8,
    /// Ratio below which liquidation is allowed
    pub liquidation_threshold_bps: u64,
    /// Penalty on liquidated debt
    pub liquidation_penalty_bps: u64,
    /// Protocol share of the penalty
    pub liquidation_fee_protocol_bps: u64,
    /// Reserve handed to the liquidator on full liquidation
    pub liquidation_reserve: u64,
    /// Minimum debt (partial liquidations keep `minimum_debt + reserve`)
    pub minimum_debt: u64,
}

impl From<&CollateralConfig> for LiquidationParams {
    fn from(config: &CollateralConfig) -> Self {
        Self {
            asset_decimals: config.decimals,
            liquidation_threshold_bps: config.liquidation_threshold_bps,
            liquidation_penalty_bps: config.liquidation_penalty_bps,
            liquidation_fee_protocol_bps: config.liquidation_fee_protocol_bps,
            liquidation_reserve: config.liquidation_reserve,
            minimum_debt: config.minimum_debt,
        }
    }
}

/// Which regime the position was liquidated under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationMode {
    /// Collateral value ≤ debt: liquidator takes everything
    Underwater,
    /// Collateral value > debt: penalty split between liquidator and protocol
    Penalized,
}

/// Distribution of seized collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollateralSplit {
    /// Collateral paid to the liquidator
    pub liquidator: u64,
    /// Collateral paid to the protocol fee collector
    pub protocol_fee: u64,
    /// Collateral returned to the position owner
    pub owner_refund: u64,
}

impl CollateralSplit {
    /// Total collateral distributed
    pub fn total(&self) -> CdpResult<u64> {
        safe_add(safe_add(self.liquidator, self.protocol_fee)?, self.owner_refund)
    }
}

/// Result of a liquidation calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationOutcome {
    /// Regime applied
    pub mode: LiquidationMode,
    /// Ratio of the whole position before liquidation
    pub ratio_bps: u64,
    /// Debt burned from the liquidator's balance
    pub debt_liquidated: u64,
    /// Collateral leaving the position
    pub collateral_seized: u64,
    /// How the seized collateral is distributed
    pub split: CollateralSplit,
    /// Reserve transferred to the liquidator
    pub reserve_to_liquidator: u64,
    /// Collateral left in the position
    pub remaining_collateral: u64,
    /// Debt left in the position
    pub remaining_debt: u64,
}

impl LiquidationOutcome {
    /// Returns true when nothing remains and the position must be deleted
    pub fn closes_position(&self) -> bool {
        self.remaining_collateral == 0 && self.remaining_debt == 0
    }
}

/// Ratio of a position, failing with `CannotLiquidate` unless it is below
/// the liquidation threshold
pub fn check_liquidatable(
    position: &CollateralPosition,
    price: FixedPointPrice,
    params: &LiquidationParams,
) -> CdpResult<u64> {
    let ratio_bps = collateral_ratio_bps(
        position.collateral_amount,
        position.debt_amount,
        params.asset_decimals,
        price,
    )?;

    if ratio_bps >= params.liquidation_threshold_bps {
        return Err(CdpError::CannotLiquidate {
            ratio_bps,
            threshold_bps: params.liquidation_threshold_bps,
        });
    }
    Ok(ratio_bps)
}

/// Returns true when the position may be liquidated at `price`
pub fn is_liquidatable(
    position: &CollateralPosition,
    price: FixedPointPrice,
    params: &LiquidationParams,
) -> bool {
    check_liquidatable(position, price, params).is_ok()
}

/// Split `collateral` seized against `debt` under the regime selected by
/// the whole position's `ratio_bps`
pub fn split_collateral(
    collateral: u64,
    debt: u64,
    ratio_bps: u64,
    price: FixedPointPrice,
    params: &LiquidationParams,
) -> CdpResult<(LiquidationMode, CollateralSplit)> {
    if ratio_bps <= PAR_RATIO_BPS {
        return Ok((
            LiquidationMode::Underwater,
            CollateralSplit {
                liquidator: collateral,
                protocol_fee: 0,
                owner_refund: 0,
            },
        ));
    }

    // Penalty in debt-token units
    let penalty_cap_ratio = safe_add(PAR_RATIO_BPS, params.liquidation_penalty_bps)?;
    let penalty = if ratio_bps <= penalty_cap_ratio {
        let max_collateral_value = collateral_value(collateral, params.asset_decimals, price)?;
        max_collateral_value.saturating_sub(debt)
    } else {
        bps_of(debt, params.liquidation_penalty_bps)?
    };

    let penalty_collateral = debt_to_collateral(penalty, params.asset_decimals, price)?;
    let protocol_fee = bps_of(penalty_collateral, params.liquidation_fee_protocol_bps)?;
    let liquidator_penalty = safe_sub(penalty_collateral, protocol_fee)?;

    let debt_in_collateral = debt_to_collateral(debt, params.asset_decimals, price)?;
    let owner_refund =
        collateral.saturating_sub(safe_add(penalty_collateral, debt_in_collateral)?);

    let reward_cap = safe_sub(safe_sub(collateral, protocol_fee)?, owner_refund)?;
    let liquidator = safe_add(liquidator_penalty, debt_in_collateral)?.min(reward_cap);

    debug!(
        "liquidation split: penalty={} penalty_coll={} fee={} debt_coll={} refund={} reward={}",
        penalty, penalty_collateral, protocol_fee, debt_in_collateral, owner_refund, liquidator
    );

    Ok((
        LiquidationMode::Penalized,
        CollateralSplit {
            liquidator,
            protocol_fee,
            owner_refund,
        },
    ))
}

/// Calculate a full liquidation of `position`
pub fn calculate_liquidation(
    position: &CollateralPosition,
    price: FixedPointPrice,
    params: &LiquidationParams,
) -> CdpResult<LiquidationOutcome> {
    let ratio_bps = check_liquidatable(position, price, params)?;

    let (mode, split) = split_collateral(
        position.collateral_amount,
        position.debt_amount,
        ratio_bps,
        price,
        params,
    )?;

    Ok(LiquidationOutcome {
        mode,
        ratio_bps,
        debt_liquidated: position.debt_amount,
        collateral_seized: position.collateral_amount,
        split,
        reserve_to_liquidator: params.liquidation_reserve,
        remaining_collateral: 0,
        remaining_debt: 0,
    })
}

/// Truncate a requested partial liquidation down to a whole number of
/// `debt / 1000` chunks
pub fn partial_liquidation_amount(debt: u64, requested: u64) -> CdpResult<u64> {
    let chunk = debt / PARTIAL_CHUNK_DIVISOR;
    if chunk == 0 {
        return Err(CdpError::PositionTooSmallForPartialLiquidation { debt });
    }

    let amount = (requested / chunk) * chunk;
    if amount == 0 {
        return Err(CdpError::LiquidationAmountTooSmall { requested, chunk });
    }
    Ok(amount)
}

/// Calculate a partial liquidation of `debt_to_liquidate` from `position`.
///
/// Requests covering the whole debt are delegated to
/// [`calculate_liquidation`].
pub fn calculate_partial_liquidation(
    position: &CollateralPosition,
    debt_to_liquidate: u64,
    price: FixedPointPrice,
    params: &LiquidationParams,
) -> CdpResult<LiquidationOutcome> {
    if debt_to_liquidate >= position.debt_amount {
        return calculate_liquidation(position, price, params);
    }

    let ratio_bps = check_liquidatable(position, price, params)?;

    let debt_liquidated = partial_liquidation_amount(position.debt_amount, debt_to_liquidate)?;
    let remaining_debt = safe_sub(position.debt_amount, debt_liquidated)?;
    let minimum = safe_add(params.minimum_debt, params.liquidation_reserve)?;
    if remaining_debt < minimum {
        return Err(CdpError::InvalidDebtAmount {
            remaining: remaining_debt,
            minimum,
        });
    }

    let collateral_seized = mul_div_floor(
        position.collateral_amount,
        debt_liquidated,
        position.debt_amount,
    )?
    .min(position.collateral_amount);

    let (mode, split) = split_collateral(collateral_seized, debt_liquidated, ratio_bps, price, params)?;

    Ok(LiquidationOutcome {
        mode,
        ratio_bps,
        debt_liquidated,
        collateral_seized,
        split,
        reserve_to_liquidator: 0,
        remaining_collateral: safe_sub(position.collateral_amount, collateral_seized)?,
        remaining_debt,
    })
}

// ============ Tests ============
