//! Liquidation of troves below the threshold
//!
//! The amounts come from the pure calculator in `cdp-common`; this module
//! only checks the caller, moves tokens and updates the ledger.

use cdp_common::{
    errors::{CdpError, CdpResult},
    events::CdpEvent,
    liquidation::{
        calculate_liquidation, calculate_partial_liquidation, LiquidationOutcome,
        LiquidationParams,
    },
    types::{Address, AssetId, CollateralPosition},
};
use cdp_debt_token::{Asset, TokenOps};

use crate::OpContext;

/// Liquidate `owner`'s whole trove
pub(crate) fn liquidate<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    owner: &Address,
) -> CdpResult<LiquidationOutcome> {
    let (position, params) = load(ctx, asset, owner)?;
    let price = ctx.price(asset)?;
    let outcome = calculate_liquidation(&position, price, &params)?;
    apply(ctx, asset, owner, &outcome)?;
    Ok(outcome)
}

/// Liquidate `debt_to_liquidate` of `owner`'s trove
pub(crate) fn partial_liquidate<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    owner: &Address,
    debt_to_liquidate: u64,
) -> CdpResult<LiquidationOutcome> {
    let (position, params) = load(ctx, asset, owner)?;
    let price = ctx.price(asset)?;
    let outcome = calculate_partial_liquidation(&position, debt_to_liquidate, price, &params)?;
    apply(ctx, asset, owner, &outcome)?;
    Ok(outcome)
}

fn load<L: TokenOps>(
    ctx: &OpContext<'_, L>,
    asset: &AssetId,
    owner: &Address,
) -> CdpResult<(CollateralPosition, LiquidationParams)> {
    let config = ctx.collateral_config(asset)?;
    if ctx.signer == *owner {
        return Err(CdpError::SelfLiquidation);
    }
    let position = ctx.position(owner, asset)?;
    Ok((position, LiquidationParams::from(config)))
}

fn apply<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    owner: &Address,
    outcome: &LiquidationOutcome,
) -> CdpResult<()> {
    let liquidator = ctx.signer;
    let fee_collector = ctx.custody.fee_collector;
    let reserve_holder = ctx.custody.reserve_holder;

    // 1. Liquidator pays the liquidated debt
    ctx.burn(&liquidator, outcome.debt_liquidated)?;

    // 2. Distribute seized collateral
    ctx.release_collateral(&liquidator, asset, outcome.split.liquidator)?;
    ctx.release_collateral(&fee_collector, asset, outcome.split.protocol_fee)?;
    ctx.release_collateral(owner, asset, outcome.split.owner_refund)?;

    // 3. Reserve to the liquidator (full liquidation only)
    if outcome.reserve_to_liquidator > 0 {
        ctx.new_state.tokens.transfer(
            &reserve_holder,
            &liquidator,
            &Asset::Debt,
            outcome.reserve_to_liquidator,
        )?;
    }

    // 4. Ledger
    let ledger = &mut ctx.new_state.ledger;
    ledger.decrease_totals(asset, outcome.collateral_seized, outcome.debt_liquidated)?;
    if outcome.closes_position() {
        ledger.remove_position(owner, asset);
    } else {
        let remaining =
            CollateralPosition::new(outcome.remaining_collateral, outcome.remaining_debt, ctx.now);
        ledger.put_position(owner, asset, remaining);
    }

    log::info!(
        "liquidation on {asset}: ratio={} debt={} mode={:?}",
        outcome.ratio_bps,
        outcome.debt_liquidated,
        outcome.mode
    );

    let event = if outcome.closes_position() {
        CdpEvent::TroveLiquidated {
            owner: *owner,
            liquidator,
            asset: asset.clone(),
            ratio_bps: outcome.ratio_bps,
            debt_burned: outcome.debt_liquidated,
            collateral_to_liquidator: outcome.split.liquidator,
            protocol_fee: outcome.split.protocol_fee,
            owner_refund: outcome.split.owner_refund,
            reserve_to_liquidator: outcome.reserve_to_liquidator,
            timestamp: ctx.now,
        }
    } else {
        CdpEvent::TrovePartiallyLiquidated {
            owner: *owner,
            liquidator,
            asset: asset.clone(),
            ratio_bps: outcome.ratio_bps,
            debt_burned: outcome.debt_liquidated,
            collateral_seized: outcome.collateral_seized,
            collateral_to_liquidator: outcome.split.liquidator,
            protocol_fee: outcome.split.protocol_fee,
            owner_refund: outcome.split.owner_refund,
            remaining_collateral: outcome.remaining_collateral,
            remaining_debt: outcome.remaining_debt,
            timestamp: ctx.now,
        }
    };
    ctx.emit(event);
    Ok(())
}
