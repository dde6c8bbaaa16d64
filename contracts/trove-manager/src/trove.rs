//! Trove lifecycle: open, adjust and close

use cdp_common::{
    errors::{CdpError, CdpResult},
    events::CdpEvent,
    math::{bps_of, check_collateral_ratio, collateral_ratio_bps, safe_add, safe_sub},
    types::{AssetId, CollateralPosition, OperationKind},
};
use cdp_debt_token::TokenOps;

use crate::OpContext;

/// Open a new trove for the signer
pub(crate) fn open_trove<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    collateral_deposit: u64,
    debt_to_mint: u64,
) -> CdpResult<CollateralPosition> {
    let owner = ctx.signer;
    let config = ctx.collateral_config(asset)?;

    // 1. Asset and "open" flag enabled
    config.require_enabled(OperationKind::Open)?;

    // 2. One trove per (owner, asset)
    if ctx.new_state.ledger.position(&owner, asset).is_some() {
        return Err(CdpError::PositionAlreadyExists { owner });
    }

    // 3. Minimum debt
    if debt_to_mint < config.minimum_debt {
        return Err(CdpError::BelowMinimumDebt {
            amount: debt_to_mint,
            minimum: config.minimum_debt,
        });
    }

    // 4. Fee and total debt
    let borrow_fee = bps_of(debt_to_mint, config.borrow_rate_bps)?;
    let total_debt = safe_add(safe_add(debt_to_mint, borrow_fee)?, config.liquidation_reserve)?;

    // 5. Ratio against MCR
    let price = ctx.price(asset)?;
    check_collateral_ratio(
        collateral_deposit,
        total_debt,
        config.decimals,
        price,
        config.mcr_bps,
    )?;

    // 6. Move funds
    ctx.lock_collateral(&owner, asset, collateral_deposit)?;
    ctx.mint(&owner, debt_to_mint)?;
    let fee_collector = ctx.custody.fee_collector;
    let reserve_holder = ctx.custody.reserve_holder;
    ctx.mint(&fee_collector, borrow_fee)?;
    ctx.mint(&reserve_holder, config.liquidation_reserve)?;

    // 7. Record the trove and opt it in as a redemption provider
    let position = CollateralPosition::new(collateral_deposit, total_debt, ctx.now);
    let ledger = &mut ctx.new_state.ledger;
    ledger.put_position(&owner, asset, position);
    ledger.increase_totals(asset, collateral_deposit, total_debt)?;
    ledger.set_redemption_provider(&owner, asset, true);

    log::info!(
        "trove opened on {asset}: collateral={collateral_deposit} debt={total_debt} fee={borrow_fee}"
    );
    ctx.emit(CdpEvent::TroveOpened {
        owner,
        asset: asset.clone(),
        collateral: collateral_deposit,
        debt_minted: debt_to_mint,
        borrow_fee,
        liquidation_reserve: config.liquidation_reserve,
        total_debt,
        timestamp: ctx.now,
    });

    Ok(position)
}

/// Add collateral and/or mint more debt
///
/// Each leg is gated by its own flag. Only the mint leg re-checks the ratio.
pub(crate) fn deposit_or_mint<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    collateral_deposit: u64,
    debt_to_mint: u64,
) -> CdpResult<()> {
    let owner = ctx.signer;
    let config = ctx.collateral_config(asset)?;
    let mut position = ctx.position(&owner, asset)?;

    if collateral_deposit == 0 && debt_to_mint == 0 {
        return Ok(());
    }
    if collateral_deposit > 0 {
        config.require_enabled(OperationKind::Deposit)?;
    }
    if debt_to_mint > 0 {
        config.require_enabled(OperationKind::Borrow)?;
    }

    let new_collateral = safe_add(position.collateral_amount, collateral_deposit)?;
    let borrow_fee = bps_of(debt_to_mint, config.borrow_rate_bps)?;
    let added_debt = safe_add(debt_to_mint, borrow_fee)?;
    let new_debt = safe_add(position.debt_amount, added_debt)?;

    // Ratio on the new totals, mint leg only
    let mut new_ratio_bps = 0;
    if debt_to_mint > 0 {
        let price = ctx.price(asset)?;
        check_collateral_ratio(new_collateral, new_debt, config.decimals, price, config.mcr_bps)?;
        new_ratio_bps = collateral_ratio_bps(new_collateral, new_debt, config.decimals, price)?;
    }

    ctx.lock_collateral(&owner, asset, collateral_deposit)?;
    ctx.mint(&owner, debt_to_mint)?;
    let fee_collector = ctx.custody.fee_collector;
    ctx.mint(&fee_collector, borrow_fee)?;

    position.collateral_amount = new_collateral;
    position.debt_amount = new_debt;
    position.last_update_time = ctx.now;
    let ledger = &mut ctx.new_state.ledger;
    ledger.put_position(&owner, asset, position);
    ledger.increase_totals(asset, collateral_deposit, added_debt)?;

    if collateral_deposit > 0 {
        ctx.emit(CdpEvent::CollateralDeposited {
            owner,
            asset: asset.clone(),
            amount: collateral_deposit,
            new_collateral,
            timestamp: ctx.now,
        });
    }
    if debt_to_mint > 0 {
        log::debug!("minted {debt_to_mint} (+{borrow_fee} fee) on {asset}, ratio {new_ratio_bps}");
        ctx.emit(CdpEvent::DebtMinted {
            owner,
            asset: asset.clone(),
            amount: debt_to_mint,
            borrow_fee,
            new_debt,
            new_ratio_bps,
            timestamp: ctx.now,
        });
    }
    Ok(())
}

/// Withdraw collateral and/or repay debt
///
/// Never gated by operation flags. Repaying the whole debt also retires the
/// liquidation reserve, so the owner only burns `debt - reserve` of their own.
pub(crate) fn repay_or_withdraw<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    collateral_withdraw: u64,
    debt_repay: u64,
) -> CdpResult<()> {
    let owner = ctx.signer;
    let config = ctx.collateral_config(asset)?;
    let mut position = ctx.position(&owner, asset)?;

    // 1. Amounts available in the trove
    if collateral_withdraw > position.collateral_amount {
        return Err(CdpError::InsufficientCollateralBalance {
            available: position.collateral_amount,
            requested: collateral_withdraw,
        });
    }
    if debt_repay > position.debt_amount {
        return Err(CdpError::InsufficientDebtBalance {
            available: position.debt_amount,
            requested: debt_repay,
        });
    }
    if collateral_withdraw == 0 && debt_repay == 0 {
        return Ok(());
    }

    let new_collateral = position.collateral_amount - collateral_withdraw;
    let new_debt = position.debt_amount - debt_repay;

    // 2. Minimum debt; debt may only reach zero together with collateral
    let minimum = config.min_position_debt()?;
    if (new_debt > 0 && new_debt < minimum) || (new_debt == 0 && new_collateral > 0) {
        return Err(CdpError::BelowMinimumDebt {
            amount: new_debt,
            minimum,
        });
    }

    // 3. Ratio on the resulting trove when collateral leaves
    if collateral_withdraw > 0 {
        let price = ctx.price(asset)?;
        check_collateral_ratio(new_collateral, new_debt, config.decimals, price, config.mcr_bps)?;
    }

    // 4. Burn and release
    if new_debt == 0 {
        let reserve = config.liquidation_reserve.min(debt_repay);
        let reserve_holder = ctx.custody.reserve_holder;
        ctx.burn(&owner, debt_repay - reserve)?;
        ctx.burn(&reserve_holder, reserve)?;
    } else {
        ctx.burn(&owner, debt_repay)?;
    }
    ctx.release_collateral(&owner, asset, collateral_withdraw)?;

    position.collateral_amount = new_collateral;
    position.debt_amount = new_debt;
    position.last_update_time = ctx.now;
    let ledger = &mut ctx.new_state.ledger;
    ledger.put_position(&owner, asset, position);
    ledger.decrease_totals(asset, collateral_withdraw, debt_repay)?;

    if debt_repay > 0 {
        ctx.emit(CdpEvent::DebtRepaid {
            owner,
            asset: asset.clone(),
            amount: debt_repay,
            new_debt,
            timestamp: ctx.now,
        });
    }
    if collateral_withdraw > 0 {
        ctx.emit(CdpEvent::CollateralWithdrawn {
            owner,
            asset: asset.clone(),
            amount: collateral_withdraw,
            new_collateral,
            timestamp: ctx.now,
        });
    }
    Ok(())
}

/// Close the signer's trove
pub(crate) fn close_trove<L: TokenOps>(ctx: &mut OpContext<'_, L>, asset: &AssetId) -> CdpResult<()> {
    let owner = ctx.signer;
    let config = ctx.collateral_config(asset)?;
    let position = ctx.position(&owner, asset)?;
    if !position.is_active() {
        return Err(CdpError::NoPositionExists { owner });
    }

    // Owner repays everything but the reserve, which the holder burns
    let reserve = config.liquidation_reserve.min(position.debt_amount);
    let owner_part = safe_sub(position.debt_amount, reserve)?;
    let reserve_holder = ctx.custody.reserve_holder;
    ctx.burn(&owner, owner_part)?;
    ctx.burn(&reserve_holder, reserve)?;
    ctx.release_collateral(&owner, asset, position.collateral_amount)?;

    let ledger = &mut ctx.new_state.ledger;
    ledger.decrease_totals(asset, position.collateral_amount, position.debt_amount)?;
    ledger.remove_position(&owner, asset);

    log::info!(
        "trove closed on {asset}: collateral={} debt={}",
        position.collateral_amount,
        position.debt_amount
    );
    ctx.emit(CdpEvent::TroveClosed {
        owner,
        asset: asset.clone(),
        collateral_returned: position.collateral_amount,
        debt_repaid: position.debt_amount,
        timestamp: ctx.now,
    });
    Ok(())
}
