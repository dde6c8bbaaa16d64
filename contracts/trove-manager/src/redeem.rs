//! Redemptions and the redemption-provider registry

use cdp_common::{
    errors::{CdpError, CdpResult},
    events::CdpEvent,
    math::FixedPointPrice,
    redemption::{calculate_redemption, RedemptionParams, RedemptionQuote},
    types::{Address, AssetId, CollateralPosition, OperationKind},
};
use cdp_debt_token::TokenOps;

use crate::OpContext;

/// Redeem against a single provider
pub(crate) fn redeem<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    provider: &Address,
    debt_amount: u64,
    min_collateral_out: u64,
) -> CdpResult<RedemptionQuote> {
    let params = redemption_params(ctx, asset)?;
    let price = ctx.price(asset)?;
    redeem_one(ctx, asset, &params, price, provider, debt_amount, min_collateral_out)
}

/// Redeem against each provider in order, as one operation
pub(crate) fn redeem_multiple<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    providers: &[Address],
    debt_amounts: &[u64],
    min_collateral_outs: &[u64],
) -> CdpResult<Vec<RedemptionQuote>> {
    if providers.len() != debt_amounts.len() || providers.len() != min_collateral_outs.len() {
        return Err(CdpError::InvalidArrayLength);
    }

    let params = redemption_params(ctx, asset)?;
    let price = ctx.price(asset)?;
    let mut quotes = Vec::with_capacity(providers.len());
    for ((provider, amount), min_out) in providers.iter().zip(debt_amounts).zip(min_collateral_outs) {
        quotes.push(redeem_one(ctx, asset, &params, price, provider, *amount, *min_out)?);
    }
    log::debug!("batch redemption on {asset}: {} providers", quotes.len());
    Ok(quotes)
}

/// Opt the signer's trove in or out of redemptions
pub(crate) fn set_redemption_provider<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    is_provider: bool,
) -> CdpResult<()> {
    let owner = ctx.signer;
    ctx.collateral_config(asset)?;
    if is_provider {
        ctx.position(&owner, asset)?;
    }

    ctx.new_state
        .ledger
        .set_redemption_provider(&owner, asset, is_provider);
    ctx.emit(CdpEvent::RedemptionProviderChanged {
        owner,
        asset: asset.clone(),
        is_provider,
        timestamp: ctx.now,
    });
    Ok(())
}

fn redemption_params<L: TokenOps>(
    ctx: &OpContext<'_, L>,
    asset: &AssetId,
) -> CdpResult<RedemptionParams> {
    let config = ctx.collateral_config(asset)?;
    config.require_enabled(OperationKind::Redeem)?;
    Ok(RedemptionParams::from(config))
}

fn redeem_one<L: TokenOps>(
    ctx: &mut OpContext<'_, L>,
    asset: &AssetId,
    params: &RedemptionParams,
    price: FixedPointPrice,
    provider: &Address,
    debt_amount: u64,
    min_collateral_out: u64,
) -> CdpResult<RedemptionQuote> {
    let redeemer = ctx.signer;

    // 1. Target must be an opted-in open trove
    let position = match ctx.new_state.ledger.position(provider, asset) {
        Some(position) if ctx.new_state.ledger.is_redemption_provider(provider, asset) => *position,
        _ => {
            return Err(CdpError::NotRedemptionProvider {
                provider: *provider,
            })
        }
    };

    // 2. Size, convert and split
    let quote = calculate_redemption(&position, debt_amount, min_collateral_out, price, params)?;

    // 3. Move funds
    let fee_collector = ctx.custody.fee_collector;
    let reserve_holder = ctx.custody.reserve_holder;
    ctx.burn(&redeemer, quote.debt_redeemed)?;
    ctx.release_collateral(&redeemer, asset, quote.collateral_to_redeemer)?;
    ctx.release_collateral(&fee_collector, asset, quote.redemption_fee)?;
    ctx.release_collateral(provider, asset, quote.gratuity_fee)?;

    // 4. Ledger
    if quote.closes_position {
        ctx.burn(&reserve_holder, quote.reserve_burned)?;
        ctx.release_collateral(provider, asset, quote.residual_collateral)?;
        let ledger = &mut ctx.new_state.ledger;
        ledger.decrease_totals(asset, position.collateral_amount, position.debt_amount)?;
        ledger.remove_position(provider, asset);
    } else {
        let remaining =
            CollateralPosition::new(quote.remaining_collateral, quote.remaining_debt, ctx.now);
        let ledger = &mut ctx.new_state.ledger;
        ledger.decrease_totals(asset, quote.collateral_redeemed, quote.debt_redeemed)?;
        ledger.put_position(provider, asset, remaining);
    }

    log::debug!(
        "redeemed {} from provider on {asset}: collateral_out={} closed={}",
        quote.debt_redeemed,
        quote.collateral_to_redeemer,
        quote.closes_position
    );
    ctx.emit(CdpEvent::Redemption {
        redeemer,
        provider: *provider,
        asset: asset.clone(),
        debt_redeemed: quote.debt_redeemed,
        collateral_to_redeemer: quote.collateral_to_redeemer,
        redemption_fee: quote.redemption_fee,
        gratuity_fee: quote.gratuity_fee,
        closed_position: quote.closes_position,
        timestamp: ctx.now,
    });
    Ok(quote)
}
