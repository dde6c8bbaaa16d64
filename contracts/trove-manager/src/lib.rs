//! Trove Manager - CDP Engine
//!
//! Orchestrates every collateralized debt position (trove) operation: it
//! reads configs and prices, runs the pure calculators from `cdp-common`,
//! moves tokens through a [`TokenOps`] capability and commits the result to
//! the [`PositionLedger`].
//!
//! ## Core Operations
//!
//! - **OpenTrove**: lock collateral, mint debt + borrow fee + reserve
//! - **DepositOrMint**: add collateral and/or borrow more
//! - **RepayOrWithdraw**: repay debt and/or take collateral out
//! - **CloseTrove**: repay everything, get all collateral back
//! - **Liquidate / PartialLiquidate**: seize troves below the threshold
//! - **Redeem / RedeemMultiple**: swap debt token for provider collateral
//!
//! ## Atomicity
//!
//! Each call runs against a staged copy of the engine state (`new_state`)
//! which replaces the committed state only if the whole operation succeeds.
//! A failed call leaves ledger, balances and events untouched.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cdp_common::{
    errors::{CdpError, CdpResult},
    events::{CdpEvent, EventLog},
    liquidation::{
        calculate_liquidation, calculate_partial_liquidation, check_liquidatable,
        LiquidationOutcome, LiquidationParams,
    },
    math::{collateral_ratio_bps, FixedPointPrice},
    redemption::{calculate_redemption, RedemptionParams, RedemptionQuote},
    types::{Address, AggregateTotals, AssetId, CollateralConfig, CollateralPosition, Timestamp},
};
use cdp_debt_token::{Asset, TokenLedger, TokenOps};
use cdp_price_oracle::PriceOracle;

pub mod config;
pub mod custody;
pub mod ledger;
mod liquidate;
mod redeem;
mod trove;


pub use config::{ConfigProvider, ConfigStore};
pub use custody::Custody;
pub use ledger::PositionLedger;

// ============ Actions ============

/// Every engine operation, one per transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TroveAction {
    OpenTrove {
        asset: AssetId,
        collateral_deposit: u64,
        debt_to_mint: u64,
    },
    DepositOrMint {
        asset: AssetId,
        collateral_deposit: u64,
        debt_to_mint: u64,
    },
    RepayOrWithdraw {
        asset: AssetId,
        collateral_withdraw: u64,
        debt_repay: u64,
    },
    CloseTrove {
        asset: AssetId,
    },
    Liquidate {
        asset: AssetId,
        owner: Address,
    },
    PartialLiquidate {
        asset: AssetId,
        owner: Address,
        debt_to_liquidate: u64,
    },
    Redeem {
        asset: AssetId,
        provider: Address,
        debt_amount: u64,
        min_collateral_out: u64,
    },
    RedeemMultiple {
        asset: AssetId,
        providers: Vec<Address>,
        debt_amounts: Vec<u64>,
        min_collateral_outs: Vec<u64>,
    },
    SetRedemptionProvider {
        asset: AssetId,
        is_provider: bool,
    },
}

// ============ Call Context ============

/// Collaborators and caller identity injected into every call
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// Collateral config source
    pub config: &'a dyn ConfigProvider,
    /// Price source
    pub oracle: &'a dyn PriceOracle,
    /// Caller (trove owner, liquidator or redeemer)
    pub signer: Address,
    /// Current time in seconds
    pub timestamp: Timestamp,
}

impl<'a> CallContext<'a> {
    pub fn new(
        config: &'a dyn ConfigProvider,
        oracle: &'a dyn PriceOracle,
        signer: Address,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            config,
            oracle,
            signer,
            timestamp,
        }
    }
}

// ============ Engine State ============

/// Everything a single operation may change
#[derive(Debug, Clone)]
pub(crate) struct EngineState<L> {
    pub(crate) ledger: PositionLedger,
    pub(crate) tokens: L,
    pub(crate) events: EventLog,
}

/// Staged view handed to operation handlers
pub(crate) struct OpContext<'a, L> {
    /// Staged state, committed only on success
    pub(crate) new_state: &'a mut EngineState<L>,
    pub(crate) custody: &'a Custody,
    pub(crate) config: &'a dyn ConfigProvider,
    pub(crate) oracle: &'a dyn PriceOracle,
    pub(crate) signer: Address,
    pub(crate) now: Timestamp,
}

impl<'a, L: TokenOps> OpContext<'a, L> {
    pub(crate) fn collateral_config(&self, asset: &AssetId) -> CdpResult<&'a CollateralConfig> {
        let config: &'a dyn ConfigProvider = self.config;
        config.collateral_config(asset)
    }

    pub(crate) fn price(&self, asset: &AssetId) -> CdpResult<FixedPointPrice> {
        self.oracle.get_price(asset, self.now)
    }

    pub(crate) fn position(&self, owner: &Address, asset: &AssetId) -> CdpResult<CollateralPosition> {
        self.new_state
            .ledger
            .position(owner, asset)
            .copied()
            .ok_or(CdpError::NoPositionExists { owner: *owner })
    }

    pub(crate) fn emit(&mut self, event: CdpEvent) {
        self.new_state.events.emit(event);
    }

    /// Move collateral from `from` into the vault
    pub(crate) fn lock_collateral(
        &mut self,
        from: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> CdpResult<()> {
        let vault = self.custody.vault;
        self.new_state
            .tokens
            .transfer(from, &vault, &Asset::Collateral(asset.clone()), amount)
    }

    /// Move collateral out of the vault to `to`
    pub(crate) fn release_collateral(
        &mut self,
        to: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> CdpResult<()> {
        let vault = self.custody.vault;
        self.new_state
            .tokens
            .transfer(&vault, to, &Asset::Collateral(asset.clone()), amount)
    }

    pub(crate) fn mint(&mut self, to: &Address, amount: u64) -> CdpResult<()> {
        self.new_state
            .tokens
            .mint_debt(&self.custody.vault, to, amount)
    }

    pub(crate) fn burn(&mut self, from: &Address, amount: u64) -> CdpResult<()> {
        self.new_state
            .tokens
            .burn_debt(&self.custody.vault, from, amount)
    }
}

// ============ Trove Manager ============

/// The CDP engine
#[derive(Debug, Clone)]
pub struct TroveManager<L = TokenLedger> {
    custody: Custody,
    state: EngineState<L>,
}

impl TroveManager<TokenLedger> {
    /// Create an engine with custody derived from `seed` and a fresh token
    /// ledger minted by the vault
    pub fn new(seed: &[u8]) -> Self {
        let custody = Custody::derive(seed);
        Self::with_tokens(custody, TokenLedger::new(custody.vault))
    }

    /// Credit `holder` with collateral arriving from outside the system.
    ///
    /// Custody addresses only receive collateral through trove operations.
    pub fn fund_collateral(
        &mut self,
        holder: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> CdpResult<()> {
        if self.custody.contains(holder) {
            return Err(CdpError::InvalidConfig {
                param: "holder",
                reason: "custody addresses cannot be funded directly",
            });
        }
        self.state.tokens.fund(holder, asset, amount)
    }
}

impl<L: TokenOps + Clone> TroveManager<L> {
    /// Create an engine over an existing token capability
    pub fn with_tokens(custody: Custody, tokens: L) -> Self {
        Self {
            custody,
            state: EngineState {
                ledger: PositionLedger::new(),
                tokens,
                events: EventLog::new(),
            },
        }
    }

    /// Run `op` on a staged copy of the state and commit it only on success
    fn transact<T>(
        &mut self,
        env: &CallContext<'_>,
        op: impl FnOnce(&mut OpContext<'_, L>) -> CdpResult<T>,
    ) -> CdpResult<T> {
        let mut new_state = self.state.clone();
        let result = {
            let mut ctx = OpContext {
                new_state: &mut new_state,
                custody: &self.custody,
                config: env.config,
                oracle: env.oracle,
                signer: env.signer,
                now: env.timestamp,
            };
            op(&mut ctx)
        };

        match result {
            Ok(value) => {
                self.state = new_state;
                Ok(value)
            }
            Err(err) => {
                log::warn!("operation rejected: {} ({})", err.code(), err);
                Err(err)
            }
        }
    }

    // ============ Operations ============

    /// Open a trove for the signer
    pub fn open_trove(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        collateral_deposit: u64,
        debt_to_mint: u64,
    ) -> CdpResult<CollateralPosition> {
        self.transact(env, |ctx| {
            trove::open_trove(ctx, asset, collateral_deposit, debt_to_mint)
        })
    }

    /// Add collateral and/or mint more debt on the signer's trove
    pub fn deposit_or_mint(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        collateral_deposit: u64,
        debt_to_mint: u64,
    ) -> CdpResult<()> {
        self.transact(env, |ctx| {
            trove::deposit_or_mint(ctx, asset, collateral_deposit, debt_to_mint)
        })
    }

    /// Withdraw collateral and/or repay debt on the signer's trove
    pub fn repay_or_withdraw(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        collateral_withdraw: u64,
        debt_repay: u64,
    ) -> CdpResult<()> {
        self.transact(env, |ctx| {
            trove::repay_or_withdraw(ctx, asset, collateral_withdraw, debt_repay)
        })
    }

    /// Close the signer's trove
    pub fn close_trove(&mut self, env: &CallContext<'_>, asset: &AssetId) -> CdpResult<()> {
        self.transact(env, |ctx| trove::close_trove(ctx, asset))
    }

    /// Liquidate `owner`'s whole trove
    pub fn liquidate(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        owner: &Address,
    ) -> CdpResult<LiquidationOutcome> {
        self.transact(env, |ctx| liquidate::liquidate(ctx, asset, owner))
    }

    /// Liquidate part of `owner`'s trove
    pub fn partial_liquidate(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        owner: &Address,
        debt_to_liquidate: u64,
    ) -> CdpResult<LiquidationOutcome> {
        self.transact(env, |ctx| {
            liquidate::partial_liquidate(ctx, asset, owner, debt_to_liquidate)
        })
    }

    /// Redeem debt token against one provider
    pub fn redeem(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        provider: &Address,
        debt_amount: u64,
        min_collateral_out: u64,
    ) -> CdpResult<RedemptionQuote> {
        self.transact(env, |ctx| {
            redeem::redeem(ctx, asset, provider, debt_amount, min_collateral_out)
        })
    }

    /// Redeem against several providers; any failure voids the whole batch
    pub fn redeem_multiple(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        providers: &[Address],
        debt_amounts: &[u64],
        min_collateral_outs: &[u64],
    ) -> CdpResult<Vec<RedemptionQuote>> {
        self.transact(env, |ctx| {
            redeem::redeem_multiple(ctx, asset, providers, debt_amounts, min_collateral_outs)
        })
    }

    /// Move debt token from the signer to `to`
    pub fn transfer_debt(
        &mut self,
        env: &CallContext<'_>,
        to: &Address,
        amount: u64,
    ) -> CdpResult<()> {
        self.transact(env, |ctx| {
            let from = ctx.signer;
            ctx.new_state.tokens.transfer(&from, to, &Asset::Debt, amount)
        })
    }

    /// Opt the signer's trove in or out of redemptions
    pub fn set_redemption_provider(
        &mut self,
        env: &CallContext<'_>,
        asset: &AssetId,
        is_provider: bool,
    ) -> CdpResult<()> {
        self.transact(env, |ctx| {
            redeem::set_redemption_provider(ctx, asset, is_provider)
        })
    }

    /// Dispatch a [`TroveAction`]
    pub fn execute(&mut self, env: &CallContext<'_>, action: &TroveAction) -> CdpResult<()> {
        match action {
            TroveAction::OpenTrove {
                asset,
                collateral_deposit,
                debt_to_mint,
            } => self
                .open_trove(env, asset, *collateral_deposit, *debt_to_mint)
                .map(|_| ()),
            TroveAction::DepositOrMint {
                asset,
                collateral_deposit,
                debt_to_mint,
            } => self.deposit_or_mint(env, asset, *collateral_deposit, *debt_to_mint),
            TroveAction::RepayOrWithdraw {
                asset,
                collateral_withdraw,
                debt_repay,
            } => self.repay_or_withdraw(env, asset, *collateral_withdraw, *debt_repay),
            TroveAction::CloseTrove { asset } => self.close_trove(env, asset),
            TroveAction::Liquidate { asset, owner } => self.liquidate(env, asset, owner).map(|_| ()),
            TroveAction::PartialLiquidate {
                asset,
                owner,
                debt_to_liquidate,
            } => self
                .partial_liquidate(env, asset, owner, *debt_to_liquidate)
                .map(|_| ()),
            TroveAction::Redeem {
                asset,
                provider,
                debt_amount,
                min_collateral_out,
            } => self
                .redeem(env, asset, provider, *debt_amount, *min_collateral_out)
                .map(|_| ()),
            TroveAction::RedeemMultiple {
                asset,
                providers,
                debt_amounts,
                min_collateral_outs,
            } => self
                .redeem_multiple(env, asset, providers, debt_amounts, min_collateral_outs)
                .map(|_| ()),
            TroveAction::SetRedemptionProvider { asset, is_provider } => {
                self.set_redemption_provider(env, asset, *is_provider)
            }
        }
    }

    // ============ Views ============

    pub fn custody(&self) -> &Custody {
        &self.custody
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.state.ledger
    }

    pub fn position(&self, owner: &Address, asset: &AssetId) -> Option<&CollateralPosition> {
        self.state.ledger.position(owner, asset)
    }

    pub fn totals(&self, asset: &AssetId) -> AggregateTotals {
        self.state.ledger.totals(asset)
    }

    pub fn is_redemption_provider(&self, owner: &Address, asset: &AssetId) -> bool {
        self.state.ledger.is_redemption_provider(owner, asset)
    }

    /// Whether the aggregate totals of `asset` match its positions
    pub fn verify_totals(&self, asset: &AssetId) -> bool {
        self.state.ledger.verify_totals(asset)
    }

    /// Token balances
    pub fn tokens(&self) -> &L {
        &self.state.tokens
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    pub fn drain_events(&mut self) -> Vec<CdpEvent> {
        self.state.events.drain()
    }

    /// Current collateral ratio of `owner`'s trove
    pub fn current_ratio_bps(
        &self,
        env: &CallContext<'_>,
        owner: &Address,
        asset: &AssetId,
    ) -> CdpResult<u64> {
        let (position, config, price) = self.position_inputs(env, owner, asset)?;
        collateral_ratio_bps(
            position.collateral_amount,
            position.debt_amount,
            config.decimals,
            price,
        )
    }

    /// Whether `owner`'s trove is below the liquidation threshold
    pub fn is_liquidatable(
        &self,
        env: &CallContext<'_>,
        owner: &Address,
        asset: &AssetId,
    ) -> CdpResult<bool> {
        let (position, config, price) = self.position_inputs(env, owner, asset)?;
        match check_liquidatable(&position, price, &LiquidationParams::from(config)) {
            Ok(_) => Ok(true),
            Err(CdpError::CannotLiquidate { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Outcome of liquidating `owner`'s trove now, without committing.
    ///
    /// `None` quotes a full liquidation.
    pub fn quote_liquidation(
        &self,
        env: &CallContext<'_>,
        owner: &Address,
        asset: &AssetId,
        debt_to_liquidate: Option<u64>,
    ) -> CdpResult<LiquidationOutcome> {
        let (position, config, price) = self.position_inputs(env, owner, asset)?;
        let params = LiquidationParams::from(config);
        match debt_to_liquidate {
            Some(amount) => calculate_partial_liquidation(&position, amount, price, &params),
            None => calculate_liquidation(&position, price, &params),
        }
    }

    /// Outcome of redeeming against `provider` now, without committing
    pub fn quote_redemption(
        &self,
        env: &CallContext<'_>,
        provider: &Address,
        asset: &AssetId,
        debt_amount: u64,
        min_collateral_out: u64,
    ) -> CdpResult<RedemptionQuote> {
        if !self.is_redemption_provider(provider, asset) {
            return Err(CdpError::NotRedemptionProvider {
                provider: *provider,
            });
        }
        let (position, config, price) = self.position_inputs(env, provider, asset)?;
        calculate_redemption(
            &position,
            debt_amount,
            min_collateral_out,
            price,
            &RedemptionParams::from(config),
        )
    }

    fn position_inputs<'c>(
        &self,
        env: &CallContext<'c>,
        owner: &Address,
        asset: &AssetId,
    ) -> CdpResult<(CollateralPosition, &'c CollateralConfig, FixedPointPrice)> {
        let provider: &'c dyn ConfigProvider = env.config;
        let config = provider.collateral_config(asset)?;
        let position = self
            .position(owner, asset)
            .copied()
            .ok_or(CdpError::NoPositionExists { owner: *owner })?;
        let price = env.oracle.get_price(asset, env.timestamp)?;
        Ok((position, config, price))
    }
}
