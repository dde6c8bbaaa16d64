//! Debt Token and Collateral Balances
//!
//! Fungible balances for the debt token and every collateral asset, plus the
//! [`TokenOps`] capability the trove manager drives. Only the authorized
//! minter can mint or burn the debt token.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cdp_common::{
    constants::token,
    errors::{CdpError, CdpResult},
    types::{Address, AssetId},
};

// ============ Assets ============

/// A balance-bearing asset
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub enum Asset {
    /// The pegged debt token
    Debt,
    /// A collateral asset
    Collateral(AssetId),
}

impl Asset {
    fn insufficient(&self, available: u64, requested: u64) -> CdpError {
        match self {
            Asset::Debt => CdpError::InsufficientDebtBalance { available, requested },
            Asset::Collateral(_) => CdpError::InsufficientCollateralBalance { available, requested },
        }
    }
}

// ============ Capability ============

/// Mint/burn/transfer capability handed to the trove manager
pub trait TokenOps {
    /// Balance of `holder` in `asset`
    fn balance_of(&self, holder: &Address, asset: &Asset) -> u64;

    /// Mint debt token to `to`; `minter` must be the authorized minter
    fn mint_debt(&mut self, minter: &Address, to: &Address, amount: u64) -> CdpResult<()>;

    /// Burn debt token held by `from`; `minter` must be the authorized minter
    fn burn_debt(&mut self, minter: &Address, from: &Address, amount: u64) -> CdpResult<()>;

    /// Move `amount` of `asset` from `from` to `to`
    fn transfer(&mut self, from: &Address, to: &Address, asset: &Asset, amount: u64)
        -> CdpResult<()>;
}

// ============ Token Ledger ============

/// In-memory balances for the debt token and all collateral assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenLedger {
    /// Only address allowed to mint or burn the debt token
    authorized_minter: Address,
    /// Balances keyed by (holder, asset)
    balances: BTreeMap<(Address, Asset), u64>,
    /// Outstanding debt token
    total_supply: u64,
    /// Debt token supply cap
    max_supply: u64,
    /// Cumulative debt token minted
    total_minted: u64,
    /// Cumulative debt token burned
    total_burned: u64,
}

// NOTE: no Default impl; a ledger always needs an explicit minter.

impl TokenLedger {
    /// Create an empty ledger with the protocol supply cap
    pub fn new(authorized_minter: Address) -> Self {
        Self::with_supply_cap(authorized_minter, token::MAX_SUPPLY)
    }

    /// Create an empty ledger with a custom supply cap
    pub fn with_supply_cap(authorized_minter: Address, max_supply: u64) -> Self {
        Self {
            authorized_minter,
            balances: BTreeMap::new(),
            total_supply: 0,
            max_supply,
            total_minted: 0,
            total_burned: 0,
        }
    }

    /// Get token name
    pub fn name() -> &'static str {
        token::NAME
    }

    /// Get token symbol
    pub fn symbol() -> &'static str {
        token::SYMBOL
    }

    /// Get token decimals
    pub fn decimals() -> u8 {
        token::DECIMALS
    }

    pub fn authorized_minter(&self) -> Address {
        self.authorized_minter
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    pub fn total_minted(&self) -> u64 {
        self.total_minted
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }

    /// Credit collateral arriving from outside the system
    pub fn fund(&mut self, holder: &Address, asset: &AssetId, amount: u64) -> CdpResult<()> {
        self.credit(holder, &Asset::Collateral(asset.clone()), amount)
    }

    fn require_minter(&self, minter: &Address) -> CdpResult<()> {
        if *minter != self.authorized_minter {
            return Err(CdpError::Unauthorized {
                expected: self.authorized_minter,
                actual: *minter,
            });
        }
        Ok(())
    }

    fn credit(&mut self, holder: &Address, asset: &Asset, amount: u64) -> CdpResult<()> {
        let balance = self.balances.entry((*holder, asset.clone())).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CdpError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, holder: &Address, asset: &Asset, amount: u64) -> CdpResult<()> {
        let key = (*holder, asset.clone());
        let available = self.balances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(asset.insufficient(available, amount));
        }
        if available == amount {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, available - amount);
        }
        Ok(())
    }
}

impl TokenOps for TokenLedger {
    fn balance_of(&self, holder: &Address, asset: &Asset) -> u64 {
        self.balances
            .get(&(*holder, asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn mint_debt(&mut self, minter: &Address, to: &Address, amount: u64) -> CdpResult<()> {
        self.require_minter(minter)?;
        if amount == 0 {
            return Ok(());
        }

        let new_supply = self.total_supply.checked_add(amount).ok_or(CdpError::Overflow)?;
        if new_supply > self.max_supply {
            return Err(CdpError::SupplyCapExceeded {
                supply: self.total_supply,
                requested: amount,
                cap: self.max_supply,
            });
        }

        self.credit(to, &Asset::Debt, amount)?;
        self.total_supply = new_supply;
        self.total_minted = self.total_minted.checked_add(amount).ok_or(CdpError::Overflow)?;
        log::trace!("minted {amount} debt token, supply {new_supply}");
        Ok(())
    }

    fn burn_debt(&mut self, minter: &Address, from: &Address, amount: u64) -> CdpResult<()> {
        self.require_minter(minter)?;
        if amount == 0 {
            return Ok(());
        }

        self.debit(from, &Asset::Debt, amount)?;
        self.total_supply = self.total_supply.checked_sub(amount).ok_or(CdpError::Underflow)?;
        self.total_burned = self.total_burned.checked_add(amount).ok_or(CdpError::Overflow)?;
        log::trace!("burned {amount} debt token, supply {}", self.total_supply);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        asset: &Asset,
        amount: u64,
    ) -> CdpResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }
}

// ============ Helper Functions ============

/// Split a debt token amount into whole and fractional parts
pub fn format_amount(amount: u64) -> (u64, u64) {
    (amount / token::ONE, amount % token::ONE)
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;

    const MINTER: Address = [9u8; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    fn btc() -> AssetId {
        AssetId::new("BTC").unwrap()
    }

    #[test]
    fn test_metadata() {
        assert_eq!(TokenLedger::symbol(), "dUSD");
        assert_eq!(TokenLedger::decimals(), 8);
        assert_eq!(format_amount(150_000_000), (1, 50_000_000));
    }

    #[test]
    fn test_mint_and_burn() {
        let mut ledger = TokenLedger::new(MINTER);
        ledger.mint_debt(&MINTER, &ALICE, 1_000).unwrap();
        assert_eq!(ledger.balance_of(&ALICE, &Asset::Debt), 1_000);
        assert_eq!(ledger.total_supply(), 1_000);

        ledger.burn_debt(&MINTER, &ALICE, 400).unwrap();
        assert_eq!(ledger.balance_of(&ALICE, &Asset::Debt), 600);
        assert_eq!(ledger.total_supply(), 600);
        assert_eq!(ledger.total_minted(), 1_000);
        assert_eq!(ledger.total_burned(), 400);
    }

    #[test]
    fn test_mint_unauthorized() {
        let mut ledger = TokenLedger::new(MINTER);
        let result = ledger.mint_debt(&ALICE, &ALICE, 1_000);
        assert!(matches!(result, Err(CdpError::Unauthorized { .. })));
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_supply_cap() {
        let mut ledger = TokenLedger::with_supply_cap(MINTER, 1_000);
        ledger.mint_debt(&MINTER, &ALICE, 800).unwrap();
        let result = ledger.mint_debt(&MINTER, &BOB, 201);
        assert_eq!(
            result,
            Err(CdpError::SupplyCapExceeded { supply: 800, requested: 201, cap: 1_000 })
        );
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut ledger = TokenLedger::new(MINTER);
        ledger.mint_debt(&MINTER, &ALICE, 100).unwrap();
        let result = ledger.burn_debt(&MINTER, &ALICE, 101);
        assert_eq!(
            result,
            Err(CdpError::InsufficientDebtBalance { available: 100, requested: 101 })
        );
    }

    #[test]
    fn test_collateral_transfer() {
        let mut ledger = TokenLedger::new(MINTER);
        let asset = Asset::Collateral(btc());
        ledger.fund(&ALICE, &btc(), 500).unwrap();

        ledger.transfer(&ALICE, &BOB, &asset, 200).unwrap();
        assert_eq!(ledger.balance_of(&ALICE, &asset), 300);
        assert_eq!(ledger.balance_of(&BOB, &asset), 200);

        let result = ledger.transfer(&ALICE, &BOB, &asset, 301);
        assert_eq!(
            result,
            Err(CdpError::InsufficientCollateralBalance { available: 300, requested: 301 })
        );
    }

    #[test]
    fn test_assets_are_isolated() {
        let mut ledger = TokenLedger::new(MINTER);
        ledger.fund(&ALICE, &btc(), 500).unwrap();
        let eth = Asset::Collateral(AssetId::new("ETH").unwrap());
        assert_eq!(ledger.balance_of(&ALICE, &eth), 0);
        assert_eq!(ledger.balance_of(&ALICE, &Asset::Debt), 0);
    }
}
