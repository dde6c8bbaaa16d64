//! Position Ledger
//!
//! Positions keyed by (owner, asset), per-asset aggregate totals and the
//! redemption-provider registry. Anyone can read; only the engine writes.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cdp_common::{
    errors::CdpResult,
    math::{safe_add, safe_sub},
    types::{Address, AggregateTotals, AssetId, CollateralPosition},
};

/// Persisted ledger state
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct PositionLedger {
    positions: BTreeMap<(Address, AssetId), CollateralPosition>,
    totals: BTreeMap<AssetId, AggregateTotals>,
    providers: BTreeSet<(Address, AssetId)>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Reads ============

    pub fn position(&self, owner: &Address, asset: &AssetId) -> Option<&CollateralPosition> {
        self.positions.get(&(*owner, asset.clone()))
    }

    /// Aggregate totals of `asset` (zero if nothing was ever opened)
    pub fn totals(&self, asset: &AssetId) -> AggregateTotals {
        self.totals.get(asset).copied().unwrap_or_default()
    }

    pub fn is_redemption_provider(&self, owner: &Address, asset: &AssetId) -> bool {
        self.providers.contains(&(*owner, asset.clone()))
    }

    /// Open positions of `asset`
    pub fn positions_for<'a>(
        &'a self,
        asset: &'a AssetId,
    ) -> impl Iterator<Item = (&'a Address, &'a CollateralPosition)> + 'a {
        self.positions
            .iter()
            .filter(move |((_, a), _)| a == asset)
            .map(|((owner, _), position)| (owner, position))
    }

    /// Number of open positions across all assets
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Recompute the totals of `asset` from its positions and compare
    pub fn verify_totals(&self, asset: &AssetId) -> bool {
        let mut collateral: u128 = 0;
        let mut debt: u128 = 0;
        for (_, position) in self.positions_for(asset) {
            collateral += position.collateral_amount as u128;
            debt += position.debt_amount as u128;
        }
        let totals = self.totals(asset);
        collateral == totals.total_collateral as u128 && debt == totals.total_debt as u128
    }

    // ============ Engine Writes ============

    /// Store `position`, deleting it (and its provider flag) once both legs
    /// are zero
    pub(crate) fn put_position(
        &mut self,
        owner: &Address,
        asset: &AssetId,
        position: CollateralPosition,
    ) {
        let key = (*owner, asset.clone());
        if position.is_empty() {
            self.positions.remove(&key);
            self.providers.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
    }

    pub(crate) fn remove_position(&mut self, owner: &Address, asset: &AssetId) {
        let key = (*owner, asset.clone());
        self.positions.remove(&key);
        self.providers.remove(&key);
    }

    pub(crate) fn set_redemption_provider(
        &mut self,
        owner: &Address,
        asset: &AssetId,
        is_provider: bool,
    ) {
        let key = (*owner, asset.clone());
        if is_provider {
            self.providers.insert(key);
        } else {
            self.providers.remove(&key);
        }
    }

    pub(crate) fn increase_totals(
        &mut self,
        asset: &AssetId,
        collateral: u64,
        debt: u64,
    ) -> CdpResult<()> {
        let totals = self.totals.entry(asset.clone()).or_default();
        totals.total_collateral = safe_add(totals.total_collateral, collateral)?;
        totals.total_debt = safe_add(totals.total_debt, debt)?;
        Ok(())
    }

    pub(crate) fn decrease_totals(
        &mut self,
        asset: &AssetId,
        collateral: u64,
        debt: u64,
    ) -> CdpResult<()> {
        let totals = self.totals.entry(asset.clone()).or_default();
        totals.total_collateral = safe_sub(totals.total_collateral, collateral)?;
        totals.total_debt = safe_sub(totals.total_debt, debt)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_common::errors::CdpError;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    fn btc() -> AssetId {
        AssetId::new("BTC").unwrap()
    }

    #[test]
    fn test_empty_position_is_deleted() {
        let mut ledger = PositionLedger::new();
        ledger.put_position(&ALICE, &btc(), CollateralPosition::new(100, 50, 1));
        ledger.set_redemption_provider(&ALICE, &btc(), true);
        assert!(ledger.is_redemption_provider(&ALICE, &btc()));

        ledger.put_position(&ALICE, &btc(), CollateralPosition::new(0, 0, 2));
        assert!(ledger.position(&ALICE, &btc()).is_none());
        assert!(!ledger.is_redemption_provider(&ALICE, &btc()));
    }

    #[test]
    fn test_verify_totals() {
        let mut ledger = PositionLedger::new();
        ledger.put_position(&ALICE, &btc(), CollateralPosition::new(100, 50, 1));
        ledger.put_position(&BOB, &btc(), CollateralPosition::new(200, 70, 1));
        ledger.increase_totals(&btc(), 300, 120).unwrap();
        assert!(ledger.verify_totals(&btc()));

        ledger.increase_totals(&btc(), 1, 0).unwrap();
        assert!(!ledger.verify_totals(&btc()));
    }

    #[test]
    fn test_totals_underflow() {
        let mut ledger = PositionLedger::new();
        ledger.increase_totals(&btc(), 10, 10).unwrap();
        assert_eq!(ledger.decrease_totals(&btc(), 11, 0), Err(CdpError::Underflow));
    }

    #[test]
    fn test_positions_are_per_asset() {
        let mut ledger = PositionLedger::new();
        let eth = AssetId::new("ETH").unwrap();
        ledger.put_position(&ALICE, &btc(), CollateralPosition::new(100, 50, 1));
        ledger.put_position(&ALICE, &eth, CollateralPosition::new(5, 60, 1));
        assert_eq!(ledger.positions_for(&btc()).count(), 1);
        assert_eq!(ledger.position_count(), 2);
    }
}
