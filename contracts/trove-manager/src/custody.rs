//! Engine-controlled custody identities
//!
//! The trove manager holds pooled collateral, liquidation reserves and fees
//! under addresses only it can move funds from. Each is derived as
//! `Sha256(domain_tag || seed)`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use cdp_common::types::Address;

const VAULT_TAG: &[u8] = b"cdp-ledger/vault";
const RESERVE_TAG: &[u8] = b"cdp-ledger/reserve";
const FEE_COLLECTOR_TAG: &[u8] = b"cdp-ledger/fee-collector";

/// Custody addresses of one trove manager instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Custody {
    /// Holds all deposited collateral; also the debt token minter
    pub vault: Address,
    /// Holds the liquidation reserve of every open trove
    pub reserve_holder: Address,
    /// Receives borrow fees, liquidation protocol fees and redemption fees
    pub fee_collector: Address,
}

impl Custody {
    /// Derive all custody addresses from `seed`
    pub fn derive(seed: &[u8]) -> Self {
        Self {
            vault: derive_address(VAULT_TAG, seed),
            reserve_holder: derive_address(RESERVE_TAG, seed),
            fee_collector: derive_address(FEE_COLLECTOR_TAG, seed),
        }
    }

    /// Route fees to an external collector instead of the derived one
    pub fn with_fee_collector(mut self, fee_collector: Address) -> Self {
        self.fee_collector = fee_collector;
        self
    }

    /// Whether `address` is one of the custody roles
    pub fn contains(&self, address: &Address) -> bool {
        [self.vault, self.reserve_holder, self.fee_collector].contains(address)
    }
}

/// Deterministic address for a custody role
pub fn derive_address(domain_tag: &[u8], seed: &[u8]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(domain_tag);
    hasher.update(seed);
    let result = hasher.finalize();
    let mut address = [0u8; 32];
    address.copy_from_slice(&result);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        assert_eq!(Custody::derive(b"main"), Custody::derive(b"main"));
        assert_ne!(Custody::derive(b"main").vault, Custody::derive(b"test").vault);
    }

    #[test]
    fn test_roles_are_distinct() {
        let custody = Custody::derive(b"main");
        assert_ne!(custody.vault, custody.reserve_holder);
        assert_ne!(custody.vault, custody.fee_collector);
        assert_ne!(custody.reserve_holder, custody.fee_collector);
    }

    #[test]
    fn test_external_fee_collector() {
        let custody = Custody::derive(b"main").with_fee_collector([7u8; 32]);
        assert_eq!(custody.fee_collector, [7u8; 32]);
    }

    #[test]
    fn test_contains_roles_only() {
        let custody = Custody::derive(b"main");
        assert!(custody.contains(&custody.vault));
        assert!(custody.contains(&custody.reserve_holder));
        assert!(custody.contains(&custody.fee_collector));
        assert!(!custody.contains(&[7u8; 32]));
    }
}
