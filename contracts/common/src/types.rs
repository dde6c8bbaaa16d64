//! Core Types for the CDP Ledger
//!
//! This module defines the fundamental data structures shared by the
//! oracle, token and trove manager crates.

use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{bps::BPS_DENOMINATOR, defaults, limits};
use crate::errors::{CdpError, CdpResult};
use crate::String;

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Seconds since the Unix epoch
pub type Timestamp = u64;

// ============ Asset Identity ============

/// Collateral asset identifier (e.g. `"BTC"`, `"ETH"`)
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset identifier, rejecting empty or oversized symbols
    pub fn new(symbol: &str) -> CdpResult<Self> {
        if symbol.is_empty() {
            return Err(CdpError::InvalidConfig {
                param: "asset_id",
                reason: "must not be empty",
            });
        }
        if symbol.len() > limits::MAX_ASSET_ID_LEN {
            return Err(CdpError::InvalidConfig {
                param: "asset_id",
                reason: "too long",
            });
        }
        Ok(Self(String::from(symbol)))
    }

    /// Symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gated operation kinds (one enable flag each)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum OperationKind {
    /// Opening a new trove
    Open,
    /// Minting additional debt against an existing trove
    Borrow,
    /// Depositing additional collateral
    Deposit,
    /// Redeeming debt token against a provider's trove
    Redeem,
}

// ============ Position Types ============

/// A user's collateral/debt pair for one collateral type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct CollateralPosition {
    /// Collateral in the asset's base units
    pub collateral_amount: u64,
    /// Debt in debt-token base units (8 decimals), including reserve and fees
    pub debt_amount: u64,
    /// Time of the last mutation
    pub last_update_time: Timestamp,
}

impl CollateralPosition {
    /// Creates a new position
    pub fn new(collateral_amount: u64, debt_amount: u64, now: Timestamp) -> Self {
        Self {
            collateral_amount,
            debt_amount,
            last_update_time: now,
        }
    }

    /// Returns true while the trove has an outstanding debt leg
    pub fn is_active(&self) -> bool {
        self.debt_amount > 0
    }

    /// Returns true once both legs reached zero
    pub fn is_empty(&self) -> bool {
        self.collateral_amount == 0 && self.debt_amount == 0
    }
}

/// Per-asset aggregate of all open positions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub struct AggregateTotals {
    /// Sum of collateral across open positions
    pub total_collateral: u64,
    /// Sum of debt across open positions
    pub total_debt: u64,
}

// ============ Collateral Configuration ============

/// Per-asset operation enable flags
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct OperationFlags {
    pub open: bool,
    pub borrow: bool,
    pub deposit: bool,
    pub redeem: bool,
}

impl OperationFlags {
    /// Everything enabled
    pub const ALL: Self = Self {
        open: true,
        borrow: true,
        deposit: true,
        redeem: true,
    };

    /// Everything disabled
    pub const NONE: Self = Self {
        open: false,
        borrow: false,
        deposit: false,
        redeem: false,
    };

    /// Whether an operation is enabled
    pub fn allows(&self, operation: OperationKind) -> bool {
        match operation {
            OperationKind::Open => self.open,
            OperationKind::Borrow => self.borrow,
            OperationKind::Deposit => self.deposit,
            OperationKind::Redeem => self.redeem,
        }
    }

    /// Fails with `OperationDisabled` unless the operation is enabled
    pub fn require(&self, operation: OperationKind) -> CdpResult<()> {
        if self.allows(operation) {
            Ok(())
        } else {
            Err(CdpError::OperationDisabled { operation })
        }
    }
}

impl Default for OperationFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// Economic parameters of one collateral type
///
/// Immutable for the duration of a single operation. All ratios and fee
/// rates are in basis points (10000 = 100%).
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct CollateralConfig {
    /// Decimal precision of the collateral asset's base unit
    pub decimals: u8,
    /// Minimum debt to mint when opening
    pub minimum_debt: u64,
    /// Minimum collateral ratio for opening and borrowing
    pub mcr_bps: u64,
    /// One-off borrow fee charged on minted debt
    pub borrow_rate_bps: u64,
    /// Debt token set aside at open for liquidators
    pub liquidation_reserve: u64,
    /// Ratio below which a trove becomes liquidatable
    pub liquidation_threshold_bps: u64,
    /// Liquidation penalty on liquidated debt
    pub liquidation_penalty_bps: u64,
    /// Protocol share of the liquidation penalty
    pub liquidation_fee_protocol_bps: u64,
    /// Redemption fee (to the fee collector)
    pub redemption_fee_bps: u64,
    /// Redemption gratuity (to the provider)
    pub redemption_fee_gratuity_bps: u64,
    /// Collateral type enabled
    pub enabled: bool,
    /// Per-operation enable flags
    pub flags: OperationFlags,
}

impl CollateralConfig {
    /// Create a config for an asset with the default parameters
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            minimum_debt: defaults::MINIMUM_DEBT,
            mcr_bps: defaults::MCR_BPS,
            borrow_rate_bps: defaults::BORROW_RATE_BPS,
            liquidation_reserve: defaults::LIQUIDATION_RESERVE,
            liquidation_threshold_bps: defaults::LIQUIDATION_THRESHOLD_BPS,
            liquidation_penalty_bps: defaults::LIQUIDATION_PENALTY_BPS,
            liquidation_fee_protocol_bps: defaults::LIQUIDATION_FEE_PROTOCOL_BPS,
            redemption_fee_bps: defaults::REDEMPTION_FEE_BPS,
            redemption_fee_gratuity_bps: defaults::REDEMPTION_FEE_GRATUITY_BPS,
            enabled: true,
            flags: OperationFlags::ALL,
        }
    }

    /// Smallest debt an open trove may carry
    pub fn min_position_debt(&self) -> CdpResult<u64> {
        self.minimum_debt
            .checked_add(self.liquidation_reserve)
            .ok_or(CdpError::Overflow)
    }

    /// Fails unless the asset is enabled and the operation flag is on
    pub fn require_enabled(&self, operation: OperationKind) -> CdpResult<()> {
        if !self.enabled {
            return Err(CdpError::CollateralDisabled);
        }
        self.flags.require(operation)
    }

    /// Validate parameter ranges
    ///
    /// `mcr_bps > liquidation_threshold_bps` is expected but not enforced.
    pub fn validate(&self) -> CdpResult<()> {
        if self.decimals > limits::MAX_ASSET_DECIMALS {
            return Err(CdpError::InvalidConfig {
                param: "decimals",
                reason: "exceeds 18",
            });
        }
        if self.mcr_bps == 0 {
            return Err(CdpError::InvalidConfig {
                param: "mcr_bps",
                reason: "must be positive",
            });
        }
        if self.liquidation_threshold_bps == 0 {
            return Err(CdpError::InvalidConfig {
                param: "liquidation_threshold_bps",
                reason: "must be positive",
            });
        }
        let bounded = [
            ("borrow_rate_bps", self.borrow_rate_bps),
            ("liquidation_penalty_bps", self.liquidation_penalty_bps),
            ("liquidation_fee_protocol_bps", self.liquidation_fee_protocol_bps),
            ("redemption_fee_bps", self.redemption_fee_bps),
            ("redemption_fee_gratuity_bps", self.redemption_fee_gratuity_bps),
        ];
        for (param, value) in bounded {
            if value > BPS_DENOMINATOR {
                return Err(CdpError::InvalidConfig {
                    param,
                    reason: "exceeds 10000 bps",
                });
            }
        }
        if self
            .redemption_fee_bps
            .saturating_add(self.redemption_fee_gratuity_bps)
            > BPS_DENOMINATOR
        {
            return Err(CdpError::InvalidConfig {
                param: "redemption_fee_bps",
                reason: "fee plus gratuity exceeds 10000 bps",
            });
        }
        if self.minimum_debt == 0 {
            return Err(CdpError::InvalidConfig {
                param: "minimum_debt",
                reason: "must be positive",
            });
        }
        self.min_position_debt()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_validation() {
        assert!(AssetId::new("BTC").is_ok());
        assert!(AssetId::new("").is_err());
        assert!(AssetId::new(&"X".repeat(33)).is_err());
        assert_eq!(AssetId::new("ETH").unwrap().as_str(), "ETH");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CollateralConfig::new(8);
        assert!(config.validate().is_ok());
        assert!(config.mcr_bps > config.liquidation_threshold_bps);
        assert_eq!(
            config.min_position_debt().unwrap(),
            defaults::MINIMUM_DEBT + defaults::LIQUIDATION_RESERVE
        );
    }

    #[test]
    fn test_config_rejects_out_of_range() {
        let mut config = CollateralConfig::new(19);
        assert!(matches!(
            config.validate(),
            Err(CdpError::InvalidConfig { param: "decimals", .. })
        ));

        config.decimals = 6;
        config.liquidation_penalty_bps = 10_001;
        assert!(matches!(
            config.validate(),
            Err(CdpError::InvalidConfig { param: "liquidation_penalty_bps", .. })
        ));
    }

    #[test]
    fn test_require_enabled() {
        let mut config = CollateralConfig::new(8);
        assert!(config.require_enabled(OperationKind::Open).is_ok());

        config.flags.borrow = false;
        assert_eq!(
            config.require_enabled(OperationKind::Borrow),
            Err(CdpError::OperationDisabled { operation: OperationKind::Borrow })
        );

        config.enabled = false;
        assert_eq!(
            config.require_enabled(OperationKind::Open),
            Err(CdpError::CollateralDisabled)
        );
    }

    #[test]
    fn test_position_state() {
        let position = CollateralPosition::new(100, 50, 7);
        assert!(position.is_active());
        assert!(!position.is_empty());
        assert!(CollateralPosition::default().is_empty());
    }
}
