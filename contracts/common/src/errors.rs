//! Error Types for the CDP Ledger
//!
//! Typed errors carrying the offending values. Every precondition violation
//! aborts the whole operation; nothing is recovered inside the core.

use core::fmt;

use crate::types::{Address, OperationKind};

/// Result type alias for CDP operations
pub type CdpResult<T> = Result<T, CdpError>;

/// Main error enum for all CDP ledger errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdpError {
    // ============ Eligibility Errors ============
    /// Collateral type exists but is switched off
    CollateralDisabled,

    /// The requested operation is disabled for this collateral type
    OperationDisabled { operation: OperationKind },

    /// Collateral type has never been registered
    UnsupportedCollateral,

    // ============ Balance Errors ============
    /// Not enough collateral (in a position or a wallet) for the operation
    InsufficientCollateralBalance { available: u64, requested: u64 },

    /// Not enough debt (in a position or debt token in a wallet)
    InsufficientDebtBalance { available: u64, requested: u64 },

    /// Resulting debt would sit below `minimum_debt + liquidation_reserve`
    BelowMinimumDebt { amount: u64, minimum: u64 },

    // ============ Solvency Errors ============
    /// Collateral ratio below MCR
    InsufficientCollateral { ratio_bps: u64, required_bps: u64 },

    /// Collateral ratio is not below the liquidation threshold
    CannotLiquidate { ratio_bps: u64, threshold_bps: u64 },

    // ============ Position Lifecycle Errors ============
    /// Owner already has a trove for this collateral type
    PositionAlreadyExists { owner: Address },

    /// Owner has no open trove for this collateral type
    NoPositionExists { owner: Address },

    // ============ Liquidation Sizing Errors ============
    /// Debt is too small to be split into 0.1% chunks
    PositionTooSmallForPartialLiquidation { debt: u64 },

    /// Requested amount truncates to zero chunks
    LiquidationAmountTooSmall { requested: u64, chunk: u64 },

    /// Remaining debt after partial liquidation would be below minimum
    InvalidDebtAmount { remaining: u64, minimum: u64 },

    /// Liquidator is the trove owner
    SelfLiquidation,

    // ============ Market Data Errors ============
    /// No price feed configured for the collateral type
    OracleNotFound,

    /// Last price update is older than the feed's max age
    PriceStale {
        publish_time: u64,
        now: u64,
        max_age: u64,
    },

    /// Price is zero or above the sanity ceiling
    InvalidPrice { price: u64 },

    // ============ Redemption Errors ============
    /// Target has not opted in as a redemption provider
    NotRedemptionProvider { provider: Address },

    /// Redemption fee or gratuity rounds down to zero
    FeeTooSmall,

    /// Collateral out after fees is below the caller's minimum
    SlippageExceeded { collateral_out: u64, min_collateral_out: u64 },

    // ============ Input Validation Errors ============
    /// Parallel input arrays differ in length
    InvalidArrayLength,

    /// Configuration parameter out of range
    InvalidConfig { param: &'static str, reason: &'static str },

    // ============ Authorization Errors ============
    /// Caller is not authorized for this operation
    Unauthorized { expected: Address, actual: Address },

    // ============ Token Errors ============
    /// Minting would exceed the debt token supply cap
    SupplyCapExceeded { supply: u64, requested: u64, cap: u64 },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

/// Error classification used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Eligibility,
    Balance,
    Solvency,
    PositionLifecycle,
    LiquidationSizing,
    MarketData,
    Redemption,
    InputValidation,
    Authorization,
    Arithmetic,
}

impl CdpError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::CollateralDisabled => "E001_COLLATERAL_DISABLED",
            Self::OperationDisabled { .. } => "E002_OPERATION_DISABLED",
            Self::UnsupportedCollateral => "E003_UNSUPPORTED_COLLATERAL",
            Self::InsufficientCollateralBalance { .. } => "E010_INSUFFICIENT_COLL_BALANCE",
            Self::InsufficientDebtBalance { .. } => "E011_INSUFFICIENT_DEBT_BALANCE",
            Self::BelowMinimumDebt { .. } => "E012_BELOW_MIN_DEBT",
            Self::InsufficientCollateral { .. } => "E020_INSUFFICIENT_COLLATERAL",
            Self::CannotLiquidate { .. } => "E021_CANNOT_LIQUIDATE",
            Self::PositionAlreadyExists { .. } => "E030_POSITION_EXISTS",
            Self::NoPositionExists { .. } => "E031_NO_POSITION",
            Self::PositionTooSmallForPartialLiquidation { .. } => "E040_POSITION_TOO_SMALL",
            Self::LiquidationAmountTooSmall { .. } => "E041_LIQ_AMOUNT_TOO_SMALL",
            Self::InvalidDebtAmount { .. } => "E042_INVALID_DEBT_AMOUNT",
            Self::SelfLiquidation => "E043_SELF_LIQUIDATION",
            Self::OracleNotFound => "E050_ORACLE_NOT_FOUND",
            Self::PriceStale { .. } => "E051_PRICE_STALE",
            Self::InvalidPrice { .. } => "E052_INVALID_PRICE",
            Self::NotRedemptionProvider { .. } => "E060_NOT_REDEMPTION_PROVIDER",
            Self::FeeTooSmall => "E061_FEE_TOO_SMALL",
            Self::SlippageExceeded { .. } => "E062_SLIPPAGE",
            Self::InvalidArrayLength => "E070_INVALID_ARRAY_LENGTH",
            Self::InvalidConfig { .. } => "E071_INVALID_CONFIG",
            Self::Unauthorized { .. } => "E080_UNAUTHORIZED",
            Self::SupplyCapExceeded { .. } => "E081_SUPPLY_CAP",
            Self::Overflow => "E090_OVERFLOW",
            Self::Underflow => "E091_UNDERFLOW",
            Self::DivisionByZero => "E092_DIV_ZERO",
        }
    }

    /// Returns the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CollateralDisabled
            | Self::OperationDisabled { .. }
            | Self::UnsupportedCollateral => ErrorCategory::Eligibility,
            Self::InsufficientCollateralBalance { .. }
            | Self::InsufficientDebtBalance { .. }
            | Self::BelowMinimumDebt { .. } => ErrorCategory::Balance,
            Self::InsufficientCollateral { .. } | Self::CannotLiquidate { .. } => {
                ErrorCategory::Solvency
            }
            Self::PositionAlreadyExists { .. } | Self::NoPositionExists { .. } => {
                ErrorCategory::PositionLifecycle
            }
            Self::PositionTooSmallForPartialLiquidation { .. }
            | Self::LiquidationAmountTooSmall { .. }
            | Self::InvalidDebtAmount { .. }
            | Self::SelfLiquidation => ErrorCategory::LiquidationSizing,
            Self::OracleNotFound | Self::PriceStale { .. } | Self::InvalidPrice { .. } => {
                ErrorCategory::MarketData
            }
            Self::NotRedemptionProvider { .. }
            | Self::FeeTooSmall
            | Self::SlippageExceeded { .. } => ErrorCategory::Redemption,
            Self::InvalidArrayLength | Self::InvalidConfig { .. } => {
                ErrorCategory::InputValidation
            }
            Self::Unauthorized { .. } | Self::SupplyCapExceeded { .. } => {
                ErrorCategory::Authorization
            }
            Self::Overflow | Self::Underflow | Self::DivisionByZero => ErrorCategory::Arithmetic,
        }
    }

    /// Returns true if the caller can fix this by resubmitting with
    /// corrected parameters or fresher price data
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCollateral { .. }
                | Self::InsufficientCollateralBalance { .. }
                | Self::InsufficientDebtBalance { .. }
                | Self::BelowMinimumDebt { .. }
                | Self::LiquidationAmountTooSmall { .. }
                | Self::InvalidDebtAmount { .. }
                | Self::PriceStale { .. }
                | Self::FeeTooSmall
                | Self::SlippageExceeded { .. }
                | Self::InvalidArrayLength
        )
    }
}

impl fmt::Display for CdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperationDisabled { operation } => {
                write!(f, "{}: {:?} is disabled", self.code(), operation)
            }
            Self::InsufficientCollateralBalance { available, requested }
            | Self::InsufficientDebtBalance { available, requested } => write!(
                f,
                "{}: available {}, requested {}",
                self.code(),
                available,
                requested
            ),
            Self::BelowMinimumDebt { amount, minimum } => {
                write!(f, "{}: {} < {}", self.code(), amount, minimum)
            }
            Self::InsufficientCollateral { ratio_bps, required_bps } => {
                write!(f, "{}: ratio {}bps < {}bps", self.code(), ratio_bps, required_bps)
            }
            Self::CannotLiquidate { ratio_bps, threshold_bps } => {
                write!(f, "{}: ratio {}bps >= {}bps", self.code(), ratio_bps, threshold_bps)
            }
            Self::PriceStale { publish_time, now, max_age } => write!(
                f,
                "{}: published {}, now {}, max age {}s",
                self.code(),
                publish_time,
                now,
                max_age
            ),
            Self::SlippageExceeded { collateral_out, min_collateral_out } => write!(
                f,
                "{}: {} < {}",
                self.code(),
                collateral_out,
                min_collateral_out
            ),
            Self::InvalidConfig { param, reason } => {
                write!(f, "{}: {} {}", self.code(), param, reason)
            }
            _ => f.write_str(self.code()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CdpError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            CdpError::CollateralDisabled,
            CdpError::OperationDisabled { operation: OperationKind::Open },
            CdpError::UnsupportedCollateral,
            CdpError::InsufficientCollateralBalance { available: 0, requested: 1 },
            CdpError::InsufficientDebtBalance { available: 0, requested: 1 },
            CdpError::BelowMinimumDebt { amount: 0, minimum: 1 },
            CdpError::InsufficientCollateral { ratio_bps: 0, required_bps: 1 },
            CdpError::CannotLiquidate { ratio_bps: 1, threshold_bps: 0 },
            CdpError::PositionAlreadyExists { owner: [0u8; 32] },
            CdpError::NoPositionExists { owner: [0u8; 32] },
            CdpError::PositionTooSmallForPartialLiquidation { debt: 1 },
            CdpError::LiquidationAmountTooSmall { requested: 1, chunk: 2 },
            CdpError::InvalidDebtAmount { remaining: 0, minimum: 1 },
            CdpError::SelfLiquidation,
            CdpError::OracleNotFound,
            CdpError::PriceStale { publish_time: 0, now: 1, max_age: 0 },
            CdpError::InvalidPrice { price: 0 },
            CdpError::NotRedemptionProvider { provider: [0u8; 32] },
            CdpError::FeeTooSmall,
            CdpError::SlippageExceeded { collateral_out: 0, min_collateral_out: 1 },
            CdpError::InvalidArrayLength,
            CdpError::InvalidConfig { param: "mcr_bps", reason: "zero" },
            CdpError::Unauthorized { expected: [0u8; 32], actual: [1u8; 32] },
            CdpError::SupplyCapExceeded { supply: 0, requested: 1, cap: 0 },
            CdpError::Overflow,
            CdpError::Underflow,
            CdpError::DivisionByZero,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_categories() {
        assert_eq!(CdpError::SelfLiquidation.category(), ErrorCategory::LiquidationSizing);
        assert_eq!(
            CdpError::PriceStale { publish_time: 0, now: 10, max_age: 5 }.category(),
            ErrorCategory::MarketData
        );
        assert_eq!(CdpError::FeeTooSmall.category(), ErrorCategory::Redemption);
        assert_eq!(CdpError::Overflow.category(), ErrorCategory::Arithmetic);
    }

    #[test]
    fn test_display_includes_code() {
        let err = CdpError::InsufficientCollateral { ratio_bps: 11_000, required_bps: 12_000 };
        let text = err.to_string();
        assert!(text.starts_with("E020_INSUFFICIENT_COLLATERAL"));
        assert!(text.contains("11000"));
        assert!(err.is_recoverable());
        assert!(!CdpError::SelfLiquidation.is_recoverable());
    }
}
