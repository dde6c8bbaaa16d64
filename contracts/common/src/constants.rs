//! Protocol Constants
//!
//! Fixed scales and default economic parameters for the CDP ledger.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production defaults (higher minimum debt and reserve)
//! - Default (no feature) - Testnet defaults (small amounts for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! cdp-common = { path = "...", features = ["mainnet"] }
//! ```

/// Debt Token Metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "dUSD";
    /// Token symbol
    pub const SYMBOL: &str = "dUSD";
    /// Decimal places of the debt token (fixed)
    pub const DECIMALS: u8 = 8;
    /// One unit with decimals (1 dUSD = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
    /// Maximum debt token supply
    pub const MAX_SUPPLY: u64 = 10_000_000_000 * ONE;
}

/// Basis point arithmetic
pub mod bps {
    /// Basis points denominator (10000 = 100%)
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Collateral ratio at which collateral value equals debt
    pub const PAR_RATIO_BPS: u64 = 10_000;
}

/// Binary fixed-point representation of oracle prices
pub mod fixed_point {
    /// Number of fractional bits (implicit denominator 2^32)
    pub const FRACTIONAL_BITS: u32 = 32;

    /// 1.0 in fixed-point representation
    pub const ONE_RAW: u128 = 1u128 << FRACTIONAL_BITS;
}

/// Oracle Configuration
pub mod oracle {
    /// USD prices are quoted with 8 decimals
    pub const PRICE_DECIMALS: u8 = 8;

    /// 1 USD in 8-decimal units
    pub const USD_ONE: u64 = 100_000_000;

    /// Sanity ceiling for a quoted price (8-decimal USD units)
    pub const MAX_PRICE_USD: u64 = 1_000_000_000_000_000_000; // 1e18

    /// Maximum price age before a feed is stale
    /// - Mainnet: 60 seconds
    /// - Testnet: 1 hour
    #[cfg(feature = "mainnet")]
    pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 60;
    #[cfg(not(feature = "mainnet"))]
    pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 3_600;
}

/// Liquidation Configuration
pub mod liquidation {
    /// Partial liquidations are sized in chunks of `debt / PARTIAL_CHUNK_DIVISOR` (0.1%)
    pub const PARTIAL_CHUNK_DIVISOR: u64 = 1_000;
}

/// Collateral asset limits
pub mod limits {
    /// Largest supported asset decimal precision
    pub const MAX_ASSET_DECIMALS: u8 = 18;

    /// Maximum length of an asset identifier
    pub const MAX_ASSET_ID_LEN: usize = 32;
}

/// Default per-asset economic parameters
///
/// Values differ between mainnet and testnet to allow easier testing.
pub mod defaults {
    use super::token::ONE;

    /// Minimum debt to open a trove
    /// - Mainnet: 1,000 dUSD
    /// - Testnet: 10 dUSD
    #[cfg(feature = "mainnet")]
    pub const MINIMUM_DEBT: u64 = 1_000 * ONE;
    #[cfg(not(feature = "mainnet"))]
    pub const MINIMUM_DEBT: u64 = 10 * ONE;

    /// Liquidation reserve set aside at open
    /// - Mainnet: 200 dUSD
    /// - Testnet: 2 dUSD
    #[cfg(feature = "mainnet")]
    pub const LIQUIDATION_RESERVE: u64 = 200 * ONE;
    #[cfg(not(feature = "mainnet"))]
    pub const LIQUIDATION_RESERVE: u64 = 2 * ONE;

    /// Minimum collateral ratio (120%)
    pub const MCR_BPS: u64 = 12_000;

    /// Liquidation threshold (115%)
    pub const LIQUIDATION_THRESHOLD_BPS: u64 = 11_500;

    /// Liquidation penalty (10% of liquidated debt)
    pub const LIQUIDATION_PENALTY_BPS: u64 = 1_000;

    /// Protocol share of the liquidation penalty (20%)
    pub const LIQUIDATION_FEE_PROTOCOL_BPS: u64 = 2_000;

    /// One-off borrow fee (0.5%)
    pub const BORROW_RATE_BPS: u64 = 50;

    /// Redemption fee (0.5%)
    pub const REDEMPTION_FEE_BPS: u64 = 50;

    /// Redemption gratuity paid to the provider (0.25%)
    pub const REDEMPTION_FEE_GRATUITY_BPS: u64 = 25;

    /// Helper to check if running in mainnet mode
    #[cfg(feature = "mainnet")]
    pub const IS_MAINNET: bool = true;
    #[cfg(not(feature = "mainnet"))]
    pub const IS_MAINNET: bool = false;
}
