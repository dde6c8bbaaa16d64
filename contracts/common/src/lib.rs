//! CDP Ledger Common Library
//!
//! Shared types, constants and pure calculators for all CDP ledger crates.
//!
//! ## Contents
//!
//! - **Fixed-Point Arithmetic**: oracle prices as 32-bit binary fractions,
//!   decimal normalization and the collateral-ratio primitive
//! - **Liquidation Calculator**: full and partial liquidation with
//!   penalty/fee/refund splitting
//! - **Redemption Calculator**: debt-for-collateral extraction with fee,
//!   gratuity and minimum-debt truncation
//! - **Events**: typed, serializable protocol events
//! - **Errors**: one classified error enum for the whole protocol
//!
//! Nothing in this crate mutates ledger state; the trove manager owns all
//! writes.
//!
//! This crate is `no_std` compatible when built without the default `std`
//! feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collection types for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{string::String, vec::Vec};
#[cfg(feature = "std")]
pub use std::{string::String, vec::Vec};

pub mod constants;
pub mod errors;
pub mod events;
pub mod liquidation;
pub mod math;
pub mod redemption;
pub mod types;

// Re-exports for convenience
pub use errors::*;
pub use events::*;
pub use liquidation::*;
pub use math::*;
pub use redemption::*;
pub use types::*;
