//! Protocol Events for the CDP Ledger
//!
//! Events are recorded during an operation and can be indexed off-chain
//! for UIs, analytics and notifications. They live in the same staged state
//! as the ledger, so a failed operation leaves no events behind.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetId, CollateralConfig, OperationFlags, Timestamp};
use crate::Vec;

/// Event types for indexing and filtering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Trove Events (0x01 - 0x1F)
    TroveOpened = 0x01,
    TroveClosed = 0x02,
    CollateralDeposited = 0x03,
    CollateralWithdrawn = 0x04,
    DebtMinted = 0x05,
    DebtRepaid = 0x06,

    // Liquidation Events (0x20 - 0x3F)
    TroveLiquidated = 0x20,
    TrovePartiallyLiquidated = 0x21,

    // Redemption Events (0x40 - 0x5F)
    Redemption = 0x40,
    RedemptionProviderChanged = 0x41,

    // Oracle Events (0x60 - 0x7F)
    PriceUpdated = 0x60,
    FeedRegistered = 0x61,

    // Configuration Events (0x80 - 0x9F)
    CollateralRegistered = 0x80,
    ConfigUpdated = 0x81,
    FlagsUpdated = 0x82,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum CdpEvent {
    // ============ Trove Events ============

    /// Emitted when a new trove is opened
    TroveOpened {
        owner: Address,
        asset: AssetId,
        collateral: u64,
        debt_minted: u64,
        borrow_fee: u64,
        liquidation_reserve: u64,
        total_debt: u64,
        timestamp: Timestamp,
    },

    /// Emitted when a trove is closed by its owner
    TroveClosed {
        owner: Address,
        asset: AssetId,
        collateral_returned: u64,
        debt_repaid: u64,
        timestamp: Timestamp,
    },

    /// Emitted when collateral is added to a trove
    CollateralDeposited {
        owner: Address,
        asset: AssetId,
        amount: u64,
        new_collateral: u64,
        timestamp: Timestamp,
    },

    /// Emitted when collateral is withdrawn from a trove
    CollateralWithdrawn {
        owner: Address,
        asset: AssetId,
        amount: u64,
        new_collateral: u64,
        timestamp: Timestamp,
    },

    /// Emitted when additional debt is minted
    DebtMinted {
        owner: Address,
        asset: AssetId,
        amount: u64,
        borrow_fee: u64,
        new_debt: u64,
        new_ratio_bps: u64,
        timestamp: Timestamp,
    },

    /// Emitted when debt is repaid
    DebtRepaid {
        owner: Address,
        asset: AssetId,
        amount: u64,
        new_debt: u64,
        timestamp: Timestamp,
    },

    // ============ Liquidation Events ============

    /// Emitted when a whole trove is liquidated
    TroveLiquidated {
        owner: Address,
        liquidator: Address,
        asset: AssetId,
        ratio_bps: u64,
        debt_burned: u64,
        collateral_to_liquidator: u64,
        protocol_fee: u64,
        owner_refund: u64,
        reserve_to_liquidator: u64,
        timestamp: Timestamp,
    },

    /// Emitted when part of a trove is liquidated
    TrovePartiallyLiquidated {
        owner: Address,
        liquidator: Address,
        asset: AssetId,
        ratio_bps: u64,
        debt_burned: u64,
        collateral_seized: u64,
        collateral_to_liquidator: u64,
        protocol_fee: u64,
        owner_refund: u64,
        remaining_collateral: u64,
        remaining_debt: u64,
        timestamp: Timestamp,
    },

    // ============ Redemption Events ============

    /// Emitted on each redemption against a provider
    Redemption {
        redeemer: Address,
        provider: Address,
        asset: AssetId,
        debt_redeemed: u64,
        collateral_to_redeemer: u64,
        redemption_fee: u64,
        gratuity_fee: u64,
        closed_position: bool,
        timestamp: Timestamp,
    },

    /// Emitted when a trove opts in or out of redemptions
    RedemptionProviderChanged {
        owner: Address,
        asset: AssetId,
        is_provider: bool,
        timestamp: Timestamp,
    },

    // ============ Oracle Events ============

    /// Emitted when an operator pushes a new price
    PriceUpdated {
        asset: AssetId,
        old_price: u64,
        new_price: u64,
        publish_time: Timestamp,
    },

    /// Emitted when a price feed is registered
    FeedRegistered {
        asset: AssetId,
        operator: Address,
        max_age_secs: u64,
        timestamp: Timestamp,
    },

    // ============ Configuration Events ============

    /// Emitted when a collateral type is registered
    CollateralRegistered {
        asset: AssetId,
        config: CollateralConfig,
        timestamp: Timestamp,
    },

    /// Emitted when a collateral config changes
    ConfigUpdated {
        asset: AssetId,
        config: CollateralConfig,
        timestamp: Timestamp,
    },

    /// Emitted when operation flags change
    FlagsUpdated {
        asset: AssetId,
        enabled: bool,
        flags: OperationFlags,
        timestamp: Timestamp,
    },
}

impl CdpEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TroveOpened { .. } => EventType::TroveOpened,
            Self::TroveClosed { .. } => EventType::TroveClosed,
            Self::CollateralDeposited { .. } => EventType::CollateralDeposited,
            Self::CollateralWithdrawn { .. } => EventType::CollateralWithdrawn,
            Self::DebtMinted { .. } => EventType::DebtMinted,
            Self::DebtRepaid { .. } => EventType::DebtRepaid,
            Self::TroveLiquidated { .. } => EventType::TroveLiquidated,
            Self::TrovePartiallyLiquidated { .. } => EventType::TrovePartiallyLiquidated,
            Self::Redemption { .. } => EventType::Redemption,
            Self::RedemptionProviderChanged { .. } => EventType::RedemptionProviderChanged,
            Self::PriceUpdated { .. } => EventType::PriceUpdated,
            Self::FeedRegistered { .. } => EventType::FeedRegistered,
            Self::CollateralRegistered { .. } => EventType::CollateralRegistered,
            Self::ConfigUpdated { .. } => EventType::ConfigUpdated,
            Self::FlagsUpdated { .. } => EventType::FlagsUpdated,
        }
    }

    /// Get the time the event occurred
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::TroveOpened { timestamp, .. }
            | Self::TroveClosed { timestamp, .. }
            | Self::CollateralDeposited { timestamp, .. }
            | Self::CollateralWithdrawn { timestamp, .. }
            | Self::DebtMinted { timestamp, .. }
            | Self::DebtRepaid { timestamp, .. }
            | Self::TroveLiquidated { timestamp, .. }
            | Self::TrovePartiallyLiquidated { timestamp, .. }
            | Self::Redemption { timestamp, .. }
            | Self::RedemptionProviderChanged { timestamp, .. }
            | Self::FeedRegistered { timestamp, .. }
            | Self::CollateralRegistered { timestamp, .. }
            | Self::ConfigUpdated { timestamp, .. }
            | Self::FlagsUpdated { timestamp, .. } => *timestamp,
            Self::PriceUpdated { publish_time, .. } => *publish_time,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<CdpEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: CdpEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[CdpEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<CdpEvent> {
        self.events
    }

    /// Remove and return all events
    pub fn drain(&mut self) -> Vec<CdpEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&CdpEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&CdpEvent> {
        self.events.last()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> AssetId {
        AssetId::new("BTC").unwrap()
    }

    #[test]
    fn test_event_type() {
        let event = CdpEvent::TroveOpened {
            owner: [2u8; 32],
            asset: btc(),
            collateral: 1_320,
            debt_minted: 1_000,
            borrow_fee: 5,
            liquidation_reserve: 10,
            total_debt: 1_015,
            timestamp: 100,
        };

        assert_eq!(event.event_type(), EventType::TroveOpened);
        assert_eq!(event.timestamp(), 100);
    }

    #[test]
    fn test_event_serialization() {
        let event = CdpEvent::Redemption {
            redeemer: [1u8; 32],
            provider: [2u8; 32],
            asset: btc(),
            debt_redeemed: 500,
            collateral_to_redeemer: 496,
            redemption_fee: 2,
            gratuity_fee: 1,
            closed_position: false,
            timestamp: 200,
        };

        let bytes = event.to_bytes();
        let restored = CdpEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.emit(CdpEvent::CollateralDeposited {
            owner: [2u8; 32],
            asset: btc(),
            amount: 10,
            new_collateral: 110,
            timestamp: 100,
        });
        log.emit(CdpEvent::DebtRepaid {
            owner: [2u8; 32],
            asset: btc(),
            amount: 5,
            new_debt: 200,
            timestamp: 100,
        });

        assert_eq!(log.len(), 2);
        assert!(log.has_events());
        assert_eq!(log.filter_by_type(EventType::DebtRepaid).len(), 1);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }
}
