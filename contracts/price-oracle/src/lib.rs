//! Price Oracle
//!
//! Per-asset USD price feeds for the CDP ledger. Each feed is written by a
//! trusted operator and read by the trove manager through the
//! [`PriceOracle`] trait.
//!
//! ## Freshness
//!
//! Every feed carries its own `max_age_secs`. A read at time `now` fails with
//! [`CdpError::PriceStale`] when `now - publish_time > max_age_secs`; there is
//! no fallback to an older price.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cdp_common::{
    constants::oracle::{DEFAULT_MAX_PRICE_AGE_SECS, MAX_PRICE_USD},
    errors::{CdpError, CdpResult},
    events::{CdpEvent, EventLog},
    math::FixedPointPrice,
    types::{Address, AssetId, Timestamp},
};

// ============ Oracle Interface ============

/// Read side of the oracle as seen by the trove manager
pub trait PriceOracle {
    /// Fresh, validated fixed-point price of `asset` at time `now`
    fn get_price(&self, asset: &AssetId, now: Timestamp) -> CdpResult<FixedPointPrice>;
}

// ============ Feed State ============

/// Stored state of one asset's price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceFeed {
    /// Last pushed price, 8-decimal USD (0 until the first push)
    pub price_usd: u64,
    /// Publish time of the last push
    pub publish_time: Timestamp,
    /// Maximum accepted age of a price in seconds
    pub max_age_secs: u64,
    /// Authorized operator (can push prices)
    pub operator: Address,
}

impl PriceFeed {
    /// Create an empty feed
    pub fn new(operator: Address, max_age_secs: u64) -> Self {
        Self {
            price_usd: 0,
            publish_time: 0,
            max_age_secs,
            operator,
        }
    }

    /// Returns true if the last push is within `max_age_secs` of `now`
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now.saturating_sub(self.publish_time) <= self.max_age_secs
    }

    fn check_fresh(&self, now: Timestamp) -> CdpResult<()> {
        if !self.is_fresh(now) {
            return Err(CdpError::PriceStale {
                publish_time: self.publish_time,
                now,
                max_age: self.max_age_secs,
            });
        }
        Ok(())
    }
}

// ============ Registry ============

/// All price feeds, keyed by collateral asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRegistry {
    /// Admin (can register feeds and change operators)
    admin: Address,
    feeds: BTreeMap<AssetId, PriceFeed>,
    events: EventLog,
}

impl OracleRegistry {
    /// Create an empty registry
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            feeds: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    /// Registry admin
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Register (or re-register) the feed for `asset`
    ///
    /// Re-registering keeps the last pushed price and publish time.
    pub fn register_feed(
        &mut self,
        signer: Address,
        asset: AssetId,
        operator: Address,
        max_age_secs: u64,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        if max_age_secs == 0 {
            return Err(CdpError::InvalidConfig {
                param: "max_age_secs",
                reason: "must be positive",
            });
        }

        let feed = self
            .feeds
            .entry(asset.clone())
            .or_insert_with(|| PriceFeed::new(operator, max_age_secs));
        feed.operator = operator;
        feed.max_age_secs = max_age_secs;

        log::info!("registered price feed for {asset} (max age {max_age_secs}s)");
        self.events.emit(CdpEvent::FeedRegistered {
            asset,
            operator,
            max_age_secs,
            timestamp: now,
        });
        Ok(())
    }

    /// Register a feed with the network default max age
    pub fn register_default_feed(
        &mut self,
        signer: Address,
        asset: AssetId,
        operator: Address,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.register_feed(signer, asset, operator, DEFAULT_MAX_PRICE_AGE_SECS, now)
    }

    /// Push a new price for `asset`
    ///
    /// Only the feed's operator may push. Publish times never move backwards.
    pub fn push_price(
        &mut self,
        signer: Address,
        asset: &AssetId,
        price_usd: u64,
        publish_time: Timestamp,
    ) -> CdpResult<()> {
        let feed = self.feeds.get_mut(asset).ok_or(CdpError::OracleNotFound)?;

        // 1. Verify caller is operator
        if signer != feed.operator {
            return Err(CdpError::Unauthorized {
                expected: feed.operator,
                actual: signer,
            });
        }

        // 2. Validate price range
        if price_usd == 0 || price_usd > MAX_PRICE_USD {
            return Err(CdpError::InvalidPrice { price: price_usd });
        }

        // 3. Reject out-of-order updates
        if publish_time < feed.publish_time {
            return Err(CdpError::PriceStale {
                publish_time,
                now: feed.publish_time,
                max_age: 0,
            });
        }

        let old_price = feed.price_usd;
        feed.price_usd = price_usd;
        feed.publish_time = publish_time;

        log::debug!("{asset} price {old_price} -> {price_usd} at {publish_time}");
        self.events.emit(CdpEvent::PriceUpdated {
            asset: asset.clone(),
            old_price,
            new_price: price_usd,
            publish_time,
        });
        Ok(())
    }

    /// Change the operator of an existing feed (admin only)
    pub fn set_operator(
        &mut self,
        signer: Address,
        asset: &AssetId,
        new_operator: Address,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        let feed = self.feeds.get_mut(asset).ok_or(CdpError::OracleNotFound)?;
        feed.operator = new_operator;
        Ok(())
    }

    /// Stored feed for `asset`
    pub fn feed(&self, asset: &AssetId) -> Option<&PriceFeed> {
        self.feeds.get(asset)
    }

    /// Returns true if `asset` has a feed whose last push is fresh at `now`
    pub fn is_price_fresh(&self, asset: &AssetId, now: Timestamp) -> bool {
        self.feeds.get(asset).is_some_and(|feed| feed.is_fresh(now))
    }

    /// Last price and its freshness, for display only (never for ledger math)
    pub fn price_for_display(&self, asset: &AssetId, now: Timestamp) -> Option<(u64, bool)> {
        self.feeds
            .get(asset)
            .map(|feed| (feed.price_usd, feed.is_fresh(now)))
    }

    /// Events emitted by registry writes
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return recorded events
    pub fn drain_events(&mut self) -> Vec<CdpEvent> {
        self.events.drain()
    }

    fn require_admin(&self, signer: Address) -> CdpResult<()> {
        if signer != self.admin {
            return Err(CdpError::Unauthorized {
                expected: self.admin,
                actual: signer,
            });
        }
        Ok(())
    }
}

impl PriceOracle for OracleRegistry {
    fn get_price(&self, asset: &AssetId, now: Timestamp) -> CdpResult<FixedPointPrice> {
        let feed = self.feeds.get(asset).ok_or(CdpError::OracleNotFound)?;
        feed.check_fresh(now)?;
        FixedPointPrice::from_usd(feed.price_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_common::{constants::fixed_point::ONE_RAW, events::EventType};

    const ADMIN: Address = [1u8; 32];
    const OPERATOR: Address = [2u8; 32];
    const STRANGER: Address = [3u8; 32];

    fn btc() -> AssetId {
        AssetId::new("BTC").unwrap()
    }

    fn create_test_registry() -> OracleRegistry {
        let mut registry = OracleRegistry::new(ADMIN);
        registry.register_feed(ADMIN, btc(), OPERATOR, 60, 1_000).unwrap();
        registry
    }

    #[test]
    fn test_register_requires_admin() {
        let mut registry = OracleRegistry::new(ADMIN);
        let result = registry.register_feed(STRANGER, btc(), OPERATOR, 60, 0);
        assert!(matches!(result, Err(CdpError::Unauthorized { .. })));
        assert!(registry.feed(&btc()).is_none());
    }

    #[test]
    fn test_push_and_read_price() {
        let mut registry = create_test_registry();
        registry.push_price(OPERATOR, &btc(), 100_000_000, 1_000).unwrap();

        let price = registry.get_price(&btc(), 1_030).unwrap();
        assert_eq!(price.raw(), ONE_RAW);
        assert_eq!(registry.events().filter_by_type(EventType::PriceUpdated).len(), 1);
    }

    #[test]
    fn test_push_requires_operator() {
        let mut registry = create_test_registry();
        let result = registry.push_price(STRANGER, &btc(), 100_000_000, 1_000);
        assert!(matches!(result, Err(CdpError::Unauthorized { .. })));
    }

    #[test]
    fn test_invalid_prices_rejected() {
        let mut registry = create_test_registry();
        assert_eq!(
            registry.push_price(OPERATOR, &btc(), 0, 1_000),
            Err(CdpError::InvalidPrice { price: 0 })
        );
        assert!(matches!(
            registry.push_price(OPERATOR, &btc(), MAX_PRICE_USD + 1, 1_000),
            Err(CdpError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_out_of_order_push_rejected() {
        let mut registry = create_test_registry();
        registry.push_price(OPERATOR, &btc(), 100_000_000, 1_000).unwrap();
        let result = registry.push_price(OPERATOR, &btc(), 200_000_000, 999);
        assert!(matches!(result, Err(CdpError::PriceStale { .. })));
        assert_eq!(registry.feed(&btc()).unwrap().price_usd, 100_000_000);
    }

    #[test]
    fn test_stale_price() {
        let mut registry = create_test_registry();
        registry.push_price(OPERATOR, &btc(), 100_000_000, 1_000).unwrap();

        assert!(registry.get_price(&btc(), 1_060).is_ok());
        assert_eq!(
            registry.get_price(&btc(), 1_061),
            Err(CdpError::PriceStale { publish_time: 1_000, now: 1_061, max_age: 60 })
        );
        assert!(!registry.is_price_fresh(&btc(), 1_061));
        assert_eq!(registry.price_for_display(&btc(), 1_061), Some((100_000_000, false)));
    }

    #[test]
    fn test_missing_feed() {
        let registry = create_test_registry();
        let eth = AssetId::new("ETH").unwrap();
        assert_eq!(registry.get_price(&eth, 0), Err(CdpError::OracleNotFound));
    }

    #[test]
    fn test_feed_without_price_is_invalid() {
        let registry = create_test_registry();
        // Fresh by publish time 0 with max age 60, but never pushed
        assert_eq!(registry.get_price(&btc(), 10), Err(CdpError::InvalidPrice { price: 0 }));
    }

    #[test]
    fn test_set_operator() {
        let mut registry = create_test_registry();
        assert!(registry.set_operator(STRANGER, &btc(), STRANGER).is_err());

        registry.set_operator(ADMIN, &btc(), STRANGER).unwrap();
        assert!(registry.push_price(OPERATOR, &btc(), 100_000_000, 1_000).is_err());
        assert!(registry.push_price(STRANGER, &btc(), 100_000_000, 1_000).is_ok());
    }
}
