//! Collateral Config Store
//!
//! Per-asset [`CollateralConfig`] plus its operation flags. Writes are
//! admin-gated and validated; the engine only reads through
//! [`ConfigProvider`].

use std::collections::BTreeMap;

use cdp_common::{
    errors::{CdpError, CdpResult},
    events::{CdpEvent, EventLog},
    types::{Address, AssetId, CollateralConfig, OperationFlags, Timestamp},
};

/// Read side of the config store as seen by the engine
pub trait ConfigProvider {
    /// Config of `asset`, or `UnsupportedCollateral` if it was never registered
    fn collateral_config(&self, asset: &AssetId) -> CdpResult<&CollateralConfig>;
}

/// Admin-owned registry of collateral configs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    admin: Address,
    configs: BTreeMap<AssetId, CollateralConfig>,
    events: EventLog,
}

impl ConfigStore {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            configs: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Register a new collateral type
    pub fn register_collateral(
        &mut self,
        signer: Address,
        asset: AssetId,
        config: CollateralConfig,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        if self.configs.contains_key(&asset) {
            return Err(CdpError::InvalidConfig {
                param: "asset",
                reason: "already registered",
            });
        }
        config.validate()?;

        log::info!("registered collateral {asset} (decimals {})", config.decimals);
        self.events.emit(CdpEvent::CollateralRegistered {
            asset: asset.clone(),
            config: config.clone(),
            timestamp: now,
        });
        self.configs.insert(asset, config);
        Ok(())
    }

    /// Replace the parameters of a registered collateral type
    pub fn update_config(
        &mut self,
        signer: Address,
        asset: &AssetId,
        config: CollateralConfig,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        config.validate()?;
        let slot = self
            .configs
            .get_mut(asset)
            .ok_or(CdpError::UnsupportedCollateral)?;
        *slot = config.clone();

        self.events.emit(CdpEvent::ConfigUpdated {
            asset: asset.clone(),
            config,
            timestamp: now,
        });
        Ok(())
    }

    /// Set the four per-operation flags
    pub fn set_flags(
        &mut self,
        signer: Address,
        asset: &AssetId,
        flags: OperationFlags,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        let config = self
            .configs
            .get_mut(asset)
            .ok_or(CdpError::UnsupportedCollateral)?;
        config.flags = flags;
        let enabled = config.enabled;
        self.emit_flags(asset, enabled, flags, now);
        Ok(())
    }

    /// Switch a whole collateral type on or off
    pub fn set_enabled(
        &mut self,
        signer: Address,
        asset: &AssetId,
        enabled: bool,
        now: Timestamp,
    ) -> CdpResult<()> {
        self.require_admin(signer)?;
        let config = self
            .configs
            .get_mut(asset)
            .ok_or(CdpError::UnsupportedCollateral)?;
        config.enabled = enabled;
        let flags = config.flags;
        if !enabled {
            log::warn!("collateral {asset} disabled");
        }
        self.emit_flags(asset, enabled, flags, now);
        Ok(())
    }

    pub fn config(&self, asset: &AssetId) -> Option<&CollateralConfig> {
        self.configs.get(asset)
    }

    /// Registered collateral types in key order
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.configs.keys()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CdpEvent> {
        self.events.drain()
    }

    fn emit_flags(&mut self, asset: &AssetId, enabled: bool, flags: OperationFlags, now: Timestamp) {
        self.events.emit(CdpEvent::FlagsUpdated {
            asset: asset.clone(),
            enabled,
            flags,
            timestamp: now,
        });
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

impl ConfigProvider for ConfigStore {
    fn collateral_config(&self, asset: &AssetId) -> CdpResult<&CollateralConfig> {
        self.configs.get(asset).ok_or(CdpError::UnsupportedCollateral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_common::types::OperationKind;

    const ADMIN: Address = [1u8; 32];
    const USER: Address = [2u8; 32];

    fn btc() -> AssetId {
        AssetId::new("BTC").unwrap()
    }

    fn create_test_store() -> ConfigStore {
        let mut store = ConfigStore::new(ADMIN);
        store
            .register_collateral(ADMIN, btc(), CollateralConfig::new(8), 0)
            .unwrap();
        store
    }

    #[test]
    fn test_register_and_read() {
        let store = create_test_store();
        assert_eq!(store.collateral_config(&btc()).unwrap().decimals, 8);
        assert_eq!(store.assets().count(), 1);
        assert_eq!(
            store.collateral_config(&AssetId::new("ETH").unwrap()),
            Err(CdpError::UnsupportedCollateral)
        );
    }

    #[test]
    fn test_writes_require_admin() {
        let mut store = create_test_store();
        let eth = AssetId::new("ETH").unwrap();
        assert!(matches!(
            store.register_collateral(USER, eth, CollateralConfig::new(18), 0),
            Err(CdpError::Unauthorized { .. })
        ));
        assert!(matches!(
            store.set_enabled(USER, &btc(), false, 0),
            Err(CdpError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut store = create_test_store();
        let result = store.register_collateral(ADMIN, btc(), CollateralConfig::new(8), 0);
        assert!(matches!(result, Err(CdpError::InvalidConfig { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut store = create_test_store();
        let mut config = CollateralConfig::new(8);
        config.redemption_fee_bps = 10_001;
        assert!(matches!(
            store.update_config(ADMIN, &btc(), config, 0),
            Err(CdpError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_flags_and_enable() {
        let mut store = create_test_store();
        let flags = OperationFlags {
            open: false,
            ..OperationFlags::ALL
        };
        store.set_flags(ADMIN, &btc(), flags, 10).unwrap();
        let config = store.collateral_config(&btc()).unwrap();
        assert_eq!(
            config.require_enabled(OperationKind::Open),
            Err(CdpError::OperationDisabled { operation: OperationKind::Open })
        );

        store.set_enabled(ADMIN, &btc(), false, 11).unwrap();
        let config = store.collateral_config(&btc()).unwrap();
        assert_eq!(
            config.require_enabled(OperationKind::Borrow),
            Err(CdpError::CollateralDisabled)
        );
        assert_eq!(store.events().len(), 3);
    }
}
