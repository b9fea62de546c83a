// 8.0 engine/core.rs: main engine. holds the registry, every position, and the
// two external collaborators (stable ledger and collateral custody).

use super::config::EngineConfig;
use super::results::{AccountInformation, EngineError};
use crate::account::{AccountingState, UserPosition};
use crate::custody::{CollateralCustody, CollateralVault};
use crate::events::{Event, EventLog};
use crate::ledger::{StableAssetLedger, StableCoin};
use crate::liquidation::PositionStatus;
use crate::price_feed::{PriceOracle, SharedOracle};
use crate::registry::{CollateralAsset, CollateralRegistry};
use crate::types::{AssetId, HealthFactor, Quantity, Timestamp, Usd, UserId};
use crate::valuation::ValuationEngine;
use tracing::info;

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine<L = StableCoin, C = CollateralVault> {
    pub(super) config: EngineConfig,
    pub(super) registry: CollateralRegistry,
    pub(super) accounting: AccountingState,
    pub(super) stable: L,
    pub(super) custody: C,
    pub(super) events: EventLog,
    pub(super) current_time: Timestamp,
}

impl<L: StableAssetLedger, C: CollateralCustody> Engine<L, C> {
    /// `stable` must already accept `config.engine_account` as its minter.
    pub fn new(config: EngineConfig, registry: CollateralRegistry, stable: L, custody: C) -> Result<Self, EngineError> {
        config.risk.validate()?;
        info!(
            assets = registry.len(),
            engine = %config.engine_account,
            threshold = config.risk.liquidation_threshold_percent,
            "engine created"
        );
        Ok(Self {
            events: EventLog::new(config.max_events),
            config,
            registry,
            accounting: AccountingState::new(),
            stable,
            custody,
            current_time: Timestamp::from_millis(0),
        })
    }

    /// Build the registry from parallel asset/feed lists, then the engine.
    pub fn with_collateral(
        config: EngineConfig,
        assets: Vec<CollateralAsset>,
        feeds: Vec<SharedOracle>,
        stable: L,
        custody: C,
    ) -> Result<Self, EngineError> {
        let registry = CollateralRegistry::new(assets, feeds)?;
        Self::new(config, registry, stable, custody)
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis().saturating_add(millis));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn valuation(&self) -> ValuationEngine<'_> {
        ValuationEngine::new(&self.registry, &self.config.risk)
    }

    pub fn health_factor(&self, user: UserId) -> Result<HealthFactor, EngineError> {
        let position = self.accounting.position(user);
        Ok(self.valuation().health_factor(&position)?)
    }

    pub fn status(&self, user: UserId) -> Result<PositionStatus, EngineError> {
        let health_factor = self.health_factor(user)?;
        Ok(PositionStatus::evaluate(health_factor, &self.config.risk))
    }

    pub fn account_information(&self, user: UserId) -> Result<AccountInformation, EngineError> {
        let position = self.accounting.position(user);
        let collateral_value_usd = self.valuation().total_collateral_value(&position)?;
        Ok(AccountInformation {
            debt_minted: position.debt_minted,
            collateral_value_usd,
        })
    }

    pub fn collateral_balance_of(&self, user: UserId, asset: AssetId) -> Quantity {
        self.accounting.collateral_balance(user, asset)
    }

    pub fn account_collateral_value(&self, user: UserId) -> Result<Usd, EngineError> {
        Ok(self.account_information(user)?.collateral_value_usd)
    }

    pub fn usd_value(&self, asset: AssetId, quantity: Quantity) -> Result<Usd, EngineError> {
        Ok(self.valuation().usd_value(asset, quantity)?)
    }

    pub fn token_amount_from_usd(&self, asset: AssetId, usd: Usd) -> Result<Quantity, EngineError> {
        Ok(self.valuation().quantity_from_usd(asset, usd)?)
    }

    pub fn price_feed_for(&self, asset: AssetId) -> Result<&dyn PriceOracle, EngineError> {
        Ok(self.registry.price_feed_for(asset)?)
    }

    pub fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    pub fn collateral_tokens(&self) -> Vec<AssetId> {
        self.registry.collateral_tokens().map(|asset| asset.id).collect()
    }

    pub fn position(&self, user: UserId) -> UserPosition {
        self.accounting.position(user)
    }

    pub fn accounting(&self) -> &AccountingState {
        &self.accounting
    }

    pub fn stable_ledger(&self) -> &L {
        &self.stable
    }

    /// Direct ledger access for holder-side actions such as transfers.
    pub fn stable_ledger_mut(&mut self) -> &mut L {
        &mut self.stable
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn min_health_factor(&self) -> HealthFactor {
        self.config.risk.min_health_factor()
    }

    pub fn liquidation_threshold(&self) -> u128 {
        self.config.risk.liquidation_threshold_percent
    }

    pub fn liquidation_bonus(&self) -> u128 {
        self.config.risk.liquidation_bonus_divisor
    }

    pub fn precision(&self) -> u128 {
        self.config.risk.precision
    }

    /// Scaling applied to `asset`'s feed answer (1e10 for an 8-decimal feed).
    pub fn additional_feed_precision(&self, asset: AssetId) -> Result<u128, EngineError> {
        let decimals = self.registry.price_feed_for(asset)?.decimals();
        self.config
            .risk
            .feed_precision_adjustment(decimals)
            .ok_or(EngineError::InvalidPrice { asset })
    }

    pub fn recent_events(&self, count: usize) -> Vec<&Event> {
        self.events.recent(count)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

impl Engine<StableCoin, CollateralVault> {
    /// Fresh ledger owned by the engine account, with the mint capability
    /// handed to the engine, and an empty vault.
    pub fn deploy(config: EngineConfig, assets: Vec<CollateralAsset>, feeds: Vec<SharedOracle>) -> Result<Self, EngineError> {
        let engine_account = config.engine_account;
        let mut stable = StableCoin::new("Decentralized Stable Coin", "DSC", engine_account);
        stable.set_minter(engine_account, engine_account)?;
        Self::with_collateral(config, assets, feeds, stable, CollateralVault::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, RiskParams};
    use crate::math::WAD;
    use crate::price_feed::MockPriceFeed;
    use std::sync::Arc;

    fn engine() -> Engine {
        let eth: SharedOracle = Arc::new(MockPriceFeed::new("ETH / USD", 2000 * 10u128.pow(8), 8));
        let btc: SharedOracle = Arc::new(MockPriceFeed::new("BTC / USD", 1000 * 10u128.pow(8), 8));
        Engine::deploy(
            EngineConfig::default(),
            vec![CollateralAsset::weth(), CollateralAsset::wbtc()],
            vec![eth, btc],
        )
        .unwrap()
    }

    #[test]
    fn deploy_wires_minter() {
        let engine = engine();
        assert_eq!(engine.stable_ledger().minter(), Some(UserId(0)));
        assert_eq!(engine.collateral_tokens(), vec![AssetId(1), AssetId(2)]);
    }

    #[test]
    fn constants() {
        let engine = engine();
        assert_eq!(engine.min_health_factor(), HealthFactor::new(WAD));
        assert_eq!(engine.liquidation_threshold(), 50);
        assert_eq!(engine.liquidation_bonus(), 10);
        assert_eq!(engine.precision(), WAD);
        assert_eq!(engine.additional_feed_precision(AssetId(1)).unwrap(), 10_000_000_000);
    }

    #[test]
    fn reads_on_unknown_user() {
        let engine = engine();
        assert_eq!(engine.health_factor(UserId(7)).unwrap(), HealthFactor::MAX);
        let info = engine.account_information(UserId(7)).unwrap();
        assert_eq!(info.debt_minted, Usd::ZERO);
        assert_eq!(info.collateral_value_usd, Usd::ZERO);
    }

    #[test]
    fn usd_getters() {
        let engine = engine();
        let usd = engine.usd_value(AssetId(1), Quantity::new(15 * WAD)).unwrap();
        assert_eq!(usd, Usd::new(30_000 * WAD));

        let qty = engine.token_amount_from_usd(AssetId(1), Usd::new(100 * WAD)).unwrap();
        assert_eq!(qty, Quantity::new(WAD / 20));

        assert_eq!(
            engine.usd_value(AssetId(9), Quantity::new(1)),
            Err(EngineError::UnknownAsset(AssetId(9)))
        );
    }

    #[test]
    fn invalid_risk_rejected() {
        let config = EngineConfig::with_risk(RiskParams {
            liquidation_threshold_percent: 0,
            ..RiskParams::default()
        });
        let result = Engine::deploy(config, vec![], vec![]);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn precision_without_matching_floor_rejected() {
        let config = EngineConfig::with_risk(RiskParams {
            precision: 10u128.pow(6),
            ..RiskParams::default()
        });
        let result = Engine::deploy(config, vec![], vec![]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfig(ConfigError::HealthFactorScale { .. }))
        ));
    }

    #[test]
    fn mismatched_lists_rejected() {
        let eth: SharedOracle = Arc::new(MockPriceFeed::new("ETH / USD", 1, 8));
        let result = Engine::deploy(
            EngineConfig::default(),
            vec![CollateralAsset::weth(), CollateralAsset::wbtc()],
            vec![eth],
        );
        assert!(matches!(result, Err(EngineError::LengthMismatch { assets: 2, feeds: 1 })));
    }

    #[test]
    fn clock() {
        let mut engine = engine();
        engine.set_time(Timestamp::from_millis(1_000));
        engine.advance_time(500);
        assert_eq!(engine.time(), Timestamp::from_millis(1_500));

        engine.set_time(Timestamp::from_millis(i64::MAX - 1));
        engine.advance_time(10);
        assert_eq!(engine.time(), Timestamp::from_millis(i64::MAX));
    }
}
