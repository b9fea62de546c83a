//! Collateral valuation and health factor.
//!
//! Converts collateral quantities to USD using the registry's oracle feeds and
//! computes the solvency ratio of a position. Read-only: takes position
//! snapshots and never writes accounting state.
//!
//! ```text
//! usd      = qty * price * 10^(18 - feed_decimals) / 10^asset_decimals
//! qty      = usd * 10^asset_decimals / (price * 10^(18 - feed_decimals))
//! hf       = (collateral_usd * threshold / 100) * 1e18 / debt
//! ```

use crate::account::UserPosition;
use crate::config::RiskParams;
use crate::math::{mul_div, mul_div_product, mul_mul_div, pow10, MathError};
use crate::registry::{CollateralRegistry, RegistryError};
use crate::types::{AssetId, HealthFactor, Quantity, Usd};

#[derive(Debug, Clone, Copy)]
pub struct ValuationEngine<'a> {
    registry: &'a CollateralRegistry,
    params: &'a RiskParams,
}

/// Oracle answer plus the scaling needed to use it.
#[derive(Debug, Clone, Copy)]
struct PriceTerms {
    price: u128,
    feed_adjustment: u128,
    asset_scale: u128,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(registry: &'a CollateralRegistry, params: &'a RiskParams) -> Self {
        Self { registry, params }
    }

    pub fn usd_value(&self, asset: AssetId, quantity: Quantity) -> Result<Usd, ValuationError> {
        if quantity.is_zero() {
            // unknown assets still fail
            self.registry.asset(asset)?;
            return Ok(Usd::ZERO);
        }
        let terms = self.price_terms(asset)?;
        let usd = mul_mul_div(quantity.raw(), terms.price, terms.feed_adjustment, terms.asset_scale)?;
        Ok(Usd::new(usd))
    }

    /// Floors toward zero. a liquidator is never paid more than the debt is worth.
    pub fn quantity_from_usd(&self, asset: AssetId, usd: Usd) -> Result<Quantity, ValuationError> {
        let terms = self.price_terms(asset)?;
        let quantity = mul_div_product(usd.raw(), terms.asset_scale, terms.price, terms.feed_adjustment)?;
        Ok(Quantity::new(quantity))
    }

    pub fn total_collateral_value(&self, position: &UserPosition) -> Result<Usd, ValuationError> {
        position
            .collateral_iter()
            .try_fold(Usd::ZERO, |total, (asset, qty)| {
                let value = self.usd_value(asset, qty)?;
                total.checked_add(value).ok_or(ValuationError::Overflow)
            })
    }

    pub fn health_factor(&self, position: &UserPosition) -> Result<HealthFactor, ValuationError> {
        if !position.has_debt() {
            return Ok(HealthFactor::MAX);
        }
        let collateral = self.total_collateral_value(position)?;
        calculate_health_factor(collateral, position.debt_minted, self.params)
    }

    fn price_terms(&self, asset: AssetId) -> Result<PriceTerms, ValuationError> {
        let meta = self.registry.asset(asset)?;
        let round = self.registry.price_feed_for(asset)?.latest_round();

        if round.answer == 0 {
            return Err(ValuationError::InvalidPrice { asset });
        }
        let feed_adjustment = self
            .params
            .feed_precision_adjustment(round.decimals)
            .ok_or(ValuationError::InvalidPrice { asset })?;
        let asset_scale = pow10(meta.decimals)?;

        Ok(PriceTerms {
            price: round.answer,
            feed_adjustment,
            asset_scale,
        })
    }
}

/// Health factor from aggregate values. `MAX` for zero debt; saturates at `MAX`
/// when collateral dwarfs a dust-sized debt.
pub fn calculate_health_factor(
    collateral_usd: Usd,
    debt: Usd,
    params: &RiskParams,
) -> Result<HealthFactor, ValuationError> {
    if debt.is_zero() {
        return Ok(HealthFactor::MAX);
    }
    let adjusted = mul_div(collateral_usd.raw(), params.liquidation_threshold_percent, 100)?;
    match mul_div(adjusted, params.precision, debt.raw()) {
        Ok(hf) => Ok(HealthFactor::new(hf)),
        Err(MathError::Overflow) => Ok(HealthFactor::MAX),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValuationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Feed for {asset} returned an unusable price")]
    InvalidPrice { asset: AssetId },

    #[error("Valuation overflow")]
    Overflow,
}

impl From<MathError> for ValuationError {
    fn from(_: MathError) -> Self {
        ValuationError::Overflow
    }
}
