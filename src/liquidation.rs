//! Liquidation conditions and payout sizing.
//!
//! A position becomes liquidatable once its health factor drops below the
//! minimum. A liquidator repays part of the debt with stable asset and receives
//! the equivalent collateral plus a bonus. Payouts floor toward zero at every
//! step, so rounding always favors the position being liquidated.

use crate::config::RiskParams;
use crate::types::{AssetId, HealthFactor, Quantity, Usd};
use crate::valuation::{ValuationEngine, ValuationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Healthy { health_factor: HealthFactor },
    Liquidatable { health_factor: HealthFactor },
}

impl PositionStatus {
    pub fn evaluate(health_factor: HealthFactor, params: &RiskParams) -> Self {
        if health_factor < params.min_health_factor() {
            PositionStatus::Liquidatable { health_factor }
        } else {
            PositionStatus::Healthy { health_factor }
        }
    }

    pub fn is_liquidatable(&self) -> bool {
        matches!(self, PositionStatus::Liquidatable { .. })
    }

    pub fn health_factor(&self) -> HealthFactor {
        match self {
            PositionStatus::Healthy { health_factor } | PositionStatus::Liquidatable { health_factor } => {
                *health_factor
            }
        }
    }
}

/// Collateral a liquidator receives for covering `debt_to_cover`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    pub asset: AssetId,
    pub debt_to_cover: Usd,
    /// Collateral worth exactly `debt_to_cover` at the current price (floored).
    pub collateral_seized: Quantity,
    pub bonus: Quantity,
    pub total_seized: Quantity,
}

pub fn quote_liquidation(
    valuation: &ValuationEngine<'_>,
    asset: AssetId,
    debt_to_cover: Usd,
    params: &RiskParams,
) -> Result<LiquidationQuote, ValuationError> {
    let collateral_seized = valuation.quantity_from_usd(asset, debt_to_cover)?;
    let bonus = calculate_liquidation_bonus(collateral_seized, params);
    let total_seized = collateral_seized
        .checked_add(bonus)
        .ok_or(ValuationError::Overflow)?;

    Ok(LiquidationQuote {
        asset,
        debt_to_cover,
        collateral_seized,
        bonus,
        total_seized,
    })
}

/// seized / divisor, floored.
pub fn calculate_liquidation_bonus(collateral_seized: Quantity, params: &RiskParams) -> Quantity {
    match params.liquidation_bonus_divisor {
        0 => Quantity::ZERO,
        divisor => Quantity::new(collateral_seized.raw() / divisor),
    }
}
