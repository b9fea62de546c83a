//! Liquidation detection and execution.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult};
use crate::custody::CollateralCustody;
use crate::events::{EventPayload, LiquidatedEvent};
use crate::ledger::StableAssetLedger;
use crate::liquidation::{quote_liquidation, PositionStatus};
use crate::types::{AssetId, HealthFactor, Usd, UserId};
use tracing::{info, warn};

impl<L: StableAssetLedger, C: CollateralCustody> Engine<L, C> {
    /// Users whose health factor is below the minimum, worst first. Positions
    /// that cannot be valued right now are skipped, not fatal to the scan.
    pub fn liquidatable_users(&self) -> Vec<(UserId, HealthFactor)> {
        let valuation = self.valuation();
        let mut liquidatable = Vec::new();

        for (user, position) in self.accounting.iter() {
            let health_factor = match valuation.health_factor(position) {
                Ok(hf) => hf,
                Err(err) => {
                    warn!(user = %user, error = %err, "skipping position in liquidation scan");
                    continue;
                }
            };
            if PositionStatus::evaluate(health_factor, &self.config.risk).is_liquidatable() {
                liquidatable.push((*user, health_factor));
            }
        }

        liquidatable.sort_by_key(|(user, health_factor)| (*health_factor, *user));
        liquidatable
    }

    /// Cover `debt_to_cover` of `user`'s debt with the liquidator's stable asset
    /// and take the matching collateral plus the bonus.
    pub fn liquidate(
        &mut self,
        liquidator: UserId,
        user: UserId,
        asset: AssetId,
        debt_to_cover: Usd,
    ) -> Result<LiquidationResult, EngineError> {
        let result = self.execute_transaction("liquidate", |engine, tx| {
            if debt_to_cover.is_zero() {
                return Err(EngineError::ZeroAmount);
            }
            if !engine.registry.is_approved(asset) {
                return Err(EngineError::UnknownAsset(asset));
            }

            let health_factor_before = engine.staged_health_factor(tx, user)?;
            if !PositionStatus::evaluate(health_factor_before, &engine.config.risk).is_liquidatable() {
                return Err(EngineError::HealthFactorOk(health_factor_before));
            }

            let quote = quote_liquidation(&engine.valuation(), asset, debt_to_cover, &engine.config.risk)?;
            engine.stage_redeem(tx, user, liquidator, asset, quote.total_seized)?;
            engine.stage_burn(tx, user, liquidator, debt_to_cover)?;

            let health_factor_after = engine.staged_health_factor(tx, user)?;
            if health_factor_after <= health_factor_before {
                return Err(EngineError::HealthFactorNotImproved {
                    before: health_factor_before,
                    after: health_factor_after,
                });
            }
            engine.require_healthy(tx, liquidator)?;

            tx.emit(EventPayload::Liquidated(LiquidatedEvent {
                liquidator,
                user,
                asset,
                debt_covered: debt_to_cover,
                collateral_seized: quote.total_seized,
                health_factor_before,
                health_factor_after,
            }));

            Ok(LiquidationResult {
                liquidator,
                user,
                asset,
                debt_covered: debt_to_cover,
                collateral_seized: quote.collateral_seized,
                bonus: quote.bonus,
                total_seized: quote.total_seized,
                health_factor_before,
                health_factor_after,
            })
        })?;

        info!(
            liquidator = %result.liquidator,
            user = %result.user,
            asset = %result.asset,
            debt_covered = %result.debt_covered,
            seized = result.total_seized.raw(),
            hf_before = %result.health_factor_before,
            hf_after = %result.health_factor_after,
            "position liquidated"
        );
        Ok(result)
    }
}
