// 8.2: position operations. deposit, mint, redeem, burn and their composites.
//
// every public operation stages into a Transaction and commits only if all
// checks pass. the stage_* helpers are shared with liquidation so a single
// transaction can chain several of them.

use super::core::Engine;
use super::results::EngineError;
use super::transaction::{Interaction, Transaction};
use crate::custody::CollateralCustody;
use crate::events::{
    CollateralDepositedEvent, CollateralRedeemedEvent, EventPayload, StableAssetBurnedEvent, StableAssetMintedEvent,
};
use crate::ledger::StableAssetLedger;
use crate::types::{AssetId, HealthFactor, Quantity, Usd, UserId};

impl<L: StableAssetLedger, C: CollateralCustody> Engine<L, C> {
    pub fn deposit_collateral(&mut self, user: UserId, asset: AssetId, amount: Quantity) -> Result<(), EngineError> {
        self.execute_transaction("deposit_collateral", |engine, tx| {
            require_nonzero(amount.is_zero())?;
            engine.stage_deposit(tx, user, asset, amount)
        })
    }

    pub fn mint_stable_asset(&mut self, user: UserId, amount: Usd) -> Result<(), EngineError> {
        self.execute_transaction("mint_stable_asset", |engine, tx| {
            require_nonzero(amount.is_zero())?;
            engine.stage_mint(tx, user, amount)
        })
    }

    pub fn redeem_collateral(&mut self, user: UserId, asset: AssetId, amount: Quantity) -> Result<(), EngineError> {
        self.execute_transaction("redeem_collateral", |engine, tx| {
            require_nonzero(amount.is_zero())?;
            engine.stage_redeem(tx, user, user, asset, amount)?;
            engine.require_healthy(tx, user)?;
            Ok(())
        })
    }

    /// Repay debt with the user's own stable asset. never blocked by the health factor.
    pub fn burn_stable_asset(&mut self, user: UserId, amount: Usd) -> Result<(), EngineError> {
        self.execute_transaction("burn_stable_asset", |engine, tx| {
            require_nonzero(amount.is_zero())?;
            engine.stage_burn(tx, user, user, amount)
        })
    }

    pub fn deposit_collateral_and_mint(
        &mut self,
        user: UserId,
        asset: AssetId,
        amount_collateral: Quantity,
        amount_to_mint: Usd,
    ) -> Result<(), EngineError> {
        self.execute_transaction("deposit_collateral_and_mint", |engine, tx| {
            require_nonzero(amount_collateral.is_zero() || amount_to_mint.is_zero())?;
            engine.stage_deposit(tx, user, asset, amount_collateral)?;
            engine.stage_mint(tx, user, amount_to_mint)
        })
    }

    /// Burn first, then redeem, so the freed collateral is checked against the reduced debt.
    pub fn redeem_collateral_for_stable(
        &mut self,
        user: UserId,
        asset: AssetId,
        amount_collateral: Quantity,
        amount_to_burn: Usd,
    ) -> Result<(), EngineError> {
        self.execute_transaction("redeem_collateral_for_stable", |engine, tx| {
            require_nonzero(amount_collateral.is_zero() || amount_to_burn.is_zero())?;
            engine.stage_burn(tx, user, user, amount_to_burn)?;
            engine.stage_redeem(tx, user, user, asset, amount_collateral)?;
            engine.require_healthy(tx, user)?;
            Ok(())
        })
    }

    pub(super) fn stage_deposit(
        &self,
        tx: &mut Transaction,
        user: UserId,
        asset: AssetId,
        amount: Quantity,
    ) -> Result<(), EngineError> {
        if !self.registry.is_approved(asset) {
            return Err(EngineError::UnknownAsset(asset));
        }
        tx.position_mut(&self.accounting, user).credit_collateral(asset, amount)?;
        tx.interact(Interaction::PullCollateral {
            asset,
            from: user,
            amount,
        });
        tx.emit(EventPayload::CollateralDeposited(CollateralDepositedEvent { user, asset, amount }));
        Ok(())
    }

    pub(super) fn stage_mint(&self, tx: &mut Transaction, user: UserId, amount: Usd) -> Result<(), EngineError> {
        tx.position_mut(&self.accounting, user).add_debt(amount)?;
        self.require_healthy(tx, user)?;
        tx.interact(Interaction::Mint { to: user, amount });
        tx.emit(EventPayload::StableAssetMinted(StableAssetMintedEvent { user, amount }));
        Ok(())
    }

    /// Move `amount` of `from`'s collateral to `to`'s wallet. no health check here.
    pub(super) fn stage_redeem(
        &self,
        tx: &mut Transaction,
        from: UserId,
        to: UserId,
        asset: AssetId,
        amount: Quantity,
    ) -> Result<(), EngineError> {
        tx.position_mut(&self.accounting, from).debit_collateral(asset, amount)?;
        tx.interact(Interaction::PushCollateral {
            asset,
            owner: from,
            to,
            amount,
        });
        tx.emit(EventPayload::CollateralRedeemed(CollateralRedeemedEvent {
            redeemed_from: from,
            redeemed_to: to,
            asset,
            amount,
        }));
        Ok(())
    }

    /// Reduce `on_behalf_of`'s debt, paid with `payer`'s stable asset.
    pub(super) fn stage_burn(
        &self,
        tx: &mut Transaction,
        on_behalf_of: UserId,
        payer: UserId,
        amount: Usd,
    ) -> Result<(), EngineError> {
        tx.position_mut(&self.accounting, on_behalf_of).repay_debt(amount)?;
        tx.interact(Interaction::Burn {
            from: payer,
            on_behalf_of,
            amount,
        });
        tx.emit(EventPayload::StableAssetBurned(StableAssetBurnedEvent {
            on_behalf_of,
            payer,
            amount,
        }));
        Ok(())
    }

    /// Health factor of `user` as staged in `tx`.
    pub(super) fn staged_health_factor(&self, tx: &Transaction, user: UserId) -> Result<HealthFactor, EngineError> {
        let position = tx.position(&self.accounting, user);
        Ok(self.valuation().health_factor(&position)?)
    }

    pub(super) fn require_healthy(&self, tx: &Transaction, user: UserId) -> Result<HealthFactor, EngineError> {
        let health_factor = self.staged_health_factor(tx, user)?;
        if health_factor < self.config.risk.min_health_factor() {
            return Err(EngineError::HealthFactorBroken(health_factor));
        }
        Ok(health_factor)
    }
}

fn require_nonzero(is_zero: bool) -> Result<(), EngineError> {
    if is_zero {
        return Err(EngineError::ZeroAmount);
    }
    Ok(())
}
