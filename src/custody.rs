// 9.2 custody.rs: collateral token movements between user wallets and the engine.
//
// The engine calls `pull` when a user deposits and `push` when collateral leaves
// (redemption or liquidation payout). Both run only after the engine's own
// books are committed. `CollateralVault` is the in-memory reference: wallet
// balances per (asset, user) plus what the engine currently holds per asset.

use std::collections::{HashMap, HashSet};

use crate::ledger::TransferError;
use crate::types::{AssetId, Quantity, UserId};

pub trait CollateralCustody {
    /// Move `amount` of `asset` from `from`'s wallet into engine custody.
    fn pull(&mut self, asset: AssetId, from: UserId, amount: Quantity) -> Result<(), TransferError>;

    /// Move `amount` of `asset` from engine custody to `to`'s wallet.
    fn push(&mut self, asset: AssetId, to: UserId, amount: Quantity) -> Result<(), TransferError>;
}

#[derive(Debug, Clone, Default)]
pub struct CollateralVault {
    wallets: HashMap<(AssetId, UserId), Quantity>,
    held: HashMap<AssetId, Quantity>,
    // recipients whose wallet refuses incoming transfers
    blocked: HashSet<UserId>,
}

impl CollateralVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faucet: credit a wallet out of thin air.
    pub fn fund(&mut self, asset: AssetId, user: UserId, amount: Quantity) {
        let balance = self.balance_of(asset, user);
        self.wallets
            .insert((asset, user), Quantity::new(balance.raw().saturating_add(amount.raw())));
    }

    pub fn balance_of(&self, asset: AssetId, user: UserId) -> Quantity {
        self.wallets.get(&(asset, user)).copied().unwrap_or(Quantity::ZERO)
    }

    /// Collateral of `asset` currently in engine custody.
    pub fn held(&self, asset: AssetId) -> Quantity {
        self.held.get(&asset).copied().unwrap_or(Quantity::ZERO)
    }

    /// Make every push to `user` fail, like a contract wallet that reverts on receive.
    pub fn block_recipient(&mut self, user: UserId) {
        self.blocked.insert(user);
    }

    pub fn unblock_recipient(&mut self, user: UserId) {
        self.blocked.remove(&user);
    }
}

impl CollateralCustody for CollateralVault {
    fn pull(&mut self, asset: AssetId, from: UserId, amount: Quantity) -> Result<(), TransferError> {
        let balance = self.balance_of(asset, from);
        let remaining = balance.checked_sub(amount).ok_or(TransferError::InsufficientBalance {
            holder: from,
            requested: amount.raw(),
            available: balance.raw(),
        })?;
        let held = self.held(asset).checked_add(amount).ok_or(TransferError::Overflow)?;

        self.wallets.insert((asset, from), remaining);
        self.held.insert(asset, held);
        Ok(())
    }

    fn push(&mut self, asset: AssetId, to: UserId, amount: Quantity) -> Result<(), TransferError> {
        if self.blocked.contains(&to) {
            return Err(TransferError::Rejected {
                reason: format!("{to} refuses {asset}"),
            });
        }
        let held = self.held(asset);
        let remaining = held.checked_sub(amount).ok_or(TransferError::InsufficientBalance {
            holder: to,
            requested: amount.raw(),
            available: held.raw(),
        })?;
        let wallet = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.held.insert(asset, remaining);
        self.wallets.insert((asset, to), wallet);
        Ok(())
    }
}
