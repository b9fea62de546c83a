//! Per-user collateral and debt bookkeeping.
//!
//! `AccountingState` is the only owner of `UserPosition` records. Positions are
//! created implicitly on first access and never removed: a fully repaid and
//! withdrawn user simply sits at zero balances.

use crate::types::{AssetId, Quantity, Usd, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub collateral: BTreeMap<AssetId, Quantity>,
    pub debt_minted: Usd,
}

impl UserPosition {
    pub fn collateral_of(&self, asset: AssetId) -> Quantity {
        self.collateral.get(&asset).copied().unwrap_or(Quantity::ZERO)
    }

    /// Assets with a nonzero balance.
    pub fn collateral_iter(&self) -> impl Iterator<Item = (AssetId, Quantity)> + '_ {
        self.collateral
            .iter()
            .filter(|(_, qty)| !qty.is_zero())
            .map(|(asset, qty)| (*asset, *qty))
    }

    pub fn has_debt(&self) -> bool {
        !self.debt_minted.is_zero()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_debt() && self.collateral_iter().next().is_none()
    }

    pub fn credit_collateral(&mut self, asset: AssetId, amount: Quantity) -> Result<Quantity, AccountError> {
        let balance = self.collateral_of(asset);
        let updated = balance.checked_add(amount).ok_or(AccountError::Overflow)?;
        self.collateral.insert(asset, updated);
        Ok(updated)
    }

    pub fn debit_collateral(&mut self, asset: AssetId, amount: Quantity) -> Result<Quantity, AccountError> {
        let balance = self.collateral_of(asset);
        let updated = balance
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientCollateral {
                asset,
                requested: amount,
                available: balance,
            })?;
        self.collateral.insert(asset, updated);
        Ok(updated)
    }

    pub fn add_debt(&mut self, amount: Usd) -> Result<Usd, AccountError> {
        self.debt_minted = self.debt_minted.checked_add(amount).ok_or(AccountError::Overflow)?;
        Ok(self.debt_minted)
    }

    pub fn repay_debt(&mut self, amount: Usd) -> Result<Usd, AccountError> {
        self.debt_minted = self
            .debt_minted
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientDebt {
                requested: amount,
                outstanding: self.debt_minted,
            })?;
        Ok(self.debt_minted)
    }
}

/// All positions, keyed by user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountingState {
    positions: HashMap<UserId, UserPosition>,
}

impl AccountingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user's position. unknown users read as empty.
    pub fn position(&self, user: UserId) -> UserPosition {
        self.positions.get(&user).cloned().unwrap_or_default()
    }

    pub fn get(&self, user: UserId) -> Option<&UserPosition> {
        self.positions.get(&user)
    }

    pub fn collateral_balance(&self, user: UserId, asset: AssetId) -> Quantity {
        self.positions
            .get(&user)
            .map(|p| p.collateral_of(asset))
            .unwrap_or(Quantity::ZERO)
    }

    pub fn debt_of(&self, user: UserId) -> Usd {
        self.positions.get(&user).map(|p| p.debt_minted).unwrap_or(Usd::ZERO)
    }

    /// Replace a user's position wholesale. returns the previous record, if any.
    pub(crate) fn store(&mut self, user: UserId, position: UserPosition) -> Option<UserPosition> {
        self.positions.insert(user, position)
    }

    /// Put back a record saved by `store`. `None` means the user had no record.
    pub(crate) fn restore(&mut self, user: UserId, previous: Option<UserPosition>) {
        match previous {
            Some(position) => {
                self.positions.insert(user, position);
            }
            None => {
                self.positions.remove(&user);
            }
        }
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.positions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserPosition)> {
        self.positions.iter()
    }

    pub fn total_debt(&self) -> Usd {
        self.positions.values().map(|p| p.debt_minted).sum()
    }

    /// Sum of every user's balance of `asset`.
    pub fn total_collateral(&self, asset: AssetId) -> Quantity {
        let total = self
            .positions
            .values()
            .fold(0u128, |acc, p| acc.saturating_add(p.collateral_of(asset).raw()));
        Quantity::new(total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Insufficient collateral {asset}: requested {requested}, available {available}")]
    InsufficientCollateral {
        asset: AssetId,
        requested: Quantity,
        available: Quantity,
    },

    #[error("Insufficient debt: requested {requested}, outstanding {outstanding}")]
    InsufficientDebt { requested: Usd, outstanding: Usd },

    #[error("Balance overflow")]
    Overflow,
}
