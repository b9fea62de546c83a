// 9.1 ledger.rs: the stable asset token. in-memory, owner-gated mint/burn.
//
// The engine only sees the `StableAssetLedger` trait. `StableCoin` is the reference
// ledger: the owner hands the mint capability to exactly one minter (the engine)
// and nobody else can create or destroy supply.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Usd, UserId};

/// Mint/burn surface the engine drives. `minter` is the caller's identity.
pub trait StableAssetLedger {
    fn mint(&mut self, minter: UserId, to: UserId, amount: Usd) -> Result<(), TransferError>;

    /// Destroy `amount` held by `from`.
    fn burn_from(&mut self, minter: UserId, from: UserId, amount: Usd) -> Result<(), TransferError>;

    fn balance_of(&self, holder: UserId) -> Usd;

    fn total_supply(&self) -> Usd;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableCoin {
    pub name: String,
    pub symbol: String,
    owner: UserId,
    minter: Option<UserId>,
    balances: HashMap<UserId, Usd>,
    total_supply: Usd,
}

impl StableCoin {
    pub fn new(name: &str, symbol: &str, owner: UserId) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            owner,
            minter: None,
            balances: HashMap::new(),
            total_supply: Usd::ZERO,
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn minter(&self) -> Option<UserId> {
        self.minter
    }

    pub fn set_minter(&mut self, caller: UserId, minter: UserId) -> Result<(), TransferError> {
        if caller != self.owner {
            return Err(TransferError::NotOwner { caller });
        }
        self.minter = Some(minter);
        Ok(())
    }

    pub fn transfer(&mut self, from: UserId, to: UserId, amount: Usd) -> Result<(), TransferError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn require_minter(&self, caller: UserId) -> Result<(), TransferError> {
        if self.minter != Some(caller) {
            return Err(TransferError::NotMinter { caller });
        }
        Ok(())
    }

    fn debit(&mut self, holder: UserId, amount: Usd) -> Result<(), TransferError> {
        let balance = self.balance_of(holder);
        let updated = balance.checked_sub(amount).ok_or(TransferError::InsufficientBalance {
            holder,
            requested: amount.raw(),
            available: balance.raw(),
        })?;
        self.balances.insert(holder, updated);
        Ok(())
    }

    fn credit(&mut self, holder: UserId, amount: Usd) -> Result<(), TransferError> {
        let updated = self.balance_of(holder).checked_add(amount).ok_or(TransferError::Overflow)?;
        self.balances.insert(holder, updated);
        Ok(())
    }
}

impl StableAssetLedger for StableCoin {
    fn mint(&mut self, minter: UserId, to: UserId, amount: Usd) -> Result<(), TransferError> {
        self.require_minter(minter)?;
        let supply = self.total_supply.checked_add(amount).ok_or(TransferError::Overflow)?;
        self.credit(to, amount)?;
        self.total_supply = supply;
        Ok(())
    }

    fn burn_from(&mut self, minter: UserId, from: UserId, amount: Usd) -> Result<(), TransferError> {
        self.require_minter(minter)?;
        self.debit(from, amount)?;
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn balance_of(&self, holder: UserId) -> Usd {
        self.balances.get(&holder).copied().unwrap_or(Usd::ZERO)
    }

    fn total_supply(&self) -> Usd {
        self.total_supply
    }
}

/// Failure of an external token movement. shared by the stable ledger and custody.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("{holder} holds {available}, needs {requested}")]
    InsufficientBalance {
        holder: UserId,
        requested: u128,
        available: u128,
    },

    #[error("{caller} is not the minter")]
    NotMinter { caller: UserId },

    #[error("{caller} is not the owner")]
    NotOwner { caller: UserId },

    #[error("Token balance overflow")]
    Overflow,

    #[error("Transfer rejected: {reason}")]
    Rejected { reason: String },
}
