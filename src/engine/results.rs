// 8.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::config::ConfigError;
use crate::ledger::TransferError;
use crate::math::MathError;
use crate::registry::RegistryError;
use crate::types::{AssetId, HealthFactor, Quantity, Usd, UserId};
use crate::valuation::ValuationError;
use serde::{Deserialize, Serialize};

/// `(debt_minted, collateral_value_usd)` for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    pub debt_minted: Usd,
    pub collateral_value_usd: Usd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub liquidator: UserId,
    pub user: UserId,
    pub asset: AssetId,
    pub debt_covered: Usd,
    pub collateral_seized: Quantity,
    pub bonus: Quantity,
    pub total_seized: Quantity,
    pub health_factor_before: HealthFactor,
    pub health_factor_after: HealthFactor,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Collateral {0} is not approved")]
    UnknownAsset(AssetId),

    #[error("Insufficient collateral {asset}: requested {requested}, available {available}")]
    InsufficientCollateral {
        asset: AssetId,
        requested: Quantity,
        available: Quantity,
    },

    #[error("Insufficient debt: requested {requested}, outstanding {outstanding}")]
    InsufficientDebt { requested: Usd, outstanding: Usd },

    #[error("Transfer failed: {0}")]
    TransferFailed(TransferError),

    #[error("Transfer failed: {cause}; rollback incomplete: {compensation}")]
    CompensationFailed {
        cause: TransferError,
        compensation: TransferError,
    },

    #[error("Health factor broken: {0}")]
    HealthFactorBroken(HealthFactor),

    #[error("Health factor ok: {0}")]
    HealthFactorOk(HealthFactor),

    #[error("Health factor not improved: before {before}, after {after}")]
    HealthFactorNotImproved { before: HealthFactor, after: HealthFactor },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Asset list has {assets} entries but feed list has {feeds}")]
    LengthMismatch { assets: usize, feeds: usize },

    #[error("Collateral {0} registered twice")]
    DuplicateAsset(AssetId),

    #[error("Feed for {asset} returned an unusable price")]
    InvalidPrice { asset: AssetId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<AccountError> for EngineError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientCollateral {
                asset,
                requested,
                available,
            } => EngineError::InsufficientCollateral {
                asset,
                requested,
                available,
            },
            AccountError::InsufficientDebt {
                requested,
                outstanding,
            } => EngineError::InsufficientDebt {
                requested,
                outstanding,
            },
            AccountError::Overflow => EngineError::ArithmeticOverflow,
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownAsset(asset) => EngineError::UnknownAsset(asset),
            RegistryError::LengthMismatch { assets, feeds } => EngineError::LengthMismatch { assets, feeds },
            RegistryError::DuplicateAsset(asset) => EngineError::DuplicateAsset(asset),
        }
    }
}

impl From<ValuationError> for EngineError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::Registry(e) => e.into(),
            ValuationError::InvalidPrice { asset } => EngineError::InvalidPrice { asset },
            ValuationError::Overflow => EngineError::ArithmeticOverflow,
        }
    }
}

impl From<MathError> for EngineError {
    fn from(_: MathError) -> Self {
        EngineError::ArithmeticOverflow
    }
}

impl From<TransferError> for EngineError {
    fn from(err: TransferError) -> Self {
        EngineError::TransferFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_errors_flatten() {
        let err: EngineError = AccountError::InsufficientDebt {
            requested: Usd::new(2),
            outstanding: Usd::new(1),
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientDebt { .. }));

        let err: EngineError = AccountError::Overflow.into();
        assert_eq!(err, EngineError::ArithmeticOverflow);
    }

    #[test]
    fn valuation_errors_flatten() {
        let err: EngineError = ValuationError::Registry(RegistryError::UnknownAsset(AssetId(4))).into();
        assert_eq!(err, EngineError::UnknownAsset(AssetId(4)));

        let err: EngineError = RegistryError::LengthMismatch { assets: 2, feeds: 1 }.into();
        assert_eq!(err, EngineError::LengthMismatch { assets: 2, feeds: 1 });
    }

    #[test]
    fn incomplete_rollback_names_both_failures() {
        let err = EngineError::CompensationFailed {
            cause: TransferError::NotMinter { caller: UserId(0) },
            compensation: TransferError::Overflow,
        };
        let message = err.to_string();
        assert!(message.starts_with("Transfer failed: "));
        assert!(message.contains("rollback incomplete"));
    }

    #[test]
    fn health_factor_in_message() {
        let err = EngineError::HealthFactorBroken(HealthFactor::new(9 * 10u128.pow(17)));
        assert_eq!(err.to_string(), "Health factor broken: 0.9");
    }
}
