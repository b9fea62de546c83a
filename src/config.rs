// 7.0 config.rs: protocol risk constants in one place. fixed at construction.
// 7.1 RiskParams has the threshold, bonus and precision constants. presets per environment.

use serde::{Deserialize, Serialize};

use crate::math::{pow10, WAD, WAD_DECIMALS};
use crate::types::HealthFactor;

/** 7.2: solvency and liquidation constants */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    // Percent of raw collateral value that counts toward solvency (50 = 200% overcollateralized)
    pub liquidation_threshold_percent: u128,
    // Seized collateral / divisor is paid to the liquidator on top (10 = 10% bonus)
    pub liquidation_bonus_divisor: u128,
    // Health factor below this is liquidatable, at `precision` scale
    pub min_health_factor: u128,
    // Internal fixed-point base (1e18)
    pub precision: u128,
    // Decimals every oracle answer is normalized up to before valuation
    pub feed_precision_target: u32,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            liquidation_threshold_percent: 50, // 200% collateralized
            liquidation_bonus_divisor: 10,     // 10% bonus
            min_health_factor: WAD,
            precision: WAD,
            feed_precision_target: WAD_DECIMALS,
        }
    }
}

impl RiskParams {
    // Tighter collateral requirement and a smaller liquidation incentive
    pub fn conservative() -> Self {
        Self {
            liquidation_threshold_percent: 40, // 250% collateralized
            liquidation_bonus_divisor: 20,     // 5% bonus
            ..Self::default()
        }
    }

    // Looser requirement for testing liquidations without huge price moves
    pub fn aggressive() -> Self {
        Self {
            liquidation_threshold_percent: 80, // 125% collateralized
            liquidation_bonus_divisor: 10,
            ..Self::default()
        }
    }

    pub fn min_health_factor(&self) -> HealthFactor {
        HealthFactor::new(self.min_health_factor)
    }

    /// Factor lifting an oracle answer quoted in `feed_decimals` up to the
    /// target precision (1e10 for the usual 8-decimal USD feeds).
    pub fn feed_precision_adjustment(&self, feed_decimals: u32) -> Option<u128> {
        let gap = self.feed_precision_target.checked_sub(feed_decimals)?;
        pow10(gap).ok()
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liquidation_threshold_percent == 0 || self.liquidation_threshold_percent > 100 {
            return Err(ConfigError::InvalidThreshold {
                percent: self.liquidation_threshold_percent,
            });
        }

        if self.liquidation_bonus_divisor == 0 {
            return Err(ConfigError::InvalidBonus {
                reason: "bonus divisor must be at least 1".to_string(),
            });
        }

        if self.min_health_factor == 0 {
            return Err(ConfigError::InvalidHealthFactor);
        }

        // precision must be 10^n with n >= 6
        let mut p = self.precision;
        let mut digits = 0;
        while p > 1 && p % 10 == 0 {
            p /= 10;
            digits += 1;
        }
        if p != 1 || digits < 6 {
            return Err(ConfigError::InvalidPrecision {
                reason: format!("precision {} is not a power of ten >= 1e6", self.precision),
            });
        }

        // health factors are computed at `precision` scale, so 1.0 must be exactly `precision`
        if self.min_health_factor != self.precision {
            return Err(ConfigError::HealthFactorScale {
                min_health_factor: self.min_health_factor,
                precision: self.precision,
            });
        }

        if self.feed_precision_target > 36 {
            return Err(ConfigError::InvalidPrecision {
                reason: format!("feed precision target {} exceeds 36 decimals", self.feed_precision_target),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Liquidation threshold {percent}% must be within 1..=100")]
    InvalidThreshold { percent: u128 },

    #[error("Invalid liquidation bonus: {reason}")]
    InvalidBonus { reason: String },

    #[error("Minimum health factor must be positive")]
    InvalidHealthFactor,

    #[error("Minimum health factor {min_health_factor} is not on the precision scale {precision}")]
    HealthFactorScale { min_health_factor: u128, precision: u128 },

    #[error("Invalid precision: {reason}")]
    InvalidPrecision { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn risk_params(&self) -> RiskParams {
        match self {
            Environment::Development => RiskParams::aggressive(),
            Environment::Testnet => RiskParams::default(),
            Environment::Mainnet => RiskParams::conservative(),
        }
    }
}
