//! Engine configuration options.

use crate::config::RiskParams;
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Solvency and liquidation constants.
    pub risk: RiskParams,
    /// Identity the engine presents to the stable ledger when minting and burning.
    pub engine_account: UserId,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskParams::default(),
            engine_account: UserId(0),
            max_events: 100_000,
        }
    }
}

impl EngineConfig {
    pub fn with_risk(risk: RiskParams) -> Self {
        Self {
            risk,
            ..Self::default()
        }
    }
}
