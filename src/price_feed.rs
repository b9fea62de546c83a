// Price Feed Integration
//
// This module abstracts how the engine reads collateral prices. The engine is
// agnostic to whether a price comes from Chainlink, Pyth or a custom oracle: it
// only needs the latest answer and the fixed number of decimals it is quoted in.
// Staleness and circuit breaking are the feed operator's problem, not ours.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::math::decimal_to_raw;
use crate::types::Timestamp;

/// The latest answer published by a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    pub round_id: u64,
    /// USD price of one whole unit of the asset, scaled by `10^decimals`.
    pub answer: u128,
    pub decimals: u32,
    pub updated_at: Timestamp,
}

impl RoundData {
    pub fn new(answer: u128, decimals: u32, updated_at: Timestamp) -> Self {
        Self {
            round_id: 1,
            answer,
            decimals,
            updated_at,
        }
    }
}

/// Trait for oracle adapters. One adapter backs exactly one collateral asset.
pub trait PriceOracle: Send + Sync {
    /// Human readable description, e.g. "ETH / USD".
    fn description(&self) -> &str;

    fn latest_round(&self) -> RoundData;

    fn decimals(&self) -> u32 {
        self.latest_round().decimals
    }
}

pub type SharedOracle = Arc<dyn PriceOracle>;

/// In-memory aggregator. The answer can be pushed while the registry holds the feed.
#[derive(Debug)]
pub struct MockPriceFeed {
    description: String,
    round: RwLock<RoundData>,
}

impl MockPriceFeed {
    pub fn new(description: &str, answer: u128, decimals: u32) -> Self {
        Self {
            description: description.to_string(),
            round: RwLock::new(RoundData::new(answer, decimals, Timestamp::from_millis(0))),
        }
    }

    /// Build from a human price, e.g. `dec!(2000)` at 8 decimals.
    pub fn from_decimal(description: &str, price: Decimal, decimals: u32) -> Option<Self> {
        decimal_to_raw(price, decimals).map(|answer| Self::new(description, answer, decimals))
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Publish a new answer. bumps the round id.
    pub fn update_answer(&self, answer: u128) {
        self.update_answer_at(answer, Timestamp::now());
    }

    pub fn update_answer_at(&self, answer: u128, timestamp: Timestamp) {
        let mut round = self.round.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        round.round_id += 1;
        round.answer = answer;
        round.updated_at = timestamp;
    }

    pub fn update_decimal(&self, price: Decimal) -> bool {
        let decimals = self.decimals();
        match decimal_to_raw(price, decimals) {
            Some(answer) => {
                self.update_answer(answer);
                true
            }
            None => false,
        }
    }
}

impl PriceOracle for MockPriceFeed {
    fn description(&self) -> &str {
        &self.description
    }

    fn latest_round(&self) -> RoundData {
        *self.round.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
