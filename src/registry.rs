//! Approved collateral assets and their price feeds.
//!
//! Built once at construction and never mutated afterwards. The engine owns the
//! registry and lends `&CollateralRegistry` to valuation.

use crate::price_feed::{PriceOracle, SharedOracle};
use crate::types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Static metadata for one collateral asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralAsset {
    pub id: AssetId,
    pub symbol: String,
    /// Decimal places of the underlying token quantity.
    pub decimals: u32,
}

impl CollateralAsset {
    pub fn new(id: AssetId, symbol: &str, decimals: u32) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn weth() -> Self {
        Self::new(AssetId(1), "WETH", 18)
    }

    pub fn wbtc() -> Self {
        Self::new(AssetId(2), "WBTC", 18)
    }
}

struct RegisteredAsset {
    asset: CollateralAsset,
    feed: SharedOracle,
}

pub struct CollateralRegistry {
    // registration order is preserved so assets can be addressed by index
    entries: Vec<RegisteredAsset>,
    index: HashMap<AssetId, usize>,
}

impl CollateralRegistry {
    /// Pair each asset with the feed at the same position.
    pub fn new(assets: Vec<CollateralAsset>, feeds: Vec<SharedOracle>) -> Result<Self, RegistryError> {
        if assets.len() != feeds.len() {
            return Err(RegistryError::LengthMismatch {
                assets: assets.len(),
                feeds: feeds.len(),
            });
        }

        let mut entries = Vec::with_capacity(assets.len());
        let mut index = HashMap::with_capacity(assets.len());

        for (asset, feed) in assets.into_iter().zip(feeds) {
            if index.insert(asset.id, entries.len()).is_some() {
                return Err(RegistryError::DuplicateAsset(asset.id));
            }
            entries.push(RegisteredAsset { asset, feed });
        }

        Ok(Self { entries, index })
    }

    pub fn is_approved(&self, asset: AssetId) -> bool {
        self.index.contains_key(&asset)
    }

    pub fn price_feed_for(&self, asset: AssetId) -> Result<&dyn PriceOracle, RegistryError> {
        self.entry(asset).map(|e| e.feed.as_ref())
    }

    pub fn asset(&self, asset: AssetId) -> Result<&CollateralAsset, RegistryError> {
        self.entry(asset).map(|e| &e.asset)
    }

    /// Asset at registration position `index`.
    pub fn collateral_token(&self, index: usize) -> Option<&CollateralAsset> {
        self.entries.get(index).map(|e| &e.asset)
    }

    pub fn collateral_tokens(&self) -> impl Iterator<Item = &CollateralAsset> {
        self.entries.iter().map(|e| &e.asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, asset: AssetId) -> Result<&RegisteredAsset, RegistryError> {
        self.index
            .get(&asset)
            .map(|&i| &self.entries[i])
            .ok_or(RegistryError::UnknownAsset(asset))
    }
}

impl fmt::Debug for CollateralRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (&e.asset.symbol, e.feed.description())))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Collateral {0} is not approved")]
    UnknownAsset(AssetId),

    #[error("Asset list has {assets} entries but feed list has {feeds}")]
    LengthMismatch { assets: usize, feeds: usize },

    #[error("Collateral {0} registered twice")]
    DuplicateAsset(AssetId),
}
