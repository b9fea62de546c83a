// stable-core: over-collateralized stable-asset engine.
// solvency-first architecture: every mint and redemption is checked against the
// health factor, and undercollateralized positions are open to liquidation.
// all computation is deterministic integer fixed-point with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, AssetId, Quantity, Usd, HealthFactor
//   1.5  math.rs: 256-bit mul/div helpers, decimal conversion
//   2.x  registry.rs: approved collateral assets and their feeds
//   3.x  valuation.rs: USD value, token amount from USD, health factor
//   6.x  liquidation.rs: liquidation condition, bonus, payout quote
//   7.x  config.rs: risk params, env presets
//   8.x  engine/: core engine: positions, liquidations, transactions
//   9.x  price_feed.rs: oracle rounds (mocked)
//   9.1  ledger.rs: stable asset token (mocked)
//   9.2  custody.rs: collateral pull/push flows (mocked)
//   10.x account.rs: per-user collateral and debt books
//   11.x events.rs: state transition events for audit

// core modules
pub mod account;
pub mod engine;
pub mod events;
pub mod liquidation;
pub mod math;
pub mod registry;
pub mod types;
pub mod valuation;

// integration modules
pub mod config;
pub mod custody;
pub mod ledger;
pub mod price_feed;

// re exports for convenience
pub use account::*;
pub use engine::*;
pub use events::*;
pub use liquidation::*;
pub use math::{MathError, WAD, WAD_DECIMALS};
pub use registry::*;
pub use types::*;
pub use valuation::*;
pub use config::{ConfigError, Environment, RiskParams};
pub use custody::{CollateralCustody, CollateralVault};
pub use ledger::{StableAssetLedger, StableCoin, TransferError};
pub use price_feed::{MockPriceFeed, PriceOracle, RoundData, SharedOracle};
