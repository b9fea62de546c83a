// 8.0: core stable-asset engine. coordinates collateral deposits, minting,
// redemptions, burns and liquidations against the accounting books.
// deterministic and event-driven; external effects go through the ledger and
// custody traits only after the books are committed.

mod config;
mod core;
mod liquidations;
mod positions;
mod results;
mod transaction;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{AccountInformation, EngineError, LiquidationResult};
