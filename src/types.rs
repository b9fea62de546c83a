// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, raw fixed-point amounts, health factor, timestamps. each is a newtype so the
// compiler catches a collateral quantity being passed where a USD value is expected.

use crate::math::{decimal_to_raw, raw_to_decimal, WAD_DECIMALS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

// 1.1: collateral quantity in the asset's smallest unit (1 WETH = 1e18 units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u128);

impl Quantity {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Parse a human amount (e.g. `dec!(10)`) into raw units with `decimals` places.
    pub fn from_decimal(value: Decimal, decimals: u32) -> Option<Self> {
        decimal_to_raw(value, decimals).map(Self)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Quantity) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Quantity) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn to_decimal(&self, decimals: u32) -> Option<Decimal> {
        raw_to_decimal(self.0, decimals)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: USD amount at 18 decimals. the stable asset is pegged 1:1 so debt uses it too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Usd(u128);

impl Usd {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn from_decimal(value: Decimal) -> Option<Self> {
        decimal_to_raw(value, WAD_DECIMALS).map(Self)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Usd) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Usd) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(&self, other: Usd) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        raw_to_decimal(self.0, WAD_DECIMALS)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "${}", d.normalize()),
            None => write!(f, "{} wad", self.0),
        }
    }
}

impl Sum for Usd {
    // saturates; callers needing overflow detection use checked_add
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u128, |acc, u| acc.saturating_add(u.0)))
    }
}

// 1.3: solvency ratio at 18 decimals. 1e18 == 1.0. never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HealthFactor(u128);

impl HealthFactor {
    /// Positions without debt. never liquidatable.
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_max(&self) -> bool {
        self.0 == u128::MAX
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.is_max() {
            return None;
        }
        raw_to_decimal(self.0, WAD_DECIMALS)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            return write!(f, "inf");
        }
        match self.to_decimal() {
            Some(d) => write!(f, "{}", d.normalize()),
            None => write!(f, "{} wad", self.0),
        }
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
