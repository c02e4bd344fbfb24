// 1.0: all the primitives live here. nothing in the pool works without these types.
// IDs, asset classes, amounts, basis points, timestamps. IDs are newtypes so the compiler
// catches a user id passed where a request id belongs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

// Raw base units. Every ledger amount is an integer and every division floors.
pub type Amount = u128;

// 1.1: the two staked asset classes. Primary is the plentiful one (18 decimals),
// secondary the scarce one (8 decimals) that shares are minted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Primary,
    Secondary,
}

impl AssetClass {
    pub const ALL: [AssetClass; 2] = [AssetClass::Primary, AssetClass::Secondary];

    pub fn decimals(&self) -> u32 {
        match self {
            AssetClass::Primary => 18,
            AssetClass::Secondary => 8,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AssetClass::Primary => 0,
            AssetClass::Secondary => 1,
        }
    }

    pub fn asset(&self) -> Asset {
        match self {
            AssetClass::Primary => Asset::Primary,
            AssetClass::Secondary => Asset::Secondary,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Primary => write!(f, "primary"),
            AssetClass::Secondary => write!(f, "secondary"),
        }
    }
}

// Everything custody can move: both staked assets plus the reward token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Primary,
    Secondary,
    Reward,
}

impl From<AssetClass> for Asset {
    fn from(class: AssetClass) -> Self {
        class.asset()
    }
}

// 1.2: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub const DENOMINATOR: u32 = 10_000;

    pub const fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

// 1.3: whole seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    // seconds from `earlier` to self, zero if earlier is actually later
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0 as i64, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}s", self.0),
        }
    }
}
