//! Reward tier classification.
//!
//! A staker's tier is picked by the ratio of primary to secondary asset they
//! hold. The primary amount is first normalized into secondary denomination
//! (floor division by the decimal-scale divisor), then floor-divided by the
//! secondary amount. The two successive floors lose precision near tier
//! boundaries and that loss is part of the observable behaviour: a deposit
//! aimed exactly at a threshold can land one ratio unit short.
//!
//! Thresholds are checked highest first and the first satisfied entry wins,
//! so a ratio equal to a threshold belongs to that tier.

use crate::types::{Amount, Bps};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Base,
    Boost,
    Super,
    Satoshi,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Base, Tier::Boost, Tier::Super, Tier::Satoshi];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Base => "BASE",
            Tier::Boost => "BOOST",
            Tier::Super => "SUPER",
            Tier::Satoshi => "SATOSHI",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    pub tier: Tier,
    pub min_ratio: u128,
    pub annual_rate: Bps,
}

/// Ordered threshold table, highest threshold first. The last entry is the
/// floor tier and must have `min_ratio == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    entries: Vec<TierSpec>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            entries: vec![
                TierSpec { tier: Tier::Satoshi, min_ratio: 160_000, annual_rate: Bps::new(2000) },
                TierSpec { tier: Tier::Super, min_ratio: 60_000, annual_rate: Bps::new(1200) },
                TierSpec { tier: Tier::Boost, min_ratio: 20_000, annual_rate: Bps::new(800) },
                TierSpec { tier: Tier::Base, min_ratio: 0, annual_rate: Bps::new(500) },
            ],
        }
    }
}

impl TierTable {
    pub fn new(entries: Vec<TierSpec>) -> Result<Self, TierTableError> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    pub fn entries(&self) -> &[TierSpec] {
        &self.entries
    }

    pub fn validate(&self) -> Result<(), TierTableError> {
        let Some(last) = self.entries.last() else {
            return Err(TierTableError::Empty);
        };
        if last.min_ratio != 0 {
            return Err(TierTableError::NoFloorTier);
        }
        for pair in self.entries.windows(2) {
            if pair[0].min_ratio <= pair[1].min_ratio {
                return Err(TierTableError::NotDescending {
                    tier: pair[1].tier,
                    min_ratio: pair[1].min_ratio,
                });
            }
        }
        Ok(())
    }

    // 2.1: first satisfied threshold wins, highest first
    pub fn classify(&self, ratio: u128) -> Tier {
        self.spec_for(ratio).map(|s| s.tier).unwrap_or(Tier::Base)
    }

    pub fn rate_for(&self, ratio: u128) -> Bps {
        self.spec_for(ratio).map(|s| s.annual_rate).unwrap_or(Bps::new(0))
    }

    pub fn rate_of(&self, tier: Tier) -> Option<Bps> {
        self.entries.iter().find(|s| s.tier == tier).map(|s| s.annual_rate)
    }

    fn spec_for(&self, ratio: u128) -> Option<&TierSpec> {
        self.entries.iter().find(|s| ratio >= s.min_ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierTableError {
    #[error("Tier table is empty")]
    Empty,

    #[error("Tier table has no zero-threshold floor tier")]
    NoFloorTier,

    #[error("Tier {tier} threshold {min_ratio} is not below the previous entry")]
    NotDescending { tier: Tier, min_ratio: u128 },
}

// 2.2: primary amount expressed in secondary units. floors.
pub fn normalize_primary(primary: Amount, divisor: u128) -> u128 {
    if divisor == 0 {
        return primary;
    }
    primary / divisor
}

// 2.3: floor(floor(primary / divisor) / secondary). zero secondary gives zero.
pub fn compute_ratio(primary: Amount, secondary: Amount, divisor: u128) -> u128 {
    if secondary == 0 {
        return 0;
    }
    normalize_primary(primary, divisor) / secondary
}

/// Classify against the default table.
pub fn classify(ratio: u128) -> Tier {
    TierTable::default().classify(ratio)
}
