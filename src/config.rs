// 7.0 config.rs: all settings in one place. tiers, normalization, bonding periods, instant ceiling.
// 7.1 tier thresholds are fixed per deployment; nothing adjusts them while the pool runs.

use serde::{Deserialize, Serialize};

use crate::tier::{TierTable, TierTableError};
use crate::types::{Amount, AssetClass, SECONDS_PER_DAY};
use crate::unbonding::BondingPeriods;

// primary has 18 decimals, secondary 8
pub const DEFAULT_NORMALIZATION_DIVISOR: u128 = 10_000_000_000;

// 10 whole units of an 8-decimal asset
pub const DEFAULT_MAX_INSTANT_WITHDRAWAL: Amount = 1_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    // Human readable pool name
    pub name: String,
    pub tiers: TierTable,
    // Primary amounts are floor-divided by this before the ratio is taken
    pub normalization_divisor: u128,
    pub bonding: BondingPeriods,
    // Ceiling for a single instant withdrawal, any asset class
    pub max_instant_withdrawal: Amount,
    // Keep at most this many events in memory. None keeps everything.
    pub max_events: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "Dual Stake Pool".to_string(),
            tiers: TierTable::default(),
            normalization_divisor: DEFAULT_NORMALIZATION_DIVISOR,
            bonding: BondingPeriods {
                primary_secs: 7 * SECONDS_PER_DAY,
                secondary_secs: SECONDS_PER_DAY,
            },
            max_instant_withdrawal: DEFAULT_MAX_INSTANT_WITHDRAWAL,
            max_events: None,
        }
    }
}

impl PoolConfig {
    // short bonding so exits can be exercised within a session
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.name = "Dual Stake Pool Testnet".to_string();
        config.bonding = BondingPeriods {
            primary_secs: 3600,
            secondary_secs: 600,
        };
        config
    }

    // Conservative instant ceiling for production
    pub fn mainnet() -> Self {
        let mut config = Self::default();
        config.max_instant_withdrawal = DEFAULT_MAX_INSTANT_WITHDRAWAL / 10;
        config.max_events = Some(1_000_000);
        config
    }

    pub fn bonding_period(&self, asset: AssetClass) -> u64 {
        self.bonding.for_asset(asset)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiers.validate()?;

        if self.normalization_divisor == 0 {
            return Err(ConfigError::InvalidNormalization);
        }

        for asset in AssetClass::ALL {
            if self.bonding_period(asset) == 0 {
                return Err(ConfigError::InvalidBonding { asset });
            }
        }

        if self.max_events == Some(0) {
            return Err(ConfigError::InvalidRetention);
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid tier table: {0}")]
    InvalidTiers(#[from] TierTableError),

    #[error("Normalization divisor must be non-zero")]
    InvalidNormalization,

    #[error("Bonding period for {asset} must be non-zero")]
    InvalidBonding { asset: AssetClass },

    #[error("Event retention must keep at least one event")]
    InvalidRetention,
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
    pub fn config(&self) -> PoolConfig {
        match self {
            Environment::Development => PoolConfig::default(),
            Environment::Testnet => PoolConfig::testnet(),
            Environment::Mainnet => PoolConfig::mainnet(),
        }
    }
}
