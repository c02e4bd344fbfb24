// 6.0 liquidity.rs: funds on hand for instant exits, one counter per asset class.
// only a trusted operator writes the counters; the instant path draws them down.

use crate::types::{Amount, AssetClass};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityTracker {
    available: [Amount; 2],
    // fixed ceiling for any single instant withdrawal
    max_instant_withdrawal: Amount,
}

impl LiquidityTracker {
    pub fn new(max_instant_withdrawal: Amount) -> Self {
        Self {
            available: [0; 2],
            max_instant_withdrawal,
        }
    }

    pub fn available(&self, asset: AssetClass) -> Amount {
        self.available[asset.index()]
    }

    pub fn max_instant_withdrawal(&self) -> Amount {
        self.max_instant_withdrawal
    }

    /// Trusted operator write. Returns the previous value.
    pub fn set_available(&mut self, asset: AssetClass, amount: Amount) -> Amount {
        std::mem::replace(&mut self.available[asset.index()], amount)
    }

    // 6.1: under the ceiling and covered by what is on hand
    pub fn can_withdraw_instantly(&self, amount: Amount, asset: AssetClass) -> bool {
        amount <= self.max_instant_withdrawal && amount <= self.available(asset)
    }

    /// Why an instant withdrawal of `amount` would be refused, if it would.
    pub fn check_instant(&self, amount: Amount, asset: AssetClass) -> Result<(), LiquidityError> {
        if amount == 0 {
            return Err(LiquidityError::AmountMustBePositive);
        }
        if amount > self.max_instant_withdrawal {
            return Err(LiquidityError::AboveInstantCeiling {
                requested: amount,
                ceiling: self.max_instant_withdrawal,
            });
        }
        let available = self.available(asset);
        if amount > available {
            return Err(LiquidityError::InsufficientLiquidity {
                asset,
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn draw(&mut self, amount: Amount, asset: AssetClass) -> Result<Amount, LiquidityError> {
        self.check_instant(amount, asset)?;
        let available = self.available(asset);
        self.available[asset.index()] = available - amount;
        Ok(available - amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityError {
    #[error("Instant withdrawal amount must be positive")]
    AmountMustBePositive,

    #[error("Requested {requested} exceeds instant ceiling {ceiling}")]
    AboveInstantCeiling { requested: Amount, ceiling: Amount },

    #[error("Insufficient {asset} liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        asset: AssetClass,
        requested: Amount,
        available: Amount,
    },
}
