// 8.0.2: result types and errors for pool operations.

use crate::config::ConfigError;
use crate::custody::CustodyError;
use crate::ledger::LedgerError;
use crate::liquidity::LiquidityError;
use crate::tier::Tier;
use crate::types::{Amount, RequestId, Timestamp, UserId};
use crate::unbonding::QueueError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeReceipt {
    pub shares_minted: Amount,
    pub total_shares: Amount,
    pub ratio: u128,
    pub tier: Tier,
    pub rewards_accrued: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeReceipt {
    pub primary_returned: Amount,
    pub secondary_returned: Amount,
    pub shares_remaining: Amount,
    pub ratio: u128,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub users: usize,
    pub total_primary: Amount,
    pub total_secondary: Amount,
    pub total_shares: Amount,
    pub primary_queued: Amount,
    pub secondary_queued: Amount,
    pub primary_liquidity: Amount,
    pub secondary_liquidity: Amount,
    pub reward_reserve: Amount,
    pub unbonding_requests: usize,
    // unfloored pool-wide normalized primary per secondary, None with nothing staked
    pub pool_ratio: Option<Decimal>,
    pub pool_tier: Tier,
    // users per tier, BASE first
    pub tier_distribution: [usize; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Amount must be positive")]
    AmountMustBePositive,

    #[error("Insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Amount, held: Amount },

    #[error("Instant withdrawal not available: {0}")]
    InstantWithdrawalNotAvailable(LiquidityError),

    #[error("Unbonding request {0} not found")]
    RequestNotFound(RequestId),

    #[error("Request index {index} out of range for {user} ({len} requests)")]
    IndexOutOfRange { user: UserId, index: usize, len: usize },

    #[error("Unbonding request {0} already claimed")]
    AlreadyClaimed(RequestId),

    #[error("Unbonding request {id} still bonding until {unlock_time}")]
    StillBonding { id: RequestId, unlock_time: Timestamp },

    #[error("Insufficient reward pool: requested {requested}, reserve {reserve}")]
    InsufficientPool { requested: Amount, reserve: Amount },

    #[error("{0} has no stake record")]
    UserNotFound(UserId),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Ledger invariant broken: {0}")]
    Invariant(LedgerError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<LedgerError> for PoolError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientShares { requested, held } => {
                PoolError::InsufficientShares { requested, held }
            }
            LedgerError::Overflow => PoolError::ArithmeticOverflow,
            other => PoolError::Invariant(other),
        }
    }
}

impl From<QueueError> for PoolError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::AmountMustBePositive => PoolError::AmountMustBePositive,
            QueueError::RequestNotFound(id) => PoolError::RequestNotFound(id),
            QueueError::IndexOutOfRange { user, index, len } => {
                PoolError::IndexOutOfRange { user, index, len }
            }
            QueueError::AlreadyClaimed(id) => PoolError::AlreadyClaimed(id),
            QueueError::StillBonding { id, unlock_time } => PoolError::StillBonding { id, unlock_time },
            QueueError::Overflow => PoolError::ArithmeticOverflow,
        }
    }
}

impl From<LiquidityError> for PoolError {
    fn from(e: LiquidityError) -> Self {
        match e {
            LiquidityError::AmountMustBePositive => PoolError::AmountMustBePositive,
            other => PoolError::InstantWithdrawalNotAvailable(other),
        }
    }
}
