// 8.0: staking pool engine. coordinates the ledger, reward accrual, the unbonding queue,
// liquidity and custody. every public mutating call takes &mut self, so calls never interleave
// and custody cannot re-enter the pool mid-operation.

mod core;
mod queue;
mod results;
mod staking;

pub use core::StakingPool;
pub use results::{PoolError, PoolStats, StakeReceipt, UnstakeReceipt};
