// dual-stake-core: accounting and incentive core of a dual-asset staking pool.
// deposits pair two assets; their ratio picks a reward tier; exits go through a
// per-asset unbonding queue or an instant path gated by liquidity.
// all computation is deterministic integer math with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, RequestId, AssetClass, Asset, Bps, Timestamp
//   2.x  tier.rs: ratio derivation and tier classification
//   3.x  ledger.rs: per-user stake records, totals, conservation check
//   4.x  rewards.rs: lazy reward accrual (the flush)
//   5.x  unbonding.rs: time-delayed exit queue
//   6.x  liquidity.rs: per-asset funds on hand for instant exits
//   7.x  config.rs: tiers, normalization, bonding periods, env presets
//   8.x  engine/: StakingPool: staking, claims, queue operations
//   9.x  custody.rs: asset-transfer collaborator (in-memory)
//   10.x events.rs: append-only event log

pub mod config;
pub mod custody;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod liquidity;
pub mod rewards;
pub mod tier;
pub mod types;
pub mod unbonding;

pub use config::{ConfigError, Environment, PoolConfig};
pub use custody::{AssetCustody, CustodyError, Direction, InMemoryCustody, Transfer};
pub use engine::{PoolError, PoolStats, StakeReceipt, StakingPool, UnstakeReceipt};
pub use events::{Event, EventId, EventPayload, SettlementPath};
pub use ledger::{LedgerError, LedgerTotals, StakeHandle, StakeLedger, UserStake};
pub use liquidity::{LiquidityError, LiquidityTracker};
pub use rewards::{accrue, period_reward, AccrualOutcome, BASIS_POINTS};
pub use tier::{classify, compute_ratio, normalize_primary, Tier, TierSpec, TierTable};
pub use types::{
    Amount, Asset, AssetClass, Bps, RequestId, Timestamp, UserId, SECONDS_PER_DAY, SECONDS_PER_YEAR,
};
pub use unbonding::{BondingPeriods, QueueError, QueueInfo, RequestState, UnbondingQueue, UnbondingRequest};
