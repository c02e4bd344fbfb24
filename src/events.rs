// 10.0: every successful state change appends one event. observers rebuild history from
// this log; nothing in it is ever edited. the EventPayload enum lists all event types.

use crate::tier::Tier;
use crate::types::{Amount, AssetClass, RequestId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }

    pub fn user(&self) -> Option<UserId> {
        match &self.payload {
            EventPayload::Staked(e) => Some(e.user),
            EventPayload::Unstaked(e) => Some(e.user),
            EventPayload::RewardsClaimed(e) => Some(e.user),
            EventPayload::RewardsAccrued(e) => Some(e.user),
            EventPayload::UnbondingRequested(e) => Some(e.user),
            EventPayload::InstantWithdrawal(e) => Some(e.user),
            EventPayload::UnbondingSettled(e) => Some(e.user),
            EventPayload::RewardsFunded(_)
            | EventPayload::RequestsProcessed(_)
            | EventPayload::LiquidityUpdated(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match &self.payload {
            EventPayload::Staked(_) => "staked",
            EventPayload::Unstaked(_) => "unstaked",
            EventPayload::RewardsClaimed(_) => "rewards_claimed",
            EventPayload::RewardsAccrued(_) => "rewards_accrued",
            EventPayload::RewardsFunded(_) => "rewards_funded",
            EventPayload::UnbondingRequested(_) => "unbonding_requested",
            EventPayload::InstantWithdrawal(_) => "instant_withdrawal",
            EventPayload::UnbondingSettled(_) => "unbonding_settled",
            EventPayload::RequestsProcessed(_) => "requests_processed",
            EventPayload::LiquidityUpdated(_) => "liquidity_updated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Ledger events
    Staked(StakedEvent),
    Unstaked(UnstakedEvent),
    RewardsClaimed(RewardsClaimedEvent),
    RewardsAccrued(RewardsAccruedEvent),
    RewardsFunded(RewardsFundedEvent),

    // Queue events
    UnbondingRequested(UnbondingRequestedEvent),
    InstantWithdrawal(InstantWithdrawalEvent),
    UnbondingSettled(UnbondingSettledEvent),
    RequestsProcessed(RequestsProcessedEvent),

    // Operator events
    LiquidityUpdated(LiquidityUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakedEvent {
    pub user: UserId,
    pub primary_amount: Amount,
    pub secondary_amount: Amount,
    pub shares_minted: Amount,
    pub ratio: u128,
    pub tier: Tier,
    pub rewards_accrued: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnstakedEvent {
    pub user: UserId,
    pub shares_burned: Amount,
    pub primary_returned: Amount,
    pub secondary_returned: Amount,
    pub ratio: u128,
    pub tier: Tier,
    pub rewards_accrued: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsClaimedEvent {
    pub user: UserId,
    pub amount: Amount,
    pub tier: Tier,
    pub reserve_after: Amount,
}

// standalone flush; stake, unstake and claim report their accrual in their own event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsAccruedEvent {
    pub user: UserId,
    pub reward: Amount,
    pub elapsed: u64,
    pub tier: Tier,
    pub accumulated: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsFundedEvent {
    pub amount: Amount,
    pub reserve_after: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbondingRequestedEvent {
    pub request_id: RequestId,
    pub user: UserId,
    pub amount: Amount,
    pub asset: AssetClass,
    pub unlock_time: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantWithdrawalEvent {
    pub user: UserId,
    pub amount: Amount,
    pub asset: AssetClass,
    pub liquidity_after: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPath {
    Sweep,
    Claim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbondingSettledEvent {
    pub request_id: RequestId,
    pub user: UserId,
    pub amount: Amount,
    pub asset: AssetClass,
    pub unlock_time: Timestamp,
    pub via: SettlementPath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsProcessedEvent {
    pub processed: usize,
    pub primary_queued_after: Amount,
    pub secondary_queued_after: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityUpdatedEvent {
    pub asset: AssetClass,
    pub previous: Amount,
    pub available: Amount,
}
