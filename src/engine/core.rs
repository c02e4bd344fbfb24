// 8.0 engine/core.rs: the pool. holds the ledger, queue, liquidity, reward reserve, custody
// and the event log. every operation snapshots the clock once at entry.

use super::results::{PoolError, PoolStats};
use crate::config::PoolConfig;
use crate::custody::{AssetCustody, InMemoryCustody, Transfer};
use crate::events::{Event, EventId, EventPayload, LiquidityUpdatedEvent, RewardsFundedEvent};
use crate::ledger::{StakeLedger, UserStake};
use crate::liquidity::LiquidityTracker;
use crate::rewards;
use crate::tier::{compute_ratio, Tier};
use crate::types::{Amount, AssetClass, Timestamp, UserId};
use crate::unbonding::UnbondingQueue;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

/** 8.1: main pool struct. all state lives here */
#[derive(Debug)]
pub struct StakingPool<C: AssetCustody = InMemoryCustody> {
    pub(super) config: PoolConfig,
    pub(super) ledger: StakeLedger,
    pub(super) queue: UnbondingQueue,
    pub(super) liquidity: LiquidityTracker,
    pub(super) custody: C,
    pub(super) reward_reserve: Amount,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl StakingPool<InMemoryCustody> {
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_custody(config, InMemoryCustody::new())
    }
}

impl<C: AssetCustody> StakingPool<C> {
    pub fn with_custody(config: PoolConfig, custody: C) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            queue: UnbondingQueue::new(config.bonding),
            liquidity: LiquidityTracker::new(config.max_instant_withdrawal),
            ledger: StakeLedger::new(),
            custody,
            reward_reserve: 0,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_secs(0),
            config,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.saturating_add(secs);
    }

    // wall clock, never moving backwards
    pub fn sync_clock(&mut self) {
        self.current_time = self.current_time.max(Timestamp::now());
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn queue(&self) -> &UnbondingQueue {
        &self.queue
    }

    pub fn user_stake(&self, user: UserId) -> Option<&UserStake> {
        self.ledger.get(user)
    }

    pub fn user_ratio(&self, user: UserId) -> Result<u128, PoolError> {
        let stake = self.ledger.get(user).ok_or(PoolError::UserNotFound(user))?;
        Ok(self.ratio_of(stake))
    }

    pub fn user_tier(&self, user: UserId) -> Result<Tier, PoolError> {
        let ratio = self.user_ratio(user)?;
        Ok(self.config.tiers.classify(ratio))
    }

    /// Accumulated rewards plus whatever a flush right now would add.
    pub fn pending_rewards(&self, user: UserId) -> Result<Amount, PoolError> {
        let stake = self.ledger.get(user).ok_or(PoolError::UserNotFound(user))?;
        rewards::pending_rewards(
            stake,
            self.current_time,
            &self.config.tiers,
            self.config.normalization_divisor,
        )
        .ok_or(PoolError::ArithmeticOverflow)
    }

    pub fn total_primary(&self) -> Amount {
        self.ledger.totals().primary
    }

    pub fn total_secondary(&self) -> Amount {
        self.ledger.totals().secondary
    }

    pub fn total_shares(&self) -> Amount {
        self.ledger.totals().shares
    }

    pub fn reward_reserve(&self) -> Amount {
        self.reward_reserve
    }

    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.ledger.check_invariants().map_err(PoolError::Invariant)
    }

    /// Privileged top-up of the reserve rewards are paid from.
    pub fn fund_rewards(&mut self, amount: Amount) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(PoolError::AmountMustBePositive);
        }
        let now = self.current_time;
        self.reward_reserve = self
            .reward_reserve
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;

        info!(amount, reserve = self.reward_reserve, "reward reserve funded");
        self.emit_event(
            now,
            EventPayload::RewardsFunded(RewardsFundedEvent {
                amount,
                reserve_after: self.reward_reserve,
            }),
        );
        Ok(self.reward_reserve)
    }

    /// Trusted operator write of the funds on hand for instant exits.
    pub fn set_available_liquidity(&mut self, asset: AssetClass, amount: Amount) {
        let now = self.current_time;
        let previous = self.liquidity.set_available(asset, amount);

        info!(%asset, previous, available = amount, "liquidity updated");
        self.emit_event(
            now,
            EventPayload::LiquidityUpdated(LiquidityUpdatedEvent {
                asset,
                previous,
                available: amount,
            }),
        );
    }

    pub fn available_liquidity(&self, asset: AssetClass) -> Amount {
        self.liquidity.available(asset)
    }

    pub fn max_instant_withdrawal(&self) -> Amount {
        self.liquidity.max_instant_withdrawal()
    }

    pub fn stats(&self) -> PoolStats {
        let totals = self.ledger.totals();
        let mut tier_distribution = [0usize; 4];
        for stake in self.ledger.iter() {
            let tier = self.config.tiers.classify(self.ratio_of(stake));
            tier_distribution[tier as usize] += 1;
        }
        let pool_ratio_floored = compute_ratio(totals.primary, totals.secondary, self.config.normalization_divisor);
        let pool_ratio = if totals.secondary == 0 {
            None
        } else {
            Decimal::from_u128(totals.primary)
                .zip(Decimal::from_u128(totals.secondary))
                .zip(Decimal::from_u128(self.config.normalization_divisor))
                .and_then(|((p, s), d)| p.checked_div(d)?.checked_div(s))
        };

        PoolStats {
            users: self.ledger.len(),
            total_primary: totals.primary,
            total_secondary: totals.secondary,
            total_shares: totals.shares,
            primary_queued: self.queue.total_queued(AssetClass::Primary),
            secondary_queued: self.queue.total_queued(AssetClass::Secondary),
            primary_liquidity: self.liquidity.available(AssetClass::Primary),
            secondary_liquidity: self.liquidity.available(AssetClass::Secondary),
            reward_reserve: self.reward_reserve,
            unbonding_requests: self.queue.len(),
            pool_ratio,
            pool_tier: self.config.tiers.classify(pool_ratio_floored),
            tier_distribution,
        }
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn ratio_of(&self, stake: &UserStake) -> u128 {
        compute_ratio(
            stake.primary_amount,
            stake.secondary_amount,
            self.config.normalization_divisor,
        )
    }

    // one custody batch per operation; on failure `undo` restores the operation's writes
    pub(super) fn transfer<F>(&mut self, transfers: &[Transfer], undo: F) -> Result<(), PoolError>
    where
        F: FnOnce(&mut Self),
    {
        if let Err(e) = self.custody.settle(transfers) {
            warn!(error = %e, legs = transfers.len(), "custody rejected batch, rolling back");
            undo(self);
            return Err(PoolError::Custody(e));
        }
        Ok(())
    }

    pub(super) fn emit_event(&mut self, timestamp: Timestamp, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), timestamp, payload);
        self.next_event_id += 1;
        self.events.push(event);

        if let Some(max) = self.config.max_events {
            if self.events.len() > max {
                let drain_count = self.events.len() - max;
                self.events.drain(0..drain_count);
            }
        }
    }
}
