//! Staking, unstaking and reward claims.

use super::core::StakingPool;
use super::results::{PoolError, StakeReceipt, UnstakeReceipt};
use crate::custody::{AssetCustody, Transfer};
use crate::events::{
    EventPayload, RewardsAccruedEvent, RewardsClaimedEvent, StakedEvent, UnstakedEvent,
};
use crate::ledger::StakeHandle;
use crate::rewards::{self, AccrualOutcome};
use crate::types::{Amount, Asset, Timestamp, UserId};
use tracing::{debug, info};

impl<C: AssetCustody> StakingPool<C> {
    /// Bring a record's rewards up to `now`. Runs before any balance change.
    pub(super) fn flush(&mut self, handle: StakeHandle, now: Timestamp) -> Result<AccrualOutcome, PoolError> {
        let tiers = &self.config.tiers;
        let divisor = self.config.normalization_divisor;
        let stake = self.ledger.record_mut(handle);
        let outcome = rewards::accrue(stake, now, tiers, divisor).ok_or(PoolError::ArithmeticOverflow)?;

        if let AccrualOutcome::Accrued { reward, elapsed, tier, rate } = outcome {
            debug!(user = %stake.user, reward, elapsed, %tier, %rate, "rewards accrued");
        }
        Ok(outcome)
    }

    /// Flush a user's rewards without changing balances. Logs an accrual
    /// event only when something was actually accrued.
    pub fn flush_rewards(&mut self, user: UserId) -> Result<Amount, PoolError> {
        let Some(handle) = self.ledger.handle(user) else {
            return Err(PoolError::UserNotFound(user));
        };
        let now = self.current_time;
        let (outcome, accumulated) = self.atomic(Some(handle), |pool| {
            let outcome = pool.flush(handle, now)?;
            Ok((outcome, pool.ledger.record(handle).accumulated_rewards))
        })?;

        if let AccrualOutcome::Accrued { reward, elapsed, tier, .. } = outcome {
            self.emit_event(
                now,
                EventPayload::RewardsAccrued(RewardsAccruedEvent {
                    user,
                    reward,
                    elapsed,
                    tier,
                    accumulated,
                }),
            );
        }
        Ok(accumulated)
    }

    /// Deposit both assets together. Mints shares 1:1 with the secondary amount.
    pub fn stake(
        &mut self,
        user: UserId,
        primary_amount: Amount,
        secondary_amount: Amount,
    ) -> Result<StakeReceipt, PoolError> {
        if primary_amount == 0 || secondary_amount == 0 {
            return Err(PoolError::AmountMustBePositive);
        }
        let now = self.current_time;

        let receipt = self.atomic(self.ledger.handle(user), |pool| {
            let handle = pool.ledger.get_or_create(user, now);
            let outcome = pool.flush(handle, now)?;
            pool.ledger.deposit(handle, primary_amount, secondary_amount)?;

            let stake = pool.ledger.record(handle);
            let ratio = pool.ratio_of(stake);
            let receipt = StakeReceipt {
                shares_minted: secondary_amount,
                total_shares: stake.shares,
                ratio,
                tier: pool.config.tiers.classify(ratio),
                rewards_accrued: outcome.reward(),
            };

            pool.transfer(
                &[
                    Transfer::debit(user, Asset::Primary, primary_amount),
                    Transfer::debit(user, Asset::Secondary, secondary_amount),
                ],
                |_| {},
            )?;
            Ok(receipt)
        })?;

        info!(
            %user,
            primary = primary_amount,
            secondary = secondary_amount,
            ratio = receipt.ratio,
            tier = %receipt.tier,
            "staked"
        );
        self.emit_event(
            now,
            EventPayload::Staked(StakedEvent {
                user,
                primary_amount,
                secondary_amount,
                shares_minted: receipt.shares_minted,
                ratio: receipt.ratio,
                tier: receipt.tier,
                rewards_accrued: receipt.rewards_accrued,
            }),
        );
        Ok(receipt)
    }

    /// Burn shares and return the same fraction of both assets.
    pub fn unstake(&mut self, user: UserId, shares: Amount) -> Result<UnstakeReceipt, PoolError> {
        let Some(handle) = self.ledger.handle(user) else {
            return Err(PoolError::InsufficientShares { requested: shares, held: 0 });
        };
        let held = self.ledger.record(handle).shares;
        if shares == 0 || shares > held {
            return Err(PoolError::InsufficientShares { requested: shares, held });
        }
        let now = self.current_time;

        let (receipt, accrued) = self.atomic(Some(handle), |pool| {
            let outcome = pool.flush(handle, now)?;
            let (primary, secondary) = pool.ledger.withdraw(handle, shares)?;

            let stake = pool.ledger.record(handle);
            let ratio = pool.ratio_of(stake);
            let receipt = UnstakeReceipt {
                primary_returned: primary,
                secondary_returned: secondary,
                shares_remaining: stake.shares,
                ratio,
                tier: pool.config.tiers.classify(ratio),
            };

            pool.transfer(
                &[
                    Transfer::credit(user, Asset::Primary, primary),
                    Transfer::credit(user, Asset::Secondary, secondary),
                ],
                |_| {},
            )?;
            Ok((receipt, outcome.reward()))
        })?;

        info!(
            %user,
            shares,
            primary = receipt.primary_returned,
            secondary = receipt.secondary_returned,
            "unstaked"
        );
        self.emit_event(
            now,
            EventPayload::Unstaked(UnstakedEvent {
                user,
                shares_burned: shares,
                primary_returned: receipt.primary_returned,
                secondary_returned: receipt.secondary_returned,
                ratio: receipt.ratio,
                tier: receipt.tier,
                rewards_accrued: accrued,
            }),
        );
        Ok(receipt)
    }

    /// Pay out everything accumulated so far from the reward reserve.
    pub fn claim_rewards(&mut self, user: UserId) -> Result<Amount, PoolError> {
        let Some(handle) = self.ledger.handle(user) else {
            return Err(PoolError::UserNotFound(user));
        };
        let now = self.current_time;

        let amount = self.atomic(Some(handle), |pool| {
            pool.flush(handle, now)?;
            let amount = pool.ledger.record(handle).accumulated_rewards;
            if amount > pool.reward_reserve {
                return Err(PoolError::InsufficientPool {
                    requested: amount,
                    reserve: pool.reward_reserve,
                });
            }
            pool.ledger.record_mut(handle).accumulated_rewards = 0;
            pool.reward_reserve -= amount;

            pool.transfer(&[Transfer::credit(user, Asset::Reward, amount)], |_| {})?;
            Ok(amount)
        })?;

        let ratio = self.ratio_of(self.ledger.record(handle));
        let tier = self.config.tiers.classify(ratio);
        info!(%user, amount, %tier, reserve = self.reward_reserve, "rewards claimed");
        self.emit_event(
            now,
            EventPayload::RewardsClaimed(RewardsClaimedEvent {
                user,
                amount,
                tier,
                reserve_after: self.reward_reserve,
            }),
        );
        Ok(amount)
    }

    // runs `op`; on any error restores the touched record, new records and the reserve
    pub(super) fn atomic<T>(
        &mut self,
        handle: Option<StakeHandle>,
        op: impl FnOnce(&mut Self) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        let checkpoint = self.ledger.checkpoint(handle);
        let reserve = self.reward_reserve;
        let result = op(self);
        if result.is_err() {
            self.ledger.rollback(checkpoint);
            self.reward_reserve = reserve;
        }
        result
    }
}
