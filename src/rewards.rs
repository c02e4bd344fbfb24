// 4.0 rewards.rs: lazy reward accrual. nothing accrues continuously; each record is
// brought up to date ("flushed") right before anything reads or changes its balances.
// 4.1 the rate comes from the tier of the record's balances at flush time, not at stake time.

use crate::ledger::UserStake;
use crate::tier::{compute_ratio, Tier, TierTable};
use crate::types::{Amount, Bps, Timestamp, SECONDS_PER_YEAR};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const BASIS_POINTS: u128 = Bps::DENOMINATOR as u128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccrualOutcome {
    /// First touch or no secondary staked: clock reset, nothing earned.
    Started,
    /// Already flushed at this instant.
    NoElapsed,
    Accrued {
        reward: Amount,
        elapsed: u64,
        tier: Tier,
        rate: Bps,
    },
}

impl AccrualOutcome {
    pub fn reward(&self) -> Amount {
        match self {
            AccrualOutcome::Accrued { reward, .. } => *reward,
            _ => 0,
        }
    }
}

// 4.2: secondary * rate * elapsed / (BASIS_POINTS * SECONDS_PER_YEAR), floored.
// None on overflow.
pub fn period_reward(secondary: Amount, rate: Bps, elapsed: u64) -> Option<Amount> {
    secondary
        .checked_mul(rate.value() as u128)?
        .checked_mul(elapsed as u128)
        .map(|n| n / (BASIS_POINTS * SECONDS_PER_YEAR as u128))
}

/// What a flush at `now` would produce, without touching the record.
pub fn preview_accrual(
    stake: &UserStake,
    now: Timestamp,
    tiers: &TierTable,
    divisor: u128,
) -> Option<AccrualOutcome> {
    let last = match stake.last_accrual_time {
        Some(last) if stake.secondary_amount > 0 => last,
        _ => return Some(AccrualOutcome::Started),
    };
    let elapsed = now.seconds_since(last);
    if elapsed == 0 {
        return Some(AccrualOutcome::NoElapsed);
    }
    let ratio = compute_ratio(stake.primary_amount, stake.secondary_amount, divisor);
    let tier = tiers.classify(ratio);
    let rate = tiers.rate_for(ratio);
    let reward = period_reward(stake.secondary_amount, rate, elapsed)?;
    Some(AccrualOutcome::Accrued { reward, elapsed, tier, rate })
}

// 4.3: apply a flush to the record. returns None if the reward overflows, in which
// case the record is left as it was.
pub fn accrue(
    stake: &mut UserStake,
    now: Timestamp,
    tiers: &TierTable,
    divisor: u128,
) -> Option<AccrualOutcome> {
    let outcome = preview_accrual(stake, now, tiers, divisor)?;
    match outcome {
        AccrualOutcome::Started => stake.last_accrual_time = Some(now),
        AccrualOutcome::NoElapsed => {}
        AccrualOutcome::Accrued { reward, .. } => {
            stake.accumulated_rewards = stake.accumulated_rewards.checked_add(reward)?;
            stake.last_accrual_time = Some(now);
        }
    }
    Some(outcome)
}

pub fn pending_rewards(
    stake: &UserStake,
    now: Timestamp,
    tiers: &TierTable,
    divisor: u128,
) -> Option<Amount> {
    let outcome = preview_accrual(stake, now, tiers, divisor)?;
    stake.accumulated_rewards.checked_add(outcome.reward())
}

// annual rate as a plain fraction, e.g. 800 bps -> 0.08
pub fn apr(rate: Bps) -> Decimal {
    rate.as_fraction()
}

// reward per year for a given secondary balance at a rate, before flooring.
// None past Decimal's 96-bit range.
pub fn annual_reward(secondary: Amount, rate: Bps) -> Option<Decimal> {
    Decimal::from_u128(secondary)?.checked_mul(apr(rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use rust_decimal_macros::dec;

    const DIVISOR: u128 = 10_000_000_000;

    fn staked(primary: Amount, secondary: Amount, at: u64) -> UserStake {
        let mut s = UserStake::new(UserId(1), Timestamp::from_secs(at));
        s.primary_amount = primary;
        s.secondary_amount = secondary;
        s.shares = secondary;
        s.last_accrual_time = Some(Timestamp::from_secs(at));
        s
    }

    #[test]
    fn full_year_at_base_rate() {
        let mut s = staked(0, 1_000_000, 0);
        let out = accrue(&mut s, Timestamp::from_secs(SECONDS_PER_YEAR), &TierTable::default(), DIVISOR)
            .unwrap();
        assert_eq!(out.reward(), 50_000); // 5%
        assert_eq!(s.accumulated_rewards, 50_000);
        assert_eq!(s.last_accrual_time, Some(Timestamp::from_secs(SECONDS_PER_YEAR)));
    }

    #[test]
    fn rate_follows_current_ratio() {
        // 25000 ratio -> BOOST 8%
        let mut s = staked(250_000 * DIVISOR * 10, 10 * 10, 0);
        let out = accrue(&mut s, Timestamp::from_secs(SECONDS_PER_YEAR), &TierTable::default(), DIVISOR)
            .unwrap();
        assert!(matches!(out, AccrualOutcome::Accrued { tier: Tier::Boost, rate, .. } if rate == Bps::new(800)));
        assert_eq!(out.reward(), 8);
    }

    #[test]
    fn first_touch_only_starts_clock() {
        let mut s = UserStake::new(UserId(1), Timestamp::from_secs(0));
        s.secondary_amount = 100;
        let out = accrue(&mut s, Timestamp::from_secs(500), &TierTable::default(), DIVISOR).unwrap();
        assert_eq!(out, AccrualOutcome::Started);
        assert_eq!(s.last_accrual_time, Some(Timestamp::from_secs(500)));
        assert_eq!(s.accumulated_rewards, 0);
    }

    #[test]
    fn no_secondary_never_earns() {
        let mut s = staked(1_000 * DIVISOR, 0, 0);
        let out = accrue(&mut s, Timestamp::from_secs(SECONDS_PER_YEAR), &TierTable::default(), DIVISOR)
            .unwrap();
        assert_eq!(out, AccrualOutcome::Started);
        assert_eq!(s.accumulated_rewards, 0);
    }

    #[test]
    fn flush_twice_same_instant_is_idempotent() {
        let mut s = staked(0, 1_000_000, 0);
        let now = Timestamp::from_secs(86_400);
        accrue(&mut s, now, &TierTable::default(), DIVISOR).unwrap();
        let after_first = s.accumulated_rewards;
        let out = accrue(&mut s, now, &TierTable::default(), DIVISOR).unwrap();
        assert_eq!(out, AccrualOutcome::NoElapsed);
        assert_eq!(s.accumulated_rewards, after_first);
    }

    #[test]
    fn small_periods_floor_to_zero() {
        assert_eq!(period_reward(1, Bps::new(500), 1), Some(0));
    }

    #[test]
    fn overflow_is_none() {
        assert_eq!(period_reward(u128::MAX, Bps::new(500), 2), None);
    }

    #[test]
    fn pending_matches_accrue() {
        let mut s = staked(0, 2_000_000, 0);
        let now = Timestamp::from_secs(SECONDS_PER_YEAR / 2);
        let preview = pending_rewards(&s, now, &TierTable::default(), DIVISOR).unwrap();
        accrue(&mut s, now, &TierTable::default(), DIVISOR).unwrap();
        assert_eq!(preview, s.accumulated_rewards);
        assert_eq!(preview, 50_000);
    }

    #[test]
    fn apr_helpers() {
        assert_eq!(apr(Bps::new(1200)), dec!(0.12));
        assert_eq!(annual_reward(1_000, Bps::new(800)), Some(dec!(80)));
        assert_eq!(annual_reward(u128::MAX, Bps::new(800)), None);
    }
}
