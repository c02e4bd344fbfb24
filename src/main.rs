//! Dual-asset staking pool simulation.
//!
//! Walks the pool through tier classification, reward accrual under a ratio
//! change, partial exits, the unbonding sweep and the instant-withdrawal path.

use dual_stake_core::*;
use rust_decimal_macros::dec;

// one whole primary unit normalizes to one secondary base unit
const UNIT: u128 = 10_000_000_000;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("Dual-Asset Staking Pool Simulation\n");

    scenario_1_tier_boundaries();
    scenario_2_accrual_under_ratio_change()?;
    scenario_3_partial_exit()?;
    scenario_4_unbonding_sweep()?;
    scenario_5_instant_withdrawal()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn funded_pool(users: &[UserId]) -> Result<StakingPool, PoolError> {
    let mut pool = StakingPool::new(PoolConfig::default())?;
    pool.set_time(Timestamp::from_secs(1_700_000_000));
    for &user in users {
        pool.custody_mut().mint(user, Asset::Primary, 10_000_000_000 * UNIT);
        pool.custody_mut().mint(user, Asset::Secondary, 10_000_000);
    }
    Ok(pool)
}

/// Ratio thresholds and the double floor at the boundary.
fn scenario_1_tier_boundaries() {
    println!("Scenario 1: Tier Boundaries\n");

    for (primary, secondary) in [
        (250_000 * UNIT, 10),
        (200_000 * UNIT, 10),
        (200_000 * UNIT - 1, 10),
        (600_000 * UNIT, 10),
        (1_600_000 * UNIT, 10),
    ] {
        let ratio = compute_ratio(primary, secondary, UNIT);
        println!("  primary {} / secondary {} -> ratio {} -> {}", primary, secondary, ratio, classify(ratio));
    }
    println!("  (one base unit short of 200000 lands in BASE after the two floors)\n");
}

/// A later deposit moves the staker up a tier for the next period.
fn scenario_2_accrual_under_ratio_change() -> Result<(), PoolError> {
    println!("Scenario 2: Accrual Under Ratio Change\n");

    let alice = UserId(1);
    let mut pool = funded_pool(&[alice])?;
    pool.fund_rewards(1_000_000)?;

    let receipt = pool.stake(alice, UNIT, 100_000)?;
    println!("  Alice stakes at ratio {} ({})", receipt.ratio, receipt.tier);

    let rate = pool.config().tiers.rate_for(receipt.ratio);
    println!(
        "  Projected over a year: {:?}",
        rewards::annual_reward(100_000, rate).map(|r| r.round_dp(2))
    );

    pool.advance_time(SECONDS_PER_YEAR);
    println!("  A year later pending: {}", pool.pending_rewards(alice)?);

    let receipt = pool.stake(alice, 3_000_000_000 * UNIT, 50_000)?;
    println!(
        "  Top-up moves ratio to {} ({}), flushed {}",
        receipt.ratio, receipt.tier, receipt.rewards_accrued
    );

    pool.advance_time(SECONDS_PER_YEAR);
    let claimed = pool.claim_rewards(alice)?;
    println!("  Claimed {} after two years, reserve left {}\n", claimed, pool.reward_reserve());
    Ok(())
}

/// Unstaking a fraction keeps the realized ratio.
fn scenario_3_partial_exit() -> Result<(), PoolError> {
    println!("Scenario 3: Partial Exit\n");

    let bob = UserId(2);
    let mut pool = funded_pool(&[bob])?;
    let receipt = pool.stake(bob, 3_000_000 * UNIT, 90)?;
    println!("  Bob stakes, ratio {} ({}), shares {}", receipt.ratio, receipt.tier, receipt.total_shares);

    let exit = pool.unstake(bob, 30)?;
    println!(
        "  Burns 30 shares: {} primary, {} secondary back, ratio still {}",
        exit.primary_returned, exit.secondary_returned, exit.ratio
    );

    let stats = pool.stats();
    println!(
        "  Pool totals: primary {}, secondary {}, shares {}, ratio {:?}\n",
        stats.total_primary,
        stats.total_secondary,
        stats.total_shares,
        stats.pool_ratio.map(|r| r.round_dp(2)),
    );
    pool.check_invariants()?;
    Ok(())
}

/// Requests mature per asset class and a sweep settles them.
fn scenario_4_unbonding_sweep() -> Result<(), PoolError> {
    println!("Scenario 4: Unbonding Sweep\n");

    let carol = UserId(3);
    let mut pool = funded_pool(&[carol])?;
    pool.stake(carol, 50 * UNIT, 1_000)?;
    pool.request_unbonding(carol, 100, AssetClass::Secondary)?;
    pool.request_unbonding(carol, 5 * UNIT, AssetClass::Primary)?;

    let info = pool.get_queue_info(carol, AssetClass::Secondary);
    println!(
        "  Carol queued {} secondary, position {}, unlock {:?}",
        info.total_queued, info.position, info.estimated_unlock_time.map(|t| t.to_string())
    );

    pool.advance_time(23 * 3600);
    println!("  After 23h: {} settled", pool.process_ready_requests()?);

    pool.advance_time(3600 + 1);
    println!("  After 24h01s: {} settled", pool.process_ready_requests()?);
    println!(
        "  Still queued: primary {}, secondary {}; still staked: secondary {}\n",
        pool.total_queued(AssetClass::Primary),
        pool.total_queued(AssetClass::Secondary),
        pool.total_secondary()
    );
    Ok(())
}

/// The instant path needs both the ceiling and liquidity on hand.
fn scenario_5_instant_withdrawal() -> Result<(), PoolError> {
    println!("Scenario 5: Instant Withdrawal\n");

    let dave = UserId(4);
    let mut pool = funded_pool(&[dave])?;
    pool.stake(dave, 10_000 * UNIT, 1_000)?;
    pool.set_available_liquidity(AssetClass::Secondary, 500);

    for amount in [400, 200, pool.max_instant_withdrawal() + 1] {
        match pool.process_instant_withdrawal(dave, amount, AssetClass::Secondary) {
            Ok(left) => println!("  {} out instantly, {} liquidity left", amount, left),
            Err(e) => println!("  {} rejected: {}", amount, e),
        }
    }

    let stake = pool.user_stake(dave).map_or(0, |s| s.secondary_amount);
    let rate = pool.config().tiers.rate_for(pool.user_ratio(dave)?);
    let apr = rewards::apr(rate);
    let projected = rewards::annual_reward(stake, rate).unwrap_or_default();
    println!(
        "  Dave keeps {} secondary staked at {}% a year, about {} a year in rewards",
        stake,
        apr * dec!(100),
        projected.round_dp(2)
    );
    Ok(())
}
