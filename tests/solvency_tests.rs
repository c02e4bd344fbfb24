//! Solvency invariant tests.
//!
//! These tests verify the conservation rules the pool must keep under any
//! sequence of operations: totals equal the sum of records, shares equal
//! secondary, queued totals equal the open requests, and no asset appears
//! or disappears between custody and the pool.

use dual_stake_core::*;
use proptest::prelude::*;

const DIVISOR: u128 = 10_000_000_000;
const WALLET_PRIMARY: u128 = 1_000_000_000 * DIVISOR;
const WALLET_SECONDARY: u128 = 1_000_000_000;

#[derive(Debug, Clone)]
enum Op {
    Stake { user: u64, primary: u128, secondary: u128 },
    Unstake { user: u64, pct: u128 },
    Claim { user: u64 },
    Advance { secs: u64 },
    Fund { amount: u128 },
    Unbond { user: u64, pct: u128, asset: AssetClass },
    Instant { user: u64, pct: u128, asset: AssetClass },
    Sweep,
    ClaimUnbonded { user: u64, index: usize },
    Liquidity { asset: AssetClass, amount: u128 },
}

fn asset_strategy() -> impl Strategy<Value = AssetClass> {
    prop_oneof![Just(AssetClass::Primary), Just(AssetClass::Secondary)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..6, 1u128..5_000_000u128, 1u128..10_000u128).prop_map(|(user, whole, secondary)| Op::Stake {
            user,
            primary: whole * DIVISOR,
            secondary,
        }),
        (1u64..6, 1u128..=100u128).prop_map(|(user, pct)| Op::Unstake { user, pct }),
        (1u64..6).prop_map(|user| Op::Claim { user }),
        (0u64..30 * SECONDS_PER_DAY).prop_map(|secs| Op::Advance { secs }),
        (1u128..10_000u128).prop_map(|amount| Op::Fund { amount }),
        (1u64..6, 1u128..=120u128, asset_strategy()).prop_map(|(user, pct, asset)| Op::Unbond { user, pct, asset }),
        (1u64..6, 1u128..=120u128, asset_strategy()).prop_map(|(user, pct, asset)| Op::Instant { user, pct, asset }),
        Just(Op::Sweep),
        (1u64..6, 0usize..5).prop_map(|(user, index)| Op::ClaimUnbonded { user, index }),
        (asset_strategy(), 0u128..1_000_000_000u128).prop_map(|(asset, amount)| Op::Liquidity { asset, amount }),
    ]
}

fn pool_with_wallets(users: u64) -> StakingPool {
    let mut pool = StakingPool::new(PoolConfig::default()).unwrap();
    pool.set_time(Timestamp::from_secs(1_700_000_000));
    for id in 1..=users {
        pool.custody_mut().mint(UserId(id), Asset::Primary, WALLET_PRIMARY);
        pool.custody_mut().mint(UserId(id), Asset::Secondary, WALLET_SECONDARY);
    }
    pool
}

// up to 120% of the holding, so some withdrawals overshoot and must be refused
fn slice_of_holding(pool: &StakingPool, user: u64, asset: AssetClass, pct: u128) -> u128 {
    let held = pool.user_stake(UserId(user)).map_or(0, |s| s.amount(asset));
    held * pct / 100
}

fn apply(pool: &mut StakingPool, op: &Op) {
    match *op {
        Op::Stake { user, primary, secondary } => {
            let _ = pool.stake(UserId(user), primary, secondary);
        }
        Op::Unstake { user, pct } => {
            let held = pool.user_stake(UserId(user)).map_or(0, |s| s.shares);
            let _ = pool.unstake(UserId(user), held * pct / 100);
        }
        Op::Claim { user } => {
            let _ = pool.claim_rewards(UserId(user));
        }
        Op::Advance { secs } => pool.advance_time(secs),
        Op::Fund { amount } => {
            let _ = pool.fund_rewards(amount);
        }
        Op::Unbond { user, pct, asset } => {
            let amount = slice_of_holding(pool, user, asset, pct);
            let _ = pool.request_unbonding(UserId(user), amount, asset);
        }
        Op::Instant { user, pct, asset } => {
            let amount = slice_of_holding(pool, user, asset, pct);
            let _ = pool.process_instant_withdrawal(UserId(user), amount, asset);
        }
        Op::Sweep => {
            let _ = pool.process_ready_requests();
        }
        Op::ClaimUnbonded { user, index } => {
            if let Ok(id) = pool.user_request(UserId(user), index).map(|r| r.id) {
                let _ = pool.claim_unbonded(UserId(user), id);
            }
        }
        Op::Liquidity { asset, amount } => pool.set_available_liquidity(asset, amount),
    }
}

fn wallets(pool: &StakingPool, users: u64, asset: Asset) -> u128 {
    (1..=users).map(|id| pool.custody().balance(UserId(id), asset)).sum()
}

proptest! {
    /// Every deposited unit is in a wallet, under stake or in the queue,
    /// whatever mix of stakes, exits, unbonding and instant withdrawals ran.
    #[test]
    fn conservation_under_random_operations(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut pool = pool_with_wallets(5);
        let mut funded: u128 = 0;

        for op in &ops {
            if let Op::Fund { amount } = op {
                funded += amount;
            }
            apply(&mut pool, op);
            prop_assert!(pool.check_invariants().is_ok(), "invariants broken after {:?}", op);
            prop_assert!(pool.queue().check_indexes(), "queue indexes broken after {:?}", op);
            prop_assert_eq!(pool.total_shares(), pool.total_secondary());

            prop_assert_eq!(
                wallets(&pool, 5, Asset::Primary) + pool.total_primary() + pool.total_queued(AssetClass::Primary),
                5 * WALLET_PRIMARY
            );
            prop_assert_eq!(
                wallets(&pool, 5, Asset::Secondary) + pool.total_secondary() + pool.total_queued(AssetClass::Secondary),
                5 * WALLET_SECONDARY
            );
        }
        prop_assert_eq!(wallets(&pool, 5, Asset::Reward) + pool.reward_reserve(), funded);
    }

    /// Rewards never decrease without a claim.
    #[test]
    fn pending_rewards_monotone(
        secondary in 1u128..1_000_000u128,
        steps in proptest::collection::vec(0u64..SECONDS_PER_YEAR, 1..20),
    ) {
        let user = UserId(1);
        let mut pool = pool_with_wallets(1);
        pool.stake(user, 300_000 * DIVISOR, secondary).unwrap();

        let mut last = 0;
        for secs in steps {
            pool.advance_time(secs);
            let pending = pool.pending_rewards(user).unwrap();
            prop_assert!(pending >= last);
            last = pending;
        }
    }

    /// Withdrawals only ever return what was deposited, through either path.
    #[test]
    fn withdrawals_never_exceed_deposits(
        deposits in proptest::collection::vec((1u128..1_000_000u128, 1u128..10_000u128), 3),
        requests in proptest::collection::vec((1u64..4, 1u128..=150u128, asset_strategy(), any::<bool>()), 1..40),
        waits in proptest::collection::vec(0u64..3 * SECONDS_PER_DAY, 1..10),
    ) {
        let mut pool = pool_with_wallets(3);
        pool.set_available_liquidity(AssetClass::Primary, u128::MAX / 2);
        pool.set_available_liquidity(AssetClass::Secondary, u128::MAX / 2);
        let mut deposited = [0u128; 2];
        for (i, (whole, secondary)) in deposits.iter().enumerate() {
            pool.stake(UserId(i as u64 + 1), whole * DIVISOR, *secondary).unwrap();
            deposited[0] += whole * DIVISOR;
            deposited[1] += secondary;
        }

        for (user, pct, asset, instant) in &requests {
            let amount = slice_of_holding(&pool, *user, *asset, *pct);
            let held = pool.user_stake(UserId(*user)).map_or(0, |s| s.amount(*asset));
            let result = if *instant && amount <= pool.max_instant_withdrawal() {
                pool.process_instant_withdrawal(UserId(*user), amount, *asset).map(|_| ())
            } else {
                pool.request_unbonding(UserId(*user), amount, *asset).map(|_| ())
            };
            if amount > held {
                prop_assert_eq!(result, Err(PoolError::InsufficientShares { requested: amount, held }));
            }
        }
        for (i, secs) in waits.iter().enumerate() {
            pool.advance_time(*secs);
            if i % 2 == 0 {
                pool.process_ready_requests().unwrap();
            } else if let Ok(id) = pool.user_request(UserId(i as u64 % 3 + 1), 0).map(|r| r.id) {
                let _ = pool.claim_unbonded(UserId(i as u64 % 3 + 1), id);
            }
            prop_assert!(pool.queue().check_indexes());
        }

        for (asset, coin) in [(AssetClass::Primary, Asset::Primary), (AssetClass::Secondary, Asset::Secondary)] {
            let start = if asset == AssetClass::Primary { WALLET_PRIMARY } else { WALLET_SECONDARY };
            let paid = wallets(&pool, 3, coin) - (3 * start - deposited[asset.index()]);
            let staked = pool.ledger().totals().amount(asset);
            prop_assert_eq!(paid + staked + pool.total_queued(asset), deposited[asset.index()]);
        }
        prop_assert!(pool.check_invariants().is_ok());
    }
}

#[test]
fn failed_operations_leave_state_untouched() {
    let user = UserId(1);
    let mut pool = pool_with_wallets(1);
    pool.stake(user, 250_000 * DIVISOR, 100).unwrap();
    pool.advance_time(SECONDS_PER_DAY);
    let before = pool.stats();
    let events = pool.events().len();

    pool.custody_mut().set_frozen(true);
    assert!(pool.stake(user, DIVISOR, 1).is_err());
    assert!(pool.unstake(user, 50).is_err());
    pool.custody_mut().set_frozen(false);

    assert_eq!(pool.stats(), before);
    assert_eq!(pool.events().len(), events);
    assert!(pool.check_invariants().is_ok());
}

#[test]
fn shares_equal_secondary_across_users() {
    let mut pool = pool_with_wallets(4);
    for id in 1..=4u64 {
        pool.stake(UserId(id), id as u128 * 100_000 * DIVISOR, id as u128 * 7).unwrap();
    }
    pool.unstake(UserId(2), 5).unwrap();
    pool.unstake(UserId(4), 28).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.total_shares, stats.total_secondary);
    assert_eq!(stats.users, 4);
    // a fully exited user keeps an empty record
    assert!(pool.user_stake(UserId(4)).unwrap().is_empty());
    assert!(pool.check_invariants().is_ok());
}
