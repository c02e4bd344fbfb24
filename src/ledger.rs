//! Per-user stake records.
//!
//! Records live in a flat arena addressed by [`StakeHandle`]; a user id maps
//! to its handle on first deposit and keeps it forever. Zero balances stay as
//! a record. Global totals are kept alongside and must always equal the sum
//! over the arena, and total shares must equal total secondary under stake
//! since shares are minted 1:1 with secondary deposits.

use crate::types::{Amount, AssetClass, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StakeHandle(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub user: UserId,
    pub primary_amount: Amount,
    pub secondary_amount: Amount,
    pub shares: Amount,
    /// Unset until the first flush touches this record.
    pub last_accrual_time: Option<Timestamp>,
    pub accumulated_rewards: Amount,
    pub created_at: Timestamp,
}

impl UserStake {
    pub fn new(user: UserId, timestamp: Timestamp) -> Self {
        Self {
            user,
            primary_amount: 0,
            secondary_amount: 0,
            shares: 0,
            last_accrual_time: None,
            accumulated_rewards: 0,
            created_at: timestamp,
        }
    }

    pub fn amount(&self, asset: AssetClass) -> Amount {
        match asset {
            AssetClass::Primary => self.primary_amount,
            AssetClass::Secondary => self.secondary_amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shares == 0 && self.primary_amount == 0 && self.secondary_amount == 0
    }

    // 3.1: both assets scaled by the same shares/user_shares fraction, floored
    pub fn proportional_exit(&self, shares: Amount) -> Result<(Amount, Amount), LedgerError> {
        if shares == 0 || shares > self.shares {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                held: self.shares,
            });
        }
        let primary = self
            .primary_amount
            .checked_mul(shares)
            .ok_or(LedgerError::Overflow)?
            / self.shares;
        let secondary = self
            .secondary_amount
            .checked_mul(shares)
            .ok_or(LedgerError::Overflow)?
            / self.shares;
        Ok((primary, secondary))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub primary: Amount,
    pub secondary: Amount,
    pub shares: Amount,
}

impl LedgerTotals {
    pub fn amount(&self, asset: AssetClass) -> Amount {
        match asset {
            AssetClass::Primary => self.primary,
            AssetClass::Secondary => self.secondary,
        }
    }
}

/// State needed to undo one operation's ledger writes.
#[derive(Debug, Clone)]
pub struct LedgerCheckpoint {
    len: usize,
    touched: Option<(StakeHandle, UserStake)>,
    totals: LedgerTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StakeLedger {
    records: Vec<UserStake>,
    handles: HashMap<UserId, StakeHandle>,
    totals: LedgerTotals,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn totals(&self) -> LedgerTotals {
        self.totals
    }

    pub fn handle(&self, user: UserId) -> Option<StakeHandle> {
        self.handles.get(&user).copied()
    }

    pub fn get(&self, user: UserId) -> Option<&UserStake> {
        self.handle(user).map(|h| &self.records[h.0])
    }

    pub fn record(&self, handle: StakeHandle) -> &UserStake {
        &self.records[handle.0]
    }

    pub fn record_mut(&mut self, handle: StakeHandle) -> &mut UserStake {
        &mut self.records[handle.0]
    }

    pub fn get_or_create(&mut self, user: UserId, timestamp: Timestamp) -> StakeHandle {
        if let Some(handle) = self.handle(user) {
            return handle;
        }
        let handle = StakeHandle(self.records.len());
        self.records.push(UserStake::new(user, timestamp));
        self.handles.insert(user, handle);
        handle
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserStake> {
        self.records.iter()
    }

    pub fn deposit(
        &mut self,
        handle: StakeHandle,
        primary: Amount,
        secondary: Amount,
    ) -> Result<(), LedgerError> {
        let totals = LedgerTotals {
            primary: self.totals.primary.checked_add(primary).ok_or(LedgerError::Overflow)?,
            secondary: self.totals.secondary.checked_add(secondary).ok_or(LedgerError::Overflow)?,
            shares: self.totals.shares.checked_add(secondary).ok_or(LedgerError::Overflow)?,
        };
        let record = &mut self.records[handle.0];
        // per-record sums cannot exceed the global ones checked above
        record.primary_amount += primary;
        record.secondary_amount += secondary;
        record.shares += secondary;
        self.totals = totals;
        Ok(())
    }

    /// Burn `shares` and remove the matching slice of both assets.
    pub fn withdraw(
        &mut self,
        handle: StakeHandle,
        shares: Amount,
    ) -> Result<(Amount, Amount), LedgerError> {
        let record = &mut self.records[handle.0];
        let (primary, secondary) = record.proportional_exit(shares)?;
        record.primary_amount -= primary;
        record.secondary_amount -= secondary;
        record.shares -= shares;
        self.totals.primary -= primary;
        self.totals.secondary -= secondary;
        self.totals.shares -= shares;
        Ok((primary, secondary))
    }

    /// Take `amount` of one asset class out of a holding for an unbonding or
    /// instant exit. Secondary burns shares 1:1; primary leaves shares alone.
    pub fn release(
        &mut self,
        handle: StakeHandle,
        asset: AssetClass,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let record = &mut self.records[handle.0];
        let held = record.amount(asset);
        if amount == 0 || amount > held {
            return Err(LedgerError::InsufficientShares { requested: amount, held });
        }
        match asset {
            AssetClass::Primary => {
                record.primary_amount -= amount;
                self.totals.primary -= amount;
            }
            AssetClass::Secondary => {
                record.secondary_amount -= amount;
                record.shares -= amount;
                self.totals.secondary -= amount;
                self.totals.shares -= amount;
            }
        }
        Ok(())
    }

    pub fn checkpoint(&self, handle: Option<StakeHandle>) -> LedgerCheckpoint {
        LedgerCheckpoint {
            len: self.records.len(),
            touched: handle.map(|h| (h, self.records[h.0].clone())),
            totals: self.totals,
        }
    }

    pub fn rollback(&mut self, checkpoint: LedgerCheckpoint) {
        for record in self.records.drain(checkpoint.len..) {
            self.handles.remove(&record.user);
        }
        if let Some((handle, record)) = checkpoint.touched {
            if handle.0 < self.records.len() {
                self.records[handle.0] = record;
            }
        }
        self.totals = checkpoint.totals;
    }

    // 3.2: recompute totals from the arena and compare against the running ones
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        let mut summed = LedgerTotals::default();
        for record in &self.records {
            summed.primary += record.primary_amount;
            summed.secondary += record.secondary_amount;
            summed.shares += record.shares;
            if record.shares != record.secondary_amount {
                return Err(LedgerError::SharesMismatch {
                    user: record.user,
                    shares: record.shares,
                    secondary: record.secondary_amount,
                });
            }
        }
        for asset in AssetClass::ALL {
            if summed.amount(asset) != self.totals.amount(asset) {
                return Err(LedgerError::ConservationViolated {
                    asset,
                    recorded: self.totals.amount(asset),
                    summed: summed.amount(asset),
                });
            }
        }
        if summed.shares != self.totals.shares || self.totals.shares != self.totals.secondary {
            return Err(LedgerError::ConservationViolated {
                asset: AssetClass::Secondary,
                recorded: self.totals.shares,
                summed: summed.shares,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Amount, held: Amount },

    #[error("Arithmetic overflow in ledger")]
    Overflow,

    #[error("Totals for {asset} drifted: recorded {recorded}, summed {summed}")]
    ConservationViolated {
        asset: AssetClass,
        recorded: Amount,
        summed: Amount,
    },

    #[error("{user} holds {shares} shares against {secondary} secondary")]
    SharesMismatch {
        user: UserId,
        shares: Amount,
        secondary: Amount,
    },
}
