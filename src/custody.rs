// 9.0 custody.rs: the asset-transfer collaborator. the pool never holds tokens itself;
// it hands custody a batch of debits and credits and the batch either lands whole or not at all.
// 9.1 InMemoryCustody is the bundled implementation: wallet balances in a map, no real chain.

use crate::types::{Amount, Asset, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Pull from the user into the pool.
    Debit,
    /// Pay from the pool to the user.
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub user: UserId,
    pub asset: Asset,
    pub amount: Amount,
    pub direction: Direction,
}

impl Transfer {
    pub fn debit(user: UserId, asset: Asset, amount: Amount) -> Self {
        Self { user, asset, amount, direction: Direction::Debit }
    }

    pub fn credit(user: UserId, asset: Asset, amount: Amount) -> Self {
        Self { user, asset, amount, direction: Direction::Credit }
    }
}

pub trait AssetCustody {
    /// Apply every transfer or none of them.
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Insufficient {asset:?} balance for {user}: requested {requested}, available {available}")]
    InsufficientBalance {
        user: UserId,
        asset: Asset,
        requested: Amount,
        available: Amount,
    },

    #[error("Balance overflow crediting {user}")]
    Overflow { user: UserId },

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCustody {
    balances: HashMap<(UserId, Asset), Amount>,
    // halts every batch while set; used to simulate a downed custodian
    frozen: bool,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, user: UserId, asset: Asset, amount: Amount) {
        let balance = self.balances.entry((user, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, user: UserId, asset: Asset) -> Amount {
        self.balances.get(&(user, asset)).copied().unwrap_or(0)
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    fn apply(&self, transfers: &[Transfer]) -> Result<HashMap<(UserId, Asset), Amount>, CustodyError> {
        let mut staged: HashMap<(UserId, Asset), Amount> = HashMap::new();
        for t in transfers {
            let key = (t.user, t.asset);
            let current = staged.get(&key).copied().unwrap_or_else(|| self.balance(t.user, t.asset));
            let next = match t.direction {
                Direction::Debit => current.checked_sub(t.amount).ok_or(CustodyError::InsufficientBalance {
                    user: t.user,
                    asset: t.asset,
                    requested: t.amount,
                    available: current,
                })?,
                Direction::Credit => current
                    .checked_add(t.amount)
                    .ok_or(CustodyError::Overflow { user: t.user })?,
            };
            staged.insert(key, next);
        }
        Ok(staged)
    }
}

impl AssetCustody for InMemoryCustody {
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError> {
        if self.frozen {
            return Err(CustodyError::Rejected("custody frozen".to_string()));
        }
        // stage the whole batch first so a failing leg leaves balances untouched
        let staged = self.apply(transfers)?;
        self.balances.extend(staged);
        Ok(())
    }
}
