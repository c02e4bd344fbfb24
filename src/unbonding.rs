//! Time-delayed exit queue.
//!
//! Every request is stored once in an arena indexed by its [`RequestId`]
//! (ids are allocated from 1 and never reused, so the arena slot is
//! `id - 1`, which is also the request's position in global insertion
//! order). A second index lists each user's request ids in the order they
//! were made.
//!
//! A request moves Pending -> Matured purely by the clock and Matured ->
//! Settled exactly once. The sweep conceptually visits the whole history on
//! every call; settled entries are no-ops, so the scan starts at the lowest
//! unsettled position instead and the result is the same.

use crate::types::{Amount, AssetClass, RequestId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingRequest {
    pub id: RequestId,
    pub user: UserId,
    pub amount: Amount,
    pub asset: AssetClass,
    pub request_time: Timestamp,
    pub unlock_time: Timestamp,
    pub settled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Matured,
    Settled,
}

impl UnbondingRequest {
    pub fn state(&self, now: Timestamp) -> RequestState {
        if self.settled {
            RequestState::Settled
        } else if now >= self.unlock_time {
            RequestState::Matured
        } else {
            RequestState::Pending
        }
    }

    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.state(now) == RequestState::Matured
    }
}

/// One user's view of the queue for one asset class.
///
/// "Pending" here means not yet paid out: a request that has matured but not
/// been swept or claimed still counts toward `total_queued`, and contributes
/// zero seconds to `average_wait_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Sum of the user's unsettled requests in this asset class, matured or not.
    pub total_queued: Amount,
    /// Mean seconds left until unlock over those requests, floored. Matured
    /// requests count as zero.
    pub average_wait_time: u64,
    /// 1-based global position of the user's first unsettled request of any
    /// asset class, 0 when there is none.
    pub position: usize,
    /// Earliest unlock among those requests.
    pub estimated_unlock_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingPeriods {
    pub primary_secs: u64,
    pub secondary_secs: u64,
}

impl BondingPeriods {
    pub fn for_asset(&self, asset: AssetClass) -> u64 {
        match asset {
            AssetClass::Primary => self.primary_secs,
            AssetClass::Secondary => self.secondary_secs,
        }
    }
}

/// Undo information for settlements made inside a failed operation.
#[derive(Debug, Clone)]
pub struct QueueCheckpoint {
    len: usize,
    next_id: u64,
    cursor: usize,
    total_queued: [Amount; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbondingQueue {
    periods: BondingPeriods,
    requests: Vec<UnbondingRequest>,
    by_user: HashMap<UserId, Vec<RequestId>>,
    total_queued: [Amount; 2],
    next_id: u64,
    // every request before this position is settled
    cursor: usize,
}

impl UnbondingQueue {
    pub fn new(periods: BondingPeriods) -> Self {
        Self {
            periods,
            requests: Vec::new(),
            by_user: HashMap::new(),
            total_queued: [0; 2],
            next_id: 1,
            cursor: 0,
        }
    }

    pub fn bonding_period(&self, asset: AssetClass) -> u64 {
        self.periods.for_asset(asset)
    }

    pub fn total_queued(&self, asset: AssetClass) -> Amount {
        self.total_queued[asset.index()]
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn get(&self, id: RequestId) -> Option<&UnbondingRequest> {
        let slot = (id.0 as usize).checked_sub(1)?;
        self.requests.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnbondingRequest> {
        self.requests.iter()
    }

    pub fn user_requests(&self, user: UserId) -> impl Iterator<Item = &UnbondingRequest> {
        self.by_user
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id))
    }

    pub fn user_request_count(&self, user: UserId) -> usize {
        self.by_user.get(&user).map_or(0, Vec::len)
    }

    pub fn user_request(&self, user: UserId, index: usize) -> Result<&UnbondingRequest, QueueError> {
        let ids = self.by_user.get(&user).map(Vec::as_slice).unwrap_or(&[]);
        let id = ids.get(index).ok_or(QueueError::IndexOutOfRange {
            user,
            index,
            len: ids.len(),
        })?;
        self.get(*id).ok_or(QueueError::RequestNotFound(*id))
    }

    // 5.1: unlock = now + bonding period of the asset class, fixed for life
    pub fn enqueue(
        &mut self,
        user: UserId,
        amount: Amount,
        asset: AssetClass,
        now: Timestamp,
    ) -> Result<&UnbondingRequest, QueueError> {
        if amount == 0 {
            return Err(QueueError::AmountMustBePositive);
        }
        let queued = self.total_queued[asset.index()]
            .checked_add(amount)
            .ok_or(QueueError::Overflow)?;

        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.push(UnbondingRequest {
            id,
            user,
            amount,
            asset,
            request_time: now,
            unlock_time: now.saturating_add(self.periods.for_asset(asset)),
            settled: false,
        });
        self.by_user.entry(user).or_default().push(id);
        self.total_queued[asset.index()] = queued;

        Ok(&self.requests[self.requests.len() - 1])
    }

    // 5.2: settle every matured request, oldest first. returns the settled ones.
    pub fn settle_ready(&mut self, now: Timestamp) -> Vec<UnbondingRequest> {
        let mut settled = Vec::new();
        for request in self.requests[self.cursor..].iter_mut() {
            if request.is_ready(now) {
                request.settled = true;
                // the amount was added to the total at enqueue
                self.total_queued[request.asset.index()] -= request.amount;
                settled.push(request.clone());
            }
        }
        self.advance_cursor();
        settled
    }

    // 5.3: settle one request on behalf of its owner
    pub fn settle_one(
        &mut self,
        user: UserId,
        id: RequestId,
        now: Timestamp,
    ) -> Result<UnbondingRequest, QueueError> {
        let slot = (id.0 as usize)
            .checked_sub(1)
            .filter(|s| *s < self.requests.len())
            .ok_or(QueueError::RequestNotFound(id))?;
        let request = &mut self.requests[slot];
        if request.user != user {
            return Err(QueueError::RequestNotFound(id));
        }
        match request.state(now) {
            RequestState::Settled => return Err(QueueError::AlreadyClaimed(id)),
            RequestState::Pending => {
                return Err(QueueError::StillBonding {
                    id,
                    unlock_time: request.unlock_time,
                })
            }
            RequestState::Matured => {}
        }
        request.settled = true;
        self.total_queued[request.asset.index()] -= request.amount;
        let settled = request.clone();
        self.advance_cursor();
        Ok(settled)
    }

    // 5.4: per-user view over unsettled (pending or matured) requests of one asset class
    pub fn queue_info(&self, user: UserId, asset: AssetClass, now: Timestamp) -> QueueInfo {
        let mut info = QueueInfo::default();
        let mut wait_sum: u128 = 0;
        let mut count: u128 = 0;

        for request in self.user_requests(user) {
            if request.settled || request.asset != asset {
                continue;
            }
            info.total_queued = info.total_queued.saturating_add(request.amount);
            wait_sum += request.unlock_time.seconds_since(now) as u128;
            count += 1;
            info.estimated_unlock_time = Some(match info.estimated_unlock_time {
                Some(t) if t <= request.unlock_time => t,
                _ => request.unlock_time,
            });
        }
        if count > 0 {
            info.average_wait_time = (wait_sum / count) as u64;
        }
        info.position = self
            .requests
            .iter()
            .position(|r| r.user == user && !r.settled)
            .map_or(0, |p| p + 1);
        info
    }

    pub fn checkpoint(&self) -> QueueCheckpoint {
        QueueCheckpoint {
            len: self.requests.len(),
            next_id: self.next_id,
            cursor: self.cursor,
            total_queued: self.total_queued,
        }
    }

    /// Reverse everything since `checkpoint` inside a single failed operation:
    /// drop appended requests and clear settlements made in `settled`.
    pub fn rollback(&mut self, checkpoint: QueueCheckpoint, settled: &[RequestId]) {
        for request in self.requests.drain(checkpoint.len..) {
            if let Some(ids) = self.by_user.get_mut(&request.user) {
                ids.retain(|id| *id != request.id);
            }
        }
        for id in settled {
            if let Some(slot) = (id.0 as usize).checked_sub(1) {
                if let Some(request) = self.requests.get_mut(slot) {
                    request.settled = false;
                }
            }
        }
        self.next_id = checkpoint.next_id;
        self.cursor = checkpoint.cursor;
        self.total_queued = checkpoint.total_queued;
    }

    fn advance_cursor(&mut self) {
        while self.cursor < self.requests.len() && self.requests[self.cursor].settled {
            self.cursor += 1;
        }
    }

    // every user index entry points at a request owned by that user, and every
    // request appears in exactly one user index
    pub fn check_indexes(&self) -> bool {
        let indexed: usize = self.by_user.values().map(Vec::len).sum();
        let owned = self.by_user.iter().all(|(user, ids)| {
            ids.iter().all(|id| self.get(*id).is_some_and(|r| r.user == *user))
        });
        let totals_match = AssetClass::ALL.iter().all(|asset| {
            let open: Amount = self
                .requests
                .iter()
                .filter(|r| !r.settled && r.asset == *asset)
                .map(|r| r.amount)
                .sum();
            open == self.total_queued[asset.index()]
        });
        indexed == self.requests.len() && owned && totals_match
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Unbonding amount must be positive")]
    AmountMustBePositive,

    #[error("Unbonding request {0} not found")]
    RequestNotFound(RequestId),

    #[error("Request index {index} out of range for {user} ({len} requests)")]
    IndexOutOfRange { user: UserId, index: usize, len: usize },

    #[error("Unbonding request {0} already claimed")]
    AlreadyClaimed(RequestId),

    #[error("Unbonding request {id} still bonding until {unlock_time}")]
    StillBonding { id: RequestId, unlock_time: Timestamp },

    #[error("Arithmetic overflow in unbonding queue")]
    Overflow,
}
