//! Unbonding requests, instant withdrawals and the maturity sweep.

use super::core::StakingPool;
use super::results::PoolError;
use crate::custody::{AssetCustody, Transfer};
use crate::events::{
    EventPayload, InstantWithdrawalEvent, RequestsProcessedEvent, SettlementPath,
    UnbondingRequestedEvent, UnbondingSettledEvent,
};
use crate::ledger::StakeHandle;
use crate::types::{Amount, AssetClass, RequestId, Timestamp, UserId};
use crate::unbonding::{QueueInfo, RequestState, UnbondingRequest};
use tracing::{debug, info, warn};

impl<C: AssetCustody> StakingPool<C> {
    /// Queue an exit out of the caller's holding. The amount leaves the ledger
    /// now; the unlock time is fixed here from the asset's bonding period.
    pub fn request_unbonding(
        &mut self,
        user: UserId,
        amount: Amount,
        asset: AssetClass,
    ) -> Result<RequestId, PoolError> {
        if amount == 0 {
            return Err(PoolError::AmountMustBePositive);
        }
        let handle = self.holding(user, amount, asset)?;
        let now = self.current_time;

        let (id, unlock_time) = self.atomic(Some(handle), |pool| {
            pool.flush(handle, now)?;
            pool.ledger.release(handle, asset, amount)?;
            let request = pool.queue.enqueue(user, amount, asset, now)?;
            Ok((request.id, request.unlock_time))
        })?;

        info!(%user, %id, amount, %asset, unlock = %unlock_time, "unbonding requested");
        self.emit_event(
            now,
            EventPayload::UnbondingRequested(UnbondingRequestedEvent {
                request_id: id,
                user,
                amount,
                asset,
                unlock_time,
            }),
        );
        Ok(id)
    }

    pub fn can_withdraw_instantly(&self, amount: Amount, asset: AssetClass) -> bool {
        self.liquidity.can_withdraw_instantly(amount, asset)
    }

    /// Fast path around the queue: takes the amount out of the caller's holding
    /// and pays it from liquidity on hand. Never reads or touches queued requests.
    pub fn process_instant_withdrawal(
        &mut self,
        user: UserId,
        amount: Amount,
        asset: AssetClass,
    ) -> Result<Amount, PoolError> {
        if let Err(e) = self.liquidity.check_instant(amount, asset) {
            warn!(%user, amount, %asset, error = %e, "instant withdrawal rejected");
            return Err(e.into());
        }
        let handle = self.holding(user, amount, asset)?;
        let now = self.current_time;
        let previous = self.liquidity.available(asset);

        let remaining = self.atomic(Some(handle), |pool| {
            pool.flush(handle, now)?;
            pool.ledger.release(handle, asset, amount)?;
            let remaining = pool.liquidity.draw(amount, asset)?;
            pool.transfer(&[Transfer::credit(user, asset.asset(), amount)], |pool| {
                pool.liquidity.set_available(asset, previous);
            })?;
            Ok(remaining)
        })?;

        info!(%user, amount, %asset, liquidity = remaining, "instant withdrawal");
        self.emit_event(
            now,
            EventPayload::InstantWithdrawal(InstantWithdrawalEvent {
                user,
                amount,
                asset,
                liquidity_after: remaining,
            }),
        );
        Ok(remaining)
    }

    /// Settle every matured request and pay each owner. Returns how many settled.
    pub fn process_ready_requests(&mut self) -> Result<usize, PoolError> {
        let now = self.current_time;
        let checkpoint = self.queue.checkpoint();
        let settled = self.queue.settle_ready(now);

        let transfers: Vec<Transfer> = settled
            .iter()
            .map(|r| Transfer::credit(r.user, r.asset.asset(), r.amount))
            .collect();
        if !transfers.is_empty() {
            let ids: Vec<RequestId> = settled.iter().map(|r| r.id).collect();
            self.transfer(&transfers, |pool| pool.queue.rollback(checkpoint, &ids))?;
        }

        for request in &settled {
            self.emit_settled(now, request, SettlementPath::Sweep);
        }
        let processed = settled.len();
        let primary_queued_after = self.queue.total_queued(AssetClass::Primary);
        let secondary_queued_after = self.queue.total_queued(AssetClass::Secondary);

        debug!(processed, primary_queued_after, secondary_queued_after, "ready requests processed");
        self.emit_event(
            now,
            EventPayload::RequestsProcessed(RequestsProcessedEvent {
                processed,
                primary_queued_after,
                secondary_queued_after,
            }),
        );
        Ok(processed)
    }

    /// Settle one matured request on its owner's behalf.
    pub fn claim_unbonded(&mut self, user: UserId, id: RequestId) -> Result<Amount, PoolError> {
        let now = self.current_time;
        let checkpoint = self.queue.checkpoint();
        let request = self.queue.settle_one(user, id, now)?;

        self.transfer(
            &[Transfer::credit(user, request.asset.asset(), request.amount)],
            |pool| pool.queue.rollback(checkpoint, &[id]),
        )?;

        self.emit_settled(now, &request, SettlementPath::Claim);
        Ok(request.amount)
    }

    pub fn get_queue_info(&self, user: UserId, asset: AssetClass) -> QueueInfo {
        self.queue.queue_info(user, asset, self.current_time)
    }

    pub fn request(&self, id: RequestId) -> Result<&UnbondingRequest, PoolError> {
        self.queue.get(id).ok_or(PoolError::RequestNotFound(id))
    }

    pub fn request_state(&self, id: RequestId) -> Result<RequestState, PoolError> {
        Ok(self.request(id)?.state(self.current_time))
    }

    pub fn user_request(&self, user: UserId, index: usize) -> Result<&UnbondingRequest, PoolError> {
        Ok(self.queue.user_request(user, index)?)
    }

    pub fn user_requests(&self, user: UserId) -> Vec<&UnbondingRequest> {
        self.queue.user_requests(user).collect()
    }

    pub fn total_queued(&self, asset: AssetClass) -> Amount {
        self.queue.total_queued(asset)
    }

    pub fn bonding_period(&self, asset: AssetClass) -> u64 {
        self.queue.bonding_period(asset)
    }

    // unlock time a request made now would get
    pub fn estimate_unlock(&self, asset: AssetClass) -> Timestamp {
        self.current_time.saturating_add(self.bonding_period(asset))
    }

    // the caller's record, provided it holds at least `amount` of `asset`
    fn holding(&self, user: UserId, amount: Amount, asset: AssetClass) -> Result<StakeHandle, PoolError> {
        let handle = self.ledger.handle(user);
        let held = handle.map_or(0, |h| self.ledger.record(h).amount(asset));
        match handle {
            Some(handle) if amount <= held => Ok(handle),
            _ => {
                warn!(%user, amount, held, %asset, "withdrawal exceeds holding");
                Err(PoolError::InsufficientShares { requested: amount, held })
            }
        }
    }

    fn emit_settled(&mut self, now: Timestamp, request: &UnbondingRequest, via: SettlementPath) {
        info!(user = %request.user, id = %request.id, amount = request.amount, asset = %request.asset, ?via, "unbonding settled");
        self.emit_event(
            now,
            EventPayload::UnbondingSettled(UnbondingSettledEvent {
                request_id: request.id,
                user: request.user,
                amount: request.amount,
                asset: request.asset,
                unlock_time: request.unlock_time,
                via,
            }),
        );
    }
}
