use super::ledger::LedgerEntry;
use super::money::{Currency, MinorUnits};
use super::payout::{MerchantId, NewPayout, Payout, PayoutId, PayoutStatus};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Persists `payout`, assigning its id and timestamps.
    async fn create(&self, payout: NewPayout) -> Result<Payout>;
    async fn get(&self, id: PayoutId) -> Result<Option<Payout>>;
    /// Newest first, at most `limit` records.
    async fn list_by_merchant(&self, merchant_id: MerchantId, limit: usize)
    -> Result<Vec<Payout>>;
    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<Payout>>;
    /// Unconditionally overwrites the status. Fails with `NotFound` for unknown ids.
    async fn update_status(&self, id: PayoutId, status: PayoutStatus) -> Result<()>;
    /// Sets the status to `new` only if it is currently `expected`.
    ///
    /// Returns `Ok(false)` when another writer changed the status first. The
    /// check and the write must be a single atomic step.
    async fn compare_and_set_status(
        &self,
        id: PayoutId,
        expected: PayoutStatus,
        new: PayoutStatus,
    ) -> Result<bool>;
}

#[async_trait]
pub trait BalanceGateway: Send + Sync {
    async fn available_balance(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
    ) -> std::result::Result<MinorUnits, GatewayError>;

    async fn deduct(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
        amount: MinorUnits,
    ) -> std::result::Result<(), GatewayError>;
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn record(&self, entry: &LedgerEntry) -> std::result::Result<(), GatewayError>;
}

/// Deferred auto-processing of one payout.
///
/// Jobs are keyed by payout id alone; a job for a payout that is no longer
/// pending is a no-op, so re-submitting after a restart is always safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingJob {
    pub payout_id: PayoutId,
    pub delay: Duration,
}

pub trait JobScheduler: Send + Sync {
    fn schedule(&self, job: ProcessingJob) -> Result<()>;
}

pub type PayoutStoreBox = Box<dyn PayoutStore>;
pub type BalanceGatewayBox = Box<dyn BalanceGateway>;
pub type LedgerGatewayBox = Box<dyn LedgerGateway>;
pub type JobSchedulerBox = Box<dyn JobScheduler>;
