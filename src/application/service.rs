use crate::config::ServiceConfig;
use crate::domain::ledger::LedgerEntry;
use crate::domain::money::{Currency, MinorUnits};
use crate::domain::payout::{
    MerchantId, NewPayout, Payout, PayoutId, PayoutStatus, Recipient, generate_reference,
};
use crate::domain::ports::{
    BalanceGatewayBox, JobSchedulerBox, LedgerGatewayBox, PayoutStoreBox, ProcessingJob,
};
use crate::error::{GatewayError, PayoutError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

const ROLLBACK_ATTEMPTS: u32 = 3;

/// A request to pay `amount` minor units out of a merchant's balance.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePayout {
    pub merchant_id: MerchantId,
    pub amount: MinorUnits,
    pub currency: String,
    pub recipient: Recipient,
    pub reference: Option<String>,
    pub narration: Option<String>,
}

/// What callers get back: amounts in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutView {
    pub id: PayoutId,
    pub merchant_id: MerchantId,
    pub reference: String,
    pub status: PayoutStatus,
    pub amount: Decimal,
    pub currency: Currency,
}

impl From<&Payout> for PayoutView {
    fn from(payout: &Payout) -> Self {
        Self {
            id: payout.id,
            merchant_id: payout.merchant_id,
            reference: payout.reference.clone(),
            status: payout.status,
            amount: payout.amount.to_display(),
            currency: payout.currency.clone(),
        }
    }
}

impl PayoutView {
    fn for_display(mut self) -> Self {
        self.status = self.status.display();
        self
    }
}

/// Orchestrates the payout lifecycle.
///
/// Every mutating operation re-reads the stored record and writes through
/// [`crate::domain::ports::PayoutStore::compare_and_set_status`], so the
/// transition into a success state, and with it settlement, happens at most
/// once per payout.
pub struct PayoutService {
    store: PayoutStoreBox,
    balances: BalanceGatewayBox,
    ledger: LedgerGatewayBox,
    scheduler: JobSchedulerBox,
    config: ServiceConfig,
}

impl PayoutService {
    pub fn new(
        store: PayoutStoreBox,
        balances: BalanceGatewayBox,
        ledger: LedgerGatewayBox,
        scheduler: JobSchedulerBox,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            balances,
            ledger,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validates the request, verifies the merchant's balance, persists a
    /// pending payout and schedules its auto-processing.
    pub async fn create(&self, request: CreatePayout) -> Result<PayoutView> {
        if request.merchant_id.0 == 0 {
            return Err(PayoutError::ValidationError(
                "merchant_id is required".to_string(),
            ));
        }
        if !request.amount.is_positive() {
            return Err(PayoutError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }
        let currency = Currency::new(&request.currency)?;

        let available = self
            .balances
            .available_balance(request.merchant_id, &currency)
            .await?;
        if available < request.amount {
            return Err(PayoutError::InsufficientBalance {
                requested: request.amount,
                available,
            });
        }

        let reference = request
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(generate_reference);

        let payout = self
            .store
            .create(NewPayout {
                merchant_id: request.merchant_id,
                reference,
                amount: request.amount,
                currency,
                recipient: request.recipient,
                narration: request.narration.filter(|n| !n.trim().is_empty()),
                status: PayoutStatus::Pending,
            })
            .await?;
        info!(
            payout_id = %payout.id,
            merchant_id = %payout.merchant_id,
            amount = %payout.amount,
            currency = %payout.currency,
            "payout created"
        );

        self.enqueue(payout.id);
        Ok(PayoutView::from(&payout))
    }

    pub async fn get(&self, id: PayoutId) -> Result<Option<PayoutView>> {
        Ok(self.store.get(id).await?.as_ref().map(PayoutView::from))
    }

    /// Newest first, capped at the configured page size.
    pub async fn list(&self, merchant_id: MerchantId) -> Result<Vec<PayoutView>> {
        let payouts = self
            .store
            .list_by_merchant(merchant_id, self.config.list_page_size)
            .await?;
        Ok(payouts.iter().map(PayoutView::from).collect())
    }

    /// Moves a payout to `status` (case-insensitive).
    ///
    /// Terminal-to-terminal requests, and any request against a settled or
    /// cancelled payout, return the stored record untouched. Reopening a
    /// failed payout to `pending` schedules it for processing again. The first move into
    /// `processed`/`completed` settles the payout; if settlement fails the
    /// payout ends up `failed`.
    pub async fn update_status(&self, id: PayoutId, status: &str) -> Result<PayoutView> {
        let target: PayoutStatus = status.parse()?;
        self.transition(id, target).await
    }

    /// Cancels a payout that has not reached a terminal state yet.
    pub async fn cancel(&self, id: PayoutId) -> Result<PayoutView> {
        self.transition(id, PayoutStatus::Cancelled).await
    }

    /// Body of a [`ProcessingJob`]: completes the payout if it is still
    /// pending. Returns `None` when there was nothing to do.
    pub async fn auto_process(&self, id: PayoutId) -> Result<Option<PayoutView>> {
        let Some(current) = self.store.get(id).await? else {
            warn!(payout_id = %id, "skipping auto-process: payout not found");
            return Ok(None);
        };
        if current.status != PayoutStatus::Pending {
            info!(
                payout_id = %id,
                status = %current.status,
                "skipping auto-process: payout is no longer pending"
            );
            return Ok(None);
        }

        debug!(payout_id = %id, "auto-processing payout");
        self.transition(id, PayoutStatus::Processed).await.map(Some)
    }

    /// Re-enqueues a job for every payout still pending in the store.
    ///
    /// Pending payouts are the durable queue: call this on start-up to pick up
    /// work that was scheduled before a restart.
    pub async fn recover_pending(&self) -> Result<usize> {
        let pending = self.store.list_by_status(PayoutStatus::Pending).await?;
        for payout in &pending {
            self.enqueue(payout.id);
        }
        if !pending.is_empty() {
            info!(count = pending.len(), "re-enqueued pending payouts");
        }
        Ok(pending.len())
    }

    fn enqueue(&self, id: PayoutId) {
        let job = ProcessingJob {
            payout_id: id,
            delay: self.config.processing_delay,
        };
        // The payout stays pending, so `recover_pending` picks it up later.
        if let Err(e) = self.scheduler.schedule(job) {
            error!(payout_id = %id, error = %e, "failed to schedule payout processing");
        }
    }

    async fn transition(&self, id: PayoutId, target: PayoutStatus) -> Result<PayoutView> {
        loop {
            let current = self
                .store
                .get(id)
                .await?
                .ok_or(PayoutError::NotFound(id))?;

            if current.status.is_sealed()
                || (current.status.is_terminal() && target.is_terminal())
            {
                debug!(
                    payout_id = %id,
                    current = %current.status,
                    requested = %target,
                    "payout already final, ignoring transition"
                );
                return Ok(PayoutView::from(&current));
            }

            if !self
                .store
                .compare_and_set_status(id, current.status, target)
                .await?
            {
                debug!(payout_id = %id, "status changed concurrently, re-reading");
                continue;
            }
            info!(payout_id = %id, from = %current.status, to = %target, "payout status updated");
            if target == PayoutStatus::Pending && current.status != PayoutStatus::Pending {
                self.enqueue(id);
            }

            let updated = self
                .store
                .get(id)
                .await?
                .ok_or(PayoutError::NotFound(id))?;

            if target.is_success() && !current.status.is_terminal() {
                if let Err(source) = self.finalize(&updated).await {
                    error!(payout_id = %id, error = %source, "payout finalization failed");
                    return match self.roll_back(id, target).await {
                        Ok(()) => Err(PayoutError::Finalization { id, source }),
                        Err(e) => {
                            error!(payout_id = %id, error = %e, "failed to mark payout as failed");
                            Err(PayoutError::RollbackFailed {
                                id,
                                source,
                                rollback: Box::new(e),
                            })
                        }
                    };
                }
            }

            return Ok(PayoutView::from(&updated).for_display());
        }
    }

    /// Moves an unsettled payout from `settled` back to `failed`, retrying
    /// store errors a bounded number of times.
    async fn roll_back(&self, id: PayoutId, settled: PayoutStatus) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self
                .store
                .compare_and_set_status(id, settled, PayoutStatus::Failed)
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if attempt < ROLLBACK_ATTEMPTS => {
                    warn!(payout_id = %id, attempt, error = %e, "retrying payout rollback");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Deducts the merchant balance, then records the ledger entry.
    ///
    /// A ledger failure is only logged; the payout stays settled.
    async fn finalize(&self, payout: &Payout) -> std::result::Result<(), GatewayError> {
        self.balances
            .deduct(payout.merchant_id, &payout.currency, payout.amount)
            .await?;
        info!(
            payout_id = %payout.id,
            amount = %payout.amount,
            currency = %payout.currency,
            "merchant balance debited"
        );

        let entry = LedgerEntry::from(payout);
        if let Err(e) = self.ledger.record(&entry).await {
            warn!(
                payout_id = %payout.id,
                reference = %entry.reference,
                error = %e,
                "failed to record payout transaction; needs reconciliation"
            );
        }
        Ok(())
    }
}
