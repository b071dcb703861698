use crate::domain::ledger::LedgerEntry;
use crate::domain::money::{Currency, MinorUnits};
use crate::domain::payout::{MerchantId, NewPayout, Payout, PayoutId, PayoutStatus};
use crate::domain::ports::{
    BalanceGateway, JobScheduler, LedgerGateway, PayoutStore, ProcessingJob,
};
use crate::error::{GatewayError, PayoutError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// A thread-safe in-memory payout store.
///
/// Ids are handed out from an atomic counter starting at 1. Every status
/// change happens under the write lock, which makes
/// [`PayoutStore::compare_and_set_status`] atomic.
#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    payouts: Arc<RwLock<HashMap<PayoutId, Payout>>>,
    last_id: Arc<AtomicU64>,
}

impl InMemoryPayoutStore {
    /// Creates a new, empty in-memory payout store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payouts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payouts.read().await.is_empty()
    }
}

/// Newest first; ids break ties between records created in the same instant.
pub(crate) fn newest_first(payouts: &mut [Payout]) {
    payouts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn create(&self, payout: NewPayout) -> Result<Payout> {
        let id = PayoutId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = Payout::from_new(id, payout, Utc::now());
        let mut payouts = self.payouts.write().await;
        payouts.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: PayoutId) -> Result<Option<Payout>> {
        let payouts = self.payouts.read().await;
        Ok(payouts.get(&id).cloned())
    }

    async fn list_by_merchant(
        &self,
        merchant_id: MerchantId,
        limit: usize,
    ) -> Result<Vec<Payout>> {
        let payouts = self.payouts.read().await;
        let mut matching: Vec<Payout> = payouts
            .values()
            .filter(|p| p.merchant_id == merchant_id)
            .cloned()
            .collect();
        newest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<Payout>> {
        let payouts = self.payouts.read().await;
        let mut matching: Vec<Payout> = payouts
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.id);
        Ok(matching)
    }

    async fn update_status(&self, id: PayoutId, status: PayoutStatus) -> Result<()> {
        let mut payouts = self.payouts.write().await;
        let payout = payouts.get_mut(&id).ok_or(PayoutError::NotFound(id))?;
        payout.status = status;
        payout.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_status(
        &self,
        id: PayoutId,
        expected: PayoutStatus,
        new: PayoutStatus,
    ) -> Result<bool> {
        let mut payouts = self.payouts.write().await;
        let payout = payouts.get_mut(&id).ok_or(PayoutError::NotFound(id))?;
        if payout.status != expected {
            return Ok(false);
        }
        payout.status = new;
        payout.updated_at = Utc::now();
        Ok(true)
    }
}

/// A balance debit observed by [`InMemoryBalanceGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct Deduction {
    pub merchant_id: MerchantId,
    pub currency: Currency,
    pub amount: MinorUnits,
}

#[derive(Default)]
struct BalanceState {
    balances: RwLock<HashMap<(MerchantId, Currency), MinorUnits>>,
    opening_balance: MinorUnits,
    deductions: RwLock<Vec<Deduction>>,
    balance_queries: AtomicUsize,
    deduction_attempts: AtomicUsize,
    fail_deductions: AtomicBool,
}

/// Sandbox balance service.
///
/// Merchants without an explicit balance start with the opening balance
/// (zero unless configured). Deductions larger than the balance are rejected
/// just like the real service would. Clones share state, so a test can keep a
/// handle for assertions after boxing the gateway into the service.
#[derive(Default, Clone)]
pub struct InMemoryBalanceGateway {
    state: Arc<BalanceState>,
}

impl InMemoryBalanceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opening_balance(opening_balance: MinorUnits) -> Self {
        Self {
            state: Arc::new(BalanceState {
                opening_balance,
                ..Default::default()
            }),
        }
    }

    pub async fn set_balance(&self, merchant_id: MerchantId, currency: Currency, amount: MinorUnits) {
        let mut balances = self.state.balances.write().await;
        balances.insert((merchant_id, currency), amount);
    }

    pub async fn balance(&self, merchant_id: MerchantId, currency: &Currency) -> MinorUnits {
        let balances = self.state.balances.read().await;
        balances
            .get(&(merchant_id, currency.clone()))
            .copied()
            .unwrap_or(self.state.opening_balance)
    }

    /// Makes every subsequent deduction fail with a transport error.
    pub fn fail_deductions(&self, fail: bool) {
        self.state.fail_deductions.store(fail, Ordering::SeqCst);
    }

    pub async fn deductions(&self) -> Vec<Deduction> {
        self.state.deductions.read().await.clone()
    }

    pub fn deduction_attempts(&self) -> usize {
        self.state.deduction_attempts.load(Ordering::SeqCst)
    }

    pub fn balance_queries(&self) -> usize {
        self.state.balance_queries.load(Ordering::SeqCst)
    }
}

const SANDBOX_BALANCE_SERVICE: &str = "sandbox balance service";
const SANDBOX_LEDGER_SERVICE: &str = "sandbox ledger service";

#[async_trait]
impl BalanceGateway for InMemoryBalanceGateway {
    async fn available_balance(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
    ) -> std::result::Result<MinorUnits, GatewayError> {
        self.state.balance_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance(merchant_id, currency).await)
    }

    async fn deduct(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
        amount: MinorUnits,
    ) -> std::result::Result<(), GatewayError> {
        self.state.deduction_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_deductions.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport {
                service: SANDBOX_BALANCE_SERVICE,
                message: "connection refused".to_string(),
            });
        }

        let mut balances = self.state.balances.write().await;
        let balance = balances
            .entry((merchant_id, currency.clone()))
            .or_insert(self.state.opening_balance);
        if *balance < amount {
            return Err(GatewayError::Rejected {
                service: SANDBOX_BALANCE_SERVICE,
                reason: format!("insufficient balance: {} {}", balance, currency),
            });
        }
        *balance = MinorUnits(balance.value() - amount.value());

        self.state.deductions.write().await.push(Deduction {
            merchant_id,
            currency: currency.clone(),
            amount,
        });
        Ok(())
    }
}

#[derive(Default)]
struct LedgerState {
    entries: RwLock<Vec<LedgerEntry>>,
    attempts: AtomicUsize,
    fail_records: AtomicBool,
}

/// Sandbox transaction ledger. Clones share state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerGateway {
    state: Arc<LedgerState>,
}

impl InMemoryLedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent record call fail with a 500 response.
    pub fn fail_records(&self, fail: bool) {
        self.state.fail_records.store(fail, Ordering::SeqCst);
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.entries.read().await.clone()
    }

    pub fn record_attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedgerGateway {
    async fn record(&self, entry: &LedgerEntry) -> std::result::Result<(), GatewayError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_records.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                service: SANDBOX_LEDGER_SERVICE,
                status: 500,
                body: "ledger unavailable".to_string(),
            });
        }
        self.state.entries.write().await.push(entry.clone());
        Ok(())
    }
}

/// A scheduler that only records jobs.
///
/// Tests drain the recorded jobs with [`ManualScheduler::take_jobs`] and run
/// them directly through the service instead of waiting in real time.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    jobs: Arc<Mutex<Vec<ProcessingJob>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_jobs(&self) -> Vec<ProcessingJob> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *jobs)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobScheduler for ManualScheduler {
    fn schedule(&self, job: ProcessingJob) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.push(job);
        Ok(())
    }
}
