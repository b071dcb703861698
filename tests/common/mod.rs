#![allow(dead_code)]

use payout_service::application::service::{CreatePayout, PayoutService, PayoutView};
use payout_service::config::ServiceConfig;
use payout_service::domain::money::{Currency, MinorUnits};
use payout_service::domain::payout::{MerchantId, Recipient};
use payout_service::infrastructure::in_memory::{
    InMemoryBalanceGateway, InMemoryLedgerGateway, InMemoryPayoutStore, ManualScheduler,
};
use std::sync::Arc;

pub const MERCHANT: MerchantId = MerchantId(42);

/// A service wired to in-memory collaborators, with handles kept for assertions.
pub struct TestHarness {
    pub service: Arc<PayoutService>,
    pub store: InMemoryPayoutStore,
    pub balances: InMemoryBalanceGateway,
    pub ledger: InMemoryLedgerGateway,
    pub scheduler: ManualScheduler,
}

pub fn ngn() -> Currency {
    Currency::new("NGN").unwrap()
}

pub async fn harness_with_balance(available: i64) -> TestHarness {
    let store = InMemoryPayoutStore::new();
    let balances = InMemoryBalanceGateway::new();
    balances
        .set_balance(MERCHANT, ngn(), MinorUnits::new(available))
        .await;
    let ledger = InMemoryLedgerGateway::new();
    let scheduler = ManualScheduler::new();
    let service = Arc::new(PayoutService::new(
        Box::new(store.clone()),
        Box::new(balances.clone()),
        Box::new(ledger.clone()),
        Box::new(scheduler.clone()),
        ServiceConfig::default(),
    ));
    TestHarness {
        service,
        store,
        balances,
        ledger,
        scheduler,
    }
}

pub fn payout_request(amount: i64) -> CreatePayout {
    CreatePayout {
        merchant_id: MERCHANT,
        amount: MinorUnits::new(amount),
        currency: "NGN".to_string(),
        recipient: Recipient {
            name: "Ada Obi".to_string(),
            account: "0123456789".to_string(),
            bank: "GTBank".to_string(),
        },
        reference: None,
        narration: None,
    }
}

/// Runs every job the service scheduled so far, in submission order.
pub async fn run_scheduled(harness: &TestHarness) -> Vec<Option<PayoutView>> {
    let mut results = Vec::new();
    for job in harness.scheduler.take_jobs() {
        results.push(harness.service.auto_process(job.payout_id).await.unwrap());
    }
    results
}
