use payout_service::domain::ledger::LedgerEntry;
use payout_service::domain::money::{Currency, MinorUnits};
use payout_service::domain::payout::{MerchantId, NewPayout, PayoutStatus, Recipient};
use payout_service::domain::ports::{
    BalanceGatewayBox, JobSchedulerBox, LedgerGatewayBox, PayoutStoreBox, ProcessingJob,
};
use payout_service::infrastructure::in_memory::{
    InMemoryBalanceGateway, InMemoryLedgerGateway, InMemoryPayoutStore, ManualScheduler,
};
use std::time::Duration;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let store: PayoutStoreBox = Box::new(InMemoryPayoutStore::new());
    let balances: BalanceGatewayBox =
        Box::new(InMemoryBalanceGateway::with_opening_balance(MinorUnits::new(500)));
    let ledger = InMemoryLedgerGateway::new();
    let ledger_box: LedgerGatewayBox = Box::new(ledger.clone());
    let scheduler = ManualScheduler::new();
    let scheduler_box: JobSchedulerBox = Box::new(scheduler.clone());
    let ngn = Currency::new("NGN").unwrap();

    let new = NewPayout {
        merchant_id: MerchantId(1),
        reference: "DD-1".to_string(),
        amount: MinorUnits::new(200),
        currency: ngn.clone(),
        recipient: Recipient {
            name: "Ada Obi".to_string(),
            account: "0123456789".to_string(),
            bank: "GTBank".to_string(),
        },
        narration: None,
        status: PayoutStatus::Pending,
    };

    // Verify Send + Sync by spawning tasks
    let store_handle = tokio::spawn(async move {
        let created = store.create(new).await.unwrap();
        store.get(created.id).await.unwrap().unwrap()
    });

    let gateway_currency = ngn.clone();
    let balance_handle = tokio::spawn(async move {
        balances
            .deduct(MerchantId(1), &gateway_currency, MinorUnits::new(200))
            .await
            .unwrap();
        balances
            .available_balance(MerchantId(1), &gateway_currency)
            .await
            .unwrap()
    });

    let payout = store_handle.await.unwrap();
    assert_eq!(payout.reference, "DD-1");

    let remaining = balance_handle.await.unwrap();
    assert_eq!(remaining, MinorUnits::new(300));

    let entry = LedgerEntry::from(&payout);
    tokio::spawn(async move { ledger_box.record(&entry).await.unwrap() })
        .await
        .unwrap();
    assert_eq!(ledger.entries().await.len(), 1);

    let job = ProcessingJob {
        payout_id: payout.id,
        delay: Duration::ZERO,
    };
    tokio::spawn(async move { scheduler_box.schedule(job).unwrap() })
        .await
        .unwrap();
    assert_eq!(scheduler.take_jobs(), vec![job]);
}
