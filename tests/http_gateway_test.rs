use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use payout_service::application::service::PayoutService;
use payout_service::config::ServiceConfig;
use payout_service::domain::ledger::LedgerEntry;
use payout_service::domain::money::{Currency, MinorUnits};
use payout_service::domain::payout::{MerchantId, PayoutStatus};
use payout_service::domain::ports::{BalanceGateway, LedgerGateway};
use payout_service::error::GatewayError;
use payout_service::infrastructure::http::{HttpBalanceGateway, HttpLedgerGateway};
use payout_service::infrastructure::in_memory::{InMemoryPayoutStore, ManualScheduler};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::payout_request;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Requests captured by the stub merchant and transaction services.
#[derive(Clone, Default)]
struct Captured {
    debits: Arc<Mutex<Vec<Value>>>,
    transactions: Arc<Mutex<Vec<Value>>>,
}

async fn balance(
    Path(merchant_id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match (merchant_id, params.get("currency").map(String::as_str)) {
        (404, _) => (StatusCode::NOT_FOUND, "merchant not found").into_response(),
        (500, _) => (StatusCode::OK, "not json").into_response(),
        (_, Some("NGN")) => Json(json!({
            "merchant_id": merchant_id,
            "currency": "NGN",
            "available_balance": 200.5
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, "unsupported currency").into_response(),
    }
}

async fn debit(State(captured): State<Captured>, Json(body): Json<Value>) -> Response {
    if body["merchant_id"] == 13 {
        return (StatusCode::CONFLICT, "balance locked").into_response();
    }
    captured.debits.lock().unwrap().push(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn record_transaction(State(captured): State<Captured>, Json(body): Json<Value>) -> Response {
    if body["merchant_id"] == 13 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "ledger down").into_response();
    }
    captured.transactions.lock().unwrap().push(body);
    StatusCode::CREATED.into_response()
}

async fn slow_balance() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"available_balance": 1})).into_response()
}

async fn spawn_stub() -> (String, Captured) {
    let captured = Captured::default();
    let router = Router::new()
        .route("/merchants/{merchant_id}/balance", get(balance))
        .route("/slow/merchants/{merchant_id}/balance", get(slow_balance))
        .route("/internal/balance/payout", post(debit))
        .route("/transactions", post(record_transaction))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), captured)
}

fn ngn() -> Currency {
    Currency::new("NGN").unwrap()
}

#[tokio::test]
async fn test_balance_query_converts_to_minor_units() {
    let (url, _) = spawn_stub().await;
    let gateway = HttpBalanceGateway::new(&format!("{url}/"), TIMEOUT).unwrap();

    let available = gateway.available_balance(MerchantId(42), &ngn()).await.unwrap();

    assert_eq!(available, MinorUnits::new(20_050));
}

#[tokio::test]
async fn test_balance_query_non_200_is_gateway_error() {
    let (url, _) = spawn_stub().await;
    let gateway = HttpBalanceGateway::new(&url, TIMEOUT).unwrap();

    let missing = gateway.available_balance(MerchantId(404), &ngn()).await;
    match missing {
        Err(GatewayError::Status { status, body, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "merchant not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let usd = Currency::new("USD").unwrap();
    assert!(matches!(
        gateway.available_balance(MerchantId(42), &usd).await,
        Err(GatewayError::Status { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_balance_query_rejects_malformed_body() {
    let (url, _) = spawn_stub().await;
    let gateway = HttpBalanceGateway::new(&url, TIMEOUT).unwrap();

    assert!(matches!(
        gateway.available_balance(MerchantId(500), &ngn()).await,
        Err(GatewayError::Decode { .. })
    ));
}

#[tokio::test]
async fn test_deduct_posts_display_units() {
    let (url, captured) = spawn_stub().await;
    let gateway = HttpBalanceGateway::new(&url, TIMEOUT).unwrap();

    gateway
        .deduct(MerchantId(42), &ngn(), MinorUnits::new(10_000))
        .await
        .unwrap();

    let debits = captured.debits.lock().unwrap().clone();
    assert_eq!(
        debits,
        vec![json!({"merchant_id": 42, "currency": "NGN", "amount": 100.0})]
    );
}

#[tokio::test]
async fn test_deduct_rejection_is_gateway_error() {
    let (url, captured) = spawn_stub().await;
    let gateway = HttpBalanceGateway::new(&url, TIMEOUT).unwrap();

    let result = gateway
        .deduct(MerchantId(13), &ngn(), MinorUnits::new(10_000))
        .await;

    assert!(matches!(
        result,
        Err(GatewayError::Status { status: 409, .. })
    ));
    assert!(captured.debits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_record_body() {
    let (url, captured) = spawn_stub().await;
    let gateway = HttpLedgerGateway::new(&url, TIMEOUT).unwrap();
    let entry = LedgerEntry {
        reference: "payout-INV-1".to_string(),
        merchant_id: MerchantId(42),
        amount: MinorUnits::new(10_050),
        currency: ngn(),
        description: "Payout to Ada Obi (GTBank)".to_string(),
    };

    gateway.record(&entry).await.unwrap();

    let transactions = captured.transactions.lock().unwrap().clone();
    assert_eq!(
        transactions,
        vec![json!({
            "reference": "payout-INV-1",
            "merchant_id": 42,
            "amount": 100.5,
            "currency": "NGN",
            "payment_method": "payout",
            "status": "payout",
            "description": "Payout to Ada Obi (GTBank)"
        })]
    );
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Grab a free port, then release it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = HttpBalanceGateway::new(&format!("http://{addr}"), TIMEOUT).unwrap();
    assert!(matches!(
        gateway.available_balance(MerchantId(42), &ngn()).await,
        Err(GatewayError::Transport { .. })
    ));
}

#[tokio::test]
async fn test_slow_service_hits_timeout() {
    let (url, _) = spawn_stub().await;
    let gateway =
        HttpBalanceGateway::new(&format!("{url}/slow"), Duration::from_millis(100)).unwrap();

    assert!(matches!(
        gateway.available_balance(MerchantId(42), &ngn()).await,
        Err(GatewayError::Transport { .. })
    ));
}

#[tokio::test]
async fn test_service_settles_through_http_gateways() {
    let (url, captured) = spawn_stub().await;
    let store = InMemoryPayoutStore::new();
    let scheduler = ManualScheduler::new();
    let service = PayoutService::new(
        Box::new(store),
        Box::new(HttpBalanceGateway::new(&url, TIMEOUT).unwrap()),
        Box::new(HttpLedgerGateway::new(&url, TIMEOUT).unwrap()),
        Box::new(scheduler.clone()),
        ServiceConfig::default(),
    );

    let mut request = payout_request(10_000);
    request.reference = Some("INV-77".to_string());
    let created = service.create(request).await.unwrap();
    for job in scheduler.take_jobs() {
        service.auto_process(job.payout_id).await.unwrap();
    }

    let fetched = service.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, PayoutStatus::Processed);
    assert_eq!(captured.debits.lock().unwrap().len(), 1);
    let transactions = captured.transactions.lock().unwrap().clone();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["reference"], "payout-INV-77");
    assert_eq!(transactions[0]["amount"], 100.0);
}
