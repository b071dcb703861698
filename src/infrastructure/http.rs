//! reqwest-backed clients for the merchant (balance) and transaction (ledger)
//! services.
//!
//! Amounts cross the wire as JSON numbers in display units and are converted
//! back to minor units on arrival.

use crate::domain::ledger::{LedgerEntry, PAYOUT_TAG};
use crate::domain::money::{Currency, MinorUnits};
use crate::domain::payout::MerchantId;
use crate::domain::ports::{BalanceGateway, LedgerGateway};
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BALANCE_SERVICE: &str = "merchant service";
const LEDGER_SERVICE: &str = "transaction service";

#[derive(Debug, Deserialize)]
struct BalanceQueryResponse {
    #[serde(with = "rust_decimal::serde::float")]
    available_balance: Decimal,
}

#[derive(Debug, Serialize)]
struct BalanceDebitRequest<'a> {
    merchant_id: MerchantId,
    currency: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct LedgerRecordRequest<'a> {
    reference: &'a str,
    merchant_id: MerchantId,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    currency: &'a str,
    payment_method: &'static str,
    status: &'static str,
    description: &'a str,
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Transport {
            service: "http client",
            message: e.to_string(),
        })
}

fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> GatewayError {
    move |e| GatewayError::Transport {
        service,
        message: e.to_string(),
    }
}

/// Turns any status outside `accepted` into [`GatewayError::Status`],
/// keeping the response body for diagnostics.
async fn expect_status(
    service: &'static str,
    response: reqwest::Response,
    accepted: &[StatusCode],
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Balance gateway backed by the merchant service.
#[derive(Clone, Debug)]
pub struct HttpBalanceGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBalanceGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl BalanceGateway for HttpBalanceGateway {
    async fn available_balance(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
    ) -> Result<MinorUnits, GatewayError> {
        let response = self
            .client
            .get(format!("{}/merchants/{}/balance", self.base_url, merchant_id))
            .query(&[("currency", currency.as_str())])
            .send()
            .await
            .map_err(transport(BALANCE_SERVICE))?;
        let response = expect_status(BALANCE_SERVICE, response, &[StatusCode::OK]).await?;

        let payload: BalanceQueryResponse =
            response.json().await.map_err(|e| GatewayError::Decode {
                service: BALANCE_SERVICE,
                message: e.to_string(),
            })?;
        MinorUnits::from_display(payload.available_balance).map_err(|e| GatewayError::Decode {
            service: BALANCE_SERVICE,
            message: e.to_string(),
        })
    }

    async fn deduct(
        &self,
        merchant_id: MerchantId,
        currency: &Currency,
        amount: MinorUnits,
    ) -> Result<(), GatewayError> {
        let request = BalanceDebitRequest {
            merchant_id,
            currency: currency.as_str(),
            amount: amount.to_display(),
        };
        let response = self
            .client
            .post(format!("{}/internal/balance/payout", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport(BALANCE_SERVICE))?;
        expect_status(
            BALANCE_SERVICE,
            response,
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }
}

/// Ledger gateway backed by the transaction service.
#[derive(Clone, Debug)]
pub struct HttpLedgerGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLedgerGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn record(&self, entry: &LedgerEntry) -> Result<(), GatewayError> {
        let request = LedgerRecordRequest {
            reference: &entry.reference,
            merchant_id: entry.merchant_id,
            amount: entry.amount.to_display(),
            currency: entry.currency.as_str(),
            payment_method: PAYOUT_TAG,
            status: PAYOUT_TAG,
            description: &entry.description,
        };
        let response = self
            .client
            .post(format!("{}/transactions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport(LEDGER_SERVICE))?;
        expect_status(
            LEDGER_SERVICE,
            response,
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;
        Ok(())
    }
}
