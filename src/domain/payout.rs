use super::money::{Currency, MinorUnits};
use crate::error::PayoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned payout identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PayoutId(pub u64);

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MerchantId(pub u64);

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a payout.
///
/// `Processed` and `Completed` are the same terminal success; `Cancelled` is
/// only reachable through an explicit cancel and is not accepted by
/// [`PayoutStatus::from_str`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Processed,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Processed => "processed",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal success: the transition into this state settles the payout.
    pub fn is_success(&self) -> bool {
        matches!(self, PayoutStatus::Processed | PayoutStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PayoutStatus::Processed
                | PayoutStatus::Completed
                | PayoutStatus::Failed
                | PayoutStatus::Cancelled
        )
    }

    /// No transition of any kind leaves a sealed status: a settled payout, or
    /// one the merchant cancelled.
    pub fn is_sealed(&self) -> bool {
        self.is_success() || *self == PayoutStatus::Cancelled
    }

    /// Status shown to clients. `processed` reads as `completed`.
    pub fn display(&self) -> PayoutStatus {
        match self {
            PayoutStatus::Processed => PayoutStatus::Completed,
            other => *other,
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = PayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err(PayoutError::ValidationError(
                "Status is required".to_string(),
            )),
            "pending" => Ok(PayoutStatus::Pending),
            "processing" => Ok(PayoutStatus::Processing),
            "processed" => Ok(PayoutStatus::Processed),
            "completed" => Ok(PayoutStatus::Completed),
            "failed" => Ok(PayoutStatus::Failed),
            _ => Err(PayoutError::ValidationError(format!(
                "Invalid status '{}'",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Recipient {
    pub name: String,
    pub account: String,
    pub bank: String,
}

/// A payout as handed to the store, before it has an id or timestamps.
#[derive(Debug, PartialEq, Clone)]
pub struct NewPayout {
    pub merchant_id: MerchantId,
    pub reference: String,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub recipient: Recipient,
    pub narration: Option<String>,
    pub status: PayoutStatus,
}

/// A persisted payout record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payout {
    pub id: PayoutId,
    pub merchant_id: MerchantId,
    pub reference: String,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub recipient: Recipient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payout {
    /// Builds the record a store persists for `new` under `id`.
    pub fn from_new(id: PayoutId, new: NewPayout, now: DateTime<Utc>) -> Self {
        Self {
            id,
            merchant_id: new.merchant_id,
            reference: new.reference,
            amount: new.amount,
            currency: new.currency,
            recipient: new.recipient,
            narration: new.narration,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference sent to the ledger service for this payout.
    pub fn ledger_reference(&self) -> String {
        if self.reference.is_empty() {
            format!("payout-{}", self.id)
        } else {
            format!("payout-{}", self.reference)
        }
    }
}

/// Generates a time-ordered reference for payouts created without one.
pub fn generate_reference() -> String {
    format!("PO-{}", uuid::Uuid::now_v7().simple())
}
