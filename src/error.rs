use crate::domain::money::MinorUnits;
use crate::domain::payout::PayoutId;
use thiserror::Error;

/// Failures raised while talking to the balance or ledger service.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{service} unreachable: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} sent an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{service} rejected the request: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Insufficient available balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: MinorUnits,
        available: MinorUnits,
    },
    #[error("Payout {0} not found")]
    NotFound(PayoutId),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Failed to finalize payout {id}: {source}")]
    Finalization {
        id: PayoutId,
        #[source]
        source: GatewayError,
    },
    #[error("Failed to finalize payout {id} ({source}) and could not mark it failed: {rollback}")]
    RollbackFailed {
        id: PayoutId,
        #[source]
        source: GatewayError,
        rollback: Box<PayoutError>,
    },
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Processing queue is closed")]
    QueueClosed,
    #[error("Worker task failed: {0}")]
    WorkerError(#[from] tokio::task::JoinError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PayoutError {
    fn from(err: rocksdb::Error) -> Self {
        PayoutError::Storage(Box::new(err))
    }
}

impl From<serde_json::Error> for PayoutError {
    fn from(err: serde_json::Error) -> Self {
        PayoutError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PayoutError>;
