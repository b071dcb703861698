use super::in_memory::newest_first;
use crate::domain::payout::{MerchantId, NewPayout, Payout, PayoutId, PayoutStatus};
use crate::domain::ports::PayoutStore;
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payout records.
pub const CF_PAYOUTS: &str = "payouts";
/// Column Family for bookkeeping such as the id sequence.
pub const CF_META: &str = "meta";

const LAST_ID_KEY: &[u8] = b"last_payout_id";

/// A persistent payout store using RocksDB.
///
/// Payouts are stored as JSON under their big-endian id. All writes go
/// through one async mutex, so id allocation and the read-check-write of
/// [`PayoutStore::compare_and_set_status`] cannot interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBPayoutStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

fn missing_cf(name: &str) -> PayoutError {
    PayoutError::Storage(Box::new(std::io::Error::other(format!(
        "{name} column family not found"
    ))))
}

impl RocksDBPayoutStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("payouts" and "meta") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payouts = ColumnFamilyDescriptor::new(CF_PAYOUTS, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payouts, cf_meta])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read(&self, id: PayoutId) -> Result<Option<Payout>> {
        let cf = self.db.cf_handle(CF_PAYOUTS).ok_or_else(|| missing_cf(CF_PAYOUTS))?;
        match self.db.get_cf(&cf, id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, payout: &Payout) -> Result<()> {
        let cf = self.db.cf_handle(CF_PAYOUTS).ok_or_else(|| missing_cf(CF_PAYOUTS))?;
        let value = serde_json::to_vec(payout)?;
        self.db.put_cf(&cf, payout.id.0.to_be_bytes(), value)?;
        Ok(())
    }

    fn scan<F>(&self, mut keep: F) -> Result<Vec<Payout>>
    where
        F: FnMut(&Payout) -> bool,
    {
        let cf = self.db.cf_handle(CF_PAYOUTS).ok_or_else(|| missing_cf(CF_PAYOUTS))?;
        let mut payouts = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let payout: Payout = serde_json::from_slice(&value)?;
            if keep(&payout) {
                payouts.push(payout);
            }
        }
        Ok(payouts)
    }

    fn next_id(&self) -> Result<PayoutId> {
        let cf = self.db.cf_handle(CF_META).ok_or_else(|| missing_cf(CF_META))?;
        let last = match self.db.get_cf(&cf, LAST_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PayoutError::Storage(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "corrupt payout id sequence",
                    )))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = last + 1;
        self.db.put_cf(&cf, LAST_ID_KEY, next.to_be_bytes())?;
        Ok(PayoutId(next))
    }
}

#[async_trait]
impl PayoutStore for RocksDBPayoutStore {
    async fn create(&self, payout: NewPayout) -> Result<Payout> {
        let _guard = self.write_lock.lock().await;
        let id = self.next_id()?;
        let record = Payout::from_new(id, payout, Utc::now());
        self.write(&record)?;
        Ok(record)
    }

    async fn get(&self, id: PayoutId) -> Result<Option<Payout>> {
        self.read(id)
    }

    async fn list_by_merchant(
        &self,
        merchant_id: MerchantId,
        limit: usize,
    ) -> Result<Vec<Payout>> {
        let mut payouts = self.scan(|p| p.merchant_id == merchant_id)?;
        newest_first(&mut payouts);
        payouts.truncate(limit);
        Ok(payouts)
    }

    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<Payout>> {
        // Keys are big-endian ids, so the scan is already in id order.
        self.scan(|p| p.status == status)
    }

    async fn update_status(&self, id: PayoutId, status: PayoutStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut payout = self.read(id)?.ok_or(PayoutError::NotFound(id))?;
        payout.status = status;
        payout.updated_at = Utc::now();
        self.write(&payout)
    }

    async fn compare_and_set_status(
        &self,
        id: PayoutId,
        expected: PayoutStatus,
        new: PayoutStatus,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut payout = self.read(id)?.ok_or(PayoutError::NotFound(id))?;
        if payout.status != expected {
            return Ok(false);
        }
        payout.status = new;
        payout.updated_at = Utc::now();
        self.write(&payout)?;
        Ok(true)
    }
}
