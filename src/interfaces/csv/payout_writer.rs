use crate::application::service::PayoutView;
use crate::error::Result;
use std::io::Write;

/// Writes payout views as CSV (`id,merchant,reference,amount,currency,status`).
pub struct PayoutWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PayoutWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payouts<I>(&mut self, payouts: I) -> Result<()>
    where
        I: IntoIterator<Item = PayoutView>,
    {
        self.writer.write_record([
            "id",
            "merchant",
            "reference",
            "amount",
            "currency",
            "status",
        ])?;
        for payout in payouts {
            self.writer.write_record([
                payout.id.to_string(),
                payout.merchant_id.to_string(),
                payout.reference,
                payout.amount.to_string(),
                payout.currency.to_string(),
                payout.status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
