use crate::application::service::CreatePayout;
use crate::domain::money::MinorUnits;
use crate::domain::payout::{MerchantId, PayoutId, Recipient};
use crate::error::{PayoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Create,
    Status,
    Cancel,
}

/// One raw row of a payout command file. Amounts are in display units.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub merchant: Option<u64>,
    pub payout: Option<u64>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_account: Option<String>,
    pub recipient_bank: Option<String>,
    pub narration: Option<String>,
}

/// A validated command ready to be applied to the payout service.
#[derive(Debug, PartialEq, Clone)]
pub enum PayoutCommand {
    Create(CreatePayout),
    UpdateStatus { payout: PayoutId, status: String },
    Cancel { payout: PayoutId },
}

impl TryFrom<CommandRecord> for PayoutCommand {
    type Error = PayoutError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        match record.r#type {
            CommandType::Create => {
                let merchant = record.merchant.ok_or_else(|| missing("merchant"))?;
                let amount = record.amount.ok_or_else(|| missing("amount"))?;
                Ok(PayoutCommand::Create(CreatePayout {
                    merchant_id: MerchantId(merchant),
                    amount: MinorUnits::from_display(amount)?,
                    currency: record.currency.unwrap_or_default(),
                    recipient: Recipient {
                        name: record.recipient_name.unwrap_or_default(),
                        account: record.recipient_account.unwrap_or_default(),
                        bank: record.recipient_bank.unwrap_or_default(),
                    },
                    reference: record.reference,
                    narration: record.narration,
                }))
            }
            CommandType::Status => Ok(PayoutCommand::UpdateStatus {
                payout: PayoutId(record.payout.ok_or_else(|| missing("payout"))?),
                status: record.status.unwrap_or_default(),
            }),
            CommandType::Cancel => Ok(PayoutCommand::Cancel {
                payout: PayoutId(record.payout.ok_or_else(|| missing("payout"))?),
            }),
        }
    }
}

fn missing(field: &str) -> PayoutError {
    PayoutError::ValidationError(format!("{field} is required"))
}

/// Reads payout commands from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted; absent trailing
/// columns read as empty.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses and validates commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<PayoutCommand>> {
        self.reader.into_deserialize().map(|result| {
            let record: CommandRecord = result?;
            PayoutCommand::try_from(record)
        })
    }
}
