use super::money::{Currency, MinorUnits};
use super::payout::{MerchantId, Payout};

/// Tag the ledger uses for both payment method and status of payout entries.
pub const PAYOUT_TAG: &str = "payout";

/// A settled payout as recorded in the transaction ledger.
#[derive(Debug, PartialEq, Clone)]
pub struct LedgerEntry {
    pub reference: String,
    pub merchant_id: MerchantId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub description: String,
}

impl From<&Payout> for LedgerEntry {
    fn from(payout: &Payout) -> Self {
        Self {
            reference: payout.ledger_reference(),
            merchant_id: payout.merchant_id,
            amount: payout.amount,
            currency: payout.currency.clone(),
            description: format!(
                "Payout to {} ({})",
                payout.recipient.name, payout.recipient.bank
            ),
        }
    }
}
