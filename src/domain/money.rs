use crate::error::PayoutError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits between minor units and display units.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// A monetary value in the currency's smallest unit (kobo, cents, ...).
///
/// This is the only representation used inside the service. Display units
/// (`Decimal`) appear solely at the gateway wire and the CLI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Converts to display units, e.g. `10000` kobo becomes `100.00` NGN.
    pub fn to_display(self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    /// Converts display units to minor units, rounding half away from zero.
    pub fn from_display(amount: Decimal) -> Result<Self, PayoutError> {
        amount
            .checked_mul(Decimal::from(10_i64.pow(MINOR_UNIT_SCALE)))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or_else(|| PayoutError::ValidationError(format!("Amount {amount} is out of range")))
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

/// An ISO-4217 style currency code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, PayoutError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PayoutError::ValidationError(
                "Currency is required".to_string(),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = PayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = PayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
