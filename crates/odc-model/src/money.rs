//! Money values: currency code, whole units and fractional nanos

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Number of nanos in one whole unit
pub const NANOS_PER_UNIT: i64 = 1_000_000_000;

/// An amount of money in a single currency
///
/// The total value is `units + nanos * 10^-9`. `nanos` is always the
/// non-negative fractional part, so `12.5 USD` is `{units: 12, nanos: 500000000}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Money {
    /// ISO 4217 currency code, e.g. `USD`
    #[schemars(regex(pattern = r"^[A-Z]{3}$"))]
    pub currency_code: String,
    /// Whole units of the amount
    pub units: i64,
    /// Fractional part in billionths of a unit
    #[schemars(range(min = 0, max = 999_999_999))]
    pub nanos: i32,
}

impl Money {
    /// Build a money value, checking the currency code and nanos range
    ///
    /// # Errors
    /// - `ModelError::InvalidCurrencyCode` unless the code is 3 upper-case letters
    /// - `ModelError::NanosOutOfRange` unless `0 <= nanos <= 999_999_999`
    pub fn new(currency_code: impl Into<String>, units: i64, nanos: i32) -> Result<Self, ModelError> {
        let money = Self {
            currency_code: currency_code.into(),
            units,
            nanos,
        };
        money.validate()?;
        Ok(money)
    }

    /// Whole US dollars
    #[inline]
    #[must_use]
    pub fn usd(units: i64) -> Self {
        Self {
            currency_code: "USD".to_string(),
            units,
            nanos: 0,
        }
    }

    /// Check the invariants on a value that was deserialized without checks
    ///
    /// # Errors
    /// Same as [`Money::new`].
    pub fn validate(&self) -> Result<(), ModelError> {
        if !is_currency_code(&self.currency_code) {
            return Err(ModelError::InvalidCurrencyCode(self.currency_code.clone()));
        }
        if !(0..NANOS_PER_UNIT).contains(&i64::from(self.nanos)) {
            return Err(ModelError::NanosOutOfRange(self.nanos));
        }
        Ok(())
    }

    /// Total value expressed in nanos
    #[inline]
    #[must_use]
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.units) * i128::from(NANOS_PER_UNIT) + i128::from(self.nanos)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09} {}", self.units, self.nanos, self.currency_code)
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
