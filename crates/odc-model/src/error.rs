//! Error types for the record model

/// Invariant violations when building records by hand
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Currency code is not three upper-case ASCII letters
    #[error("invalid currency code {0:?}: must be a 3-letter uppercase code")]
    InvalidCurrencyCode(String),

    /// Fractional part outside `0..=999_999_999`
    #[error("nanos {0} out of range 0..=999999999")]
    NanosOutOfRange(i32),

    /// An order result must carry at least one line item
    #[error("order {0} has no line items")]
    EmptyOrder(String),
}
