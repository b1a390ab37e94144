//! Quote calculation

use odc_model::{Money, ShippingQuote};
use serde_json::Value;

use crate::error::QuoteError;

/// Largest item count billed at the standard rate
pub const BULK_THRESHOLD: u64 = 10;

const STANDARD_UNITS: i64 = 10;
const BULK_UNITS: i64 = 15;
const ITEMS_FIELD: &str = "numberOfItems";

/// Quote for a known item count
#[must_use]
pub fn quote_for(items: u64) -> ShippingQuote {
    let units = if items > BULK_THRESHOLD {
        BULK_UNITS
    } else {
        STANDARD_UNITS
    };
    ShippingQuote {
        cost_usd: Money::usd(units),
    }
}

/// Item count from a `numberOfItems` value
///
/// Whole numbers are accepted even when written as floats (`3.0`).
///
/// # Errors
/// `QuoteError::MissingItems` for `null`, `QuoteError::InvalidItems` for
/// anything that is not a non-negative whole number.
pub fn parse_item_count(value: &Value) -> Result<u64, QuoteError> {
    match value {
        Value::Null => Err(QuoteError::MissingItems),
        Value::Number(n) => {
            if let Some(count) = n.as_u64() {
                return Ok(count);
            }
            match n.as_f64() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
                Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                    Ok(f as u64)
                }
                _ => Err(QuoteError::InvalidItems),
            }
        }
        _ => Err(QuoteError::InvalidItems),
    }
}

/// Quote for a request body (`None` when the request had no body)
///
/// # Errors
/// `QuoteError::MissingItems` when the body or field is absent, otherwise
/// see [`parse_item_count`].
pub fn calculate_quote(body: Option<&Value>) -> Result<ShippingQuote, QuoteError> {
    let items = body
        .and_then(|body| body.get(ITEMS_FIELD))
        .ok_or(QuoteError::MissingItems)
        .and_then(parse_item_count)?;
    Ok(quote_for(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn quote(body: Value) -> Result<ShippingQuote, QuoteError> {
        calculate_quote(Some(&body))
    }

    #[test]
    fn scenarios() {
        assert_eq!(quote(json!({"numberOfItems": 3})).unwrap().cost_usd.units, 10);
        assert_eq!(quote(json!({"numberOfItems": 20})).unwrap().cost_usd.units, 15);
        assert_eq!(
            quote(json!({"numberOfItems": -1})).unwrap_err().to_string(),
            "Invalid number of items"
        );
        assert_eq!(
            quote(json!({})).unwrap_err().to_string(),
            "Missing numberOfItems field"
        );
    }

    #[test]
    fn boundary_is_inclusive() {
        assert_eq!(quote_for(0).cost_usd.units, 10);
        assert_eq!(quote_for(10).cost_usd.units, 10);
        assert_eq!(quote_for(11).cost_usd.units, 15);
    }

    #[test]
    fn missing_null_and_no_body() {
        assert_eq!(calculate_quote(None).unwrap_err(), QuoteError::MissingItems);
        assert_eq!(quote(json!({"numberOfItems": null})).unwrap_err(), QuoteError::MissingItems);
        assert_eq!(quote(json!([3])).unwrap_err(), QuoteError::MissingItems);
    }

    #[test]
    fn non_numeric_values_are_invalid() {
        for value in [json!(2.5), json!(-1), json!("abc"), json!(""), json!("   "), json!({}), json!([]), json!(true), json!("3")] {
            assert_eq!(
                quote(json!({"numberOfItems": value.clone()})).unwrap_err(),
                QuoteError::InvalidItems,
                "{value}"
            );
        }
    }

    #[test]
    fn whole_floats_count() {
        assert_eq!(quote(json!({"numberOfItems": 12.0})).unwrap().cost_usd.units, 15);
    }

    proptest! {
        #[test]
        fn standard_range_costs_ten(n in 0u64..=10) {
            let q = quote(json!({"numberOfItems": n})).unwrap();
            prop_assert_eq!(q.cost_usd, Money::usd(10));
        }

        #[test]
        fn bulk_costs_fifteen(n in 11u64..1_000_000) {
            let q = quote(json!({"numberOfItems": n})).unwrap();
            prop_assert_eq!(q.cost_usd.units, 15);
            prop_assert_eq!(q.cost_usd.nanos, 0);
            prop_assert_eq!(q.cost_usd.currency_code.as_str(), "USD");
        }

        #[test]
        fn negatives_never_quote(n in i64::MIN..0) {
            prop_assert_eq!(quote(json!({"numberOfItems": n})).unwrap_err(), QuoteError::InvalidItems);
        }

        #[test]
        fn fractions_never_quote(n in 0u32..1000, frac in 0.01f64..0.99) {
            let value = f64::from(n) + frac;
            prop_assert_eq!(quote(json!({"numberOfItems": value})).unwrap_err(), QuoteError::InvalidItems);
        }

        #[test]
        fn strings_never_quote(s in ".*") {
            let err = quote(json!({"numberOfItems": s})).unwrap_err();
            prop_assert!(!err.to_string().is_empty());
        }
    }
}
