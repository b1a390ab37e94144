//! Typed outcome validation: envelope → schema → record

use std::marker::PhantomData;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::MessageEnvelope;
use crate::error::{SchemaError, ValidationFailure};
use crate::validator::SchemaValidator;

/// Validates payloads of type `T` against the schema generated for `T`
#[derive(Debug)]
pub struct OutcomeValidator<T> {
    schema: SchemaValidator,
    _record: PhantomData<fn() -> T>,
}

impl<T> OutcomeValidator<T>
where
    T: JsonSchema + DeserializeOwned,
{
    /// Build the validator
    ///
    /// # Errors
    /// `SchemaError` if the schema for `T` cannot be compiled.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            schema: SchemaValidator::for_type::<T>()?,
            _record: PhantomData,
        })
    }

    /// Underlying schema validator
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &SchemaValidator {
        &self.schema
    }

    /// Validate a bare payload and decode it
    ///
    /// # Errors
    /// - `ValidationFailure::Schema` with every failing field
    /// - `ValidationFailure::Decode` if the typed record cannot be built
    pub fn validate_value(&self, payload: &Value) -> Result<T, ValidationFailure> {
        let type_name = self.schema.type_name();
        if let Err(report) = self.schema.check(payload) {
            tracing::debug!("{} rejected with {} failing fields", type_name, report.len());
            return Err(ValidationFailure::Schema { type_name, report });
        }
        T::deserialize(payload).map_err(|source| ValidationFailure::Decode { type_name, source })
    }

    /// Unwrap a message envelope and validate its contents
    ///
    /// # Errors
    /// `ValidationFailure::Envelope` if the envelope cannot be decoded, else
    /// the same as [`OutcomeValidator::validate_value`].
    pub fn validate_envelope(&self, raw: &[u8]) -> Result<T, ValidationFailure> {
        let envelope = MessageEnvelope::decode(raw)?;
        self.validate_value(&envelope.contents)
    }

    /// Same as [`OutcomeValidator::validate_envelope`] for a parsed value
    ///
    /// # Errors
    /// See [`OutcomeValidator::validate_envelope`].
    pub fn validate_envelope_value(&self, envelope: Value) -> Result<T, ValidationFailure> {
        let envelope = MessageEnvelope::from_value(envelope)?;
        self.validate_value(&envelope.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odc_model::{OrderResult, ShippingQuote};
    use serde_json::json;

    fn order_json() -> Value {
        json!({
            "order_id": "ORDER-123",
            "shipping_tracking_id": "TRACK-456",
            "shipping_cost": {"currency_code": "USD", "units": 12, "nanos": 500000000},
            "shipping_address": {
                "street_address": "123 Main St",
                "city": "Mountain View",
                "state": "CA",
                "country": "USA",
                "zip_code": "94043"
            },
            "items": [{
                "item": {"product_id": "SKU-001", "quantity": 2},
                "cost": {"currency_code": "USD", "units": 20, "nanos": 0}
            }]
        })
    }

    #[test]
    fn string_wrapped_envelope_decodes_to_record() {
        let validator = OutcomeValidator::<OrderResult>::new().unwrap();
        let envelope = MessageEnvelope::wrap(order_json()).to_value().to_string();
        let raw = serde_json::to_vec(&Value::String(envelope)).unwrap();

        let order = validator.validate_envelope(&raw).unwrap();
        assert_eq!(order.order_id, "ORDER-123");
        assert_eq!(order.items[0].cost.units, 20);
    }

    #[test]
    fn schema_failure_lists_all_fields() {
        let validator = OutcomeValidator::<OrderResult>::new().unwrap();
        let mut order = order_json();
        order["shipping_tracking_id"] = json!(null);
        order["items"][0]["cost"]["currency_code"] = json!("dollars");

        let failure = validator.validate_value(&order).unwrap_err();
        let report = failure.report().expect("schema failure");
        assert!(report.has_path("/shipping_tracking_id"));
        assert!(report.has_path("/items/0/cost/currency_code"));
        assert!(failure.to_string().starts_with("OrderResult validation failed"));
    }

    #[test]
    fn envelope_problems_are_not_schema_failures() {
        let validator = OutcomeValidator::<ShippingQuote>::new().unwrap();
        let failure = validator
            .validate_envelope_value(json!({"metadata": {}}))
            .unwrap_err();
        assert!(matches!(failure, ValidationFailure::Envelope(_)));
        assert!(failure.report().is_none());
    }
}
