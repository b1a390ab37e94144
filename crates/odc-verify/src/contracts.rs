//! Consumer contract catalog
//!
//! The frontend's expectations of the shipping quote API and accounting's
//! expectations of checkout's order message, written as Pact v3 files by
//! `odc write-pacts`.

use std::path::{Path, PathBuf};

use odc_model::OrderResult;
use odc_schema::{
    ContractError, Interaction, MessageEnvelope, MessageInteraction, OutcomeValidator, PactFile,
    PactRequest, PactResponse, PactWriteMode, Pattern,
};
use serde_json::{json, Value};

use crate::error::FlowError;
use crate::flow::ORDER_MESSAGE_DESCRIPTION;

/// Provider state every shipping interaction starts from
pub const SHIPPING_READY: &str = "shipping service is ready";

const INVALID_ITEMS: &str = "Invalid number of items";
const MISSING_ITEMS: &str = "Missing numberOfItems field";
const BAD_CONTENT_TYPE: &str = "Invalid or missing Content-Type header";

fn quote_request(body: Value) -> PactRequest {
    PactRequest::post("/getquote").json_body(&Pattern::exact(body))
}

fn quote_body(units: i64) -> Pattern {
    Pattern::object([(
        "cost_usd",
        Pattern::object([
            ("currency_code", Pattern::like("USD")),
            ("units", Pattern::integer(units)),
            ("nanos", Pattern::integer(0)),
        ]),
    )])
}

fn error_response(message: &str) -> PactResponse {
    PactResponse::status(400).json_body(&Pattern::like(json!({ "error": message })))
}

fn rejected(description: &str, request: PactRequest, message: &str) -> Interaction {
    Interaction::new(description)
        .given(SHIPPING_READY)
        .with_request(request)
        .will_respond_with(error_response(message))
}

/// `frontend` → `shipping`: the quote API
#[must_use]
pub fn frontend_shipping_pact() -> PactFile {
    let mut pact = PactFile::new("frontend", "shipping")
        .with_interaction(
            Interaction::new("a valid quote request with standard items")
                .given(SHIPPING_READY)
                .with_request(quote_request(json!({ "numberOfItems": 3 })))
                .will_respond_with(PactResponse::status(200).json_body(&quote_body(10))),
        )
        .with_interaction(
            Interaction::new("a valid quote request with bulk items")
                .given(SHIPPING_READY)
                .with_request(quote_request(json!({ "numberOfItems": 20 })))
                .will_respond_with(PactResponse::status(200).json_body(&quote_body(15))),
        )
        .with_interaction(rejected(
            "an invalid quote request with negative items",
            quote_request(json!({ "numberOfItems": -1 })),
            INVALID_ITEMS,
        ));

    let invalid = [
        ("float", json!(2.5)),
        ("string", json!("abc")),
        ("empty string", json!("")),
        ("whitespace string", json!("   ")),
        ("object", json!({})),
        ("array", json!([])),
    ];
    for (desc, value) in invalid {
        pact = pact.with_interaction(rejected(
            &format!("a quote request with {desc} numberOfItems"),
            quote_request(json!({ "numberOfItems": value })),
            INVALID_ITEMS,
        ));
    }

    pact.with_interaction(rejected(
        "a quote request with null numberOfItems",
        quote_request(json!({ "numberOfItems": null })),
        MISSING_ITEMS,
    ))
    .with_interaction(rejected(
        "a quote request with no body",
        PactRequest::post("/getquote").header("Content-Type", "application/json"),
        MISSING_ITEMS,
    ))
    .with_interaction(rejected(
        "a quote request with incorrect Content-Type header",
        PactRequest::post("/getquote")
            .header("Content-Type", "text/plain")
            .raw_body(Value::String(json!({ "numberOfItems": 3 }).to_string())),
        BAD_CONTENT_TYPE,
    ))
    .with_interaction(rejected(
        "a quote request with missing numberOfItems field",
        quote_request(json!({})),
        MISSING_ITEMS,
    ))
}

fn money(units: i64, nanos: i64) -> Pattern {
    Pattern::object([
        ("currency_code", Pattern::term("^[A-Z]{3}$", "USD")),
        ("units", Pattern::integer(units)),
        ("nanos", Pattern::integer(nanos)),
    ])
}

/// `accounting` → `checkout`: the order message on the orders topic
#[must_use]
pub fn accounting_checkout_pact() -> PactFile {
    let contents = Pattern::object([
        ("order_id", Pattern::like("ORDER-123")),
        ("shipping_tracking_id", Pattern::like("TRACK-456")),
        ("shipping_cost", money(12, 500_000_000)),
        (
            "shipping_address",
            Pattern::object([
                ("street_address", Pattern::like("123 Main St")),
                ("city", Pattern::like("Mountain View")),
                ("state", Pattern::like("CA")),
                ("country", Pattern::like("USA")),
                ("zip_code", Pattern::like("94043")),
            ]),
        ),
        (
            "items",
            Pattern::each_like(Pattern::object([
                (
                    "item",
                    Pattern::object([
                        ("product_id", Pattern::like("SKU-001")),
                        ("quantity", Pattern::integer(2)),
                    ]),
                ),
                ("cost", money(20, 0)),
            ])),
        ),
    ]);

    PactFile::new("accounting", "checkout")
        .with_message(MessageInteraction::new(ORDER_MESSAGE_DESCRIPTION).json_contents(&contents))
}

/// Check that a message contract's example is itself a valid order
///
/// # Errors
/// `FlowError::Schema` or `FlowError::Validation`.
pub fn check_message_contract(message: &MessageInteraction) -> Result<OrderResult, FlowError> {
    let validator = OutcomeValidator::<OrderResult>::new()?;
    let envelope = MessageEnvelope {
        contents: message.contents.clone(),
        metadata: message.metadata.clone(),
    };
    Ok(validator.validate_envelope_value(envelope.to_value())?)
}

/// Write every catalog contract to `dir`
///
/// # Errors
/// `ContractError` from the first file that cannot be written.
pub fn write_all(dir: impl AsRef<Path>, mode: PactWriteMode) -> Result<Vec<PathBuf>, ContractError> {
    let dir = dir.as_ref();
    [frontend_shipping_pact(), accounting_checkout_pact()]
        .iter()
        .map(|pact| pact.write(dir, mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shipping_catalog_covers_every_case() {
        let pact = frontend_shipping_pact();
        assert_eq!(pact.file_name(), "frontend-shipping.json");
        assert_eq!(pact.interactions.len(), 13);
        assert!(pact
            .interactions
            .iter()
            .all(|i| i.provider_states.iter().any(|s| s.name == SHIPPING_READY)));

        let bulk = pact.interaction("a valid quote request with bulk items").unwrap();
        assert_eq!(bulk.request.body, Some(json!({ "numberOfItems": 20 })));
        assert_eq!(bulk.response.body.as_ref().unwrap()["cost_usd"]["units"], 15);

        let no_body = pact.interaction("a quote request with no body").unwrap();
        assert_eq!(no_body.request.body, None);
        assert_eq!(no_body.response.body, Some(json!({ "error": MISSING_ITEMS })));
    }

    #[test]
    fn zero_items_is_not_listed_as_invalid() {
        let pact = frontend_shipping_pact();
        assert!(pact.interaction("a quote request with zero numberOfItems").is_err());
    }

    #[test]
    fn order_message_example_is_a_valid_order() {
        let pact = accounting_checkout_pact();
        assert_eq!(pact.file_name(), "accounting-checkout.json");

        let message = pact.message(ORDER_MESSAGE_DESCRIPTION).unwrap();
        assert_eq!(message.metadata["content-type"], "application/json");

        let order = check_message_contract(message).unwrap();
        assert_eq!(order.order_id, "ORDER-123");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.shipping_cost.nanos, 500_000_000);
    }

    #[test]
    fn broken_message_contract_is_rejected() {
        let mut message = accounting_checkout_pact().messages.remove(0);
        message.contents["shipping_cost"]["currency_code"] = json!("usd");
        message.contents["items"] = json!([]);

        let err = check_message_contract(&message).unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
    }

    #[test]
    fn write_all_produces_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_all(dir.path(), PactWriteMode::Overwrite).unwrap();
        assert_eq!(paths.len(), 2);

        let shipping = PactFile::read(dir.path().join("frontend-shipping.json")).unwrap();
        assert_eq!(shipping, frontend_shipping_pact());
        let accounting = PactFile::read(dir.path().join("accounting-checkout.json")).unwrap();
        assert_eq!(accounting.messages.len(), 1);
    }
}
