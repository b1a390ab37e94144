//! The pacts committed under `pacts/` match what `odc write-pacts` produces

use std::path::PathBuf;

use odc_schema::PactFile;
use odc_verify::contracts::{accounting_checkout_pact, check_message_contract, frontend_shipping_pact};
use odc_verify::ORDER_MESSAGE_DESCRIPTION;
use pretty_assertions::assert_eq;

fn pact_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../pacts")
}

#[test]
fn frontend_shipping_is_current() {
    let committed = PactFile::read(pact_dir().join("frontend-shipping.json")).unwrap();
    assert_eq!(committed, frontend_shipping_pact());
}

#[test]
fn accounting_checkout_is_current() {
    let committed = PactFile::read(pact_dir().join("accounting-checkout.json")).unwrap();
    assert_eq!(committed, accounting_checkout_pact());

    let message = committed.message(ORDER_MESSAGE_DESCRIPTION).unwrap();
    check_message_contract(message).unwrap();
}

#[test]
fn shipping_pacts_are_discovered_by_suffix() {
    let found = PactFile::read_dir(pact_dir(), "shipping.json").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1.provider.name, "shipping");
}
