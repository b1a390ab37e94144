//! JSON round-trip of the order result published on the orders topic.

use odc_model::{Address, CartItem, Money, OrderItem, OrderResult};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn money() -> impl Strategy<Value = Money> {
    ("[A-Z]{3}", any::<i64>(), 0..=999_999_999i32).prop_map(|(currency_code, units, nanos)| Money {
        currency_code,
        units,
        nanos,
    })
}

fn address() -> impl Strategy<Value = Address> {
    (".*", ".*", "[A-Z]{2}", ".*", "[0-9]{5}").prop_map(
        |(street_address, city, state, country, zip_code)| Address {
            street_address,
            city,
            state,
            country,
            zip_code,
        },
    )
}

fn line() -> impl Strategy<Value = OrderItem> {
    ("SKU-[0-9]{3}", any::<i32>(), money()).prop_map(|(product_id, quantity, cost)| OrderItem {
        item: CartItem::new(product_id, quantity),
        cost,
    })
}

fn order_result() -> impl Strategy<Value = OrderResult> {
    (
        ".*",
        ".*",
        money(),
        address(),
        prop::collection::vec(line(), 1..5),
    )
        .prop_map(
            |(order_id, shipping_tracking_id, shipping_cost, shipping_address, items)| {
                OrderResult {
                    order_id,
                    shipping_tracking_id,
                    shipping_cost,
                    shipping_address,
                    items,
                }
            },
        )
}

proptest! {
    #[test]
    fn prop_order_result_survives_json(order in order_result()) {
        let text = serde_json::to_string(&order).unwrap();
        let parsed: OrderResult = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(&parsed, &order);
        prop_assert!(parsed.validate().is_ok());
    }
}

#[test]
fn wire_field_names_are_stable() {
    let order = OrderResult {
        order_id: "ORDER-123".to_string(),
        shipping_tracking_id: "TRACK-456".to_string(),
        shipping_cost: Money::new("USD", 12, 500_000_000).unwrap(),
        shipping_address: Address::mountain_view(),
        items: vec![OrderItem {
            item: CartItem::new("SKU-001", 2),
            cost: Money::usd(20),
        }],
    };

    let value = serde_json::to_value(&order).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
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
    );
}
