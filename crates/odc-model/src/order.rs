//! Order request and order result records

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::money::Money;

/// Shipping address in the snake_case shape used by checkout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Address {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl Address {
    /// The address every contract example ships to
    #[must_use]
    pub fn mountain_view() -> Self {
        Self {
            street_address: "123 Main St".to_string(),
            city: "Mountain View".to_string(),
            state: "CA".to_string(),
            country: "USA".to_string(),
            zip_code: "94043".to_string(),
        }
    }
}

/// A product and how many of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i32,
}

impl CartItem {
    #[inline]
    #[must_use]
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Body posted to the checkout API to place an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OrderRequest {
    pub email: String,
    pub address: Address,
    pub items: Vec<CartItem>,
}

impl OrderRequest {
    /// The fixed order used by the checkout verification
    #[must_use]
    pub fn sample() -> Self {
        Self {
            email: "test-pact@example.com".to_string(),
            address: Address::mountain_view(),
            items: vec![CartItem::new("SKU-001", 2), CartItem::new("SKU-002", 1)],
        }
    }
}

/// Storefront address in camelCase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrontendAddress {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl From<Address> for FrontendAddress {
    fn from(address: Address) -> Self {
        Self {
            street_address: address.street_address,
            city: address.city,
            state: address.state,
            country: address.country,
            zip_code: address.zip_code,
        }
    }
}

/// Card details the storefront forwards to payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditCard {
    pub credit_card_number: String,
    pub credit_card_expiration_month: String,
    pub credit_card_expiration_year: i32,
    pub credit_card_cvv: i32,
}

/// The storefront's own checkout body (`POST /api/checkout` on the frontend proxy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrontendCheckout {
    pub user_id: String,
    pub user_currency: String,
    pub address: FrontendAddress,
    pub email: String,
    pub credit_card: CreditCard,
}

impl FrontendCheckout {
    /// Checkout for the contract test user with a test card
    #[must_use]
    pub fn sample() -> Self {
        Self {
            user_id: "pact-test-user".to_string(),
            user_currency: "USD".to_string(),
            address: Address::mountain_view().into(),
            email: "someone@example.com".to_string(),
            credit_card: CreditCard {
                credit_card_number: "4432-8015-6152-0454".to_string(),
                credit_card_expiration_month: "January".to_string(),
                credit_card_expiration_year: 2030,
                credit_card_cvv: 123,
            },
        }
    }
}

/// Either body shape the order trigger can post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckoutPayload {
    Order(OrderRequest),
    Frontend(FrontendCheckout),
}

impl Default for CheckoutPayload {
    fn default() -> Self {
        Self::Order(OrderRequest::sample())
    }
}

/// One priced line of a completed order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct OrderItem {
    pub item: CartItem,
    pub cost: Money,
}

/// Completed order as published by checkout on the orders topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OrderResult {
    pub order_id: String,
    pub shipping_tracking_id: String,
    pub shipping_cost: Money,
    pub shipping_address: Address,
    #[schemars(length(min = 1))]
    pub items: Vec<OrderItem>,
}

impl OrderResult {
    /// Check money invariants and that the order has line items
    ///
    /// # Errors
    /// The first violated invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.items.is_empty() {
            return Err(ModelError::EmptyOrder(self.order_id.clone()));
        }
        self.shipping_cost.validate()?;
        self.items.iter().try_for_each(|line| line.cost.validate())
    }

    /// Sum of all line costs plus shipping, in nanos
    ///
    /// Returns `None` when the lines mix currencies.
    #[must_use]
    pub fn total_nanos(&self) -> Option<i128> {
        let currency = &self.shipping_cost.currency_code;
        self.items.iter().try_fold(self.shipping_cost.total_nanos(), |acc, line| {
            (line.cost.currency_code == *currency).then(|| acc + line.cost.total_nanos())
        })
    }
}
