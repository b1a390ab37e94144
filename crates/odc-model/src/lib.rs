//! Records exchanged between the demo services
//!
//! Everything here is a plain serde record that mirrors the JSON the services
//! put on the wire:
//! - `OrderRequest` / `FrontendCheckout`: what gets posted to trigger an order
//! - `OrderResult`: what checkout publishes on the `orders` topic
//! - `ShippingQuote` / `QuoteRequest` / `ErrorBody`: the shipping quote API
//!
//! Every record derives `JsonSchema` so the runtime validator can check raw
//! payloads against the same shape the Rust types describe.

#![allow(missing_docs)]

pub mod error;
pub mod money;
pub mod order;
pub mod quote;

pub use error::ModelError;
pub use money::{Money, NANOS_PER_UNIT};
pub use order::{
    Address, CartItem, CheckoutPayload, CreditCard, FrontendAddress, FrontendCheckout,
    OrderItem, OrderRequest, OrderResult,
};
pub use quote::{ErrorBody, QuoteRequest, ShippingQuote};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
