//! Shipping quotes
//!
//! - `quote`: the pricing rule and request validation
//! - `server`: the mock shipping service (`POST /getquote`, `GET /health`)
//! - `client`: the frontend-side quote client
//!
//! Pricing: up to ten items cost 10 USD, more than ten cost 15 USD.

#![warn(unreachable_pub)]

pub mod client;
pub mod error;
pub mod quote;
pub mod server;

pub use client::ShippingClient;
pub use error::{QuoteClientError, QuoteError, ServerError};
pub use quote::{calculate_quote, parse_item_count, quote_for, BULK_THRESHOLD};
pub use server::{routes, ShippingServer, DEFAULT_PORT};
