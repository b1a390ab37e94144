//! Shipping quote API records

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Body of `POST /getquote`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuoteRequest {
    #[serde(rename = "numberOfItems")]
    pub number_of_items: i64,
}

/// Successful quote response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShippingQuote {
    pub cost_usd: Money,
}

/// Error response used by every 4xx from the shipping service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    #[schemars(length(min = 1))]
    pub error: String,
}

impl ErrorBody {
    #[inline]
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
