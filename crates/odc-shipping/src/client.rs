//! Quote client used by the frontend

use std::time::Duration;

use odc_model::{ErrorBody, QuoteRequest, ShippingQuote};
use serde_json::Value;

use crate::error::QuoteClientError;

/// HTTP client for `POST /getquote`
#[derive(Debug, Clone)]
pub struct ShippingClient {
    base_url: String,
    http: reqwest::Client,
}

impl ShippingClient {
    /// Client for a service at `base_url` with a 10 s request timeout
    ///
    /// # Errors
    /// `QuoteClientError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, QuoteClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(base_url, http))
    }

    #[must_use]
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask for a quote for `number_of_items`
    ///
    /// # Errors
    /// - `QuoteClientError::Rejected` for a 4xx with an error body
    /// - `QuoteClientError::Unexpected` for other statuses or bodies
    /// - `QuoteClientError::Transport` if no response arrived
    pub async fn get_quote(&self, number_of_items: i64) -> Result<ShippingQuote, QuoteClientError> {
        let request = QuoteRequest { number_of_items };
        let response = self
            .http
            .post(format!("{}/getquote", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return serde_json::from_str(&text).map_err(|_| QuoteClientError::Unexpected {
                status: status.as_u16(),
                body: text,
            });
        }

        if status.is_client_error() {
            if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(&text) {
                return Err(QuoteClientError::Rejected {
                    status: status.as_u16(),
                    error,
                });
            }
        }
        Err(QuoteClientError::Unexpected {
            status: status.as_u16(),
            body: text,
        })
    }

    /// Whether `GET /health` answers 200
    pub async fn is_healthy(&self) -> bool {
        match self.http.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!("Shipping health check failed: {}", e);
                false
            }
        }
    }

    /// Raw `POST /getquote` with an arbitrary JSON body
    ///
    /// # Errors
    /// `QuoteClientError::Transport` if no response arrived.
    pub async fn post_raw(&self, body: &Value) -> Result<(u16, Value), QuoteClientError> {
        let response = self
            .http
            .post(format!("{}/getquote", self.base_url))
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }
}
