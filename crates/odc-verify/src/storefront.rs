//! The storefront side of the checkout flow

use std::time::Duration;

use odc_model::CheckoutPayload;

use crate::config::{
    CheckoutFlowConfig, DEFAULT_HEALTH_INTERVAL_MS, DEFAULT_HEALTH_TIMEOUT_MS, DEFAULT_ORDER_TIMEOUT_MS,
};
use crate::error::ProbeError;
use crate::probe;

/// Frontend the flow waits on and places the order through
#[async_trait::async_trait]
pub trait Storefront: Send + Sync {
    /// Wait until the storefront answers its health endpoint
    async fn wait_healthy(&self) -> Result<(), ProbeError>;

    /// Place one order
    async fn place_order(&self, payload: &CheckoutPayload) -> Result<(), ProbeError>;
}

/// Storefront reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpStorefront {
    http: reqwest::Client,
    health_url: String,
    checkout_url: String,
    health_timeout: Duration,
    health_interval: Duration,
    order_timeout: Duration,
}

impl HttpStorefront {
    #[must_use]
    pub fn new(http: reqwest::Client, health_url: impl Into<String>, checkout_url: impl Into<String>) -> Self {
        Self {
            http,
            health_url: health_url.into(),
            checkout_url: checkout_url.into(),
            health_timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
            health_interval: Duration::from_millis(DEFAULT_HEALTH_INTERVAL_MS),
            order_timeout: Duration::from_millis(DEFAULT_ORDER_TIMEOUT_MS),
        }
    }

    /// Storefront described by a flow configuration
    #[must_use]
    pub fn from_config(http: reqwest::Client, config: &CheckoutFlowConfig) -> Self {
        Self::new(http, config.health_url(), &config.checkout_api_url)
            .with_health_wait(config.health_timeout(), config.health_interval())
            .with_order_timeout(config.order_timeout())
    }

    #[must_use]
    pub fn with_health_wait(mut self, timeout: Duration, interval: Duration) -> Self {
        self.health_timeout = timeout;
        self.health_interval = interval;
        self
    }

    #[must_use]
    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    #[inline]
    #[must_use]
    pub fn checkout_url(&self) -> &str {
        &self.checkout_url
    }
}

#[async_trait::async_trait]
impl Storefront for HttpStorefront {
    async fn wait_healthy(&self) -> Result<(), ProbeError> {
        probe::wait_healthy(&self.http, &self.health_url, self.health_timeout, self.health_interval).await
    }

    async fn place_order(&self, payload: &CheckoutPayload) -> Result<(), ProbeError> {
        probe::trigger_order(&self.http, &self.checkout_url, payload, self.order_timeout).await
    }
}
