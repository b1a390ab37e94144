//! Layered configuration
//!
//! Defaults, then an optional TOML file, then environment variables. The
//! CLI applies its flags on top of the result.
//!
//! ```toml
//! pact_dir = "pacts"
//!
//! [checkout]
//! namespace = "otel-demo"
//! kafka_broker = "kafka:9092"
//! capture_order = "subscribe-first"
//!
//! [shipping]
//! provider_url = "http://localhost:9001"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use odc_cluster::{DeploymentRef, PollPolicy};
use odc_model::{CheckoutPayload, FrontendCheckout, OrderRequest};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When the capture subscription is opened relative to the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureOrder {
    /// Subscribe, then trigger, then wait
    #[default]
    SubscribeFirst,
    /// Trigger, then subscribe and wait
    TriggerFirst,
}

/// Which body the trigger posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadKind {
    /// snake_case `OrderRequest` for the checkout API
    #[default]
    Order,
    /// camelCase storefront checkout with card details
    Frontend,
}

impl PayloadKind {
    #[must_use]
    pub fn payload(self) -> CheckoutPayload {
        match self {
            Self::Order => CheckoutPayload::Order(OrderRequest::sample()),
            Self::Frontend => CheckoutPayload::Frontend(FrontendCheckout::sample()),
        }
    }
}

/// Storefront health wait defaults
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 1_000;

/// Bound on a single checkout request
pub const DEFAULT_ORDER_TIMEOUT_MS: u64 = 30_000;

/// Checkout → accounting verification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckoutFlowConfig {
    pub namespace: String,
    pub deployment: String,
    /// Pod selector; `app=<deployment>` when unset
    pub selector: Option<String>,
    pub kube_context: Option<String>,
    pub frontend_url: String,
    pub health_path: String,
    pub checkout_api_url: String,
    pub kafka_broker: String,
    pub kafka_topic: String,
    pub capture_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub health_interval_ms: u64,
    pub order_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// `None` polls until the cluster converges
    pub max_poll_attempts: Option<u32>,
    pub capture_order: CaptureOrder,
    pub payload: PayloadKind,
    /// Pact file that must describe the captured message
    pub pact_file: Option<PathBuf>,
}

impl Default for CheckoutFlowConfig {
    fn default() -> Self {
        Self {
            namespace: "otel-demo".to_string(),
            deployment: "accounting".to_string(),
            selector: None,
            kube_context: None,
            frontend_url: "http://localhost:8080".to_string(),
            health_path: "/health".to_string(),
            checkout_api_url: "http://localhost:8080/api/checkout".to_string(),
            kafka_broker: "localhost:9092".to_string(),
            kafka_topic: "orders".to_string(),
            capture_timeout_ms: 10_000,
            health_timeout_ms: DEFAULT_HEALTH_TIMEOUT_MS,
            health_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            order_timeout_ms: DEFAULT_ORDER_TIMEOUT_MS,
            poll_interval_ms: 2_000,
            max_poll_attempts: None,
            capture_order: CaptureOrder::default(),
            payload: PayloadKind::default(),
            pact_file: None,
        }
    }
}

impl CheckoutFlowConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    #[must_use]
    pub fn with_frontend_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = url.into();
        self
    }

    #[must_use]
    pub fn with_checkout_api_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_api_url = url.into();
        self
    }

    #[must_use]
    pub fn with_kafka(mut self, broker: impl Into<String>, topic: impl Into<String>) -> Self {
        self.kafka_broker = broker.into();
        self.kafka_topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn with_health_wait(mut self, timeout: Duration, interval: Duration) -> Self {
        self.health_timeout_ms = duration_ms(timeout);
        self.health_interval_ms = duration_ms(interval);
        self
    }

    #[must_use]
    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_interval_ms = duration_ms(policy.interval);
        self.max_poll_attempts = policy.max_attempts;
        self
    }

    #[must_use]
    pub fn with_capture_order(mut self, order: CaptureOrder) -> Self {
        self.capture_order = order;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: PayloadKind) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn with_pact_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pact_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn deployment_ref(&self) -> DeploymentRef {
        let deployment = DeploymentRef::new(&self.deployment);
        match &self.selector {
            Some(selector) => deployment.with_selector(selector),
            None => deployment,
        }
    }

    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.poll_interval_ms);
        match self.max_poll_attempts {
            Some(max) => PollPolicy::bounded(interval, max),
            None => PollPolicy::unbounded(interval),
        }
    }

    /// Storefront health URL
    #[must_use]
    pub fn health_url(&self) -> String {
        join_url(&self.frontend_url, &self.health_path)
    }

    #[inline]
    #[must_use]
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    #[inline]
    #[must_use]
    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    /// # Errors
    /// `ConfigError::Invalid` for empty endpoints or zero durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("checkout.deployment", &self.deployment)?;
        non_empty("checkout.namespace", &self.namespace)?;
        non_empty("checkout.frontend_url", &self.frontend_url)?;
        non_empty("checkout.checkout_api_url", &self.checkout_api_url)?;
        non_empty("checkout.kafka_broker", &self.kafka_broker)?;
        non_empty("checkout.kafka_topic", &self.kafka_topic)?;
        positive("checkout.capture_timeout_ms", self.capture_timeout_ms)?;
        positive("checkout.health_interval_ms", self.health_interval_ms)?;
        positive("checkout.order_timeout_ms", self.order_timeout_ms)?;
        positive("checkout.poll_interval_ms", self.poll_interval_ms)?;
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                key: "checkout.max_poll_attempts",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Shipping provider verification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShippingVerifyConfig {
    pub provider_url: String,
    pub request_timeout_ms: u64,
    /// Pact files whose name ends with this are verified
    pub pact_suffix: String,
}

impl Default for ShippingVerifyConfig {
    fn default() -> Self {
        Self {
            provider_url: "http://localhost:9001".to_string(),
            request_timeout_ms: 10_000,
            pact_suffix: "shipping.json".to_string(),
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub pact_dir: PathBuf,
    pub checkout: CheckoutFlowConfig,
    pub shipping: ShippingVerifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pact_dir: PathBuf::from("pacts"),
            checkout: CheckoutFlowConfig::default(),
            shipping: ShippingVerifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given, then the process environment
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// # Errors
    /// `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    /// The TOML parse error.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Override settings from environment variables looked up via `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("CHECKOUT_API_URL") {
            self.checkout.checkout_api_url = value;
        }
        if let Some(value) = get("FRONTEND_URL") {
            self.checkout.frontend_url = value;
        }
        if let Some(value) = get("KAFKA_BROKER") {
            self.checkout.kafka_broker = value;
        }
        if let Some(value) = get("KAFKA_TOPIC") {
            self.checkout.kafka_topic = value;
        }
        if let Some(value) = get("KUBE_NAMESPACE") {
            self.checkout.namespace = value;
        }
        if let Some(value) = get("PROVIDER_URL") {
            self.shipping.provider_url = value;
        }
        if let Some(value) = get("PACT_DIR") {
            self.pact_dir = PathBuf::from(value);
        }
    }

    /// # Errors
    /// The first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.checkout.validate()?;
        non_empty("shipping.provider_url", &self.shipping.provider_url)?;
        positive("shipping.request_timeout_ms", self.shipping.request_timeout_ms)
    }
}

/// `base` and `path` joined with exactly one slash
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn non_empty(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
