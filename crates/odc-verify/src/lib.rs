//! Contract verification for the OpenTelemetry demo
//!
//! Two verifications live here:
//! - `flow`: checkout → accounting. Scale accounting down, place an order,
//!   capture the order message from Kafka, validate it, and always scale
//!   accounting back up.
//! - `provider`: frontend → shipping. Replay the frontend's pact against a
//!   running shipping service.
//!
//! Supporting modules:
//! - `config`: layered configuration (defaults, TOML, environment)
//! - `contracts`: the consumer contract catalog written by `odc write-pacts`
//! - `probe` / `storefront`: HTTP health waits and the order trigger
//! - `logging`: tracing subscriber setup for the binary

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod contracts;
pub mod error;
pub mod flow;
pub mod logging;
pub mod probe;
pub mod provider;
pub mod storefront;

pub use config::{AppConfig, CaptureOrder, CheckoutFlowConfig, PayloadKind, ShippingVerifyConfig};
pub use error::{ConfigError, FlowError, ProbeError, VerifyError};
pub use flow::{CheckoutFlow, FlowReport, FlowState, StateTrail, ORDER_MESSAGE_DESCRIPTION};
pub use logging::{init_tracing, LogFormat};
pub use provider::{InteractionResult, PactVerification, ProviderReport, ShippingProviderVerifier};
pub use storefront::{HttpStorefront, Storefront};
