//! Error types for the verification flows
//!
//! - `ProbeError`: HTTP health waits and the order trigger
//! - `FlowError`: why a checkout verification run failed
//! - `ConfigError`: configuration could not be loaded
//! - `VerifyError`: provider verification could not run at all

use std::path::PathBuf;
use std::time::Duration;

use odc_capture::CaptureError;
use odc_cluster::ClusterError;
use odc_schema::{ContractError, SchemaError, ValidationFailure};

use crate::flow::FlowState;

/// HTTP probe errors
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Endpoint never answered 2xx in time
    #[error("timed out after {}ms waiting for {url} to be healthy", waited.as_millis())]
    HealthTimeout {
        /// Probed URL
        url: String,
        /// Configured wait
        waited: Duration,
    },

    /// Endpoint answered with a non-2xx status
    #[error("{url} answered {status} {reason}: {body}")]
    Http {
        /// Requested URL
        url: String,
        /// HTTP status
        status: u16,
        /// Canonical reason phrase
        reason: String,
        /// Response body
        body: String,
    },

    /// No response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProbeError {
    /// Check if the wait ran out
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HealthTimeout { .. })
    }

    /// HTTP status, when there was a response
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reason a checkout verification run failed
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Scale-down command failed or never completed
    #[error("scale-down failed: {0}")]
    ScaleDown(#[source] ClusterError),

    /// Storefront never became healthy
    #[error("frontend not healthy: {0}")]
    Frontend(#[source] ProbeError),

    /// Checkout request failed
    #[error("checkout trigger failed: {0}")]
    Trigger(#[source] ProbeError),

    /// No usable message was captured
    #[error("message capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Captured message broke the contract
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// Contract file problem
    #[error("contract: {0}")]
    Contract(#[from] ContractError),

    /// Validator could not be built
    #[error("validator: {0}")]
    Schema(#[from] SchemaError),

    /// Flow attempted a transition its state machine forbids
    #[error("illegal flow transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: FlowState,
        /// Requested state
        to: FlowState,
    },
}

impl FlowError {
    /// Check if the failure was a timeout (health wait or capture)
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Frontend(e) => e.is_timeout(),
            Self::Capture(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this configuration
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid setting {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Provider verification could not run
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Provider health check failed
    #[error("provider at {0} is not running")]
    ProviderUnavailable(String),

    /// No pact files to verify
    #[error("no pact files ending in {suffix} in {dir}")]
    NoPacts {
        /// Searched directory
        dir: PathBuf,
        /// File name suffix
        suffix: String,
    },

    /// Pact files could not be read
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Response validators could not be built
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// HTTP client could not be built
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}
