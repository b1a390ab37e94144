//! Error types for validation and contract files
//!
//! Three families:
//! - `SchemaError`: the schema itself could not be built
//! - `EnvelopeError` / `ValidationFailure`: a payload was rejected
//! - `ContractError`: a contract file could not be read, written or searched

use std::path::PathBuf;

use crate::validator::ValidationReport;

/// Building a validator failed
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Generated schema could not be serialized
    #[error("schema serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Schema was rejected by the validator
    #[error("schema for {type_name} does not compile: {reason}")]
    Compile {
        /// Type the schema was generated for
        type_name: &'static str,
        /// Compiler message
        reason: String,
    },
}

/// Message envelope could not be unwrapped
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Raw bytes (or a nested string) are not JSON
    #[error("envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope has no `contents` field
    #[error("envelope has no contents field")]
    MissingContents,

    /// Envelope is neither an object nor a JSON string
    #[error("envelope must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// A payload did not satisfy its contract
#[derive(Debug, thiserror::Error)]
pub enum ValidationFailure {
    /// Envelope decoding failed before validation
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// One or more fields violate the schema
    #[error("{type_name} validation failed:\n{report}")]
    Schema {
        /// Type validated against
        type_name: &'static str,
        /// Every failing field
        report: ValidationReport,
    },

    /// Schema passed but the typed record could not be built
    #[error("{type_name} could not be decoded: {source}")]
    Decode {
        /// Type decoded into
        type_name: &'static str,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },
}

impl ValidationFailure {
    /// Report of failing fields, when the failure came from the schema
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Schema { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Contract file errors
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// File system error
    #[error("contract file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid pact
    #[error("contract file {path} is not a valid pact: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Pact could not be serialized
    #[error("contract serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Merging into a file written for another consumer/provider pair
    #[error("contract file {path} belongs to {found}, expected {expected}")]
    PairMismatch {
        /// File involved
        path: PathBuf,
        /// Pair in the existing file
        found: String,
        /// Pair being written
        expected: String,
    },

    /// No interaction or message with this description
    #[error("no interaction described as {0:?}")]
    InteractionNotFound(String),
}
