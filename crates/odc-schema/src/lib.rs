//! Outcome validation and contract artifacts
//!
//! This crate owns the consumer-side half of a contract check:
//! - Decoding a message envelope (including payloads that arrive as a JSON
//!   string holding more JSON)
//! - Validating the inner content against a JSON Schema generated from the
//!   Rust record type, reporting *every* failing field
//! - Reading and writing Pact v3 contract files, and describing expected
//!   bodies with a small matcher DSL
//!
//! Evaluating Pact matching rules is left to the Pact tooling that consumes
//! the written files.
//!
//! # Example
//!
//! ```rust,ignore
//! use odc_model::OrderResult;
//! use odc_schema::OutcomeValidator;
//!
//! let validator = OutcomeValidator::<OrderResult>::new()?;
//! let order = validator.validate_envelope(&raw_bytes)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod contract;
pub mod envelope;
pub mod error;
pub mod outcome;
pub mod validator;

pub use contract::{
    Interaction, MessageInteraction, PactFile, PactRequest, PactResponse, PactWriteMode,
    Pacticipant, Pattern, ProviderState,
};
pub use envelope::MessageEnvelope;
pub use error::{ContractError, EnvelopeError, SchemaError, ValidationFailure};
pub use outcome::OutcomeValidator;
pub use validator::{FieldError, SchemaValidator, ValidationReport};
