//! Contract artifacts
//!
//! - `pattern`: the matcher DSL used to describe expected bodies
//! - `pact`: the Pact v3 file model and its reader/writer

pub mod pact;
pub mod pattern;

pub use pact::{
    Interaction, MessageInteraction, PactFile, PactRequest, PactResponse, PactWriteMode,
    Pacticipant, ProviderState, PACT_SPECIFICATION_VERSION,
};
pub use pattern::Pattern;
