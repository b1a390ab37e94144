//! Pact v3 contract files
//!
//! Only the parts of the format this workspace reads or writes are modeled:
//! HTTP interactions, message interactions, provider states and the
//! specification version. Files are named `<consumer>-<provider>.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::pattern::Pattern;
use crate::error::ContractError;

/// Pact specification version written into every file
pub const PACT_SPECIFICATION_VERSION: &str = "3.0.0";

/// How to treat an existing file when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PactWriteMode {
    /// Replace the file
    Overwrite,
    /// Keep existing interactions, replacing those with the same description
    #[default]
    Merge,
}

/// Consumer or provider name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacticipant {
    pub name: String,
}

/// State the provider must be in before an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// Expected request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactRequest {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<Value>,
}

impl PactRequest {
    /// `POST` to `path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// `GET` of `path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            matching_rules: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// JSON body described by a pattern; sets `Content-Type: application/json`
    #[must_use]
    pub fn json_body(mut self, pattern: &Pattern) -> Self {
        self.body = Some(pattern.example());
        self.matching_rules = body_rules(pattern);
        self.header("Content-Type", "application/json")
    }

    /// Body sent verbatim (strings are sent as raw text)
    #[must_use]
    pub fn raw_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Expected response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<Value>,
}

impl PactResponse {
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            matching_rules: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// JSON body described by a pattern; sets `Content-Type: application/json`
    #[must_use]
    pub fn json_body(mut self, pattern: &Pattern) -> Self {
        self.body = Some(pattern.example());
        self.matching_rules = body_rules(pattern);
        self.header("Content-Type", "application/json")
    }

    /// Whether the status is 2xx
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_states: Vec<ProviderState>,
    pub request: PactRequest,
    pub response: PactResponse,
}

impl Interaction {
    /// Interaction with a placeholder `GET /` request and `200` response
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            provider_states: Vec::new(),
            request: PactRequest::get("/"),
            response: PactResponse::status(200),
        }
    }

    /// Add a provider state
    #[must_use]
    pub fn given(mut self, state: impl Into<String>) -> Self {
        self.provider_states.push(ProviderState {
            name: state.into(),
            params: Map::new(),
        });
        self
    }

    #[must_use]
    pub fn with_request(mut self, request: PactRequest) -> Self {
        self.request = request;
        self
    }

    #[must_use]
    pub fn will_respond_with(mut self, response: PactResponse) -> Self {
        self.response = response;
        self
    }
}

/// Asynchronous message interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInteraction {
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_states: Vec<ProviderState>,
    pub contents: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<Value>,
}

impl MessageInteraction {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            provider_states: Vec::new(),
            contents: Value::Null,
            metadata: Map::new(),
            matching_rules: None,
        }
    }

    #[must_use]
    pub fn given(mut self, state: impl Into<String>) -> Self {
        self.provider_states.push(ProviderState {
            name: state.into(),
            params: Map::new(),
        });
        self
    }

    /// JSON contents described by a pattern
    #[must_use]
    pub fn json_contents(mut self, pattern: &Pattern) -> Self {
        self.contents = pattern.example();
        self.matching_rules = body_rules(pattern);
        self.with_metadata("content-type", "application/json")
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A Pact contract between one consumer and one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PactFile {
    pub consumer: Pacticipant,
    pub provider: Pacticipant,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<Interaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageInteraction>,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

impl PactFile {
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: Pacticipant {
                name: consumer.into(),
            },
            provider: Pacticipant {
                name: provider.into(),
            },
            interactions: Vec::new(),
            messages: Vec::new(),
            metadata: default_metadata(),
        }
    }

    /// Add an interaction, replacing one with the same description
    #[must_use]
    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        upsert(&mut self.interactions, interaction, |i| &i.description);
        self
    }

    /// Add a message, replacing one with the same description
    #[must_use]
    pub fn with_message(mut self, message: MessageInteraction) -> Self {
        upsert(&mut self.messages, message, |m| &m.description);
        self
    }

    /// `<consumer>-<provider>.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.consumer.name, self.provider.name)
    }

    /// `consumer → provider`, for diagnostics
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{} → {}", self.consumer.name, self.provider.name)
    }

    /// Find an HTTP interaction by description
    ///
    /// # Errors
    /// `ContractError::InteractionNotFound` if no interaction matches.
    pub fn interaction(&self, description: &str) -> Result<&Interaction, ContractError> {
        self.interactions
            .iter()
            .find(|i| i.description == description)
            .ok_or_else(|| ContractError::InteractionNotFound(description.to_string()))
    }

    /// Find a message by description
    ///
    /// # Errors
    /// `ContractError::InteractionNotFound` if no message matches.
    pub fn message(&self, description: &str) -> Result<&MessageInteraction, ContractError> {
        self.messages
            .iter()
            .find(|m| m.description == description)
            .ok_or_else(|| ContractError::InteractionNotFound(description.to_string()))
    }

    /// Fold `other`'s interactions and messages into this pact
    pub fn merge(&mut self, other: PactFile) {
        for interaction in other.interactions {
            upsert(&mut self.interactions, interaction, |i| &i.description);
        }
        for message in other.messages {
            upsert(&mut self.messages, message, |m| &m.description);
        }
    }

    /// Read a pact file
    ///
    /// # Errors
    /// `ContractError::Io` or `ContractError::Parse`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ContractError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read every `*.json` pact in `dir` whose file name ends with `suffix`
    ///
    /// Files are returned sorted by path.
    ///
    /// # Errors
    /// The first file that cannot be listed, read or parsed.
    pub fn read_dir(dir: impl AsRef<Path>, suffix: &str) -> Result<Vec<(PathBuf, Self)>, ContractError> {
        let dir = dir.as_ref();
        let io_err = |source| ContractError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix) && n.ends_with(".json"));
            if matches {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| Self::read(&path).map(|pact| (path, pact)))
            .collect()
    }

    /// Write the pact into `dir`, returning the file path
    ///
    /// # Errors
    /// - `ContractError::PairMismatch` when merging into another pair's file
    /// - `ContractError::Io` / `ContractError::Parse` for file problems
    pub fn write(&self, dir: impl AsRef<Path>, mode: PactWriteMode) -> Result<PathBuf, ContractError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ContractError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(self.file_name());

        let pact = match mode {
            PactWriteMode::Merge if path.exists() => {
                let mut existing = Self::read(&path)?;
                if existing.consumer != self.consumer || existing.provider != self.provider {
                    return Err(ContractError::PairMismatch {
                        path,
                        found: existing.pair(),
                        expected: self.pair(),
                    });
                }
                existing.merge(self.clone());
                existing.metadata = default_metadata();
                existing
            }
            _ => self.clone(),
        };

        let mut text = serde_json::to_string_pretty(&pact)?;
        text.push('\n');
        fs::write(&path, text).map_err(|source| ContractError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote {} interactions and {} messages for {} to {}",
            pact.interactions.len(),
            pact.messages.len(),
            pact.pair(),
            path.display()
        );
        Ok(path)
    }
}

fn default_metadata() -> Value {
    json!({ "pactSpecification": { "version": PACT_SPECIFICATION_VERSION } })
}

fn body_rules(pattern: &Pattern) -> Option<Value> {
    let rules = pattern.matching_rules();
    (!rules.is_empty()).then(|| json!({ "body": rules }))
}

fn upsert<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &String) {
    match items.iter().position(|existing| key(existing) == key(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}
