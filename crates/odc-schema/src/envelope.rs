//! Message envelopes as handed over by message providers
//!
//! A provider returns `{"contents": <payload>, "metadata": {...}}`. Some
//! transports deliver that envelope as a JSON *string*, and some put the
//! payload itself in `contents` as a string of JSON, so both levels may need a
//! second parse.

use serde_json::{Map, Value};

use crate::error::EnvelopeError;

/// Decoded message envelope
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    /// Message payload
    pub contents: Value,
    /// Transport metadata such as `content-type`
    pub metadata: Map<String, Value>,
}

impl MessageEnvelope {
    /// Wrap a JSON payload with `content-type: application/json` metadata
    #[must_use]
    pub fn wrap(contents: Value) -> Self {
        let mut metadata = Map::new();
        metadata.insert(
            "content-type".to_string(),
            Value::String("application/json".to_string()),
        );
        Self { contents, metadata }
    }

    /// Envelope as a JSON object
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("contents".to_string(), self.contents.clone());
        map.insert("metadata".to_string(), Value::Object(self.metadata.clone()));
        Value::Object(map)
    }

    /// Decode raw bytes
    ///
    /// # Errors
    /// `EnvelopeError` if the bytes are not JSON, the envelope is not an
    /// object, or `contents` is missing.
    pub fn decode(raw: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Decode an already parsed value
    ///
    /// # Errors
    /// Same as [`MessageEnvelope::decode`].
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let value = match value {
            Value::String(text) => serde_json::from_str(&text)?,
            other => other,
        };

        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(EnvelopeError::NotAnObject(kind(&other))),
        };

        let contents = map
            .remove("contents")
            .ok_or(EnvelopeError::MissingContents)
            .map(parse_nested)?;
        let metadata = match map.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => Map::new(),
        };

        Ok(Self { contents, metadata })
    }

    /// Declared content type, if any
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type") || k.as_str() == "contentType")
            .and_then(|(_, v)| v.as_str())
    }
}

/// Parse string contents that hold a JSON document; plain strings stay as-is
fn parse_nested(contents: Value) -> Value {
    if let Value::String(text) = &contents {
        if let Ok(parsed @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(text) {
            return parsed;
        }
    }
    contents
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
