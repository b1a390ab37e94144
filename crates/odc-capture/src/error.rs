//! Error types for message capture

use std::time::Duration;

/// Message capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Consumer could not be created
    #[error("cannot connect to {broker}: {reason}")]
    Connect {
        /// Broker address
        broker: String,
        /// Client message
        reason: String,
    },

    /// Topic subscription was refused
    #[error("cannot subscribe to {topic}: {reason}")]
    Subscribe {
        /// Topic name
        topic: String,
        /// Client message
        reason: String,
    },

    /// No record arrived in time
    #[error("no message on {topic} within {}ms", waited.as_millis())]
    Timeout {
        /// Topic name
        topic: String,
        /// Configured wait
        waited: Duration,
    },

    /// Record was not UTF-8 JSON
    #[error("message on {topic} is not valid JSON: {reason}")]
    Decode {
        /// Topic name
        topic: String,
        /// Decoder message
        reason: String,
        /// Record as (lossy) text
        raw: String,
    },

    /// Broker reported an error while receiving
    #[error("broker error: {0}")]
    Broker(String),

    /// The stream ended or was already released
    #[error("message stream closed")]
    StreamClosed,
}

impl CaptureError {
    /// Check if the wait ran out
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if a record arrived but could not be decoded
    #[inline]
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Check if receiving again could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Broker(_))
    }
}
