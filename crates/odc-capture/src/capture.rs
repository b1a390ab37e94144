//! First-message capture with a bounded wait

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::CaptureError;
use crate::source::{MessageSource, MessageStream};

/// Wait applied when none is configured
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_millis(10_000);

const DEFAULT_GROUP_PREFIX: &str = "pact-verifier";
const BROKER_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One decoded record
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    pub topic: String,
    /// Consumer group the record was read with
    pub group_id: String,
    /// Record value as received
    pub payload: Vec<u8>,
    /// Parsed value; an empty record parses as `{}`
    pub value: Value,
}

impl CapturedMessage {
    /// Decode a raw record
    ///
    /// # Errors
    /// `CaptureError::Decode` if the record is not UTF-8 JSON.
    pub fn decode(
        topic: impl Into<String>,
        group_id: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let topic = topic.into();
        let value = if payload.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            let decoded = std::str::from_utf8(&payload)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(text).map_err(|e| e.to_string()));
            match decoded {
                Ok(value) => value,
                Err(reason) => {
                    return Err(CaptureError::Decode {
                        topic,
                        reason,
                        raw: String::from_utf8_lossy(&payload).into_owned(),
                    })
                }
            }
        };
        Ok(Self {
            topic,
            group_id: group_id.into(),
            payload,
            value,
        })
    }
}

/// Captures one message per subscription from a topic
#[derive(Clone)]
pub struct MessageCapture {
    source: Arc<dyn MessageSource>,
    topic: String,
    timeout: Duration,
    group_prefix: String,
}

impl MessageCapture {
    #[must_use]
    pub fn new(source: Arc<dyn MessageSource>, topic: impl Into<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            group_prefix: DEFAULT_GROUP_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_group_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.group_prefix = prefix.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fresh group id: `<prefix>-<unix millis>-<random suffix>`
    #[must_use]
    pub fn new_group_id(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", self.group_prefix, millis, &suffix[..8])
    }

    /// Open a consumer in a new group at the end of the topic
    ///
    /// The timeout does not start until [`Subscription::first_message`].
    ///
    /// # Errors
    /// `CaptureError::Connect` / `CaptureError::Subscribe` from the source.
    pub async fn subscribe(&self) -> Result<Subscription, CaptureError> {
        let group_id = self.new_group_id();
        tracing::info!(
            "Subscribing to {} on {} as {}",
            self.topic,
            self.source.describe(),
            group_id
        );
        let stream = self.source.subscribe(&self.topic, &group_id).await?;
        Ok(Subscription {
            stream,
            topic: self.topic.clone(),
            group_id,
            timeout: self.timeout,
        })
    }

    /// Subscribe and wait for the first message
    ///
    /// # Errors
    /// See [`MessageCapture::subscribe`] and [`Subscription::first_message`].
    pub async fn capture_one(&self) -> Result<CapturedMessage, CaptureError> {
        self.subscribe().await?.first_message().await
    }
}

impl fmt::Debug for MessageCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCapture")
            .field("source", &self.source.describe())
            .field("topic", &self.topic)
            .field("timeout", &self.timeout)
            .field("group_prefix", &self.group_prefix)
            .finish()
    }
}

/// An open consumer waiting to be used once
///
/// Both ways out (`first_message`, `close`) take the subscription by value and
/// release the consumer exactly once.
#[must_use = "a subscription should be consumed by first_message() or close()"]
pub struct Subscription {
    stream: Box<dyn MessageStream>,
    topic: String,
    group_id: String,
    timeout: Duration,
}

impl Subscription {
    #[inline]
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    #[inline]
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for one record, then release the consumer
    ///
    /// The record and the timer race; whichever settles first decides the
    /// outcome, and the loser is dropped before the release.
    ///
    /// # Errors
    /// - `CaptureError::Timeout` if nothing arrived in time
    /// - `CaptureError::Decode` if the record is not UTF-8 JSON
    /// - any non-retryable error reported by the stream
    pub async fn first_message(mut self) -> Result<CapturedMessage, CaptureError> {
        tracing::info!(
            "Waiting up to {}ms for a message on {}",
            self.timeout.as_millis(),
            self.topic
        );

        let received = tokio::select! {
            received = next_record(self.stream.as_mut()) => received,
            () = tokio::time::sleep(self.timeout) => Err(CaptureError::Timeout {
                topic: self.topic.clone(),
                waited: self.timeout,
            }),
        };

        self.stream.disconnect().await;
        tracing::debug!("Released consumer group {}", self.group_id);

        let message = CapturedMessage::decode(self.topic, self.group_id, received?)?;
        tracing::info!(
            "Captured {} bytes from {}",
            message.payload.len(),
            message.topic
        );
        Ok(message)
    }

    /// Release the consumer without reading
    pub async fn close(mut self) {
        self.stream.disconnect().await;
        tracing::debug!("Closed consumer group {}", self.group_id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("group_id", &self.group_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

async fn next_record(stream: &mut dyn MessageStream) -> Result<Vec<u8>, CaptureError> {
    loop {
        match stream.recv().await {
            Ok(payload) => return Ok(payload),
            Err(e) if e.is_retryable() => {
                tracing::warn!("Receive failed, retrying: {}", e);
                tokio::time::sleep(BROKER_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}
