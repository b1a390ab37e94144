//! Kafka message source (rdkafka)
//!
//! `subscribe` only returns once the consumer group has assigned partitions.
//! librdkafka serves the rebalance that carries the assignment while the
//! consumer is polled, so without that wait the `latest` offset would be
//! fixed by the first `recv`, after the producer has already been triggered.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use crate::error::CaptureError;
use crate::source::{MessageSource, MessageStream};

/// Bound on waiting for the group to assign partitions
pub const DEFAULT_ASSIGNMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest single poll while waiting for an assignment
const ASSIGNMENT_POLL: Duration = Duration::from_millis(100);

/// Kafka cluster reached through `bootstrap.servers`
#[derive(Debug, Clone)]
pub struct KafkaSource {
    brokers: String,
    overrides: BTreeMap<String, String>,
    assignment_timeout: Duration,
}

impl KafkaSource {
    /// Source for a comma-separated broker list
    #[must_use]
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            overrides: BTreeMap::new(),
            assignment_timeout: DEFAULT_ASSIGNMENT_TIMEOUT,
        }
    }

    /// Give up on `subscribe` if no partitions are assigned within `timeout`
    #[must_use]
    pub fn with_assignment_timeout(mut self, timeout: Duration) -> Self {
        self.assignment_timeout = timeout;
        self
    }

    /// Bound on waiting for the group to assign partitions
    #[inline]
    #[must_use]
    pub fn assignment_timeout(&self) -> Duration {
        self.assignment_timeout
    }

    /// Set an extra librdkafka property (applied last)
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Consumer configuration for one capture
    ///
    /// Offsets are never committed and a new group starts at the latest
    /// offset.
    #[must_use]
    pub fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000");
        for (key, value) in &self.overrides {
            config.set(key, value);
        }
        config
    }
}

#[async_trait::async_trait]
impl MessageSource for KafkaSource {
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Result<Box<dyn MessageStream>, CaptureError> {
        let consumer: StreamConsumer =
            self.consumer_config(group_id)
                .create()
                .map_err(|e| CaptureError::Connect {
                    broker: self.brokers.clone(),
                    reason: e.to_string(),
                })?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| CaptureError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        let assigned = &consumer;
        let pending = await_assignment(
            || assigned.assignment().is_ok_and(|partitions| partitions.count() > 0),
            move || async move { assigned.recv().await.ok().map(|message| payload_of(&message)) },
            self.assignment_timeout,
        )
        .await
        .map_err(|waited| CaptureError::Subscribe {
            topic: topic.to_string(),
            reason: format!("no partitions assigned after {}ms", waited.as_millis()),
        })?;
        tracing::debug!("Group {} assigned partitions of {}", group_id, topic);

        Ok(Box::new(KafkaStream {
            consumer: Some(consumer),
            pending,
        }))
    }

    fn describe(&self) -> String {
        self.brokers.clone()
    }
}

/// Poll until `assigned` holds, keeping whatever records the polls return
///
/// # Errors
/// The configured `timeout` if no assignment arrived in time.
async fn await_assignment<A, P, F>(assigned: A, mut poll: P, timeout: Duration) -> Result<VecDeque<Vec<u8>>, Duration>
where
    A: Fn() -> bool,
    P: FnMut() -> F,
    F: Future<Output = Option<Vec<u8>>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut polled = VecDeque::new();

    loop {
        if assigned() {
            return Ok(polled);
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(timeout);
        }
        let step = remaining.min(ASSIGNMENT_POLL);
        match tokio::time::timeout(step, poll()).await {
            Ok(Some(record)) => polled.push_back(record),
            Ok(None) => tokio::time::sleep(step).await,
            Err(_) => {}
        }
    }
}

fn payload_of(message: &impl Message) -> Vec<u8> {
    message.payload().map(<[u8]>::to_vec).unwrap_or_default()
}

struct KafkaStream {
    consumer: Option<StreamConsumer>,
    /// Records polled while waiting for the assignment
    pending: VecDeque<Vec<u8>>,
}

#[async_trait::async_trait]
impl MessageStream for KafkaStream {
    async fn recv(&mut self) -> Result<Vec<u8>, CaptureError> {
        let consumer = self.consumer.as_ref().ok_or(CaptureError::StreamClosed)?;
        if let Some(record) = self.pending.pop_front() {
            return Ok(record);
        }
        let message = consumer
            .recv()
            .await
            .map_err(|e| CaptureError::Broker(e.to_string()))?;
        Ok(payload_of(&message))
    }

    async fn disconnect(&mut self) {
        self.pending.clear();
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            tracing::debug!("Kafka consumer unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    #[test]
    fn consumer_config_starts_at_latest() {
        let config = KafkaSource::new("localhost:9092")
            .with_property("client.id", "odc")
            .consumer_config("pact-verifier-1");

        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(config.get("group.id"), Some("pact-verifier-1"));
        assert_eq!(config.get("auto.offset.reset"), Some("latest"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("client.id"), Some("odc"));
    }

    #[test]
    fn overrides_win() {
        let config = KafkaSource::new("b:9092")
            .with_property("session.timeout.ms", "10000")
            .consumer_config("g");
        assert_eq!(config.get("session.timeout.ms"), Some("10000"));
    }

    #[test]
    fn assignment_wait_defaults_and_override() {
        assert_eq!(KafkaSource::new("b:9092").assignment_timeout(), DEFAULT_ASSIGNMENT_TIMEOUT);
        let source = KafkaSource::new("b:9092").with_assignment_timeout(Duration::from_secs(3));
        assert_eq!(source.assignment_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn assigned_consumer_is_not_polled() {
        let polls = Cell::new(0);
        let pending = await_assignment(
            || true,
            || {
                polls.set(polls.get() + 1);
                std::future::ready(None)
            },
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(pending.is_empty());
        assert_eq!(polls.get(), 0);
    }

    #[tokio::test]
    async fn polls_until_partitions_are_assigned() {
        let script = RefCell::new(VecDeque::from([None, Some(b"early".to_vec()), None]));
        let pending = await_assignment(
            || script.borrow().is_empty(),
            || std::future::ready(script.borrow_mut().pop_front().flatten()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(script.borrow().is_empty());
        assert_eq!(pending, VecDeque::from([b"early".to_vec()]));
    }

    #[tokio::test]
    async fn missing_assignment_gives_up_after_the_timeout() {
        let started = Instant::now();
        let waited = await_assignment(
            || false,
            std::future::pending::<Option<Vec<u8>>>,
            Duration::from_millis(250),
        )
        .await
        .unwrap_err();

        assert_eq!(waited, Duration::from_millis(250));
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
