//! Capture the first message published to a topic
//!
//! A `MessageCapture` opens a fresh consumer group positioned at the end of the
//! topic, waits for one record or the timeout (whichever comes first), and
//! releases the consumer exactly once. The release is tied to ownership:
//! `Subscription::first_message` and `Subscription::close` both consume the
//! subscription.
//!
//! Backends:
//! - `KafkaSource` (feature `kafka`, on by default): rdkafka `StreamConsumer`;
//!   `subscribe` waits for the partition assignment before returning
//! - `InMemorySource`: tokio channels, for tests and local runs
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use odc_capture::{KafkaSource, MessageCapture};
//!
//! let capture = MessageCapture::new(Arc::new(KafkaSource::new("localhost:9092")), "orders");
//! let subscription = capture.subscribe().await?;
//! // ... trigger the producer ...
//! let message = subscription.first_message().await?;
//! ```

#![warn(unreachable_pub)]

pub mod capture;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod source;

pub use capture::{CapturedMessage, MessageCapture, Subscription, DEFAULT_CAPTURE_TIMEOUT};
pub use error::CaptureError;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaSource, DEFAULT_ASSIGNMENT_TIMEOUT};
pub use memory::InMemorySource;
pub use source::{MessageSource, MessageStream};
