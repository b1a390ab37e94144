//! In-process message source on tokio channels
//!
//! Records published before a subscription exists are not delivered to it,
//! which matches a consumer group that starts at the latest offset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::CaptureError;
use crate::source::{MessageSource, MessageStream};

type Delivery = Result<Vec<u8>, String>;

#[derive(Default)]
struct Inner {
    topics: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Delivery>>>>,
    refuse: Mutex<Option<String>>,
    subscriptions: AtomicUsize,
    releases: AtomicUsize,
}

impl Inner {
    fn topics(&self) -> MutexGuard<'_, HashMap<String, Vec<mpsc::UnboundedSender<Delivery>>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, topic: &str, delivery: &Delivery) -> usize {
        let mut topics = self.topics();
        let Some(subscribers) = topics.get_mut(topic) else {
            return 0;
        };
        subscribers.retain(|tx| tx.send(delivery.clone()).is_ok());
        subscribers.len()
    }
}

/// In-memory broker shared by clones
#[derive(Clone, Default)]
pub struct InMemorySource {
    inner: Arc<Inner>,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every open subscription on `topic`
    ///
    /// Returns how many subscriptions received it.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> usize {
        self.inner.deliver(topic, &Ok(payload))
    }

    /// Make the next receive on `topic` report a broker error
    pub fn fail_next_receive(&self, topic: &str, reason: &str) -> usize {
        self.inner.deliver(topic, &Err(reason.to_string()))
    }

    /// Refuse every later subscription with `reason`
    pub fn refuse_subscriptions(&self, reason: &str) {
        *self.inner.refuse.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }

    /// Subscriptions opened so far
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.inner.subscriptions.load(Ordering::SeqCst)
    }

    /// Disconnect calls received so far
    #[must_use]
    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySource")
            .field("subscriptions", &self.subscriptions())
            .field("releases", &self.releases())
            .finish()
    }
}

#[async_trait::async_trait]
impl MessageSource for InMemorySource {
    async fn subscribe(
        &self,
        topic: &str,
        _group_id: &str,
    ) -> Result<Box<dyn MessageStream>, CaptureError> {
        let refused = self
            .inner
            .refuse
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = refused {
            return Err(CaptureError::Subscribe {
                topic: topic.to_string(),
                reason,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.topics().entry(topic.to_string()).or_default().push(tx);
        self.inner.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryStream {
            rx,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

struct InMemoryStream {
    rx: mpsc::UnboundedReceiver<Delivery>,
    inner: Arc<Inner>,
}

#[async_trait::async_trait]
impl MessageStream for InMemoryStream {
    async fn recv(&mut self) -> Result<Vec<u8>, CaptureError> {
        match self.rx.recv().await {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(reason)) => Err(CaptureError::Broker(reason)),
            None => Err(CaptureError::StreamClosed),
        }
    }

    async fn disconnect(&mut self) {
        self.rx.close();
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
    }
}
