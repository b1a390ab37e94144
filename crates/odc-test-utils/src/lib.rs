//! Testing utilities for the otel-demo-contracts workspace
//!
//! Scriptable fakes for the cluster and the storefront, plus order fixtures.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use odc_capture::InMemorySource;
use odc_cluster::{ClusterError, Orchestrator};
use odc_model::{CheckoutPayload, OrderResult};
use odc_verify::{ProbeError, Storefront};
use serde_json::{json, Value};

/// Completed order as checkout publishes it
pub fn order_result_json() -> Value {
    json!({
        "order_id": "ORDER-123",
        "shipping_tracking_id": "TRACK-456",
        "shipping_cost": {"currency_code": "USD", "units": 12, "nanos": 500000000},
        "shipping_address": {
            "street_address": "123 Main St",
            "city": "Mountain View",
            "state": "CA",
            "country": "USA",
            "zip_code": "94043"
        },
        "items": [
            {
                "item": {"product_id": "SKU-001", "quantity": 2},
                "cost": {"currency_code": "USD", "units": 20, "nanos": 0}
            }
        ]
    })
}

pub fn order_result() -> OrderResult {
    serde_json::from_value(order_result_json()).unwrap()
}

/// The order fixture as a record payload
pub fn order_payload() -> Vec<u8> {
    order_result_json().to_string().into_bytes()
}

#[derive(Debug, Default)]
struct Cluster {
    replicas: u32,
    unreadable: bool,
    fail_scale_down: bool,
    fail_scale_up: bool,
    scale_calls: Vec<u32>,
}

/// In-memory deployment: pods follow the desired count immediately
#[derive(Debug, Clone, Default)]
pub struct FakeOrchestrator {
    cluster: Arc<Mutex<Cluster>>,
}

impl FakeOrchestrator {
    pub fn with_replicas(replicas: u32) -> Self {
        let fake = Self::default();
        fake.cluster().replicas = replicas;
        fake
    }

    /// Replica queries fail, so the controller falls back to its default
    #[must_use]
    pub fn unreadable(self) -> Self {
        self.cluster().unreadable = true;
        self
    }

    #[must_use]
    pub fn failing_scale_down(self) -> Self {
        self.cluster().fail_scale_down = true;
        self
    }

    #[must_use]
    pub fn failing_scale_up(self) -> Self {
        self.cluster().fail_scale_up = true;
        self
    }

    /// Replica counts passed to every scale command, in order
    pub fn scale_calls(&self) -> Vec<u32> {
        self.cluster().scale_calls.clone()
    }

    pub fn replicas(&self) -> u32 {
        self.cluster().replicas
    }

    fn cluster(&self) -> MutexGuard<'_, Cluster> {
        self.cluster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn desired_replicas(&self, deployment: &str) -> Result<String, ClusterError> {
        let cluster = self.cluster();
        if cluster.unreadable {
            return Err(ClusterError::command_failed(
                format!("kubectl get deployment {deployment}"),
                Some(1),
                b"Error from server (Forbidden)",
            ));
        }
        Ok(format!("'{}'", cluster.replicas))
    }

    async fn scale(&self, deployment: &str, replicas: u32) -> Result<(), ClusterError> {
        let mut cluster = self.cluster();
        cluster.scale_calls.push(replicas);
        let fail = if replicas == 0 {
            cluster.fail_scale_down
        } else {
            cluster.fail_scale_up
        };
        if fail {
            return Err(ClusterError::command_failed(
                format!("kubectl scale deployment {deployment} --replicas={replicas}"),
                Some(1),
                b"connection refused",
            ));
        }
        cluster.replicas = replicas;
        Ok(())
    }

    async fn pod_listing(&self, selector: &str) -> Result<String, ClusterError> {
        let replicas = self.cluster().replicas;
        if replicas == 0 {
            return Ok("No resources found in otel-demo namespace.\n".to_string());
        }
        let name = selector.rsplit('=').next().unwrap_or(selector);
        Ok((0..replicas)
            .map(|i| format!("{name}-{i} 1/1 Running 0 1m\n"))
            .collect())
    }

    async fn ready_replicas(&self, _deployment: &str) -> Result<String, ClusterError> {
        Ok(self.cluster().replicas.to_string())
    }
}

/// Storefront whose checkout publishes straight onto an in-memory topic
pub struct FakeStorefront {
    source: InMemorySource,
    topic: String,
    message: Option<Vec<u8>>,
    delay: Duration,
    healthy: bool,
    reject: Option<u16>,
    orders: AtomicUsize,
}

impl FakeStorefront {
    /// Healthy storefront publishing the order fixture on `topic`
    pub fn new(source: InMemorySource, topic: impl Into<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
            message: Some(order_payload()),
            delay: Duration::ZERO,
            healthy: true,
            reject: None,
            orders: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn publishing(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.message = Some(payload.into());
        self
    }

    /// Orders succeed but nothing is published
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.message = None;
        self
    }

    /// Publish `delay` after the order instead of during it
    #[must_use]
    pub fn publishing_after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    #[must_use]
    pub fn rejecting(mut self, status: u16) -> Self {
        self.reject = Some(status);
        self
    }

    /// Orders placed so far
    pub fn orders(&self) -> usize {
        self.orders.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Storefront for FakeStorefront {
    async fn wait_healthy(&self) -> Result<(), ProbeError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProbeError::HealthTimeout {
                url: "http://frontend/health".to_string(),
                waited: Duration::from_millis(10),
            })
        }
    }

    async fn place_order(&self, _payload: &CheckoutPayload) -> Result<(), ProbeError> {
        self.orders.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.reject {
            return Err(ProbeError::Http {
                url: "http://frontend/api/checkout".to_string(),
                status,
                reason: "Internal Server Error".to_string(),
                body: "checkout unavailable".to_string(),
            });
        }

        let Some(payload) = self.message.clone() else {
            return Ok(());
        };
        if self.delay.is_zero() {
            self.source.publish(&self.topic, payload);
        } else {
            let source = self.source.clone();
            let topic = self.topic.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                source.publish(&topic, payload);
            });
        }
        Ok(())
    }
}
