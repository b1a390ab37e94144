//! Checkout → accounting message verification
//!
//! One run takes the consuming deployment out of the way, places an order,
//! captures the resulting message from the orders topic and validates it. The
//! deployment is scaled back to its recorded count on every path, including
//! when scaling down itself failed.

pub mod report;
pub mod state;

use std::path::Path;
use std::sync::Arc;

use odc_capture::{CapturedMessage, MessageCapture};
use odc_cluster::{DeploymentRef, ReplicaController, ReplicaState};
use odc_model::{CheckoutPayload, OrderResult};
use odc_schema::{MessageEnvelope, MessageInteraction, OutcomeValidator, PactFile};

use crate::config::CaptureOrder;
use crate::error::FlowError;
use crate::storefront::Storefront;

pub use report::FlowReport;
pub use state::{allowed_transitions, validate_transition, FlowState, StateTrail};

/// Message description the accounting contract uses for checkout's order event
pub const ORDER_MESSAGE_DESCRIPTION: &str = "a completed order from checkout";

/// A configured checkout verification
pub struct CheckoutFlow {
    deployment: DeploymentRef,
    payload: CheckoutPayload,
    capture_order: CaptureOrder,
    replicas: ReplicaController,
    storefront: Arc<dyn Storefront>,
    capture: MessageCapture,
    validator: OutcomeValidator<OrderResult>,
    contract: Option<MessageInteraction>,
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("deployment", &self.deployment)
            .field("capture_order", &self.capture_order)
            .field("topic", &self.capture.topic())
            .field("contract", &self.contract.as_ref().map(|c| &c.description))
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    /// # Errors
    /// `FlowError::Schema` if the order validator cannot be built.
    pub fn new(
        deployment: DeploymentRef,
        replicas: ReplicaController,
        storefront: Arc<dyn Storefront>,
        capture: MessageCapture,
    ) -> Result<Self, FlowError> {
        Ok(Self {
            deployment,
            payload: CheckoutPayload::default(),
            capture_order: CaptureOrder::default(),
            replicas,
            storefront,
            capture,
            validator: OutcomeValidator::new()?,
            contract: None,
        })
    }

    /// Flow wired to kubectl, the HTTP storefront and Kafka
    ///
    /// # Errors
    /// `FlowError::Schema` or, when a pact file is configured,
    /// `FlowError::Contract`.
    #[cfg(feature = "kafka")]
    pub fn from_config(config: &crate::config::CheckoutFlowConfig) -> Result<Self, FlowError> {
        use odc_capture::KafkaSource;
        use odc_cluster::Kubectl;

        use crate::storefront::HttpStorefront;

        let mut kubectl = Kubectl::new(&config.namespace);
        if let Some(context) = &config.kube_context {
            kubectl = kubectl.with_context(context);
        }
        let replicas = ReplicaController::new(Arc::new(kubectl)).with_poll_policy(config.poll_policy());
        let storefront = HttpStorefront::from_config(reqwest::Client::new(), config);
        let capture = MessageCapture::new(Arc::new(KafkaSource::new(&config.kafka_broker)), &config.kafka_topic)
            .with_timeout(config.capture_timeout());

        let flow = Self::new(config.deployment_ref(), replicas, Arc::new(storefront), capture)?
            .with_payload(config.payload.payload())
            .with_capture_order(config.capture_order);
        match &config.pact_file {
            Some(path) => flow.with_contract_file(path),
            None => Ok(flow),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: CheckoutPayload) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn with_capture_order(mut self, order: CaptureOrder) -> Self {
        self.capture_order = order;
        self
    }

    /// Validate against a message contract; its metadata becomes the envelope metadata
    #[must_use]
    pub fn with_contract(mut self, contract: MessageInteraction) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Load the order message contract from a pact file
    ///
    /// # Errors
    /// `FlowError::Contract` if the file cannot be read or does not describe
    /// the order message.
    pub fn with_contract_file(self, path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let pact = PactFile::read(path)?;
        let contract = pact.message(ORDER_MESSAGE_DESCRIPTION)?.clone();
        tracing::info!("Using contract '{}' from {}", contract.description, pact.pair());
        Ok(self.with_contract(contract))
    }

    /// Run the verification and clean up
    ///
    /// Never returns early: every outcome, including a failed cleanup, is in
    /// the report.
    pub async fn run(&self) -> FlowReport {
        let mut trail = StateTrail::new();
        let mut replicas = self.replicas.record(self.deployment.clone()).await;
        tracing::info!(
            "Recorded {} replica(s) of {}",
            replicas.original_count(),
            replicas.name()
        );

        let (failure, order) = match self.verify(&mut trail, &mut replicas).await {
            Ok(order) => (None, Some(order)),
            Err(e) => {
                tracing::error!("Checkout verification failed in {}: {}", trail.current(), e);
                if let Err(illegal) = trail.advance(FlowState::Failed) {
                    tracing::error!("{}", illegal);
                }
                (Some(e), None)
            }
        };

        if let Err(illegal) = trail.advance(FlowState::ScalingUp) {
            tracing::error!("{}", illegal);
        }
        let cleanup_error = match self.replicas.restore(&mut replicas).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    "Failed to restore {} to {} replica(s): {}",
                    replicas.name(),
                    replicas.original_count(),
                    e
                );
                Some(e)
            }
        };
        if let Err(illegal) = trail.advance(FlowState::Done) {
            tracing::error!("{}", illegal);
        }

        FlowReport {
            visited: trail.visited().to_vec(),
            replicas,
            failure,
            cleanup_error,
            order,
        }
    }

    async fn verify(&self, trail: &mut StateTrail, replicas: &mut ReplicaState) -> Result<OrderResult, FlowError> {
        self.replicas.scale_to(replicas, 0).await.map_err(FlowError::ScaleDown)?;
        self.replicas
            .wait_until_scaled_down(replicas.deployment())
            .await
            .map_err(FlowError::ScaleDown)?;

        trail.advance(FlowState::WaitingHealthy)?;
        self.storefront.wait_healthy().await.map_err(FlowError::Frontend)?;

        trail.advance(FlowState::Triggering)?;
        let message = self.trigger_and_capture(trail).await?;

        trail.advance(FlowState::Validating)?;
        self.validate(message)
    }

    async fn trigger_and_capture(&self, trail: &mut StateTrail) -> Result<CapturedMessage, FlowError> {
        match self.capture_order {
            CaptureOrder::SubscribeFirst => {
                let subscription = self.capture.subscribe().await?;
                let triggered = match self.storefront.place_order(&self.payload).await {
                    Ok(()) => trail.advance(FlowState::Capturing),
                    Err(e) => Err(FlowError::Trigger(e)),
                };
                if let Err(e) = triggered {
                    subscription.close().await;
                    return Err(e);
                }
                Ok(subscription.first_message().await?)
            }
            CaptureOrder::TriggerFirst => {
                self.storefront
                    .place_order(&self.payload)
                    .await
                    .map_err(FlowError::Trigger)?;
                trail.advance(FlowState::Capturing)?;
                Ok(self.capture.capture_one().await?)
            }
        }
    }

    fn validate(&self, message: CapturedMessage) -> Result<OrderResult, FlowError> {
        let envelope = match &self.contract {
            Some(contract) => MessageEnvelope {
                contents: message.value,
                metadata: contract.metadata.clone(),
            },
            None => MessageEnvelope::wrap(message.value),
        };
        let order = self.validator.validate_envelope_value(envelope.to_value())?;
        tracing::info!(
            "Order {} validated ({} item(s), tracking {})",
            order.order_id,
            order.items.len(),
            order.shipping_tracking_id
        );
        Ok(order)
    }
}
