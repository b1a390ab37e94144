//! Replica control for the deployment under test
//!
//! The checkout verification needs the consuming service out of the way while
//! it reads the orders topic itself, and needs it back afterwards no matter
//! what happened in between. This crate provides:
//! - `Orchestrator`: the raw command boundary (implemented by `Kubectl`)
//! - `ReplicaController`: read, scale and wait on top of that boundary
//! - `ReplicaState`: the recorded original count, threaded through the flow
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use odc_cluster::{DeploymentRef, Kubectl, ReplicaController};
//!
//! let controller = ReplicaController::new(Arc::new(Kubectl::new("otel-demo")));
//! let mut state = controller.record(DeploymentRef::new("accounting")).await;
//! controller.scale_to(&mut state, 0).await?;
//! controller.wait_until_scaled_down(state.deployment()).await?;
//! // ...
//! controller.restore(&mut state).await?;
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod kubectl;
pub mod replicas;

pub use error::ClusterError;
pub use kubectl::{Kubectl, Orchestrator};
pub use replicas::{
    count_pods, parse_count, DeploymentRef, PollPolicy, ReplicaController, ReplicaState,
};
