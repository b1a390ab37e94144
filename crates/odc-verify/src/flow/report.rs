//! Outcome of one checkout verification run

use std::fmt::Write as _;

use odc_cluster::{ClusterError, ReplicaState};
use odc_model::OrderResult;

use crate::error::FlowError;
use crate::flow::state::FlowState;

/// What a run did and how it ended
#[derive(Debug)]
pub struct FlowReport {
    /// States entered, in order
    pub visited: Vec<FlowState>,
    /// Replica counts after cleanup
    pub replicas: ReplicaState,
    /// Why verification failed
    pub failure: Option<FlowError>,
    /// Why cleanup failed; reported alongside `failure`, never instead of it
    pub cleanup_error: Option<ClusterError>,
    /// The validated order on success
    pub order: Option<OrderResult>,
}

impl FlowReport {
    /// Whether `Failed` was entered during the run
    #[must_use]
    pub fn entered_failed(&self) -> bool {
        self.visited.contains(&FlowState::Failed)
    }

    /// Verification succeeded and the deployment was restored
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.entered_failed() && self.failure.is_none() && self.cleanup_error.is_none()
    }

    /// Process exit code: 0 on success, 1 otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed())
    }

    /// Human-readable summary, one line per fact
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let path: Vec<String> = self.visited.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "states: {}", path.join(" -> "));
        let _ = writeln!(
            out,
            "replicas: {} restored to {} (now {})",
            self.replicas.name(),
            self.replicas.original_count(),
            self.replicas.current_count()
        );
        if let Some(order) = &self.order {
            let _ = writeln!(
                out,
                "order: {} with {} item(s), shipping {}",
                order.order_id,
                order.items.len(),
                order.shipping_cost
            );
        }
        if let Some(failure) = &self.failure {
            let _ = writeln!(out, "failure: {failure}");
        }
        if let Some(cleanup) = &self.cleanup_error {
            let _ = writeln!(out, "cleanup failure: {cleanup}");
        }
        let _ = write!(out, "result: {}", if self.passed() { "PASSED" } else { "FAILED" });
        out
    }
}
