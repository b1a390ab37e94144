//! Reading, scaling and waiting on a deployment's replicas

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ClusterError;
use crate::kubectl::Orchestrator;

/// Replica count assumed when the desired count cannot be read
pub const FALLBACK_REPLICAS: u32 = 1;

/// A deployment and the label selector of its pods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRef {
    pub name: String,
    pub selector: String,
}

impl DeploymentRef {
    /// Deployment whose pods carry `app=<name>`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let selector = format!("app={name}");
        Self { name, selector }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

impl fmt::Display for DeploymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Recorded and current replica counts of one deployment
///
/// `original_count` is read once and never changes; `current_count` follows
/// every successful scale command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaState {
    deployment: DeploymentRef,
    original_count: u32,
    current_count: u32,
}

impl ReplicaState {
    #[must_use]
    pub fn new(deployment: DeploymentRef, original_count: u32) -> Self {
        Self {
            deployment,
            original_count,
            current_count: original_count,
        }
    }

    #[inline]
    #[must_use]
    pub fn deployment(&self) -> &DeploymentRef {
        &self.deployment
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.deployment.name
    }

    #[inline]
    #[must_use]
    pub fn original_count(&self) -> u32 {
        self.original_count
    }

    #[inline]
    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Whether the deployment is back at its recorded count
    #[inline]
    #[must_use]
    pub fn is_restored(&self) -> bool {
        self.current_count == self.original_count
    }
}

/// How long to keep observing while waiting
///
/// `max_attempts: None` waits until the condition holds, however long that
/// takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Keep polling until the condition holds
    #[must_use]
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` observations
    #[must_use]
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(2))
    }
}

/// Parse a count printed by the orchestrator
///
/// Surrounding whitespace and quotes are ignored.
///
/// # Errors
/// `ClusterError::Parse` if what remains is not a non-negative integer.
pub fn parse_count(output: &str) -> Result<u32, ClusterError> {
    output
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .parse()
        .map_err(|_| ClusterError::Parse {
            output: output.to_string(),
        })
}

/// Number of pods in a `--no-headers` listing
#[must_use]
pub fn count_pods(listing: &str) -> u32 {
    let pods = listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("No resources found"))
        .count();
    u32::try_from(pods).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy)]
enum Target {
    ScaledDown,
    Ready(u32),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaledDown => f.write_str("scaled down"),
            Self::Ready(n) => write!(f, "ready with {n} replicas"),
        }
    }
}

/// Replica operations on top of an `Orchestrator`
#[derive(Clone)]
pub struct ReplicaController {
    orchestrator: Arc<dyn Orchestrator>,
    policy: PollPolicy,
}

impl ReplicaController {
    #[must_use]
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            orchestrator,
            policy: PollPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Desired replica count of `deployment`
    ///
    /// Never fails: a query or parse failure is logged and reads as
    /// [`FALLBACK_REPLICAS`]. A count of zero is returned as is.
    pub async fn read_replica_count(&self, deployment: &DeploymentRef) -> u32 {
        let count = match self.orchestrator.desired_replicas(&deployment.name).await {
            Ok(output) => parse_count(&output),
            Err(e) => Err(e),
        };
        match count {
            Ok(count) => {
                tracing::info!("Deployment {} has {} desired replicas", deployment, count);
                count
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read replicas of {}, assuming {}: {}",
                    deployment,
                    FALLBACK_REPLICAS,
                    e
                );
                FALLBACK_REPLICAS
            }
        }
    }

    /// Read the current count and record it as the one to restore
    pub async fn record(&self, deployment: DeploymentRef) -> ReplicaState {
        let count = self.read_replica_count(&deployment).await;
        ReplicaState::new(deployment, count)
    }

    /// Issue the scale command; pods are not waited for
    ///
    /// # Errors
    /// The command failure. `state` is left unchanged in that case.
    pub async fn scale_to(&self, state: &mut ReplicaState, count: u32) -> Result<(), ClusterError> {
        tracing::info!(
            "Scaling {} from {} to {} replicas",
            state.deployment,
            state.current_count,
            count
        );
        self.orchestrator.scale(&state.deployment.name, count).await?;
        state.current_count = count;
        Ok(())
    }

    /// Scale back to the recorded count and wait for readiness
    ///
    /// # Errors
    /// The scale command failure, or `PollExhausted` under a bounded policy.
    pub async fn restore(&self, state: &mut ReplicaState) -> Result<(), ClusterError> {
        let original = state.original_count;
        self.scale_to(state, original).await?;
        self.wait_until_ready(&state.deployment, original).await
    }

    /// Wait until no pod matches the deployment's selector
    ///
    /// A failed listing counts as one remaining pod.
    ///
    /// # Errors
    /// `ClusterError::PollExhausted` under a bounded policy.
    pub async fn wait_until_scaled_down(&self, deployment: &DeploymentRef) -> Result<(), ClusterError> {
        self.wait_for(deployment, Target::ScaledDown).await
    }

    /// Wait until at least `expected` replicas report ready
    ///
    /// A failed or unparsable query counts as zero ready.
    ///
    /// # Errors
    /// `ClusterError::PollExhausted` under a bounded policy.
    pub async fn wait_until_ready(
        &self,
        deployment: &DeploymentRef,
        expected: u32,
    ) -> Result<(), ClusterError> {
        self.wait_for(deployment, Target::Ready(expected)).await
    }

    async fn wait_for(&self, deployment: &DeploymentRef, target: Target) -> Result<(), ClusterError> {
        tracing::info!("Waiting for {} to be {}", deployment, target);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if self.observe(deployment, target).await {
                tracing::info!("Deployment {} is {}", deployment, target);
                return Ok(());
            }
            if self.policy.exhausted(attempts) {
                return Err(ClusterError::PollExhausted {
                    deployment: deployment.name.clone(),
                    target: target.to_string(),
                    attempts,
                });
            }
            tokio::time::sleep(self.policy.interval).await;
        }
    }

    async fn observe(&self, deployment: &DeploymentRef, target: Target) -> bool {
        match target {
            Target::ScaledDown => {
                let pods = match self.orchestrator.pod_listing(&deployment.selector).await {
                    Ok(listing) => count_pods(&listing),
                    Err(e) => {
                        tracing::warn!("Pod listing for {} failed: {}", deployment.selector, e);
                        1
                    }
                };
                tracing::debug!("{} pods still running for {}", pods, deployment);
                pods == 0
            }
            Target::Ready(expected) => {
                let ready = match self.orchestrator.ready_replicas(&deployment.name).await {
                    Ok(output) => parse_count(&output).unwrap_or(0),
                    Err(e) => {
                        tracing::warn!("Ready replica query for {} failed: {}", deployment, e);
                        0
                    }
                };
                tracing::debug!("{}/{} replicas ready for {}", ready, expected, deployment);
                ready >= expected
            }
        }
    }
}

impl fmt::Debug for ReplicaController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaController")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
