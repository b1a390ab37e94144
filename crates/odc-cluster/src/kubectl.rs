//! Orchestrator command boundary
//!
//! `Orchestrator` hands back raw command output; interpreting it (counts,
//! fallbacks) is the controller's job so fakes only need to script text.

use tokio::process::Command;

use crate::error::ClusterError;

/// Raw access to deployment state
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync {
    /// Desired replica count of a deployment, as printed
    async fn desired_replicas(&self, deployment: &str) -> Result<String, ClusterError>;

    /// Set the desired replica count; does not wait for pods
    async fn scale(&self, deployment: &str, replicas: u32) -> Result<(), ClusterError>;

    /// Pod listing for a label selector, one pod per line
    async fn pod_listing(&self, selector: &str) -> Result<String, ClusterError>;

    /// Ready replica count of a deployment, as printed (may be empty)
    async fn ready_replicas(&self, deployment: &str) -> Result<String, ClusterError>;
}

/// `kubectl` subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kubectl {
    binary: String,
    namespace: String,
    context: Option<String>,
}

impl Kubectl {
    /// `kubectl` from `PATH` against `namespace`
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            binary: "kubectl".to_string(),
            namespace: namespace.into(),
            context: None,
        }
    }

    /// Use another binary (wrapper scripts, absolute paths)
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pin a kubeconfig context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full argument list for a subcommand
    #[must_use]
    pub fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = args.iter().map(ToString::to_string).collect();
        full.push("-n".to_string());
        full.push(self.namespace.clone());
        if let Some(context) = &self.context {
            full.push("--context".to_string());
            full.push(context.clone());
        }
        full
    }

    async fn run(&self, args: &[&str]) -> Result<String, ClusterError> {
        let args = self.command_args(args);
        let command = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ClusterError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClusterError::command_failed(
                command,
                output.status.code(),
                &output.stderr,
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl Orchestrator for Kubectl {
    async fn desired_replicas(&self, deployment: &str) -> Result<String, ClusterError> {
        self.run(&["get", "deployment", deployment, "-o", "jsonpath={.spec.replicas}"])
            .await
    }

    async fn scale(&self, deployment: &str, replicas: u32) -> Result<(), ClusterError> {
        let replicas = format!("--replicas={replicas}");
        self.run(&["scale", "deployment", deployment, &replicas])
            .await
            .map(drop)
    }

    async fn pod_listing(&self, selector: &str) -> Result<String, ClusterError> {
        self.run(&["get", "pods", "-l", selector, "--no-headers"]).await
    }

    async fn ready_replicas(&self, deployment: &str) -> Result<String, ClusterError> {
        self.run(&["get", "deployment", deployment, "-o", "jsonpath={.status.readyReplicas}"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_follows_subcommand() {
        let kubectl = Kubectl::new("otel-demo");
        assert_eq!(
            kubectl.command_args(&["scale", "deployment", "accounting", "--replicas=0"]),
            ["scale", "deployment", "accounting", "--replicas=0", "-n", "otel-demo"]
        );
    }

    #[test]
    fn context_is_appended() {
        let kubectl = Kubectl::new("demo").with_context("kind-demo");
        let args = kubectl.command_args(&["get", "pods"]);
        assert_eq!(args[args.len() - 2..], ["--context", "kind-demo"]);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let kubectl = Kubectl::new("demo").with_binary("/nonexistent/kubectl-odc");
        let err = kubectl.desired_replicas("accounting").await.unwrap_err();
        assert!(matches!(err, ClusterError::Spawn { .. }));
        assert!(!err.is_retryable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_command_failure() {
        let kubectl = Kubectl::new("demo").with_binary("false");
        let err = kubectl.scale("accounting", 1).await.unwrap_err();
        assert!(matches!(err, ClusterError::CommandFailed { status: Some(1), .. }));
    }
}
