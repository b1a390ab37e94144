//! Error types for replica control

/// Replica control errors
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The orchestrator binary could not be started
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully
    #[error("`{command}` exited with status {status:?}: {stderr}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Exit code, `None` when killed by a signal
        status: Option<i32>,
        /// Trimmed standard error
        stderr: String,
    },

    /// Command output was not a count
    #[error("expected a count, got {output:?}")]
    Parse {
        /// Raw output
        output: String,
    },

    /// A bounded wait ran out of observations
    #[error("deployment {deployment} did not become {target} after {attempts} checks")]
    PollExhausted {
        /// Deployment waited on
        deployment: String,
        /// What was being waited for
        target: String,
        /// Observations made
        attempts: u32,
    },
}

impl ClusterError {
    /// Build a `CommandFailed` from raw stderr bytes
    #[must_use]
    pub fn command_failed(command: impl Into<String>, status: Option<i32>, stderr: &[u8]) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Whether polling again could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Parse { .. })
    }

    /// Whether a bounded wait gave up
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::PollExhausted { .. })
    }
}
