//! Checkout flow states and their legal transitions
//!
//! ```text
//! ScalingDown -> WaitingHealthy -> Triggering -> Capturing -> Validating -> ScalingUp -> Done
//!      \               \               \             \            \           ^
//!       +---------------+---------------+-------------+------------+-> Failed +
//! ```
//!
//! `Failed` is absorbing for the outcome: its only exit is the cleanup step,
//! and a run that entered it reports failure whatever cleanup does.

use std::fmt;

use crate::error::FlowError;

/// Phase of a checkout verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    ScalingDown,
    WaitingHealthy,
    Triggering,
    Capturing,
    Validating,
    ScalingUp,
    Done,
    Failed,
}

impl FlowState {
    /// Every state, in flow order
    pub const ALL: [FlowState; 8] = [
        FlowState::ScalingDown,
        FlowState::WaitingHealthy,
        FlowState::Triggering,
        FlowState::Capturing,
        FlowState::Validating,
        FlowState::ScalingUp,
        FlowState::Done,
        FlowState::Failed,
    ];

    /// Whether the run is over
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScalingDown => "scaling-down",
            Self::WaitingHealthy => "waiting-healthy",
            Self::Triggering => "triggering",
            Self::Capturing => "capturing",
            Self::Validating => "validating",
            Self::ScalingUp => "scaling-up",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: FlowState) -> Vec<FlowState> {
    use FlowState::{Capturing, Done, Failed, ScalingDown, ScalingUp, Triggering, Validating, WaitingHealthy};
    match from {
        ScalingDown => vec![WaitingHealthy, Failed],
        WaitingHealthy => vec![Triggering, Failed],
        Triggering => vec![Capturing, Failed],
        Capturing => vec![Validating, Failed],
        Validating => vec![ScalingUp, Failed],
        Failed => vec![ScalingUp],
        ScalingUp => vec![Done],
        Done => vec![],
    }
}

/// Check a single transition
///
/// # Errors
/// `FlowError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: FlowState, to: FlowState) -> Result<(), FlowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(FlowError::IllegalTransition { from, to })
    }
}

/// Current state plus every state entered so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrail {
    current: FlowState,
    visited: Vec<FlowState>,
}

impl StateTrail {
    /// Trail starting at `ScalingDown`
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: FlowState::ScalingDown,
            visited: vec![FlowState::ScalingDown],
        }
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> FlowState {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn visited(&self) -> &[FlowState] {
        &self.visited
    }

    /// Whether `Failed` was ever entered
    #[must_use]
    pub fn entered_failed(&self) -> bool {
        self.visited.contains(&FlowState::Failed)
    }

    /// Move to `to`
    ///
    /// # Errors
    /// `FlowError::IllegalTransition`; the trail is unchanged in that case.
    pub fn advance(&mut self, to: FlowState) -> Result<(), FlowError> {
        validate_transition(self.current, to)?;
        tracing::info!("Flow: {} -> {}", self.current, to);
        self.current = to;
        self.visited.push(to);
        Ok(())
    }
}

impl Default for StateTrail {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_working_state_can_fail() {
        for state in FlowState::ALL {
            let can_fail = allowed_transitions(state).contains(&FlowState::Failed);
            let working = !matches!(state, FlowState::ScalingUp | FlowState::Done | FlowState::Failed);
            assert_eq!(can_fail, working, "{state}");
        }
    }

    #[test]
    fn failed_only_leads_to_cleanup() {
        assert_eq!(allowed_transitions(FlowState::Failed), [FlowState::ScalingUp]);
        assert!(validate_transition(FlowState::Failed, FlowState::Done).is_err());
    }

    #[test]
    fn illegal_advance_leaves_trail_alone() {
        let mut trail = StateTrail::new();
        assert!(trail.advance(FlowState::Capturing).is_err());
        assert_eq!(trail.current(), FlowState::ScalingDown);
        assert_eq!(trail.visited(), [FlowState::ScalingDown]);
    }
}
