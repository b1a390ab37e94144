use odc_verify::flow::{allowed_transitions, validate_transition, FlowState, StateTrail};
use proptest::prelude::*;

#[test]
fn test_happy_path_transitions() {
    assert!(validate_transition(FlowState::ScalingDown, FlowState::WaitingHealthy).is_ok());
    assert!(validate_transition(FlowState::WaitingHealthy, FlowState::Triggering).is_ok());
    assert!(validate_transition(FlowState::Triggering, FlowState::Capturing).is_ok());
    assert!(validate_transition(FlowState::Capturing, FlowState::Validating).is_ok());
    assert!(validate_transition(FlowState::Validating, FlowState::ScalingUp).is_ok());
    assert!(validate_transition(FlowState::ScalingUp, FlowState::Done).is_ok());

    // No skipping ahead
    assert!(validate_transition(FlowState::ScalingDown, FlowState::Triggering).is_err());
    assert!(validate_transition(FlowState::Triggering, FlowState::Validating).is_err());
}

#[test]
fn test_failed_transitions() {
    assert!(validate_transition(FlowState::Failed, FlowState::ScalingUp).is_ok());

    assert!(validate_transition(FlowState::Failed, FlowState::Done).is_err());
    assert!(validate_transition(FlowState::Failed, FlowState::Triggering).is_err());
    assert!(validate_transition(FlowState::ScalingUp, FlowState::Failed).is_err());
}

#[test]
fn test_done_is_terminal() {
    assert!(allowed_transitions(FlowState::Done).is_empty());
    assert!(FlowState::Done.is_terminal());
    assert!(!FlowState::Failed.is_terminal());
}

fn any_state() -> impl Strategy<Value = FlowState> {
    prop_oneof![
        Just(FlowState::ScalingDown),
        Just(FlowState::WaitingHealthy),
        Just(FlowState::Triggering),
        Just(FlowState::Capturing),
        Just(FlowState::Validating),
        Just(FlowState::ScalingUp),
        Just(FlowState::Done),
        Just(FlowState::Failed),
    ]
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            assert!(allowed.contains(&to));
        } else {
            assert!(!allowed.contains(&to));
        }
    }

    /// Whatever a run attempts, a legal walk always reaches cleanup and then Done
    #[test]
    fn prop_every_walk_ends_in_cleanup(steps in prop::collection::vec(any_state(), 0..20)) {
        let mut trail = StateTrail::new();
        for step in steps {
            if trail.current() == FlowState::ScalingUp || trail.current() == FlowState::Done {
                break;
            }
            let _ = trail.advance(step);
        }

        if trail.current() != FlowState::ScalingUp && trail.current() != FlowState::Done {
            if trail.advance(FlowState::ScalingUp).is_err() {
                trail.advance(FlowState::Failed).unwrap();
                trail.advance(FlowState::ScalingUp).unwrap();
            }
        }
        if trail.current() == FlowState::ScalingUp {
            trail.advance(FlowState::Done).unwrap();
        }

        prop_assert_eq!(trail.current(), FlowState::Done);
        prop_assert!(trail.visited().contains(&FlowState::ScalingUp));
    }
}
