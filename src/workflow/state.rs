//! Workflow states and transitions.

use serde::{Deserialize, Serialize};

/// Approval states for an attendance request. Every instance starts in
/// `pending_manager`; `approved` and `rejected` accept no further
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    PendingManager,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowTransition {
    Approve,
    Reject,
}

/// A transition attempted from a state that does not accept it. Reported
/// as a failure, never swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: WorkflowState,
    pub transition: WorkflowTransition,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot {} from state '{}'",
            self.transition.as_str(),
            self.from.as_str()
        )
    }
}

impl std::error::Error for TransitionError {}

impl WorkflowState {
    pub fn initial() -> WorkflowState {
        WorkflowState::PendingManager
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::PendingManager => "pending_manager",
            WorkflowState::Approved => "approved",
            WorkflowState::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<WorkflowState> {
        match value {
            "pending_manager" => Some(WorkflowState::PendingManager),
            "approved" => Some(WorkflowState::Approved),
            "rejected" => Some(WorkflowState::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Approved | WorkflowState::Rejected)
    }

    pub fn apply(self, transition: WorkflowTransition) -> Result<WorkflowState, TransitionError> {
        match (self, transition) {
            (WorkflowState::PendingManager, WorkflowTransition::Approve) => {
                Ok(WorkflowState::Approved)
            }
            (WorkflowState::PendingManager, WorkflowTransition::Reject) => {
                Ok(WorkflowState::Rejected)
            }
            (from, transition) => Err(TransitionError { from, transition }),
        }
    }
}

impl WorkflowTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowTransition::Approve => "approve",
            WorkflowTransition::Reject => "reject",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for state in [
            WorkflowState::PendingManager,
            WorkflowState::Approved,
            WorkflowState::Rejected,
        ] {
            assert_eq!(WorkflowState::parse(state.as_str()), Some(state));
        }
        assert_eq!(WorkflowState::parse("pending_hr"), None);
    }

    #[test]
    fn test_initial_state_is_pending_manager() {
        assert_eq!(WorkflowState::initial(), WorkflowState::PendingManager);
        assert!(!WorkflowState::initial().is_terminal());
    }

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            WorkflowState::PendingManager.apply(WorkflowTransition::Approve),
            Ok(WorkflowState::Approved)
        );
        assert_eq!(
            WorkflowState::PendingManager.apply(WorkflowTransition::Reject),
            Ok(WorkflowState::Rejected)
        );
    }

    #[test]
    fn test_terminal_states_refuse_transitions() {
        for state in [WorkflowState::Approved, WorkflowState::Rejected] {
            for transition in [WorkflowTransition::Approve, WorkflowTransition::Reject] {
                let err = state.apply(transition).unwrap_err();
                assert_eq!(err.from, state);
                assert_eq!(err.transition, transition);
            }
        }
    }
}
