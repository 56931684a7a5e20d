//! Approval assignee resolution.

use uuid::Uuid;

use super::state::WorkflowState;

/// Picks who should act next for an approval in the given state.
///
/// Pure in its inputs: callers load the requester's line manager and the
/// company's HR fallback (its longest-standing active admin) and pass them
/// in, so routing is testable without a database and, once persisted on the
/// instance, immune to later org-chart edits.
pub fn resolve_approval_assignee(
    state: WorkflowState,
    line_manager: Option<Uuid>,
    hr_fallback: Option<Uuid>,
) -> Option<Uuid> {
    match state {
        WorkflowState::PendingManager => line_manager.or(hr_fallback),
        WorkflowState::Approved | WorkflowState::Rejected => None,
    }
}
