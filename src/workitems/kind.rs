//! The backing-entity discriminant.
//!
//! A work item mirrors exactly one backing table, identified by
//! `entity_type` alone. `work_type` and `source` stay descriptive columns
//! for filtering; they are never consulted to find the backing row.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    Task,
    ContractAction,
    AttendanceRequest,
    Contract,
}

impl BackingKind {
    pub fn entity_type(&self) -> &'static str {
        match self {
            BackingKind::Task => "task",
            BackingKind::ContractAction => "contract_action",
            BackingKind::AttendanceRequest => "attendance_request",
            BackingKind::Contract => "contract",
        }
    }

    pub fn from_entity_type(value: &str) -> Option<BackingKind> {
        match value {
            "task" => Some(BackingKind::Task),
            "contract_action" => Some(BackingKind::ContractAction),
            "attendance_request" => Some(BackingKind::AttendanceRequest),
            "contract" => Some(BackingKind::Contract),
            _ => None,
        }
    }

    /// Whether the generic inbox completion endpoint may close this kind.
    /// Attendance requests and contracts only move through their dedicated
    /// review flows.
    pub fn completable_via_inbox(&self) -> bool {
        matches!(self, BackingKind::Task | BackingKind::ContractAction)
    }
}

impl std::fmt::Display for BackingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.entity_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            BackingKind::Task,
            BackingKind::ContractAction,
            BackingKind::AttendanceRequest,
            BackingKind::Contract,
        ] {
            assert_eq!(BackingKind::from_entity_type(kind.entity_type()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_entity_type() {
        assert_eq!(BackingKind::from_entity_type("booking"), None);
        assert_eq!(BackingKind::from_entity_type(""), None);
    }

    #[test]
    fn test_inbox_completable_kinds() {
        assert!(BackingKind::Task.completable_via_inbox());
        assert!(BackingKind::ContractAction.completable_via_inbox());
        assert!(!BackingKind::AttendanceRequest.completable_via_inbox());
        assert!(!BackingKind::Contract.completable_via_inbox());
    }
}
