//! The work-item inbox projection.
//!
//! `work_items` is a read-optimized mirror of heterogeneous backing
//! entities, never the source of truth. Every writer that creates or
//! transitions a backing entity is responsible for keeping the mirror in
//! sync through [`projector::upsert_work_item`].

pub mod kind;
pub mod projector;

pub use kind::BackingKind;
pub use projector::{
    set_work_item_assignee, set_work_item_status, upsert_work_item, WorkItemUpsert,
};

/// Work type given to approval-style items. The generic completion
/// endpoint refuses these; approvals move through their dedicated
/// approve/reject endpoints.
pub const WORK_TYPE_APPROVAL: &str = "approval";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemStatus {
    Open,
    Pending,
    Done,
    Cancelled,
}

impl WorkItemStatus {
    /// Statuses still requiring attention; the default scope of an
    /// overdue-filtered inbox query.
    pub const ACTIVE: [WorkItemStatus; 2] = [WorkItemStatus::Open, WorkItemStatus::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::Open => "open",
            WorkItemStatus::Pending => "pending",
            WorkItemStatus::Done => "done",
            WorkItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<WorkItemStatus> {
        match value {
            "open" => Some(WorkItemStatus::Open),
            "pending" => Some(WorkItemStatus::Pending),
            "done" => Some(WorkItemStatus::Done),
            "cancelled" => Some(WorkItemStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkItemStatus::Done | WorkItemStatus::Cancelled)
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
