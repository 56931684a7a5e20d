//! Workflow instance persistence.

use diesel::prelude::*;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::WorkflowInstance;
use crate::rbac::Role;
use crate::schema::{attendance_requests, profiles, user_roles, workflow_instances};
use crate::workitems::BackingKind;

use super::assignee::resolve_approval_assignee;
use super::state::{TransitionError, WorkflowState, WorkflowTransition};

#[derive(Debug)]
pub enum WorkflowError {
    NotFound,
    InvalidTransition(TransitionError),
    CorruptState(String),
    Db(diesel::result::Error),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::NotFound => write!(f, "workflow instance not found"),
            WorkflowError::InvalidTransition(e) => write!(f, "{}", e),
            WorkflowError::CorruptState(s) => write!(f, "unrecognized workflow state '{}'", s),
            WorkflowError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<diesel::result::Error> for WorkflowError {
    fn from(e: diesel::result::Error) -> Self {
        WorkflowError::Db(e)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowService;

impl WorkflowService {
    /// Starts the approval workflow for an attendance request.
    ///
    /// Idempotent: a second start for the same entity leaves the existing
    /// instance untouched (including its persisted assignee) and returns
    /// it. The initial assignee is resolved once, here, and persisted so
    /// later org-chart changes cannot retroactively reroute the approval.
    #[instrument(skip(conn))]
    pub fn start_attendance_request(
        conn: &mut PgConnection,
        company_id: Uuid,
        request_id: Uuid,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let requester: Option<Uuid> = attendance_requests::table
            .filter(attendance_requests::id.eq(request_id))
            .filter(attendance_requests::company_id.eq(company_id))
            .select(attendance_requests::profile_id)
            .first(conn)
            .optional()?;

        let Some(requester_id) = requester else {
            return Err(WorkflowError::NotFound);
        };

        let line_manager: Option<Uuid> = profiles::table
            .filter(profiles::id.eq(requester_id))
            .select(profiles::manager_id)
            .first::<Option<Uuid>>(conn)
            .optional()?
            .flatten();

        let hr_fallback = Self::hr_fallback(conn, company_id)?;
        let initial = WorkflowState::initial();
        let assigned_to = resolve_approval_assignee(initial, line_manager, hr_fallback);

        let inserted = diesel::insert_into(workflow_instances::table)
            .values((
                workflow_instances::company_id.eq(company_id),
                workflow_instances::entity_type
                    .eq(BackingKind::AttendanceRequest.entity_type()),
                workflow_instances::entity_id.eq(request_id),
                workflow_instances::current_state.eq(initial.as_str()),
                workflow_instances::assigned_to.eq(assigned_to),
            ))
            .on_conflict((
                workflow_instances::company_id,
                workflow_instances::entity_type,
                workflow_instances::entity_id,
            ))
            .do_nothing()
            .execute(conn)?;

        if inserted > 0 {
            debug!(request_id = %request_id, assigned_to = ?assigned_to, "Workflow instance started");
        }

        Self::get_instance(conn, company_id, BackingKind::AttendanceRequest, request_id)?
            .ok_or(WorkflowError::NotFound)
    }

    /// Read-only fetch; absence is `None`, not an error.
    pub fn get_instance(
        conn: &mut PgConnection,
        company_id: Uuid,
        kind: BackingKind,
        entity_id: Uuid,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        let instance = workflow_instances::table
            .filter(workflow_instances::company_id.eq(company_id))
            .filter(workflow_instances::entity_type.eq(kind.entity_type()))
            .filter(workflow_instances::entity_id.eq(entity_id))
            .select(WorkflowInstance::as_select())
            .first(conn)
            .optional()?;

        Ok(instance)
    }

    /// Applies a named transition to the instance for an entity. Terminal
    /// instances reject the attempt and keep their state.
    #[instrument(skip(conn))]
    pub fn transition(
        conn: &mut PgConnection,
        company_id: Uuid,
        kind: BackingKind,
        entity_id: Uuid,
        transition: WorkflowTransition,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let Some(instance) = Self::get_instance(conn, company_id, kind, entity_id)? else {
            return Err(WorkflowError::NotFound);
        };

        let current = WorkflowState::parse(&instance.current_state)
            .ok_or_else(|| WorkflowError::CorruptState(instance.current_state.clone()))?;

        let next = current
            .apply(transition)
            .map_err(WorkflowError::InvalidTransition)?;

        let updated = diesel::update(workflow_instances::table.find(instance.id))
            .set((
                workflow_instances::current_state.eq(next.as_str()),
                workflow_instances::updated_at.eq(diesel::dsl::now),
            ))
            .returning(WorkflowInstance::as_returning())
            .get_result(conn)?;

        debug!(
            entity_id = %entity_id,
            from = %current,
            to = %next,
            "Workflow transitioned"
        );
        Ok(updated)
    }

    /// The company's longest-standing active admin, used when a requester
    /// has no line manager.
    fn hr_fallback(
        conn: &mut PgConnection,
        company_id: Uuid,
    ) -> Result<Option<Uuid>, WorkflowError> {
        let admin: Option<Uuid> = user_roles::table
            .filter(user_roles::company_id.eq(company_id))
            .filter(user_roles::role.eq(Role::Admin.as_str()))
            .filter(user_roles::is_active.eq(true))
            .order(user_roles::created_at.asc())
            .select(user_roles::profile_id)
            .first(conn)
            .optional()?;

        Ok(admin)
    }
}
