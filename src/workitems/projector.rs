//! Work-item projection writes.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::WorkItem;
use crate::schema::work_items;

use super::{BackingKind, WorkItemStatus};

/// Everything needed to project one backing entity into the inbox.
#[derive(Debug, Clone)]
pub struct WorkItemUpsert {
    pub company_id: Uuid,
    pub kind: BackingKind,
    pub entity_id: Uuid,
    pub work_type: String,
    pub source: String,
    pub status: WorkItemStatus,
    pub title: String,
    pub due_at: Option<NaiveDateTime>,
    pub sla_due_at: Option<NaiveDateTime>,
    pub priority: Option<i32>,
    pub assignee_id: Option<Uuid>,
}

/// Inserts or updates the mirror row for (company, entity_type, entity_id).
///
/// The conflict target is the unique index on that triple, so calling this
/// twice for the same entity always converges on one row carrying the
/// latest call's values.
#[instrument(skip(conn, input), fields(entity_type = %input.kind, entity_id = %input.entity_id))]
pub fn upsert_work_item(
    conn: &mut PgConnection,
    input: &WorkItemUpsert,
) -> QueryResult<WorkItem> {
    let item = diesel::insert_into(work_items::table)
        .values((
            work_items::company_id.eq(input.company_id),
            work_items::entity_type.eq(input.kind.entity_type()),
            work_items::entity_id.eq(input.entity_id),
            work_items::work_type.eq(&input.work_type),
            work_items::source.eq(&input.source),
            work_items::status.eq(input.status.as_str()),
            work_items::title.eq(&input.title),
            work_items::due_at.eq(input.due_at),
            work_items::sla_due_at.eq(input.sla_due_at),
            work_items::priority.eq(input.priority),
            work_items::assignee_id.eq(input.assignee_id),
        ))
        .on_conflict((
            work_items::company_id,
            work_items::entity_type,
            work_items::entity_id,
        ))
        .do_update()
        .set((
            work_items::work_type.eq(&input.work_type),
            work_items::source.eq(&input.source),
            work_items::status.eq(input.status.as_str()),
            work_items::title.eq(&input.title),
            work_items::due_at.eq(input.due_at),
            work_items::sla_due_at.eq(input.sla_due_at),
            work_items::priority.eq(input.priority),
            work_items::assignee_id.eq(input.assignee_id),
            work_items::updated_at.eq(diesel::dsl::now),
        ))
        .returning(WorkItem::as_returning())
        .get_result(conn)?;

    debug!(work_item_id = %item.id, status = %item.status, "Work item projected");
    Ok(item)
}

/// Moves the mirror row for a backing entity to a new status without
/// touching the rest of the projection.
#[instrument(skip(conn))]
pub fn set_work_item_status(
    conn: &mut PgConnection,
    company_id: Uuid,
    kind: BackingKind,
    entity_id: Uuid,
    status: WorkItemStatus,
) -> QueryResult<usize> {
    diesel::update(
        work_items::table
            .filter(work_items::company_id.eq(company_id))
            .filter(work_items::entity_type.eq(kind.entity_type()))
            .filter(work_items::entity_id.eq(entity_id)),
    )
    .set((
        work_items::status.eq(status.as_str()),
        work_items::updated_at.eq(diesel::dsl::now),
    ))
    .execute(conn)
}

/// Points the mirror row at the profile expected to act next.
#[instrument(skip(conn))]
pub fn set_work_item_assignee(
    conn: &mut PgConnection,
    company_id: Uuid,
    kind: BackingKind,
    entity_id: Uuid,
    assignee_id: Option<Uuid>,
) -> QueryResult<usize> {
    diesel::update(
        work_items::table
            .filter(work_items::company_id.eq(company_id))
            .filter(work_items::entity_type.eq(kind.entity_type()))
            .filter(work_items::entity_id.eq(entity_id)),
    )
    .set((
        work_items::assignee_id.eq(assignee_id),
        work_items::updated_at.eq(diesel::dsl::now),
    ))
    .execute(conn)
}
