//! Inbox handlers.
//!
//! The inbox is a read model over `work_items`. Listing filters and orders
//! in SQL except for the me/unassigned assignee filter, which is applied in
//! the application layer on the page-bounded result set. Completion writes
//! backing entity first, audit second, mirror last, and fails closed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    audit::AuditService,
    error::{get_db_conn, ApiError, ApiResult},
    middleware::rbac::RoleContext,
    models::WorkItem,
    schema::{contract_actions, tasks, work_items},
    workitems::{BackingKind, WorkItemStatus, WORK_TYPE_APPROVAL},
    AppState,
};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InboxQuery {
    /// Comma-separated status filter, e.g. `open,pending`.
    pub status: Option<String>,
    /// `me`, `unassigned` or `all` (default).
    pub assignee: Option<String>,
    pub work_type: Option<String>,
    pub source: Option<String>,
    /// Restrict to items past their due date. Without an explicit status
    /// filter this also narrows to open and pending items.
    pub overdue: Option<bool>,
    #[param(minimum = 1, maximum = 100, default = 50)]
    pub limit: Option<i64>,
    #[param(minimum = 0, default = 0)]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    Me,
    Unassigned,
    All,
}

#[derive(Debug)]
pub struct InboxFilters {
    pub statuses: Option<Vec<WorkItemStatus>>,
    pub assignee: AssigneeFilter,
    pub work_type: Option<String>,
    pub source: Option<String>,
    pub overdue: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Normalizes raw query parameters into validated filters.
fn resolve_filters(query: InboxQuery) -> Result<InboxFilters, (StatusCode, Json<ApiError>)> {
    let statuses = match query.status.as_deref() {
        None | Some("") => None,
        Some(csv) => {
            let mut parsed = Vec::new();
            for token in csv.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                match WorkItemStatus::parse(token) {
                    Some(status) => parsed.push(status),
                    None => {
                        return Err(ApiError::bad_request(
                            format!("Unknown status '{}'", token),
                            "INVALID_STATUS",
                        ))
                    }
                }
            }
            if parsed.is_empty() {
                None
            } else {
                Some(parsed)
            }
        }
    };

    let assignee = match query.assignee.as_deref() {
        None | Some("all") => AssigneeFilter::All,
        Some("me") => AssigneeFilter::Me,
        Some("unassigned") => AssigneeFilter::Unassigned,
        Some(other) => {
            return Err(ApiError::bad_request(
                format!("Unknown assignee filter '{}'", other),
                "INVALID_ASSIGNEE_FILTER",
            ))
        }
    };

    let overdue = query.overdue.unwrap_or(false);

    // Overdue defaults the status scope to items still needing attention,
    // unless the caller asked for something explicit.
    let statuses = match (&statuses, overdue) {
        (None, true) => Some(WorkItemStatus::ACTIVE.to_vec()),
        _ => statuses,
    };

    Ok(InboxFilters {
        statuses,
        assignee,
        work_type: query.work_type.filter(|s| !s.is_empty()),
        source: query.source.filter(|s| !s.is_empty()),
        overdue,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset: query.offset.unwrap_or(0).max(0),
    })
}

type BoxedItems<'a> = work_items::BoxedQuery<'a, diesel::pg::Pg>;

fn apply_filters<'a>(
    mut query: BoxedItems<'a>,
    filters: &'a InboxFilters,
    now: NaiveDateTime,
) -> BoxedItems<'a> {
    if let Some(statuses) = &filters.statuses {
        let names: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();
        query = query.filter(work_items::status.eq_any(names));
    }
    if let Some(work_type) = &filters.work_type {
        query = query.filter(work_items::work_type.eq(work_type.as_str()));
    }
    if let Some(source) = &filters.source {
        query = query.filter(work_items::source.eq(source.as_str()));
    }
    if filters.overdue {
        query = query.filter(work_items::due_at.lt(now));
    }
    query
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InboxListResponse {
    pub success: bool,
    pub items: Vec<WorkItem>,
    /// Count the caller can trust after assignee filtering.
    pub total: i64,
    /// SQL count over the base filters, before assignee filtering.
    pub total_estimate: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteResponse {
    pub success: bool,
    #[schema(example = "Work item completed")]
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/inbox",
    tag = "Inbox",
    params(InboxQuery),
    responses(
        (status = 200, description = "Work items requiring attention", body = InboxListResponse),
        (status = 400, description = "Invalid filter or no active company", body = ApiError),
        (status = 403, description = "No membership in the company", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_inbox(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<InboxListResponse>> {
    let filters = resolve_filters(query)?;
    let now = chrono::Utc::now().naive_utc();
    let mut conn = get_db_conn(&state.db_pool)?;

    let total_estimate: i64 = apply_filters(
        work_items::table
            .filter(work_items::company_id.eq(ctx.company_id))
            .into_boxed(),
        &filters,
        now,
    )
    .count()
    .get_result(&mut conn)
    .map_err(|_| ApiError::db_error())?;

    let rows: Vec<WorkItem> = apply_filters(
        work_items::table
            .filter(work_items::company_id.eq(ctx.company_id))
            .into_boxed(),
        &filters,
        now,
    )
    .order((
        work_items::priority.asc().nulls_last(),
        work_items::sla_due_at.asc().nulls_last(),
        work_items::due_at.asc().nulls_last(),
        work_items::created_at.desc(),
    ))
    .limit(filters.limit)
    .offset(filters.offset)
    .load(&mut conn)
    .map_err(|_| ApiError::db_error())?;

    // me/unassigned narrowing happens here rather than in SQL. The result
    // set is page-bounded, so the cost is acceptable; `total` reflects what
    // survived the narrowing.
    let items: Vec<WorkItem> = match filters.assignee {
        AssigneeFilter::All => rows,
        AssigneeFilter::Me => rows
            .into_iter()
            .filter(|item| item.assignee_id == Some(ctx.profile_id))
            .collect(),
        AssigneeFilter::Unassigned => rows
            .into_iter()
            .filter(|item| item.assignee_id.is_none())
            .collect(),
    };

    let total = match filters.assignee {
        AssigneeFilter::All => total_estimate,
        _ => items.len() as i64,
    };

    Ok(Json(InboxListResponse {
        success: true,
        items,
        total,
        total_estimate,
        limit: filters.limit,
        offset: filters.offset,
    }))
}

#[utoipa::path(
    patch,
    path = "/inbox/{id}/complete",
    tag = "Inbox",
    params(("id" = Uuid, Path, description = "Work item ID")),
    responses(
        (status = 200, description = "Work item completed", body = CompleteResponse),
        (status = 403, description = "Caller may not complete work items", body = ApiError),
        (status = 404, description = "Work item not found", body = ApiError),
        (status = 409, description = "Not completable (approval, terminal, or missing backing entity)", body = ApiError),
        (status = 500, description = "Backing entity update failed", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_work_item(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<CompleteResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let item: WorkItem = work_items::table
        .filter(work_items::id.eq(item_id))
        .filter(work_items::company_id.eq(ctx.company_id))
        .select(WorkItem::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?
        .ok_or_else(|| ApiError::not_found("Work item not found", "WORK_ITEM_NOT_FOUND"))?;

    if let Some(status) = WorkItemStatus::parse(&item.status) {
        if status.is_terminal() {
            return Err(ApiError::conflict(
                format!("Work item is already {}", item.status),
                "ALREADY_COMPLETED",
            ));
        }
    }

    if item.work_type == WORK_TYPE_APPROVAL {
        return Err(ApiError::conflict(
            "Approvals cannot be completed here; use their approve/reject endpoints",
            "APPROVAL_NOT_COMPLETABLE",
        ));
    }

    let kind = BackingKind::from_entity_type(&item.entity_type)
        .filter(BackingKind::completable_via_inbox)
        .ok_or_else(|| {
            ApiError::conflict(
                "Work item has no completable backing entity",
                "NO_BACKING_ENTITY",
            )
        })?;

    // Backing entity first. If this fails the work item stays untouched so
    // the mirror can never report done for an unfinished entity.
    let updated = match kind {
        BackingKind::Task => diesel::update(
            tasks::table
                .filter(tasks::id.eq(item.entity_id))
                .filter(tasks::company_id.eq(ctx.company_id)),
        )
        .set((
            tasks::status.eq("done"),
            tasks::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn),
        BackingKind::ContractAction => diesel::update(
            contract_actions::table
                .filter(contract_actions::id.eq(item.entity_id))
                .filter(contract_actions::company_id.eq(ctx.company_id)),
        )
        .set((
            contract_actions::status.eq("completed"),
            contract_actions::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn),
        BackingKind::AttendanceRequest | BackingKind::Contract => unreachable!(),
    }
    .map_err(|e| {
        error!(error = %e, work_item_id = %item.id, "Backing entity update failed");
        ApiError::internal_with_details(
            "Failed to update backing entity",
            "BACKING_UPDATE_FAILED",
            serde_json::json!({
                "entity_type": item.entity_type,
                "entity_id": item.entity_id,
            }),
        )
    })?;

    if updated == 0 {
        return Err(ApiError::conflict(
            "Backing entity no longer exists",
            "BACKING_ENTITY_MISSING",
        ));
    }

    AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "work_item.completed",
        &item.entity_type,
        item.entity_id,
        serde_json::json!({"work_item_id": item.id, "work_type": item.work_type}),
    )
    .map_err(|e| {
        error!(error = %e, work_item_id = %item.id, "Audit write failed during completion");
        ApiError::internal_with_details(
            "Failed to record completion",
            "AUDIT_WRITE_FAILED",
            serde_json::json!({"work_item_id": item.id}),
        )
    })?;

    diesel::update(work_items::table.find(item.id))
        .set((
            work_items::status.eq(WorkItemStatus::Done.as_str()),
            work_items::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .map_err(|e| {
            error!(error = %e, work_item_id = %item.id, "Work item status update failed");
            ApiError::internal_with_details(
                "Failed to update work item",
                "WORK_ITEM_UPDATE_FAILED",
                serde_json::json!({"work_item_id": item.id}),
            )
        })?;

    info!(work_item_id = %item.id, company_id = %ctx.company_id, "Work item completed");
    Ok(Json(CompleteResponse {
        success: true,
        message: "Work item completed".to_string(),
    }))
}
