//! Attendance request handlers.
//!
//! Requests are approvals: they enter the inbox as `approval` work items
//! and can only leave it through the approve/reject endpoints here, never
//! through generic completion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Duration;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit::AuditService,
    error::{get_db_conn, ApiError, ApiResult},
    middleware::rbac::RoleContext,
    models::{AttendanceRequest, NewAttendanceRequest},
    rbac::Permission,
    schema::attendance_requests,
    workflow::{WorkflowError, WorkflowService, WorkflowTransition},
    workitems::{
        set_work_item_assignee, set_work_item_status, upsert_work_item, BackingKind,
        WorkItemStatus, WorkItemUpsert, WORK_TYPE_APPROVAL,
    },
    AppState,
};

/// How long a pending approval may sit in the inbox before it counts as
/// breaching SLA.
const APPROVAL_SLA_HOURS: i64 = 48;

const STATUS_PENDING: &str = "pending";
const STATUS_APPROVED: &str = "approved";
const STATUS_REJECTED: &str = "rejected";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAttendanceRequest {
    #[schema(example = "correction")]
    pub request_type: String,
    pub requested_date: chrono::NaiveDate,
    #[schema(example = "Forgot to clock out on Tuesday")]
    pub reason: Option<String>,
    /// Create on behalf of another profile. Requires attendance:create:all.
    pub profile_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub request: AttendanceRequest,
}

#[utoipa::path(
    post,
    path = "/attendance",
    tag = "Attendance",
    request_body = CreateAttendanceRequest,
    responses(
        (status = 201, description = "Request submitted", body = AttendanceResponse),
        (status = 400, description = "Unknown request type", body = ApiError),
        (status = 403, description = "Caller may not create attendance requests", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_attendance_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Json(payload): Json<CreateAttendanceRequest>,
) -> ApiResult<(StatusCode, Json<AttendanceResponse>)> {
    if !matches!(payload.request_type.as_str(), "correction" | "leave") {
        return Err(ApiError::bad_request(
            format!("Unknown request type '{}'", payload.request_type),
            "UNKNOWN_REQUEST_TYPE",
        ));
    }

    let subject_id = payload.profile_id.unwrap_or(ctx.profile_id);
    if subject_id != ctx.profile_id && !Permission::AttendanceCreateAll.allows(ctx.role) {
        return Err(ApiError::forbidden(
            "Creating requests for other employees requires a manager role",
            "INSUFFICIENT_ROLE",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let request: AttendanceRequest = diesel::insert_into(attendance_requests::table)
        .values(&NewAttendanceRequest {
            company_id: ctx.company_id,
            profile_id: subject_id,
            request_type: payload.request_type.clone(),
            requested_date: payload.requested_date,
            reason: payload.reason.clone(),
        })
        .returning(AttendanceRequest::as_returning())
        .get_result(&mut conn)
        .map_err(|e| {
            error!(error = %e, "Failed to create attendance request");
            ApiError::db_error()
        })?;

    // The request row is committed. Projection, workflow start and audit
    // are best-effort: their failure leaves the inbox stale until
    // reconciled, never the request missing.
    let title = format!(
        "Attendance {} for {}",
        request.request_type, request.requested_date
    );
    let now = chrono::Utc::now().naive_utc();

    if let Err(e) = upsert_work_item(
        &mut conn,
        &WorkItemUpsert {
            company_id: ctx.company_id,
            kind: BackingKind::AttendanceRequest,
            entity_id: request.id,
            work_type: WORK_TYPE_APPROVAL.to_string(),
            source: "attendance".to_string(),
            status: WorkItemStatus::Pending,
            title,
            due_at: request.requested_date.and_hms_opt(0, 0, 0),
            sla_due_at: Some(now + Duration::hours(APPROVAL_SLA_HOURS)),
            priority: Some(1),
            assignee_id: None,
        },
    ) {
        error!(error = %e, request_id = %request.id, "Failed to project attendance request into inbox");
    }

    match WorkflowService::start_attendance_request(&mut conn, ctx.company_id, request.id) {
        Ok(instance) => {
            if let Err(e) = set_work_item_assignee(
                &mut conn,
                ctx.company_id,
                BackingKind::AttendanceRequest,
                request.id,
                instance.assigned_to,
            ) {
                error!(error = %e, request_id = %request.id, "Failed to assign inbox item");
            }
        }
        Err(e) => {
            error!(error = %e, request_id = %request.id, "Failed to start attendance workflow");
        }
    }

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "attendance_request.created",
        BackingKind::AttendanceRequest.entity_type(),
        request.id,
        serde_json::json!({
            "request_type": request.request_type,
            "requested_date": request.requested_date,
            "subject": subject_id,
        }),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    info!(request_id = %request.id, company_id = %ctx.company_id, "Attendance request submitted");
    Ok((StatusCode::CREATED, Json(AttendanceResponse { request })))
}

#[utoipa::path(
    post,
    path = "/attendance/{id}/approve",
    tag = "Attendance",
    params(("id" = Uuid, Path, description = "Attendance request ID")),
    responses(
        (status = 200, description = "Request approved", body = AttendanceResponse),
        (status = 403, description = "Caller may not review requests", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Request already reviewed", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_attendance_request(
    state: State<AppState>,
    ctx: Extension<RoleContext>,
    id: Path<Uuid>,
) -> ApiResult<Json<AttendanceResponse>> {
    review_attendance_request(state, ctx, id, WorkflowTransition::Approve).await
}

#[utoipa::path(
    post,
    path = "/attendance/{id}/reject",
    tag = "Attendance",
    params(("id" = Uuid, Path, description = "Attendance request ID")),
    responses(
        (status = 200, description = "Request rejected", body = AttendanceResponse),
        (status = 403, description = "Caller may not review requests", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Request already reviewed", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_attendance_request(
    state: State<AppState>,
    ctx: Extension<RoleContext>,
    id: Path<Uuid>,
) -> ApiResult<Json<AttendanceResponse>> {
    review_attendance_request(state, ctx, id, WorkflowTransition::Reject).await
}

async fn review_attendance_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Path(request_id): Path<Uuid>,
    transition: WorkflowTransition,
) -> ApiResult<Json<AttendanceResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let request: AttendanceRequest = attendance_requests::table
        .filter(attendance_requests::id.eq(request_id))
        .filter(attendance_requests::company_id.eq(ctx.company_id))
        .select(AttendanceRequest::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?
        .ok_or_else(|| ApiError::not_found("Attendance request not found", "REQUEST_NOT_FOUND"))?;

    if request.status != STATUS_PENDING {
        return Err(ApiError::conflict(
            format!("Request already {}", request.status),
            "ALREADY_REVIEWED",
        ));
    }

    // Advance the workflow first so a terminal instance blocks a second
    // review even if the entity status was tampered with. A missing
    // instance (start failed at submission) does not block the review; the
    // entity table stays authoritative.
    match WorkflowService::transition(
        &mut conn,
        ctx.company_id,
        BackingKind::AttendanceRequest,
        request_id,
        transition,
    ) {
        Ok(_) => {}
        Err(WorkflowError::NotFound) => {
            warn!(request_id = %request_id, "Reviewing request with no workflow instance");
        }
        Err(WorkflowError::InvalidTransition(e)) => {
            return Err(ApiError::conflict(e.to_string(), "WORKFLOW_CONFLICT"));
        }
        Err(e) => {
            error!(error = %e, request_id = %request_id, "Workflow transition failed");
            return Err(ApiError::db_error());
        }
    }

    let (entity_status, item_status, action) = match transition {
        WorkflowTransition::Approve => {
            (STATUS_APPROVED, WorkItemStatus::Done, "attendance_request.approved")
        }
        WorkflowTransition::Reject => (
            STATUS_REJECTED,
            WorkItemStatus::Cancelled,
            "attendance_request.rejected",
        ),
    };

    let updated: AttendanceRequest = diesel::update(attendance_requests::table.find(request_id))
        .set((
            attendance_requests::status.eq(entity_status),
            attendance_requests::reviewed_by.eq(Some(ctx.profile_id)),
            attendance_requests::reviewed_at.eq(diesel::dsl::now),
            attendance_requests::updated_at.eq(diesel::dsl::now),
        ))
        .returning(AttendanceRequest::as_returning())
        .get_result(&mut conn)
        .map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to update attendance request");
            ApiError::db_error()
        })?;

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        action,
        BackingKind::AttendanceRequest.entity_type(),
        request_id,
        serde_json::json!({"transition": transition.as_str()}),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    // Mirror last: the backing entity is already consistent if this fails.
    if let Err(e) = set_work_item_status(
        &mut conn,
        ctx.company_id,
        BackingKind::AttendanceRequest,
        request_id,
        item_status,
    ) {
        error!(error = %e, request_id = %request_id, "Failed to update inbox mirror");
    }

    info!(
        request_id = %request_id,
        company_id = %ctx.company_id,
        outcome = %entity_status,
        "Attendance request reviewed"
    );
    Ok(Json(AttendanceResponse { request: updated }))
}
