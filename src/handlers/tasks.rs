//! Task handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::AuditService,
    error::{get_db_conn, ApiError, ApiResult},
    middleware::rbac::RoleContext,
    models::{NewTask, Task},
    pagination::{PaginationMeta, PaginationParams},
    schema::tasks,
    workitems::{upsert_work_item, BackingKind, WorkItemStatus, WorkItemUpsert},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 512, message = "Title must be 1-512 characters"))]
    #[schema(example = "Collect signed contract from promoter")]
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<NaiveDateTime>,
    #[schema(example = 2)]
    pub priority: Option<i32>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub task: Task,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TasksListResponse {
    pub data: Vec<Task>,
    pub pagination: PaginationMeta,
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Caller may not create tasks", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    if let Err(e) = payload.validate() {
        return Err(ApiError::bad_request(
            format!("Validation failed: {}", e),
            "VALIDATION_ERROR",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let task: Task = diesel::insert_into(tasks::table)
        .values(&NewTask {
            company_id: ctx.company_id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            due_at: payload.due_at,
            priority: payload.priority,
            assignee_id: payload.assignee_id,
            created_by: ctx.profile_id,
        })
        .returning(Task::as_returning())
        .get_result(&mut conn)
        .map_err(|e| {
            error!(error = %e, "Failed to create task");
            ApiError::db_error()
        })?;

    // The task row is committed; projection and audit are best-effort from
    // here. A failure leaves the inbox stale, not the task missing.
    if let Err(e) = upsert_work_item(
        &mut conn,
        &WorkItemUpsert {
            company_id: ctx.company_id,
            kind: BackingKind::Task,
            entity_id: task.id,
            work_type: "task".to_string(),
            source: "tasks".to_string(),
            status: WorkItemStatus::Open,
            title: task.title.clone(),
            due_at: task.due_at,
            sla_due_at: None,
            priority: task.priority,
            assignee_id: task.assignee_id,
        },
    ) {
        error!(error = %e, task_id = %task.id, "Failed to project task into inbox");
    }

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "task.created",
        "task",
        task.id,
        serde_json::json!({"title": task.title}),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    info!(task_id = %task.id, company_id = %ctx.company_id, "Task created");
    Ok((StatusCode::CREATED, Json(TaskResponse { task })))
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated list of tasks", body = TasksListResponse),
        (status = 403, description = "Caller may not work with tasks", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<TasksListResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let total_count: i64 = tasks::table
        .filter(tasks::company_id.eq(ctx.company_id))
        .count()
        .get_result(&mut conn)
        .map_err(|_| ApiError::db_error())?;

    let (limit, offset) = pagination.limit_offset();

    let data: Vec<Task> = tasks::table
        .filter(tasks::company_id.eq(ctx.company_id))
        .order(tasks::created_at.desc())
        .limit(limit)
        .offset(offset)
        .select(Task::as_select())
        .load(&mut conn)
        .map_err(|_| ApiError::db_error())?;

    Ok(Json(TasksListResponse {
        data,
        pagination: pagination.into_metadata(total_count),
    }))
}
