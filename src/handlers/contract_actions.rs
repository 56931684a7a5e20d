//! Contract action handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    audit::AuditService,
    error::{get_db_conn, ApiError, ApiResult},
    middleware::rbac::RoleContext,
    models::{ContractAction, NewContractAction},
    schema::contract_actions,
    workitems::{upsert_work_item, BackingKind, WorkItemStatus, WorkItemUpsert},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateContractActionRequest {
    #[validate(length(min = 1, max = 255, message = "Contract reference must be 1-255 characters"))]
    #[schema(example = "CT-2025-0042")]
    pub contract_ref: String,
    #[schema(example = "renewal")]
    pub action_type: String,
    pub due_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContractActionResponse {
    pub action: ContractAction,
}

#[utoipa::path(
    post,
    path = "/contract-actions",
    tag = "Contracts",
    request_body = CreateContractActionRequest,
    responses(
        (status = 201, description = "Contract action created", body = ContractActionResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Caller may not manage contracts", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_contract_action(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Json(payload): Json<CreateContractActionRequest>,
) -> ApiResult<(StatusCode, Json<ContractActionResponse>)> {
    if let Err(e) = payload.validate() {
        return Err(ApiError::bad_request(
            format!("Validation failed: {}", e),
            "VALIDATION_ERROR",
        ));
    }

    if !matches!(
        payload.action_type.as_str(),
        "renewal" | "amendment" | "termination"
    ) {
        return Err(ApiError::bad_request(
            format!("Unknown action type '{}'", payload.action_type),
            "UNKNOWN_ACTION_TYPE",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let action: ContractAction = diesel::insert_into(contract_actions::table)
        .values(&NewContractAction {
            company_id: ctx.company_id,
            contract_ref: payload.contract_ref.clone(),
            action_type: payload.action_type.clone(),
            due_at: payload.due_at,
            created_by: ctx.profile_id,
        })
        .returning(ContractAction::as_returning())
        .get_result(&mut conn)
        .map_err(|e| {
            error!(error = %e, "Failed to create contract action");
            ApiError::db_error()
        })?;

    // Renewals get their own work type so the inbox can be filtered down
    // to them; everything else mirrors as a plain contract action.
    let work_type = if action.action_type == "renewal" {
        "contract_renewal"
    } else {
        "contract_action"
    };

    if let Err(e) = upsert_work_item(
        &mut conn,
        &WorkItemUpsert {
            company_id: ctx.company_id,
            kind: BackingKind::ContractAction,
            entity_id: action.id,
            work_type: work_type.to_string(),
            source: "contracts".to_string(),
            status: WorkItemStatus::Open,
            title: format!("Contract {} for {}", action.action_type, action.contract_ref),
            due_at: action.due_at,
            sla_due_at: action.due_at,
            priority: Some(2),
            assignee_id: None,
        },
    ) {
        error!(error = %e, action_id = %action.id, "Failed to project contract action into inbox");
    }

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "contract_action.created",
        BackingKind::ContractAction.entity_type(),
        action.id,
        serde_json::json!({
            "contract_ref": action.contract_ref,
            "action_type": action.action_type,
        }),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    info!(action_id = %action.id, company_id = %ctx.company_id, "Contract action created");
    Ok((StatusCode::CREATED, Json(ContractActionResponse { action })))
}
