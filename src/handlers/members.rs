//! Company membership handlers.
//!
//! Memberships are deactivated, never deleted: a removed member keeps their
//! row with `is_active = false`, and re-granting reactivates it. The partial
//! unique index on (profile_id, company_id) where is_active guarantees at
//! most one live row per member.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit::AuditService,
    error::{get_db_conn, ApiError, ApiResult},
    middleware::rbac::RoleContext,
    models::NewUserRole,
    pagination::{PaginationMeta, PaginationParams},
    rbac::Role,
    schema::{profiles, user_roles},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantRoleRequest {
    #[schema(example = "member@example.com")]
    pub email: String,
    #[schema(example = "manager")]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberResponse {
    pub profile_id: Uuid,
    #[schema(example = "member@example.com")]
    pub email: String,
    pub full_name: Option<String>,
    #[schema(example = "manager")]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembersListResponse {
    pub data: Vec<MemberResponse>,
    pub pagination: PaginationMeta,
}

#[utoipa::path(
    post,
    path = "/members",
    tag = "Members",
    request_body = GrantRoleRequest,
    responses(
        (status = 201, description = "Role granted", body = MemberResponse),
        (status = 400, description = "Unknown role name", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No profile with that email", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn grant_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Json(payload): Json<GrantRoleRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let Some(role) = Role::parse(&payload.role) else {
        return Err(ApiError::bad_request(
            format!("Unknown role '{}'", payload.role),
            "UNKNOWN_ROLE",
        ));
    };

    let mut conn = get_db_conn(&state.db_pool)?;

    let member: (Uuid, String, Option<String>) = profiles::table
        .filter(profiles::email.eq(payload.email.to_lowercase()))
        .filter(profiles::is_active.eq(true))
        .select((profiles::id, profiles::email, profiles::full_name))
        .first(&mut conn)
        .map_err(|_| {
            warn!(email = %payload.email, "Attempted to grant role to unknown profile");
            ApiError::not_found("Profile not found", "PROFILE_NOT_FOUND")
        })?;

    // Reuse the latest membership row when one exists, active or not, so
    // the table keeps one row of history per member.
    let existing: Option<Uuid> = user_roles::table
        .filter(user_roles::profile_id.eq(member.0))
        .filter(user_roles::company_id.eq(ctx.company_id))
        .order(user_roles::created_at.desc())
        .select(user_roles::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?;

    match existing {
        Some(row_id) => {
            diesel::update(user_roles::table.find(row_id))
                .set((
                    user_roles::role.eq(role.as_str()),
                    user_roles::is_active.eq(true),
                    user_roles::updated_at.eq(diesel::dsl::now),
                ))
                .execute(&mut conn)
                .map_err(|_| ApiError::db_error())?;
        }
        None => {
            diesel::insert_into(user_roles::table)
                .values(&NewUserRole {
                    profile_id: member.0,
                    company_id: ctx.company_id,
                    role: role.as_str().to_string(),
                })
                .execute(&mut conn)
                .map_err(|_| ApiError::db_error())?;
        }
    }

    let _ = state.role_cache.invalidate(member.0, ctx.company_id).await;

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "member.role_granted",
        "user_role",
        member.0,
        serde_json::json!({"email": member.1, "role": role.as_str()}),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    info!(profile_id = %member.0, company_id = %ctx.company_id, role = %role, "Role granted");

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            profile_id: member.0,
            email: member.1,
            full_name: member.2,
            role: role.as_str().to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/members",
    tag = "Members",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated list of active members", body = MembersListResponse),
        (status = 403, description = "Caller may not list members", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<MembersListResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let total_count: i64 = user_roles::table
        .filter(user_roles::company_id.eq(ctx.company_id))
        .filter(user_roles::is_active.eq(true))
        .count()
        .get_result(&mut conn)
        .map_err(|_| ApiError::db_error())?;

    let (limit, offset) = pagination.limit_offset();

    let members: Vec<(Uuid, String, Option<String>, String)> = user_roles::table
        .inner_join(profiles::table.on(profiles::id.eq(user_roles::profile_id)))
        .filter(user_roles::company_id.eq(ctx.company_id))
        .filter(user_roles::is_active.eq(true))
        .order(profiles::email.asc())
        .limit(limit)
        .offset(offset)
        .select((
            profiles::id,
            profiles::email,
            profiles::full_name,
            user_roles::role,
        ))
        .load(&mut conn)
        .map_err(|_| ApiError::db_error())?;

    let data = members
        .into_iter()
        .map(|(profile_id, email, full_name, role)| MemberResponse {
            profile_id,
            email,
            full_name,
            role,
        })
        .collect();

    Ok(Json(MembersListResponse {
        data,
        pagination: pagination.into_metadata(total_count),
    }))
}

#[utoipa::path(
    delete,
    path = "/members/{profile_id}",
    tag = "Members",
    params(("profile_id" = Uuid, Path, description = "Member profile ID")),
    responses(
        (status = 204, description = "Membership deactivated"),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "No active membership", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke_membership(
    State(state): State<AppState>,
    Extension(ctx): Extension<RoleContext>,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let updated = diesel::update(
        user_roles::table
            .filter(user_roles::profile_id.eq(profile_id))
            .filter(user_roles::company_id.eq(ctx.company_id))
            .filter(user_roles::is_active.eq(true)),
    )
    .set((
        user_roles::is_active.eq(false),
        user_roles::updated_at.eq(diesel::dsl::now),
    ))
    .execute(&mut conn)
    .map_err(|_| ApiError::db_error())?;

    if updated == 0 {
        return Err(ApiError::not_found(
            "No active membership for that profile",
            "MEMBERSHIP_NOT_FOUND",
        ));
    }

    let _ = state.role_cache.invalidate(profile_id, ctx.company_id).await;

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(ctx.company_id),
        Some(ctx.profile_id),
        "member.role_revoked",
        "user_role",
        profile_id,
        serde_json::json!({}),
    ) {
        error!(error = %e, "Failed to write audit entry");
    }

    info!(profile_id = %profile_id, company_id = %ctx.company_id, "Membership deactivated");
    Ok(StatusCode::NO_CONTENT)
}
