//! Profile handlers.
//!
//! Identities are provisioned upstream; the local `profiles` row is ensured
//! on demand from verified claims. The active-company pointer is only a
//! default: any request may override it with the `x-company-id` header.

use axum::{extract::State, http::StatusCode, Extension, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::jwt::Claims,
    error::{get_db_conn, ApiError, ApiResult},
    models::{NewProfile, Profile},
    schema::{profiles, user_roles},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnsureProfileRequest {
    #[schema(example = "Amina Diallo")]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveCompanyRequest {
    pub company_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub profile: Profile,
}

fn authenticated_user_id(claims: &Claims) -> Result<Uuid, (StatusCode, Json<ApiError>)> {
    claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid token subject", "UNAUTHENTICATED"))
}

#[utoipa::path(
    put,
    path = "/profile",
    tag = "Profile",
    request_body = EnsureProfileRequest,
    responses(
        (status = 200, description = "Profile ensured", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn ensure_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnsureProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let user_id = authenticated_user_id(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let profile: Profile = diesel::insert_into(profiles::table)
        .values(&NewProfile {
            id: user_id,
            email: claims.email.to_lowercase(),
            full_name: payload.full_name.clone(),
        })
        .on_conflict(profiles::id)
        .do_update()
        .set((
            profiles::email.eq(claims.email.to_lowercase()),
            profiles::updated_at.eq(diesel::dsl::now),
        ))
        .returning(Profile::as_returning())
        .get_result(&mut conn)
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to ensure profile");
            ApiError::db_error()
        })?;

    info!(profile_id = %profile.id, "Profile ensured");
    Ok(Json(ProfileResponse { profile }))
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Current profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No profile for this identity", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ProfileResponse>> {
    let user_id = authenticated_user_id(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let profile: Profile = profiles::table
        .find(user_id)
        .select(Profile::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?
        .ok_or_else(|| ApiError::not_found("Profile not found", "PROFILE_NOT_FOUND"))?;

    Ok(Json(ProfileResponse { profile }))
}

#[utoipa::path(
    put,
    path = "/profile/active-company",
    tag = "Profile",
    request_body = SetActiveCompanyRequest,
    responses(
        (status = 200, description = "Active company updated", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "No active membership in that company", body = ApiError),
        (status = 404, description = "No profile for this identity", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_active_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetActiveCompanyRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let user_id = authenticated_user_id(&claims)?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let membership: Option<Uuid> = user_roles::table
        .filter(user_roles::profile_id.eq(user_id))
        .filter(user_roles::company_id.eq(payload.company_id))
        .filter(user_roles::is_active.eq(true))
        .select(user_roles::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?;

    if membership.is_none() {
        warn!(profile_id = %user_id, company_id = %payload.company_id, "Active-company switch without membership");
        return Err(ApiError::forbidden(
            "You are not a member of this company",
            "NO_MEMBERSHIP",
        ));
    }

    let profile: Profile = diesel::update(profiles::table.find(user_id))
        .set((
            profiles::active_company_id.eq(Some(payload.company_id)),
            profiles::updated_at.eq(diesel::dsl::now),
        ))
        .returning(Profile::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?
        .ok_or_else(|| ApiError::not_found("Profile not found", "PROFILE_NOT_FOUND"))?;

    info!(profile_id = %profile.id, company_id = %payload.company_id, "Active company switched");
    Ok(Json(ProfileResponse { profile }))
}
