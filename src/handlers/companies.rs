//! Company management handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::AuditService,
    auth::jwt::Claims,
    error::{get_db_conn, ApiError, ApiResult},
    models::{Company, NewCompany, NewUserRole},
    rbac::Role,
    schema::{companies, profiles, user_roles},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[schema(example = "Falcon Logistics")]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Slug must be 1-255 characters"))]
    #[schema(example = "falcon-logistics")]
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyResponse {
    pub company: Company,
    #[schema(example = "admin")]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyWithRole {
    pub company: Company,
    #[schema(example = "manager")]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompaniesListResponse {
    pub data: Vec<CompanyWithRole>,
}

#[utoipa::path(
    post,
    path = "/companies",
    tag = "Companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CompanyResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 409, description = "Slug already taken", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<CompanyResponse>)> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid token subject", "UNAUTHENTICATED"))?;

    if let Err(e) = payload.validate() {
        return Err(ApiError::bad_request(
            format!("Validation failed: {}", e),
            "VALIDATION_ERROR",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    // The creator must already have a profile; companies are not created by
    // anonymous identities.
    let profile_exists: Option<Uuid> = profiles::table
        .filter(profiles::id.eq(user_id))
        .select(profiles::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| ApiError::db_error())?;

    if profile_exists.is_none() {
        return Err(ApiError::unauthorized(
            "No profile found for authenticated identity",
            "PROFILE_NOT_FOUND",
        ));
    }

    let company: Company = diesel::insert_into(companies::table)
        .values(&NewCompany {
            name: payload.name.clone(),
            slug: payload.slug.to_lowercase(),
        })
        .returning(Company::as_returning())
        .get_result(&mut conn)
        .map_err(|_| ApiError::conflict("Company slug already taken", "SLUG_TAKEN"))?;

    diesel::insert_into(user_roles::table)
        .values(&NewUserRole {
            profile_id: user_id,
            company_id: company.id,
            role: Role::Admin.as_str().to_string(),
        })
        .execute(&mut conn)
        .map_err(|e| {
            error!(error = %e, company_id = %company.id, "Failed to grant creator admin role");
            ApiError::db_error()
        })?;

    // First company becomes the default context.
    let _ = diesel::update(
        profiles::table
            .find(user_id)
            .filter(profiles::active_company_id.is_null()),
    )
    .set(profiles::active_company_id.eq(Some(company.id)))
    .execute(&mut conn);

    if let Err(e) = AuditService::record(
        &mut conn,
        Some(company.id),
        Some(user_id),
        "company.created",
        "company",
        company.id,
        serde_json::json!({"name": company.name, "slug": company.slug}),
    ) {
        error!(error = %e, company_id = %company.id, "Failed to write audit entry");
    }

    info!(company_id = %company.id, slug = %company.slug, "Company created");

    Ok((
        StatusCode::CREATED,
        Json(CompanyResponse {
            company,
            role: Role::Admin.as_str().to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/companies",
    tag = "Companies",
    responses(
        (status = 200, description = "Companies the caller belongs to", body = CompaniesListResponse),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_companies(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<CompaniesListResponse>> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid token subject", "UNAUTHENTICATED"))?;
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows: Vec<(Company, String)> = user_roles::table
        .inner_join(companies::table.on(companies::id.eq(user_roles::company_id)))
        .filter(user_roles::profile_id.eq(user_id))
        .filter(user_roles::is_active.eq(true))
        .filter(companies::is_active.eq(true))
        .order(companies::name.asc())
        .select((Company::as_select(), user_roles::role))
        .load(&mut conn)
        .map_err(|_| ApiError::db_error())?;

    let data = rows
        .into_iter()
        .map(|(company, role)| CompanyWithRole { company, role })
        .collect();

    Ok(Json(CompaniesListResponse { data }))
}
