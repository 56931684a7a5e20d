//! RBAC gate middleware.
//!
//! Routes are wrapped with [`rbac_guard`] parameterized by an
//! [`RbacPolicy`]; the guard resolves the caller's company-scoped role and
//! short-circuits before the handler body runs. Failure ladder, in order:
//! 401 (no identity, or identity with no profile), 400 (no company
//! context), 403 (no membership), 403 with `{required, actual}` details
//! (role not in the permission's allowed set).

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::Claims,
    error::{get_db_conn, ApiError},
    rbac::{resolve_role, Permission, PermissionCheck, ResolvedRole, Role},
    AppState,
};

pub static COMPANY_ID_HEADER: HeaderName = HeaderName::from_static("x-company-id");

/// The resolved caller context, inserted into request extensions on
/// successful authorization.
#[derive(Debug, Clone)]
pub struct RoleContext {
    pub profile_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
}

/// A permission requirement bound to the app state so it can be attached as
/// route-layer state.
#[derive(Clone)]
pub struct RbacPolicy {
    pub state: AppState,
    pub check: PermissionCheck,
}

impl RbacPolicy {
    pub fn require(state: AppState, permission: Permission) -> Self {
        Self {
            state,
            check: PermissionCheck::All(permission),
        }
    }

    pub fn require_any(state: AppState, permissions: &'static [Permission]) -> Self {
        Self {
            state,
            check: PermissionCheck::AnyOf(permissions),
        }
    }
}

pub async fn rbac_guard(
    State(policy): State<RbacPolicy>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        ApiError::unauthorized("Authentication required", "UNAUTHENTICATED").into_response()
    })?;

    let user_id = claims.user_id().ok_or_else(|| {
        ApiError::unauthorized("Invalid token subject", "UNAUTHENTICATED").into_response()
    })?;

    let company_override = match req.headers().get(&COMPANY_ID_HEADER) {
        Some(value) => {
            let parsed = value.to_str().ok().and_then(|v| Uuid::parse_str(v).ok());
            match parsed {
                Some(id) => Some(id),
                None => {
                    return Err(ApiError::bad_request(
                        "Invalid x-company-id header",
                        "INVALID_COMPANY_HEADER",
                    )
                    .into_response())
                }
            }
        }
        None => None,
    };

    let resolved = resolve_cached(&policy.state, user_id, company_override).await?;

    let Some(profile_id) = resolved.profile_id else {
        return Err(ApiError::unauthorized(
            "No profile found for authenticated identity",
            "PROFILE_NOT_FOUND",
        )
        .into_response());
    };

    let Some(company_id) = resolved.company_id else {
        return Err(ApiError::bad_request(
            "No active company. Select a company or pass x-company-id.",
            "NO_ACTIVE_COMPANY",
        )
        .into_response());
    };

    let Some(role) = resolved.role else {
        return Err(ApiError::forbidden(
            "You are not a member of this company",
            "NO_MEMBERSHIP",
        )
        .into_response());
    };

    if !policy.check.allows(role) {
        debug!(
            profile_id = %profile_id,
            company_id = %company_id,
            actual = %role,
            permission = %policy.check.describe(),
            "Permission denied"
        );
        return Err((
            axum::http::StatusCode::FORBIDDEN,
            axum::Json(ApiError::with_details(
                "Insufficient role for this action",
                "INSUFFICIENT_ROLE",
                json!({
                    "required": policy.check.required_roles(),
                    "actual": role.as_str(),
                }),
            )),
        )
            .into_response());
    }

    req.extensions_mut().insert(RoleContext {
        profile_id,
        company_id,
        role,
    });

    Ok(next.run(req).await)
}

/// Resolves through the role cache when an explicit company target makes a
/// cache key available up front; otherwise resolves from the database and
/// back-fills the cache.
async fn resolve_cached(
    state: &AppState,
    user_id: Uuid,
    company_override: Option<Uuid>,
) -> Result<ResolvedRole, Response> {
    if let Some(company_id) = company_override {
        if let Some(cached) = state.role_cache.get(user_id, company_id).await {
            return Ok(ResolvedRole {
                profile_id: Some(cached.profile_id),
                company_id: Some(cached.company_id),
                role: cached.role.as_deref().and_then(Role::parse),
            });
        }
    }

    let mut conn = get_db_conn(&state.db_pool).map_err(|e| e.into_response())?;
    let resolved = resolve_role(&mut conn, user_id, company_override).map_err(|e| {
        warn!(error = %e, user_id = %user_id, "Role resolution failed");
        ApiError::db_error().into_response()
    })?;

    if state.role_cache.is_available() {
        if let (Some(profile_id), Some(company_id)) = (resolved.profile_id, resolved.company_id) {
            if let Err(e) = state
                .role_cache
                .set(profile_id, company_id, resolved.role)
                .await
            {
                debug!(error = %e, "Role cache write skipped");
            }
        }
    }

    Ok(resolved)
}
