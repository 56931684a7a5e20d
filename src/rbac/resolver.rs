//! Company-scoped role resolution.

use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{profiles, user_roles};

use super::role::Role;

/// The outcome of resolving a caller against a company. Absence at any stage
/// is encoded as `None` fields, never as an error: callers branch on the
/// null pattern to produce 401 vs 400 vs 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    pub profile_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub role: Option<Role>,
}

impl ResolvedRole {
    pub fn absent() -> Self {
        Self {
            profile_id: None,
            company_id: None,
            role: None,
        }
    }
}

/// Resolves the caller's role for a target company.
///
/// The target is `company_override` when given, else the profile's
/// `active_company_id`. The `user_roles` lookup relies on the partial unique
/// index on (profile_id, company_id) where is_active, so `.first()` can
/// never silently pick among multiple active rows.
pub fn resolve_role(
    conn: &mut PgConnection,
    user_id: Uuid,
    company_override: Option<Uuid>,
) -> QueryResult<ResolvedRole> {
    let profile: Option<(Uuid, Option<Uuid>)> = profiles::table
        .filter(profiles::id.eq(user_id))
        .filter(profiles::is_active.eq(true))
        .select((profiles::id, profiles::active_company_id))
        .first(conn)
        .optional()?;

    let Some((profile_id, active_company_id)) = profile else {
        return Ok(ResolvedRole::absent());
    };

    let Some(company_id) = company_override.or(active_company_id) else {
        return Ok(ResolvedRole {
            profile_id: Some(profile_id),
            company_id: None,
            role: None,
        });
    };

    let role_name: Option<String> = user_roles::table
        .filter(user_roles::profile_id.eq(profile_id))
        .filter(user_roles::company_id.eq(company_id))
        .filter(user_roles::is_active.eq(true))
        .select(user_roles::role)
        .first(conn)
        .optional()?;

    Ok(ResolvedRole {
        profile_id: Some(profile_id),
        company_id: Some(company_id),
        role: role_name.as_deref().and_then(Role::parse),
    })
}
