//! Company-scoped roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user's role within one company. Ordered roughly by privilege, but
/// permission checks always go through [`super::Permission::allowed_roles`],
/// never through ordering comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Provider,
    Client,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Provider,
        Role::Client,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Provider => "provider",
            Role::Client => "client",
            Role::Viewer => "viewer",
        }
    }

    /// Parses the database representation. Unknown values map to `None`
    /// rather than an error so a bad row degrades to "no membership".
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "provider" => Some(Role::Provider),
            "client" => Some(Role::Client),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
