//! Static permission table.
//!
//! Every route is gated by a [`Permission`], and each permission maps to a
//! fixed set of roles. The mapping is data, not logic: handlers never
//! compare role strings directly.

use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    InboxRead,
    InboxComplete,
    TasksCreate,
    AttendanceCreateOwn,
    AttendanceCreateAll,
    AttendanceReview,
    ContractsManage,
    MembersManage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::InboxRead => "inbox:read",
            Permission::InboxComplete => "inbox:complete",
            Permission::TasksCreate => "tasks:create",
            Permission::AttendanceCreateOwn => "attendance:create:own",
            Permission::AttendanceCreateAll => "attendance:create:all",
            Permission::AttendanceReview => "attendance:review",
            Permission::ContractsManage => "contracts:manage",
            Permission::MembersManage => "members:manage",
        }
    }

    /// The roles allowed to exercise this permission.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Permission::InboxRead => &[
                Role::Admin,
                Role::Manager,
                Role::Provider,
                Role::Client,
                Role::Viewer,
            ],
            Permission::InboxComplete => &[Role::Admin, Role::Manager, Role::Provider],
            Permission::TasksCreate => &[Role::Admin, Role::Manager, Role::Provider],
            Permission::AttendanceCreateOwn => {
                &[Role::Admin, Role::Manager, Role::Provider, Role::Client]
            }
            Permission::AttendanceCreateAll => &[Role::Admin, Role::Manager],
            Permission::AttendanceReview => &[Role::Admin, Role::Manager],
            Permission::ContractsManage => &[Role::Admin, Role::Manager],
            Permission::MembersManage => &[Role::Admin],
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a gated route requires: one permission, or any of several.
#[derive(Debug, Clone)]
pub enum PermissionCheck {
    All(Permission),
    AnyOf(&'static [Permission]),
}

impl PermissionCheck {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            PermissionCheck::All(p) => p.allows(role),
            PermissionCheck::AnyOf(ps) => ps.iter().any(|p| p.allows(role)),
        }
    }

    /// Union of role names for the 403 `required` detail.
    pub fn required_roles(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        let perms: &[Permission] = match self {
            PermissionCheck::All(p) => std::slice::from_ref(p),
            PermissionCheck::AnyOf(ps) => ps,
        };
        for perm in perms {
            for role in perm.allowed_roles() {
                if !names.contains(&role.as_str()) {
                    names.push(role.as_str());
                }
            }
        }
        names
    }

    pub fn describe(&self) -> String {
        match self {
            PermissionCheck::All(p) => p.as_str().to_string(),
            PermissionCheck::AnyOf(ps) => ps
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PERMISSIONS: [Permission; 8] = [
        Permission::InboxRead,
        Permission::InboxComplete,
        Permission::TasksCreate,
        Permission::AttendanceCreateOwn,
        Permission::AttendanceCreateAll,
        Permission::AttendanceReview,
        Permission::ContractsManage,
        Permission::MembersManage,
    ];

    #[test]
    fn test_every_permission_has_roles() {
        for perm in ALL_PERMISSIONS {
            assert!(
                !perm.allowed_roles().is_empty(),
                "{} maps to no roles",
                perm.as_str()
            );
        }
    }

    #[test]
    fn test_admin_can_do_everything() {
        for perm in ALL_PERMISSIONS {
            assert!(perm.allows(Role::Admin), "{} denies admin", perm.as_str());
        }
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Permission::InboxRead.allows(Role::Viewer));
        for perm in ALL_PERMISSIONS {
            if perm != Permission::InboxRead {
                assert!(!perm.allows(Role::Viewer), "{} allows viewer", perm.as_str());
            }
        }
    }

    #[test]
    fn test_attendance_create_all_is_manager_up() {
        assert!(Permission::AttendanceCreateAll.allows(Role::Admin));
        assert!(Permission::AttendanceCreateAll.allows(Role::Manager));
        assert!(!Permission::AttendanceCreateAll.allows(Role::Provider));
        assert!(!Permission::AttendanceCreateAll.allows(Role::Client));
    }

    #[test]
    fn test_any_of_unions_roles() {
        let check = PermissionCheck::AnyOf(&[
            Permission::AttendanceCreateOwn,
            Permission::AttendanceCreateAll,
        ]);
        assert!(check.allows(Role::Client));
        assert!(check.allows(Role::Manager));
        assert!(!check.allows(Role::Viewer));

        let required = check.required_roles();
        assert!(required.contains(&"client"));
        assert!(required.contains(&"admin"));
        assert!(!required.contains(&"viewer"));
    }

    #[test]
    fn test_required_roles_deduplicates() {
        let check = PermissionCheck::All(Permission::InboxComplete);
        let required = check.required_roles();
        assert_eq!(required.len(), 3);
    }
}
