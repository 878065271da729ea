//! Permission System
//!
//! Permissions are opaque strings compared by exact match. Two overrides
//! exist: the admin role grants every permission, and the system-admin
//! permission grants every resource/action pair in `can_access`.

use authsync_core::User;
use std::collections::HashSet;

/// Role name that marks an administrator (case-sensitive)
pub const ADMIN_ROLE_NAME: &str = "Admin";

/// Reserved role identifier of the administrator role
pub const ADMIN_ROLE_ID: i64 = 1;

/// Universal admin capability checked by `can_access`
pub const SYSTEM_ADMIN_PERMISSION: &str = "admin:system";

/// Set of permission strings held by the current session
pub type PermissionSet = HashSet<String>;

/// Whether `user` is an administrator: role name `Admin` or role id `1`
pub fn is_admin_user(user: Option<&User>) -> bool {
    match user {
        Some(user) => {
            user.role_name() == Some(ADMIN_ROLE_NAME) || user.role_id == Some(ADMIN_ROLE_ID)
        }
        None => false,
    }
}

/// Permission string for an action on a resource, e.g. `delete:media`
pub fn permission_string(resource: &str, action: &str) -> String {
    format!("{}:{}", action, resource)
}

/// Build a permission set from the list reported by the auth service
pub fn permission_set<I, S>(permissions: I) -> PermissionSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    permissions.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use authsync_core::Role;

    fn role(id: i64, name: &str) -> Role {
        Role {
            id,
            name: name.to_string(),
            description: None,
            permissions: Vec::new(),
            is_system: false,
        }
    }

    #[test]
    fn admin_by_role_name() {
        let user = User::new(2, "ops").with_role(role(7, "Admin"));
        assert_eq!(user.role_id, Some(7));
        assert!(is_admin_user(Some(&user)));
    }

    #[test]
    fn admin_by_role_id() {
        let mut user = User::new(2, "root").with_role(role(1, "Superuser"));
        assert!(is_admin_user(Some(&user)));

        user.role = None;
        assert!(is_admin_user(Some(&user)));
    }

    #[test]
    fn role_name_is_case_sensitive() {
        let user = User::new(3, "mod").with_role(role(4, "admin"));
        assert!(!is_admin_user(Some(&user)));
    }

    #[test]
    fn absent_user_is_not_admin() {
        assert!(!is_admin_user(None));
    }

    #[test]
    fn permission_string_puts_action_first() {
        assert_eq!(permission_string("media", "delete"), "delete:media");
    }
}
