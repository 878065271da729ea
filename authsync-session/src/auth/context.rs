//! Authorization Context
//!
//! Read-only view over a user and permission set that answers authorization
//! queries. Queries are pure and synchronous.

use super::permissions::{
    is_admin_user, permission_string, PermissionSet, SYSTEM_ADMIN_PERMISSION,
};
use authsync_core::User;

/// Authorization view borrowed from a session
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext<'a> {
    user: Option<&'a User>,
    permissions: &'a PermissionSet,
}

impl<'a> AuthorizationContext<'a> {
    pub fn new(user: Option<&'a User>, permissions: &'a PermissionSet) -> Self {
        Self { user, permissions }
    }

    pub fn user(&self) -> Option<&'a User> {
        self.user
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        is_admin_user(self.user)
    }

    /// Admins hold every permission; everyone else needs an exact match
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        self.permissions.contains(permission)
    }

    /// `"{action}:{resource}"` or the system-admin override
    pub fn can_access(&self, resource: &str, action: &str) -> bool {
        let permission = permission_string(resource, action);
        self.has_permission(&permission) || self.has_permission(SYSTEM_ADMIN_PERMISSION)
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.has_permission(p))
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    /// Create a summary string for logging
    pub fn summary(&self) -> String {
        let user_info = match self.user {
            Some(user) => format!("{}(role_id={:?})", user.username, user.role_id),
            None => "anonymous".to_string(),
        };

        format!(
            "AuthorizationContext[user={}, admin={}, permissions={}]",
            user_info,
            self.is_admin(),
            self.permissions.len()
        )
    }
}
