//! Session Types - Session state, snapshots and change notifications

use crate::auth::{permission_set, AuthorizationContext, PermissionSet};
use authsync_core::{AuthStatus, User};
use serde::{Deserialize, Serialize};

/// Mutable session state owned by the session manager
///
/// `permissions` is only ever non-empty while `current_user` is present; both
/// are set and cleared together.
///
/// `epoch` moves whenever a mutation rewrites the session. A status fetch
/// issued under an older epoch must not be applied.
#[derive(Debug, Clone)]
pub struct SessionState {
    current_user: Option<User>,
    permissions: PermissionSet,
    loading: bool,
    pending_fetches: usize,
    epoch: u64,
}

impl SessionState {
    /// Empty session waiting for the first status fetch
    pub fn new() -> Self {
        Self {
            current_user: None,
            permissions: PermissionSet::new(),
            loading: true,
            pending_fetches: 0,
            epoch: 0,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// A status fetch went out; user and permissions keep their last value.
    /// Returns the epoch the fetch was issued under.
    pub fn begin_fetch(&mut self) -> u64 {
        self.pending_fetches += 1;
        self.loading = true;
        self.epoch
    }

    /// A status fetch settled; loading stays set while others are in flight
    pub fn finish_fetch(&mut self) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
        self.loading = self.pending_fetches > 0;
    }

    /// Reconcile with a status response.
    ///
    /// A response without a user is unauthenticated even if it claims otherwise.
    pub fn apply_status(&mut self, status: AuthStatus) {
        match status {
            AuthStatus {
                authenticated: true,
                user: Some(user),
                permissions,
            } => {
                self.current_user = Some(user);
                self.permissions = permission_set(permissions.unwrap_or_default());
            }
            _ => self.clear(),
        }
    }

    /// Replace the current user without touching the permission set
    pub fn set_user(&mut self, user: User) {
        self.current_user = Some(user);
    }

    /// Mark every fetch in flight as stale
    pub fn supersede_fetches(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Reset user and permissions together
    pub fn clear(&mut self) {
        self.current_user = None;
        self.permissions.clear();
    }

    pub fn authorization(&self) -> AuthorizationContext<'_> {
        AuthorizationContext::new(self.current_user.as_ref(), &self.permissions)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_user: self.current_user.clone(),
            permissions: self.permissions.clone(),
            loading: self.loading,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable copy of the session handed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current_user: Option<User>,
    pub permissions: PermissionSet,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.authorization().is_admin()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.authorization().has_permission(permission)
    }

    pub fn can_access(&self, resource: &str, action: &str) -> bool {
        self.authorization().can_access(resource, action)
    }

    /// Permissions in sorted order, for display and stable comparisons
    pub fn sorted_permissions(&self) -> Vec<String> {
        let mut permissions: Vec<String> = self.permissions.iter().cloned().collect();
        permissions.sort();
        permissions
    }

    fn authorization(&self) -> AuthorizationContext<'_> {
        AuthorizationContext::new(self.current_user.as_ref(), &self.permissions)
    }
}

/// Session change notification
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A status fetch finished and the session was reconciled
    StatusReconciled(SessionSnapshot),
    LoggedIn(SessionSnapshot),
    LoggedOut(SessionSnapshot),
    ProfileUpdated(SessionSnapshot),
}

impl SessionEvent {
    pub fn snapshot(&self) -> &SessionSnapshot {
        match self {
            SessionEvent::StatusReconciled(snapshot)
            | SessionEvent::LoggedIn(snapshot)
            | SessionEvent::LoggedOut(snapshot)
            | SessionEvent::ProfileUpdated(snapshot) => snapshot,
        }
    }
}

/// Token and user snapshot held by the persistence store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    pub user: Option<User>,
}
