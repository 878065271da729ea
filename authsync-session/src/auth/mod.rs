//! Authorization Module
//!
//! Derives the admin flag and answers permission queries against the
//! current session:
//! - Admin role (by name or reserved id) grants every permission
//! - `admin:system` grants every resource/action pair
//! - Everything else is an exact string match

pub mod context;
pub mod permissions;

pub use context::AuthorizationContext;
pub use permissions::{
    is_admin_user, permission_set, permission_string, PermissionSet, ADMIN_ROLE_ID,
    ADMIN_ROLE_NAME, SYSTEM_ADMIN_PERMISSION,
};
