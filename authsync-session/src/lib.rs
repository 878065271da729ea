//! AuthSync Session - client-side session and authorization state
//!
//! Keeps a local session (current user, permission set, loading flag) in
//! agreement with a remote auth service:
//!
//! - **Session** ([`session`]): state, persistence, status cache and the manager
//! - **Authorization** ([`auth`]): admin detection and permission queries
//! - **Global handle** ([`global`]): explicit process-wide init and teardown
//!
//! Collaborator contracts (`AuthService`, `SessionStore`, `RequestCache`),
//! errors and configuration live in `authsync-core`.

pub mod auth;
pub mod global;
pub mod session;

pub use auth::{AuthorizationContext, PermissionSet};
pub use session::{
    FileSessionStore, MemoryRequestCache, MemorySessionStore, PersistedSession, SessionEvent,
    SessionListeners, SessionManager, SessionManagerBuilder, SessionSnapshot, SessionState,
};

pub use authsync_core;
