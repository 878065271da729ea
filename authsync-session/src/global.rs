//! Process-wide session manager handle
//!
//! Callers obtain the manager through [`handle`] after an explicit [`init`].
//! Accessing it before setup, or after [`teardown`], is an error.

use crate::session::SessionManager;
use authsync_core::{AuthSyncError, AuthSyncResult, ErrorContext};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

static MANAGER: RwLock<Option<Arc<SessionManager>>> = RwLock::new(None);

/// Install `manager` as the process-wide handle, replacing any previous one
pub fn init(manager: SessionManager) -> Arc<SessionManager> {
    let manager = Arc::new(manager);
    let previous = MANAGER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .replace(Arc::clone(&manager));

    if previous.is_some() {
        warn!("Session manager re-initialized, previous handle replaced");
    } else {
        info!("Session manager initialized");
    }
    manager
}

/// The installed manager
pub fn handle() -> AuthSyncResult<Arc<SessionManager>> {
    MANAGER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
        .ok_or_else(|| AuthSyncError::NotInitialized {
            component: "session_manager".to_string(),
            context: ErrorContext::new("global")
                .with_operation("handle")
                .with_suggestion("Call authsync_session::global::init during startup"),
        })
}

pub fn is_initialized() -> bool {
    MANAGER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .is_some()
}

/// Drop the process-wide handle. Outstanding `Arc`s stay valid.
pub fn teardown() -> Option<Arc<SessionManager>> {
    let previous = MANAGER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if previous.is_some() {
        info!("Session manager torn down");
    }
    previous
}
