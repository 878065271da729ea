//! Session lifecycle listeners
//!
//! Zero or more listeners per event. Notifications are fire-and-forget and
//! never affect the outcome of the operation that raised them.

use authsync_core::{AuthSyncError, User};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub type LoginListener = Arc<dyn Fn(&User) + Send + Sync>;
pub type LogoutListener = Arc<dyn Fn() + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(&AuthSyncError) + Send + Sync>;

/// Registry of lifecycle listeners
#[derive(Default)]
pub struct SessionListeners {
    login: RwLock<Vec<LoginListener>>,
    logout: RwLock<Vec<LogoutListener>>,
    error: RwLock<Vec<ErrorListener>>,
}

impl SessionListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the new user after a successful login
    pub fn on_login_success<F>(&self, listener: F)
    where
        F: Fn(&User) + Send + Sync + 'static,
    {
        write_guard(&self.login).push(Arc::new(listener));
    }

    /// Called once logout cleanup has finished
    pub fn on_logout<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        write_guard(&self.logout).push(Arc::new(listener));
    }

    /// Called with the failure of any mutating operation other than logout
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&AuthSyncError) + Send + Sync + 'static,
    {
        write_guard(&self.error).push(Arc::new(listener));
    }

    pub(crate) fn notify_login(&self, user: &User) {
        // Clone out so listeners may register more listeners
        let listeners = read_all(&self.login);
        debug!(count = listeners.len(), "Notifying login listeners");
        for listener in listeners {
            listener(user);
        }
    }

    pub(crate) fn notify_logout(&self) {
        let listeners = read_all(&self.logout);
        debug!(count = listeners.len(), "Notifying logout listeners");
        for listener in listeners {
            listener();
        }
    }

    pub(crate) fn notify_error(&self, error: &AuthSyncError) {
        let listeners = read_all(&self.error);
        debug!(count = listeners.len(), "Notifying error listeners");
        for listener in listeners {
            listener(error);
        }
    }

    pub fn len(&self) -> usize {
        read_all(&self.login).len() + read_all(&self.logout).len() + read_all(&self.error).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionListeners")
            .field("login", &read_all(&self.login).len())
            .field("logout", &read_all(&self.logout).len())
            .field("error", &read_all(&self.error).len())
            .finish()
    }
}

fn write_guard<T>(lock: &RwLock<Vec<T>>) -> std::sync::RwLockWriteGuard<'_, Vec<T>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_all<T: Clone>(lock: &RwLock<Vec<T>>) -> Vec<T> {
    lock.read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_registered_listener_fires() {
        let listeners = SessionListeners::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            listeners.on_login_success(move |user| {
                assert_eq!(user.username, "carol");
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        listeners.notify_login(&User::new(4, "carol"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(listeners.len(), 3);
    }

    #[test]
    fn notifying_without_listeners_is_noop() {
        let listeners = SessionListeners::new();
        listeners.notify_logout();
        listeners.notify_error(&AuthSyncError::from_status(500, "boom"));
        assert!(listeners.is_empty());
    }
}
