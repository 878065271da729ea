//! Session Manager - owns the client-side session
//!
//! Reconciles status responses into the session, runs the mutating session
//! operations and answers authorization queries. Session mutation happens
//! under a short synchronous lock, so readers never observe a half-applied
//! update. Concurrent mutations are not coordinated: the last one to
//! complete wins. A status response that was in flight when a mutation
//! rewrote the session is discarded.

use super::cache::MemoryRequestCache;
use super::events::SessionListeners;
use super::storage::{MemorySessionStore, SessionPersistence};
use super::{PersistedSession, SessionEvent, SessionSnapshot, SessionState};
use crate::auth::PermissionSet;
use authsync_core::performance::measure_async;
use authsync_core::{
    log_operation_error, log_operation_start, log_operation_success, AuthService, AuthStatus,
    AuthSyncConfig, AuthSyncError, AuthSyncResult, ChangePasswordRequest, Fetcher, LoginRequest,
    RegisterRequest, RequestCache, SessionStore, UpdateProfileRequest, User,
};
use futures::FutureExt;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Client-side session and authorization state manager
pub struct SessionManager {
    service: Arc<dyn AuthService>,
    persistence: SessionPersistence,
    cache: Arc<dyn RequestCache<AuthStatus>>,
    config: AuthSyncConfig,
    state: RwLock<SessionState>,
    listeners: SessionListeners,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Start building a manager around an auth service
    pub fn builder(service: Arc<dyn AuthService>) -> SessionManagerBuilder {
        SessionManagerBuilder::new(service)
    }

    /// Manager with in-memory persistence, in-memory cache and default config
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self::from_parts(
            service,
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryRequestCache::new()),
            AuthSyncConfig::default(),
            SessionListeners::new(),
        )
    }

    fn from_parts(
        service: Arc<dyn AuthService>,
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn RequestCache<AuthStatus>>,
        config: AuthSyncConfig,
        listeners: SessionListeners,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            persistence: SessionPersistence::new(store, config.persistence.clone()),
            cache,
            config,
            state: RwLock::new(SessionState::new()),
            listeners,
            events,
        }
    }

    /// Run the initial status reconciliation
    pub async fn start(&self) -> AuthSyncResult<SessionSnapshot> {
        info!("Starting session manager");
        self.reconcile().await
    }

    /// Fetch the authoritative status (through the request cache) and
    /// reconcile the session with it.
    ///
    /// An unauthorized failure ends the cycle as unauthenticated and is not an
    /// error. Any other failure leaves user and permissions untouched and is
    /// returned once the retry budget is spent.
    pub async fn reconcile(&self) -> AuthSyncResult<SessionSnapshot> {
        let pending = PendingFetch::begin(&self.state);

        let service = Arc::clone(&self.service);
        let fetcher: Fetcher<AuthStatus> = Box::new(move || {
            let service = Arc::clone(&service);
            async move { service.get_status().await }.boxed()
        });
        let policy = self.config.status.fetch_policy();

        let result = self
            .cache
            .fetch_with_policy(&self.config.status.cache_key, &policy, fetcher)
            .await;

        match result {
            Ok(status) => {
                debug!(authenticated = status.authenticated, "Status fetched");
                let settled = pending.settle(|state| state.apply_status(status));
                Ok(self.reconciled(settled))
            }
            Err(error) if error.is_unauthorized() => {
                debug!(error = %error, "Status query unauthorized, clearing session");
                let settled = pending.settle(SessionState::clear);
                Ok(self.reconciled(settled))
            }
            Err(error) => {
                pending.settle(|_| {});
                error.log();
                Err(error)
            }
        }
    }

    fn reconciled(&self, (snapshot, applied): (SessionSnapshot, bool)) -> SessionSnapshot {
        if applied {
            self.emit(SessionEvent::StatusReconciled(snapshot.clone()));
        } else {
            debug!("Session changed while status was in flight, response discarded");
        }
        snapshot
    }

    /// Invalidate the cached status and reconcile again
    pub async fn refresh(&self) -> AuthSyncResult<SessionSnapshot> {
        self.cache.invalidate(&self.config.status.cache_key).await;
        self.reconcile().await
    }

    /// Log in. On success the token and user are persisted, the session takes
    /// the returned user, login listeners fire and the status is refetched.
    pub async fn login(&self, request: LoginRequest) -> AuthSyncResult<User> {
        measure_async("login", async {
            log_operation_start!("login", username = %request.username);

            let response = match self.service.login(request).await {
                Ok(response) => response,
                Err(error) => return Err(self.fail("login", error)),
            };

            if let Err(error) = self
                .persistence
                .persist(&response.session_token, &response.user)
                .await
            {
                warn!(error = %error, "Failed to persist session, continuing");
            }

            let user = response.user;
            self.cache.invalidate(&self.config.status.cache_key).await;
            let snapshot = self.update(|state| {
                state.supersede_fetches();
                state.set_user(user.clone());
            });
            self.emit(SessionEvent::LoggedIn(snapshot));
            self.listeners.notify_login(&user);

            self.reconcile_after_mutation("login").await;

            log_operation_success!("login", username = %user.username);
            Ok(user)
        })
        .await
    }

    /// Register a new account. Registration does not log the user in.
    pub async fn register(&self, request: RegisterRequest) -> AuthSyncResult<User> {
        measure_async("register", async {
            log_operation_start!("register", username = %request.username);

            match self.service.register(request).await {
                Ok(user) => {
                    log_operation_success!("register", username = %user.username);
                    Ok(user)
                }
                Err(error) => Err(self.fail("register", error)),
            }
        })
        .await
    }

    /// Log out. Local cleanup always runs, whether or not the remote call
    /// succeeded; the remote failure is still returned to the caller but is
    /// not routed to the error listeners.
    pub async fn logout(&self) -> AuthSyncResult<()> {
        measure_async("logout", async {
            log_operation_start!("logout");

            let result = self.service.logout().await;
            if let Err(error) = &result {
                log_operation_error!("logout", error);
            }

            if let Err(error) = self.persistence.clear().await {
                warn!(error = %error, "Failed to clear persisted session");
            }

            self.cache.clear().await;
            let snapshot = self.update(|state| {
                state.supersede_fetches();
                state.clear();
            });
            self.emit(SessionEvent::LoggedOut(snapshot));
            self.listeners.notify_logout();

            info!("Session cleared");
            result
        })
        .await
    }

    /// Update the profile and adopt the returned user record
    pub async fn update_profile(&self, request: UpdateProfileRequest) -> AuthSyncResult<User> {
        measure_async("update_profile", async {
            log_operation_start!("update_profile");

            let user = match self.service.update_profile(request).await {
                Ok(user) => user,
                Err(error) => return Err(self.fail("update_profile", error)),
            };

            self.cache.invalidate(&self.config.status.cache_key).await;
            let snapshot = self.update(|state| {
                state.supersede_fetches();
                state.set_user(user.clone());
            });
            self.emit(SessionEvent::ProfileUpdated(snapshot));

            // Role changes may change the permission set
            self.reconcile_after_mutation("update_profile").await;

            log_operation_success!("update_profile", username = %user.username);
            Ok(user)
        })
        .await
    }

    /// Change the password. The session is left as is.
    pub async fn change_password(&self, request: ChangePasswordRequest) -> AuthSyncResult<()> {
        measure_async("change_password", async {
            log_operation_start!("change_password");

            match self.service.change_password(request).await {
                Ok(()) => {
                    log_operation_success!("change_password");
                    Ok(())
                }
                Err(error) => Err(self.fail("change_password", error)),
            }
        })
        .await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(SessionState::snapshot)
    }

    pub fn current_user(&self) -> Option<User> {
        self.read(|state| state.current_user().cloned())
    }

    pub fn permissions(&self) -> PermissionSet {
        self.read(|state| state.permissions().clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.authorization().is_authenticated())
    }

    pub fn is_loading(&self) -> bool {
        self.read(SessionState::is_loading)
    }

    pub fn is_admin(&self) -> bool {
        self.read(|state| state.authorization().is_admin())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.read(|state| state.authorization().has_permission(permission))
    }

    pub fn can_access(&self, resource: &str, action: &str) -> bool {
        self.read(|state| state.authorization().can_access(resource, action))
    }

    /// Token and user snapshot written by the last login, if any
    pub async fn stored_session(&self) -> AuthSyncResult<Option<PersistedSession>> {
        self.persistence.load().await
    }

    /// Receive a notification after every session change
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn listeners(&self) -> &SessionListeners {
        &self.listeners
    }

    pub fn config(&self) -> &AuthSyncConfig {
        &self.config
    }

    /// Refetch once the cached status has been invalidated
    async fn reconcile_after_mutation(&self, operation: &str) {
        if let Err(error) = self.reconcile().await {
            warn!(
                operation = operation,
                error = %error,
                "Status refetch after mutation failed, keeping current session"
            );
        }
    }

    fn fail(&self, operation: &str, error: AuthSyncError) -> AuthSyncError {
        log_operation_error!(operation, error);
        self.listeners.notify_error(&error);
        error
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn update<F>(&self, mutate: F) -> SessionSnapshot
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = write_state(&self.state);
        mutate(&mut state);
        state.snapshot()
    }

    fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&SessionState) -> T,
    {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        query(&state)
    }
}

fn write_state(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Loading hold for one status fetch.
///
/// Dropping it unsettled (the reconcile future was cancelled) still releases
/// the hold, so `loading` cannot stick.
struct PendingFetch<'a> {
    state: &'a RwLock<SessionState>,
    epoch: u64,
    settled: bool,
}

impl<'a> PendingFetch<'a> {
    fn begin(state: &'a RwLock<SessionState>) -> Self {
        let epoch = write_state(state).begin_fetch();
        Self {
            state,
            epoch,
            settled: false,
        }
    }

    /// Release the hold, running `apply` first unless a mutation superseded
    /// the fetch. Returns the resulting snapshot and whether `apply` ran.
    fn settle<F>(mut self, apply: F) -> (SessionSnapshot, bool)
    where
        F: FnOnce(&mut SessionState),
    {
        self.settled = true;
        let mut state = write_state(self.state);
        let current = state.epoch() == self.epoch;
        if current {
            apply(&mut state);
        }
        state.finish_fetch();
        (state.snapshot(), current)
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if !self.settled {
            write_state(self.state).finish_fetch();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.snapshot())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SessionManager`]
pub struct SessionManagerBuilder {
    service: Arc<dyn AuthService>,
    store: Option<Arc<dyn SessionStore>>,
    cache: Option<Arc<dyn RequestCache<AuthStatus>>>,
    config: AuthSyncConfig,
    listeners: SessionListeners,
}

impl SessionManagerBuilder {
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self {
            service,
            store: None,
            cache: None,
            config: AuthSyncConfig::default(),
            listeners: SessionListeners::new(),
        }
    }

    /// Set the persistence store (defaults to in-memory)
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the request cache (defaults to in-memory)
    pub fn with_cache(mut self, cache: Arc<dyn RequestCache<AuthStatus>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: AuthSyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_login_success<F>(self, listener: F) -> Self
    where
        F: Fn(&User) + Send + Sync + 'static,
    {
        self.listeners.on_login_success(listener);
        self
    }

    pub fn on_logout<F>(self, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.on_logout(listener);
        self
    }

    pub fn on_error<F>(self, listener: F) -> Self
    where
        F: Fn(&AuthSyncError) + Send + Sync + 'static,
    {
        self.listeners.on_error(listener);
        self
    }

    /// Validate the configuration and build the manager
    pub fn build(self) -> AuthSyncResult<SessionManager> {
        self.config.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryRequestCache::new()));

        Ok(SessionManager::from_parts(
            self.service,
            store,
            cache,
            self.config,
            self.listeners,
        ))
    }
}
