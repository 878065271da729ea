//! Collaborator contracts consumed by the session manager

use crate::async_utils::RetryConfig;
use crate::error::AuthSyncResult;
use crate::types::*;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;

/// Remote authentication service
///
/// Implementations report an invalid or expired session as
/// [`crate::AuthSyncError::Unauthorized`]; every other failure is treated as
/// transient by status reconciliation.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginRequest) -> AuthSyncResult<LoginResponse>;

    async fn logout(&self) -> AuthSyncResult<()>;

    async fn register(&self, request: RegisterRequest) -> AuthSyncResult<User>;

    async fn get_status(&self) -> AuthSyncResult<AuthStatus>;

    async fn update_profile(&self, request: UpdateProfileRequest) -> AuthSyncResult<User>;

    async fn change_password(&self, request: ChangePasswordRequest) -> AuthSyncResult<()>;
}

/// Key-value persistence for the session token and user snapshot
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> AuthSyncResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> AuthSyncResult<()>;

    async fn remove(&self, key: &str) -> AuthSyncResult<()>;
}

/// Produces a fresh value for a cache miss
pub type Fetcher<V> = Box<dyn Fn() -> BoxFuture<'static, AuthSyncResult<V>> + Send + Sync>;

/// Freshness and retry policy for a cached request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    /// A cached value younger than this is reused without fetching
    pub stale_time: Duration,
    pub retry: RetryConfig,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            retry: RetryConfig::with_retries(2),
        }
    }
}

/// Request cache with explicit invalidation
#[async_trait]
pub trait RequestCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Return the cached value for `key` if still fresh, otherwise run
    /// `fetcher` under the policy's retry rules and cache a successful result.
    /// Unauthorized failures are never retried.
    async fn fetch_with_policy(
        &self,
        key: &str,
        policy: &FetchPolicy,
        fetcher: Fetcher<V>,
    ) -> AuthSyncResult<V>;

    /// Mark `key` stale so the next fetch goes to the source
    async fn invalidate(&self, key: &str);

    /// Drop every cached entry
    async fn clear(&self);
}
