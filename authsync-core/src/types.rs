//! Core data type definitions

use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Role attached to a user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Permission strings granted by the role, as reported by the auth service
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_system: bool,
}

/// User record returned by the auth service
///
/// Only `role.name` and `role_id` are inspected by the session manager; the
/// remaining fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Create a minimal user with no role
    pub fn new(id: i64, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            email: None,
            first_name: None,
            last_name: None,
            role_id: None,
            role: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role_id = Some(role.id);
        self.role = Some(role);
        self
    }

    pub fn with_role_id(mut self, role_id: i64) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Name of the attached role, if any
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }
}

/// Response of a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

impl AuthStatus {
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            user: None,
            permissions: None,
        }
    }

    pub fn authenticated(user: User, permissions: Option<Vec<String>>) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub user: User,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSyncConfig {
    pub status: StatusQueryConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

/// Status reconciliation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusQueryConfig {
    /// Request cache key for the status query
    pub cache_key: String,
    /// How long a fetched status stays fresh, in seconds
    pub stale_time_secs: u64,
    /// Additional attempts after the first failed one
    pub max_retries: usize,
    /// Delay before the first retry in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Upper bound for the retry delay in milliseconds
    pub retry_max_delay_ms: u64,
}

/// Persistence slot names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub token_key: String,
    pub user_key: String,
    /// Directory for the file-backed store (None = platform data dir)
    pub storage_dir: Option<String>,
}
