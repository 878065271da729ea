//! Unified error handling system
//!
//! Provides structured error types with context, an explicit unauthorized
//! classification, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

pub type AuthSyncResult<T> = Result<T, AuthSyncError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for authsync
#[derive(Error, Debug)]
pub enum AuthSyncError {
    /// The session is missing, invalid or expired
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The auth service rejected an operation for a reason other than authorization
    #[error("Auth service error: {message}")]
    Service {
        message: String,
        status: Option<u16>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Not initialized: {component}")]
    NotInitialized {
        component: String,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl AuthSyncError {
    /// Build an error from a transport status code.
    ///
    /// Only 401 is classified as unauthorized. A 403 is a refusal of one
    /// request, not proof the session is gone, so it stays a service error.
    pub fn from_status(status: u16, message: &str) -> Self {
        let context = ErrorContext::new("auth_service")
            .with_metadata("status", &status.to_string());
        match status {
            401 => AuthSyncError::Unauthorized {
                message: message.to_string(),
                context,
            },
            408 => AuthSyncError::Timeout {
                operation: message.to_string(),
                duration_ms: 0,
                context,
            },
            500..=599 => AuthSyncError::Network {
                message: message.to_string(),
                source: None,
                context: context.with_suggestion("Retry once the auth service recovers"),
            },
            _ => AuthSyncError::Service {
                message: message.to_string(),
                status: Some(status),
                context,
            },
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            AuthSyncError::Unauthorized { context, .. } => Some(context),
            AuthSyncError::Network { context, .. } => Some(context),
            AuthSyncError::Service { context, .. } => Some(context),
            AuthSyncError::Storage { context, .. } => Some(context),
            AuthSyncError::Cache { context, .. } => Some(context),
            AuthSyncError::Config { context, .. } => Some(context),
            AuthSyncError::Validation { context, .. } => Some(context),
            AuthSyncError::NotInitialized { context, .. } => Some(context),
            AuthSyncError::Timeout { context, .. } => Some(context),
            AuthSyncError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the failure means the session is invalid. Such failures are
    /// never retried.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthSyncError::Unauthorized { .. })
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthSyncError::Network { .. } => true,
            AuthSyncError::Timeout { .. } => true,
            AuthSyncError::Io(_) => true,
            AuthSyncError::Unauthorized { .. } => false,
            AuthSyncError::Config { .. } => false,
            AuthSyncError::Validation { .. } => false,
            AuthSyncError::NotInitialized { .. } => false,
            _ => false,
        }
    }

    /// Get retry delay in milliseconds for recoverable errors
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            AuthSyncError::Network { .. } => Some(1000),
            AuthSyncError::Timeout { .. } => Some(2000),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            AuthSyncError::Unauthorized { .. } => {
                debug!(error_id = ?error_id, error = %self, "Session is not authorized");
            }
            AuthSyncError::Internal { .. } => {
                error!(error_id = ?error_id, error = %self, "Internal error occurred");
            }
            AuthSyncError::Config { .. } | AuthSyncError::Validation { .. } => {
                error!(
                    error_id = ?error_id,
                    error = %self,
                    "Configuration or validation error"
                );
            }
            AuthSyncError::Network { .. } | AuthSyncError::Timeout { .. } => {
                warn!(
                    error_id = ?error_id,
                    error = %self,
                    "Network or timeout error (may be recoverable)"
                );
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! unauthorized_error {
    ($msg:expr, $component:expr) => {
        $crate::AuthSyncError::Unauthorized {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Log in again to obtain a new session"),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::AuthSyncError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::AuthSyncError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::AuthSyncError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}
