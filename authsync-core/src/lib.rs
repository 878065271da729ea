//! authsync core - data model, error taxonomy and collaborator contracts
//!
//! This crate defines what the session manager consumes: the auth service,
//! persistence and request-cache traits, plus configuration, logging and
//! retry utilities shared by every authsync crate

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
