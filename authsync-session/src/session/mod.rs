//! Session Module
//!
//! Session state, its persistence, the status request cache and the
//! manager that ties them to an auth service.

pub mod cache;
pub mod events;
pub mod manager;
pub mod storage;
pub mod types;

pub use cache::{CacheStats, MemoryRequestCache};
pub use events::SessionListeners;
pub use manager::{SessionManager, SessionManagerBuilder};
pub use storage::{FileSessionStore, MemorySessionStore, SessionPersistence};
pub use types::*;
