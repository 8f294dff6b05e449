//! Session management for conversation history
//!
//! Sessions live in memory for the lifetime of the process. Each session is
//! guarded by its own async mutex so one conversation turn at a time can
//! read and extend its history.

pub mod manager;
pub mod store;

pub use manager::{SessionHandle, SessionManager};
pub use store::{ChatMessage, Role, Session};
