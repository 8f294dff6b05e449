//! HTTP surface for the health assistant
//!
//! Routes chat requests to the conversation agent and serves the fixed
//! record, appointment and health-data endpoints.

pub mod error;
pub mod handlers;
pub mod mock;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{build_router, run_server, spawn_session_sweeper};
pub use state::AppState;
