//! Core types and utilities for the health assistant
//!
//! This crate provides configuration loading, logging setup, the
//! in-memory session store and the shared error type used by the
//! provider, agent and server crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
