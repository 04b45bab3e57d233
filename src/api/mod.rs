//! API module for wikiwalk.
//!
//! This module provides the HTTP REST API built with Axum:
//! - `/health` - Health check endpoint
//! - `/v1/walk` - Graph snapshot, counters, visit log and feedback
//! - `/v1/walk/{start,step,pause,resume,reset}` - Walk commands
//! - `/v1/walk/branching` - Pages visited per step
//! - `/v1/walk/select`, `/v1/walk/path/:node_id` - Path-to-seed queries
//! - `/v1/walk/stream` - Server-sent events

pub mod error;
pub mod handlers;
pub mod routes;
pub mod types;

// Re-exports
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AppState, SharedState};
pub use routes::{create_router, print_routes};
pub use types::*;
