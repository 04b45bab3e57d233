//! API route definitions.

#![allow(dead_code)]

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{self, SharedState};

/// Creates the API router with all routes configured
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API v1 routes
        .nest("/v1", api_v1_routes())
        // State
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<SharedState> {
    Router::new().nest("/walk", walk_routes())
}

/// Walk control and read routes
fn walk_routes() -> Router<SharedState> {
    Router::new()
        // Snapshot and counters
        .route("/", get(handlers::get_snapshot))
        .route("/stats", get(handlers::get_stats))
        // Commands
        .route("/start", post(handlers::start_walk))
        .route("/step", post(handlers::step_walk))
        .route("/pause", post(handlers::pause_walk))
        .route("/resume", post(handlers::resume_walk))
        .route("/reset", post(handlers::reset_walk))
        .route("/branching", put(handlers::set_branching))
        // Selection and paths
        .route("/select", post(handlers::select_node))
        .route("/path/:node_id", get(handlers::path_to_seed))
        // Visit log and feedback
        .route("/log", get(handlers::get_log))
        .route("/feedback", get(handlers::get_feedback))
        // Live updates (SSE)
        .route("/stream", get(handlers::walk_stream))
}

/// Prints all available routes for logging
pub fn print_routes() {
    tracing::info!("Available API routes:");
    tracing::info!("  GET  /health                 - Health check with walk status");
    tracing::info!("  GET  /v1/walk                - Latest graph snapshot");
    tracing::info!("  GET  /v1/walk/stats          - Walk counters");
    tracing::info!("  POST /v1/walk/start          - Start a walk at a seed title");
    tracing::info!("  POST /v1/walk/step           - Run one step now");
    tracing::info!("  POST /v1/walk/pause          - Pause the run loop");
    tracing::info!("  POST /v1/walk/resume         - Resume the run loop");
    tracing::info!("  POST /v1/walk/reset          - Discard the walk");
    tracing::info!("  PUT  /v1/walk/branching      - Set pages visited per step");
    tracing::info!("  POST /v1/walk/select         - Toggle path-to-seed highlight");
    tracing::info!("  GET  /v1/walk/path/:node_id  - Shortest path to the seed");
    tracing::info!("  GET  /v1/walk/log            - Recent visits");
    tracing::info!("  GET  /v1/walk/feedback       - Latest feedback message");
    tracing::info!("  GET  /v1/walk/stream         - SSE snapshot and feedback stream");
}
