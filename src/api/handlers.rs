//! API request handlers.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::models::canonicalize;
use crate::services::{GraphSnapshot, RunController, StepOutcome, MAX_BRANCH_FACTOR};

use super::error::{ApiError, ApiResult};
use super::types::*;

/// Interval between snapshot events on the SSE stream.
const STREAM_INTERVAL: Duration = Duration::from_millis(250);

/// Application state shared across handlers
pub struct AppState {
    /// The walk of this process
    pub controller: RunController,
}

/// Thread-safe shared state
pub type SharedState = Arc<AppState>;

// ============================================================================
// Health Check Handler
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let stats = state.controller.stats().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "wikiwalk".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            link_source: state.controller.provider_name().to_string(),
            walk_status: stats.status,
            run_loop: state.controller.is_running(),
        },
    })
}

// ============================================================================
// Walk Commands
// ============================================================================

/// Start a walk at a seed title
pub async fn start_walk(
    State(state): State<SharedState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StartResponse>> {
    if canonicalize(&request.title).is_empty() {
        return Err(ApiError::ValidationError("Title cannot be empty".to_string()));
    }

    info!("Start requested at '{}'", request.title);

    let seed = if request.autorun.unwrap_or(true) {
        state.controller.start(&request.title).await?
    } else {
        state.controller.start_paused(&request.title).await?
    };

    Ok(Json(StartResponse {
        success: true,
        seed,
        stats: state.controller.stats().await,
    }))
}

/// Run a single step now
pub async fn step_walk(State(state): State<SharedState>) -> ApiResult<Json<StepResponse>> {
    let outcome = state.controller.step().await?;

    if outcome == StepOutcome::Skipped {
        debug!("Manual step skipped, another step is in flight");
    }

    Ok(Json(StepResponse {
        success: true,
        outcome,
        stats: state.controller.stats().await,
    }))
}

/// Pause the run loop
pub async fn pause_walk(State(state): State<SharedState>) -> Json<CommandResponse> {
    state.controller.pause().await;

    Json(CommandResponse {
        success: true,
        message: "Walk paused".to_string(),
        stats: state.controller.stats().await,
    })
}

/// Resume the run loop
pub async fn resume_walk(State(state): State<SharedState>) -> ApiResult<Json<CommandResponse>> {
    state.controller.resume().await?;

    Ok(Json(CommandResponse {
        success: true,
        message: "Walk resumed".to_string(),
        stats: state.controller.stats().await,
    }))
}

/// Discard the walk
pub async fn reset_walk(State(state): State<SharedState>) -> Json<CommandResponse> {
    state.controller.reset().await;

    Json(CommandResponse {
        success: true,
        message: "Walk reset".to_string(),
        stats: state.controller.stats().await,
    })
}

/// Change pages visited per step
pub async fn set_branching(
    State(state): State<SharedState>,
    Json(request): Json<BranchingRequest>,
) -> ApiResult<Json<BranchingResponse>> {
    if request.factor == 0 || request.factor > MAX_BRANCH_FACTOR {
        return Err(ApiError::ValidationError(format!(
            "Branch factor must be between 1 and {}",
            MAX_BRANCH_FACTOR
        )));
    }

    let factor = state.controller.set_branch_factor(request.factor).await?;
    let experimental = state.controller.is_experimental().await;

    Ok(Json(BranchingResponse {
        success: true,
        factor,
        experimental,
    }))
}

// ============================================================================
// Selection and Paths
// ============================================================================

/// Toggle the path-to-seed highlight on a node
pub async fn select_node(
    State(state): State<SharedState>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<SelectResponse>> {
    let node_id = canonicalize(&request.node_id);
    if node_id.is_empty() {
        return Err(ApiError::ValidationError("Node id cannot be empty".to_string()));
    }

    let selection = state.controller.select_node(&node_id).await;

    Ok(Json(SelectResponse {
        success: true,
        selection,
    }))
}

/// Shortest path from a node to the seed
pub async fn path_to_seed(
    State(state): State<SharedState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<PathResponse>> {
    let node_id = canonicalize(&node_id);

    let known = state
        .controller
        .snapshot()
        .await
        .nodes
        .iter()
        .any(|n| n.id == node_id);
    if !known {
        return Err(ApiError::NotFound(format!("Node {} not found", node_id)));
    }

    let path = state.controller.find_path_to_seed(&node_id).await;
    let hops = path.as_ref().map(|p| p.len().saturating_sub(1));

    Ok(Json(PathResponse {
        success: true,
        node_id,
        path,
        hops,
    }))
}

// ============================================================================
// Read Models
// ============================================================================

/// Latest graph snapshot
pub async fn get_snapshot(State(state): State<SharedState>) -> Json<GraphSnapshot> {
    Json(state.controller.snapshot().await)
}

/// Walk counters
pub async fn get_stats(State(state): State<SharedState>) -> Json<crate::services::WalkStats> {
    Json(state.controller.stats().await)
}

/// Recent visits
pub async fn get_log(State(state): State<SharedState>) -> Json<LogResponse> {
    let entries = state.controller.visit_log().await;

    Json(LogResponse {
        count: entries.len(),
        entries,
    })
}

/// Latest feedback message
pub async fn get_feedback(State(state): State<SharedState>) -> Json<FeedbackResponse> {
    Json(FeedbackResponse {
        feedback: state.controller.last_feedback().await,
    })
}

/// SSE stream of snapshots (every 250ms) and feedback messages as they happen.
pub async fn walk_stream(State(state): State<SharedState>) -> impl IntoResponse {
    let controller = state.controller.clone();
    let mut feedback = controller.subscribe();

    let stream = async_stream::stream! {
        let mut interval = tokio::time::interval(STREAM_INTERVAL);

        loop {
            let event = tokio::select! {
                _ = interval.tick() => json_event("snapshot", &controller.snapshot().await),
                message = feedback.recv() => match message {
                    Ok(fb) => json_event("feedback", &fb),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Feedback stream lagged, skipped {} messages", skipped);
                        None
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if let Some(event) = event {
                yield Ok::<_, Infallible>(event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn json_event<T: Serialize>(name: &str, value: &T) -> Option<Event> {
    match Event::default().event(name).json_data(value) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Failed to serialize {} event: {}", name, e);
            None
        }
    }
}
