//! API request/response types.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::services::{Feedback, Selection, StepOutcome, VisitEntry, WalkStats, WalkStatus};

// ============================================================================
// Health Check
// ============================================================================

/// Health check response
#[derive(Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub components: HealthComponents,
}

/// State of the walk components
#[derive(Serialize, Deserialize, Clone)]
pub struct HealthComponents {
    pub link_source: String,
    pub walk_status: WalkStatus,
    pub run_loop: bool,
}

// ============================================================================
// Walk Commands
// ============================================================================

/// Request to start a walk
#[derive(Deserialize, Serialize)]
pub struct StartRequest {
    /// Seed page title
    pub title: String,

    /// Run steps in the background (default: true)
    pub autorun: Option<bool>,
}

/// Response from starting a walk
#[derive(Serialize, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    pub seed: VisitEntry,
    pub stats: WalkStats,
}

/// Response from a manual step
#[derive(Serialize, Deserialize)]
pub struct StepResponse {
    pub success: bool,
    pub outcome: StepOutcome,
    pub stats: WalkStats,
}

/// Response from pause/resume/reset
#[derive(Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    pub stats: WalkStats,
}

// ============================================================================
// Branching
// ============================================================================

/// Request to change the branch factor
#[derive(Deserialize, Serialize)]
pub struct BranchingRequest {
    pub factor: usize,
}

/// Response from changing the branch factor
#[derive(Serialize, Deserialize)]
pub struct BranchingResponse {
    pub success: bool,
    pub factor: usize,
    pub experimental: bool,
}

// ============================================================================
// Selection and Paths
// ============================================================================

/// Request to toggle the highlight on a node
#[derive(Deserialize, Serialize)]
pub struct SelectRequest {
    pub node_id: String,
}

/// Response from a selection toggle
#[derive(Serialize, Deserialize)]
pub struct SelectResponse {
    pub success: bool,
    pub selection: Selection,
}

/// Path from a node to the seed
#[derive(Serialize, Deserialize)]
pub struct PathResponse {
    pub success: bool,
    pub node_id: String,
    pub path: Option<Vec<String>>,
    pub hops: Option<usize>,
}

// ============================================================================
// Log and Feedback
// ============================================================================

/// Recent visits, newest first
#[derive(Serialize, Deserialize)]
pub struct LogResponse {
    pub count: usize,
    pub entries: Vec<VisitEntry>,
}

/// Latest feedback message
#[derive(Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: Option<Feedback>,
}
