//! wikiwalk: random walks over an external link graph.
//!
//! This module exposes the public API of the library.

#![allow(dead_code)]

pub mod api;
pub mod graph;
pub mod models;
pub mod services;

// Core model types
pub use models::{canonicalize, prettify, Depth, EdgeKind, EdgeWeight, GraphEdge, WalkNode};

// Graph exports
pub use graph::{DistanceOracle, GraphStore, SimilarityConfig};

// Walk service exports
pub use services::{
    Feedback, FetchError, GraphSnapshot, LinkSource, LinkSourceConfig, LinkSourceFactory,
    MockLinkSource, RunController, Severity, StepOutcome, StepReport, WalkConfig, WalkEngine,
    WalkError, WalkStats, WalkStatus,
};
