//! Graph layer of a walk.
//!
//! This module provides:
//! - **Store**: node/edge registry with an undirected adjacency index
//! - **Similarity**: Jaccard linking of new nodes to their closest tagged peers
//! - **Distance**: BFS depths from the seed and shortest paths
//!
//! # Example
//!
//! ```ignore
//! use wikiwalk::graph::{GraphStore, SimilarityConfig};
//!
//! let mut store = GraphStore::new(SimilarityConfig::new().with_neighbors(3));
//! let ensured = store.ensure_node(source.as_ref(), "Rust (programming language)").await?;
//! store.set_seed(&ensured.id);
//! ```

#![allow(dead_code)]

pub mod config;
pub mod distance;
pub mod similarity;
pub mod store;

// Re-exports
pub use config::{ConfigError, SimilarityConfig, DEFAULT_SIMILARITY_NEIGHBORS};
pub use distance::{BfsResult, DistanceOracle};
pub use similarity::{jaccard, top_k_similar, SimilarityMatch};
pub use store::{Adjacency, EdgeCounts, EnsuredNode, FetchedNode, GraphStore, PathIndex, UpsertOutcome};
