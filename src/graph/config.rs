//! Graph algorithm configuration.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Default number of similarity neighbors linked per new node.
pub const DEFAULT_SIMILARITY_NEIGHBORS: usize = 3;

/// Configuration for the similarity linker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Maximum similarity edges proposed for each newly created node (K).
    pub neighbors: usize,

    /// Scores at or below this value never produce an edge.
    pub min_score: f32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            neighbors: DEFAULT_SIMILARITY_NEIGHBORS,
            min_score: 0.0,
        }
    }
}

impl SimilarityConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set number of neighbors (K).
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Builder: set minimum score.
    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = score.clamp(0.0, 1.0);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_score < 0.0 || self.min_score >= 1.0 {
            return Err(ConfigError::InvalidMinScore);
        }
        Ok(())
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WALK_SIMILARITY_NEIGHBORS") {
            if let Ok(k) = val.parse::<usize>() {
                config.neighbors = k;
            }
        }

        config
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMinScore,
    InvalidBranchFactor(usize),
    InvalidLogCapacity,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMinScore => write!(f, "Minimum similarity score must be in [0.0, 1.0)"),
            Self::InvalidBranchFactor(n) => {
                write!(f, "Branch factor must be between 1 and 50, got {}", n)
            }
            Self::InvalidLogCapacity => write!(f, "Visit log capacity must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
