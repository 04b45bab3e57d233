//! Service configuration.

#![allow(dead_code)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::config::{ConfigError, SimilarityConfig};

/// Largest accepted branch factor.
pub const MAX_BRANCH_FACTOR: usize = 50;

/// Configuration for the walk engine and its run loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Pages visited per step (1 = plain walk, >1 = branching variant).
    pub branch_factor: usize,

    /// Branch factors above this are logged as experimental.
    pub experimental_branch_threshold: usize,

    /// Pause between consecutive loop steps.
    pub step_delay: Duration,

    /// Maximum entries kept in the visit log.
    pub max_log_items: usize,

    /// Seed for the step RNG. `None` draws from entropy.
    pub rng_seed: Option<u64>,

    /// Similarity linker settings.
    pub similarity: SimilarityConfig,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            branch_factor: 1,
            experimental_branch_threshold: 15,
            step_delay: Duration::ZERO,
            max_log_items: 50,
            rng_seed: None,
            similarity: SimilarityConfig::default(),
        }
    }
}

impl WalkConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set branch factor.
    pub fn with_branch_factor(mut self, factor: usize) -> Self {
        self.branch_factor = factor.clamp(1, MAX_BRANCH_FACTOR);
        self
    }

    /// Builder: set delay between loop steps.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Builder: set visit log capacity.
    pub fn with_max_log_items(mut self, max: usize) -> Self {
        self.max_log_items = max.max(1);
        self
    }

    /// Builder: fix the RNG seed.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Builder: set similarity configuration.
    pub fn with_similarity(mut self, similarity: SimilarityConfig) -> Self {
        self.similarity = similarity;
        self
    }

    /// Whether the current branch factor is in the experimental range.
    pub fn is_experimental(&self) -> bool {
        self.branch_factor > self.experimental_branch_threshold
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch_factor == 0 || self.branch_factor > MAX_BRANCH_FACTOR {
            return Err(ConfigError::InvalidBranchFactor(self.branch_factor));
        }
        if self.max_log_items == 0 {
            return Err(ConfigError::InvalidLogCapacity);
        }
        self.similarity.validate()
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            similarity: SimilarityConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("WALK_BRANCH_FACTOR") {
            if let Ok(factor) = val.parse::<usize>() {
                config.branch_factor = factor.clamp(1, MAX_BRANCH_FACTOR);
            }
        }

        if let Ok(val) = std::env::var("WALK_STEP_DELAY_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.step_delay = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("WALK_RNG_SEED") {
            if let Ok(seed) = val.parse::<u64>() {
                config.rng_seed = Some(seed);
            }
        }

        config
    }
}

/// Configuration for link source providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSourceConfig {
    /// Provider name ("wikipedia" or "mock").
    pub provider: String,

    /// MediaWiki action API endpoint.
    pub api_base: String,

    /// REST summary endpoint prefix.
    pub summary_base: String,

    /// Prefix used to synthesize page URLs.
    pub page_base: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Stop paginating links after this many.
    pub max_links: usize,

    /// Stop paginating tags after this many.
    pub max_tags: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for LinkSourceConfig {
    fn default() -> Self {
        Self {
            provider: "wikipedia".to_string(),
            api_base: "https://en.wikipedia.org/w/api.php".to_string(),
            summary_base: "https://en.wikipedia.org/api/rest_v1/page/summary/".to_string(),
            page_base: "https://en.wikipedia.org/wiki/".to_string(),
            timeout: Duration::from_secs(30),
            max_links: 800,
            max_tags: 160,
            user_agent: concat!("wikiwalk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LinkSourceConfig {
    /// Creates a new configuration.
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    /// Builder: set API base URL.
    pub fn with_api_base(mut self, url: String) -> Self {
        self.api_base = url;
        self
    }

    /// Builder: set summary base URL.
    pub fn with_summary_base(mut self, url: String) -> Self {
        self.summary_base = url;
        self
    }

    /// Builder: set page base URL.
    pub fn with_page_base(mut self, url: String) -> Self {
        self.page_base = url;
        self
    }

    /// Builder: set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set link cap.
    pub fn with_max_links(mut self, max: usize) -> Self {
        self.max_links = max.max(1);
        self
    }

    /// Builder: set tag cap.
    pub fn with_max_tags(mut self, max: usize) -> Self {
        self.max_tags = max.max(1);
        self
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LINK_SOURCE_PROVIDER") {
            config.provider = val;
        }

        if let Ok(val) = std::env::var("WIKI_API_BASE") {
            config.api_base = val;
        }

        if let Ok(val) = std::env::var("WIKI_SUMMARY_BASE") {
            config.summary_base = val;
        }

        if let Ok(val) = std::env::var("WIKI_PAGE_BASE") {
            config.page_base = val;
        }

        if let Ok(val) = std::env::var("LINK_SOURCE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.timeout = Duration::from_secs(secs);
            }
        }

        config
    }
}
