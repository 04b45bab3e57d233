#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::title::prettify;

/// Placeholder used when the link source has no summary for a page.
pub const PLACEHOLDER_SUMMARY: &str = "No summary available.";

/// Seed-relative hop distance of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Depth {
    /// Reachable from the seed in this many hops.
    Finite(u32),
    /// No path to the seed in the adjacency graph.
    Unreachable,
}

impl Depth {
    /// Returns the hop count when reachable.
    pub fn finite(&self) -> Option<u32> {
        match self {
            Depth::Finite(d) => Some(*d),
            Depth::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Depth::Finite(_))
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Unreachable
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Finite(d) => write!(f, "{}", d),
            Depth::Unreachable => write!(f, "∞"),
        }
    }
}

/// A discovered page in the walk graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkNode {
    /// Canonical title, unique within a run
    pub id: String,

    /// Display title
    pub title: String,

    /// Page URL (synthesized when the source has none)
    pub url: String,

    /// Short page summary or [`PLACEHOLDER_SUMMARY`]
    pub summary: String,

    /// Tags resolved at creation, never modified afterwards
    tags: BTreeSet<String>,

    /// Number of times the walk landed here
    pub visit_count: u64,

    /// Timestamp of the last visit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visited: Option<DateTime<Utc>>,

    /// Distance from the seed
    pub depth: Depth,

    /// Position in creation order (0 = first node of the run)
    pub creation_order: u64,
}

impl WalkNode {
    /// Creates an unvisited, unreachable node.
    pub fn new(
        id: String,
        tags: BTreeSet<String>,
        summary: Option<String>,
        url: String,
        creation_order: u64,
    ) -> Self {
        Self {
            title: prettify(&id),
            id,
            url,
            summary: summary.unwrap_or_else(|| PLACEHOLDER_SUMMARY.to_string()),
            tags,
            visit_count: 0,
            last_visited: None,
            depth: Depth::Unreachable,
            creation_order,
        }
    }

    /// The immutable tag set.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Registers a visit.
    pub fn touch(&mut self) {
        self.visit_count += 1;
        self.last_visited = Some(Utc::now());
    }
}
