#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of relationship between two walk nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// The walk moved between the two pages
    Walk,
    /// The pages share tags
    Similarity,
}

/// Edge weight, discriminated by kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum EdgeWeight {
    /// Traversal count, only ever incremented
    Walk(u64),
    /// Jaccard score in [0, 1], only ever raised
    Similarity(f32),
}

impl EdgeWeight {
    pub fn kind(&self) -> EdgeKind {
        match self {
            EdgeWeight::Walk(_) => EdgeKind::Walk,
            EdgeWeight::Similarity(_) => EdgeKind::Similarity,
        }
    }

    /// Weight as a float, for consumers that do not care about the kind.
    pub fn as_f64(&self) -> f64 {
        match self {
            EdgeWeight::Walk(count) => *count as f64,
            EdgeWeight::Similarity(score) => f64::from(*score),
        }
    }
}

/// Unordered pair of node ids plus kind. The smaller id is always stored first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: String,
    pub b: String,
    pub kind: EdgeKind,
}

impl EdgeKey {
    /// Builds a key; returns `None` for a self-pair.
    pub fn new(x: &str, y: &str, kind: EdgeKind) -> Option<Self> {
        if x == y {
            return None;
        }
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        Some(Self {
            a: a.to_string(),
            b: b.to_string(),
            kind,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

/// Edge in the walk graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Endpoint first seen as the source
    pub source: String,

    /// Endpoint first seen as the target
    pub target: String,

    /// Weight (carries the kind)
    pub weight: EdgeWeight,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GraphEdge {
    /// Creates a walk edge with one traversal.
    pub fn new_walk(source: &str, target: &str) -> Self {
        Self::with_weight(source, target, EdgeWeight::Walk(1))
    }

    /// Creates a similarity edge; the score is clamped to [0, 1].
    pub fn new_similarity(source: &str, target: &str, score: f32) -> Self {
        Self::with_weight(source, target, EdgeWeight::Similarity(clamp_score(score)))
    }

    fn with_weight(source: &str, target: &str, weight: EdgeWeight) -> Self {
        let now = Utc::now();
        Self {
            source: source.to_string(),
            target: target.to_string(),
            weight,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> EdgeKind {
        self.weight.kind()
    }

    /// Adds one traversal. No-op on similarity edges.
    pub fn increment_walk(&mut self) {
        if let EdgeWeight::Walk(count) = &mut self.weight {
            *count += 1;
            self.updated_at = Utc::now();
        }
    }

    /// Raises the similarity score to `max(current, score)`. No-op on walk edges.
    pub fn raise_similarity(&mut self, score: f32) {
        if let EdgeWeight::Similarity(current) = &mut self.weight {
            let clamped = clamp_score(score);
            if clamped > *current {
                *current = clamped;
                self.updated_at = Utc::now();
            }
        }
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
