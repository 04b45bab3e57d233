//! Authoritative node/edge registry of a walk, with its adjacency index.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::SimilarityConfig;
use super::distance::DistanceOracle;
use super::similarity::top_k_similar;
use crate::models::{canonicalize, Depth, EdgeKey, EdgeKind, GraphEdge, WalkNode};
use crate::services::error::{WalkError, WalkResult};
use crate::services::link_source::{tag_set, LinkSource, PageSummary};

/// Undirected neighbor index over both edge kinds.
pub type Adjacency = HashMap<String, BTreeSet<String>>;

/// Whether an upsert created the edge or strengthened an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Result of [`GraphStore::ensure_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredNode {
    /// Canonical id of the node
    pub id: String,
    /// True when this call created the node
    pub is_new: bool,
    /// Similarity edges created for a new node
    pub similarity_links: usize,
}

/// Data resolved from the link source for a node that does not exist yet.
#[derive(Debug, Clone)]
pub struct FetchedNode {
    pub id: String,
    pub tags: BTreeSet<String>,
    pub summary: Option<PageSummary>,
    pub url: String,
}

/// Edge totals per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCounts {
    pub walk: usize,
    pub similarity: usize,
}

/// Node and edge registry for one run.
#[derive(Debug, Default)]
pub struct GraphStore {
    /// Nodes in creation order
    nodes: Vec<WalkNode>,
    /// id -> position in `nodes`
    node_index: HashMap<String, usize>,
    /// Edges in creation order
    edges: Vec<GraphEdge>,
    /// key -> position in `edges`
    edge_index: HashMap<EdgeKey, usize>,
    adjacency: Adjacency,
    seed: Option<String>,
    max_finite_depth: u32,
    similarity: SimilarityConfig,
}

impl GraphStore {
    /// Creates an empty store.
    pub fn new(similarity: SimilarityConfig) -> Self {
        Self {
            similarity,
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Returns the node for `title`, creating it from the link source if needed.
    ///
    /// Existing nodes never trigger a fetch. Tag resolution failures abort
    /// with [`WalkError::Fetch`]; a missing summary does not.
    pub async fn ensure_node(&mut self, source: &dyn LinkSource, title: &str) -> WalkResult<EnsuredNode> {
        self.ensure_node_checked(source, title, || Ok(())).await
    }

    /// Like [`ensure_node`](Self::ensure_node), but runs `commit_check` after
    /// the fetch and before registering anything. An error from the check
    /// leaves the store untouched.
    pub async fn ensure_node_checked<F>(
        &mut self,
        source: &dyn LinkSource,
        title: &str,
        commit_check: F,
    ) -> WalkResult<EnsuredNode>
    where
        F: Fn() -> WalkResult<()>,
    {
        let id = canonicalize(title);
        if id.is_empty() {
            return Err(WalkError::InvalidTitle(title.to_string()));
        }

        if self.node_index.contains_key(&id) {
            self.adjacency.entry(id.clone()).or_default();
            return Ok(EnsuredNode {
                id,
                is_new: false,
                similarity_links: 0,
            });
        }

        let fetched = Self::fetch_node_data(source, &id).await?;
        commit_check()?;
        Ok(self.insert_fetched(fetched))
    }

    /// Resolves tags and summary for `id` concurrently.
    pub async fn fetch_node_data(source: &dyn LinkSource, id: &str) -> WalkResult<FetchedNode> {
        let (tags, summary) = tokio::join!(source.resolve_tags(id), source.resolve_summary(id));
        let tags = tags?;

        let url = summary
            .as_ref()
            .and_then(|s| s.canonical_url.clone())
            .unwrap_or_else(|| source.page_url(id));

        Ok(FetchedNode {
            id: id.to_string(),
            tags: tag_set(tags),
            summary,
            url,
        })
    }

    /// Registers fetched node data. Idempotent on the id.
    pub fn insert_fetched(&mut self, fetched: FetchedNode) -> EnsuredNode {
        if self.node_index.contains_key(&fetched.id) {
            return EnsuredNode {
                id: fetched.id,
                is_new: false,
                similarity_links: 0,
            };
        }

        let id = fetched.id.clone();
        let node = WalkNode::new(
            fetched.id,
            fetched.tags,
            fetched.summary.map(|s| s.text),
            fetched.url,
            self.nodes.len() as u64,
        );

        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.adjacency.entry(id.clone()).or_default();

        let similarity_links = self.link_similar(&id);

        if self.seed.is_some() {
            self.refresh_depths();
        }

        debug!("Created node '{}' ({} similarity links)", id, similarity_links);

        EnsuredNode {
            id,
            is_new: true,
            similarity_links,
        }
    }

    /// Records a visit on a node.
    pub fn record_visit(&mut self, id: &str) -> Option<&WalkNode> {
        let idx = *self.node_index.get(id)?;
        let node = &mut self.nodes[idx];
        node.touch();
        Some(node)
    }

    pub fn node(&self, id: &str) -> Option<&WalkNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> &[WalkNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Adds one traversal between `a` and `b`. Self-pairs are ignored.
    pub fn upsert_walk_edge(&mut self, a: &str, b: &str) -> Option<UpsertOutcome> {
        let key = EdgeKey::new(a, b, EdgeKind::Walk)?;

        let outcome = match self.edge_index.get(&key) {
            Some(&idx) => {
                self.edges[idx].increment_walk();
                UpsertOutcome::Updated
            }
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(GraphEdge::new_walk(a, b));
                UpsertOutcome::Created
            }
        };

        self.add_adjacency(a, b);
        Some(outcome)
    }

    /// Proposes a similarity score for `a`–`b`; the stored weight becomes the
    /// maximum ever proposed. Self-pairs are ignored.
    pub fn upsert_similarity_edge(&mut self, a: &str, b: &str, score: f32) -> Option<UpsertOutcome> {
        let key = EdgeKey::new(a, b, EdgeKind::Similarity)?;

        let outcome = match self.edge_index.get(&key) {
            Some(&idx) => {
                self.edges[idx].raise_similarity(score);
                UpsertOutcome::Updated
            }
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(GraphEdge::new_similarity(a, b, score));
                debug!("Similarity link {} <-> {} ({:.3})", a, b, score);
                UpsertOutcome::Created
            }
        };

        self.add_adjacency(a, b);
        Some(outcome)
    }

    pub fn edge(&self, a: &str, b: &str, kind: EdgeKind) -> Option<&GraphEdge> {
        let key = EdgeKey::new(a, b, kind)?;
        self.edge_index.get(&key).map(|&idx| &self.edges[idx])
    }

    /// Edges in creation order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge_counts(&self) -> EdgeCounts {
        self.edges.iter().fold(EdgeCounts::default(), |mut counts, e| {
            match e.kind() {
                EdgeKind::Walk => counts.walk += 1,
                EdgeKind::Similarity => counts.similarity += 1,
            }
            counts
        })
    }

    fn add_adjacency(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.adjacency.entry(a.to_string()).or_default().insert(b.to_string());
        self.adjacency.entry(b.to_string()).or_default().insert(a.to_string());
    }

    pub fn neighbors(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(id)
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    // ------------------------------------------------------------------
    // Similarity
    // ------------------------------------------------------------------

    /// Links a freshly created node to its top-K most similar tagged nodes.
    fn link_similar(&mut self, id: &str) -> usize {
        let Some(&idx) = self.node_index.get(id) else {
            return 0;
        };
        let new_node = &self.nodes[idx];
        if !new_node.has_tags() {
            return 0;
        }

        let candidates = self.nodes.iter().map(|n| (n.id.as_str(), n.tags()));
        let matches = top_k_similar(id, new_node.tags(), candidates, &self.similarity);

        let mut created = 0;
        for m in matches {
            if self.upsert_similarity_edge(id, &m.id, m.score) == Some(UpsertOutcome::Created) {
                created += 1;
            }
        }
        created
    }

    // ------------------------------------------------------------------
    // Depths
    // ------------------------------------------------------------------

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    /// Fixes the seed and recomputes depths.
    pub fn set_seed(&mut self, id: &str) {
        self.seed = Some(id.to_string());
        self.refresh_depths();
    }

    /// Recomputes every node's depth with a full BFS from the seed.
    pub fn refresh_depths(&mut self) {
        let Some(seed) = self.seed.as_deref() else {
            return;
        };
        if self.nodes.is_empty() {
            return;
        }

        let result = DistanceOracle::compute(&self.adjacency, seed);

        let mut max_finite_depth = 0;
        for node in &mut self.nodes {
            node.depth = match result.distance_to(&node.id) {
                Some(d) => {
                    max_finite_depth = max_finite_depth.max(d);
                    Depth::Finite(d)
                }
                None => Depth::Unreachable,
            };
        }
        self.max_finite_depth = max_finite_depth;
    }

    /// Largest finite depth among nodes (0 when only the seed is reachable).
    pub fn max_finite_depth(&self) -> u32 {
        self.max_finite_depth
    }

    /// Shortest path from `id` to the seed over the adjacency index.
    ///
    /// `None` without a seed, for unknown ids, and for nodes outside the
    /// seed's component.
    pub fn path_to_seed(&self, id: &str) -> Option<Vec<String>> {
        let seed = self.seed.as_deref()?;
        if !self.contains(id) {
            return None;
        }
        DistanceOracle::path_between(&self.adjacency, id, seed)
    }

    /// Owned copy of what path queries need.
    pub fn path_index(&self) -> PathIndex {
        PathIndex {
            seed: self.seed.clone(),
            node_ids: self.node_index.keys().cloned().collect(),
            adjacency: self.adjacency.clone(),
        }
    }
}

/// Path-to-seed lookups detached from a [`GraphStore`].
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    seed: Option<String>,
    node_ids: HashSet<String>,
    adjacency: Adjacency,
}

impl PathIndex {
    /// Same answer as [`GraphStore::path_to_seed`] at the time of the copy.
    pub fn path_to_seed(&self, id: &str) -> Option<Vec<String>> {
        let seed = self.seed.as_deref()?;
        if !self.node_ids.contains(id) {
            return None;
        }
        DistanceOracle::path_between(&self.adjacency, id, seed)
    }
}
