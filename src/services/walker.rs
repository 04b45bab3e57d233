//! Walk engine: forward steps, backtracking and the branching variant.
//!
//! The engine is a plain state machine owned by one caller. It suspends only
//! while awaiting the [`LinkSource`]; after every such await it checks its
//! [`Generation`] and abandons the step with [`WalkError::Superseded`] when a
//! reset happened meanwhile.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::config::{WalkConfig, MAX_BRANCH_FACTOR};
use super::error::{WalkError, WalkResult};
use super::feedback::{VisitEntry, VisitLog};
use super::link_source::LinkSource;
use crate::graph::{EdgeCounts, GraphStore};
use crate::models::{canonicalize, GraphEdge, WalkNode};

/// Lifecycle state of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkStatus {
    /// No seed yet
    Idle,
    Running,
    Paused,
    /// Backtracking exhausted the walk stack
    Stuck,
}

impl WalkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalkStatus::Idle => "idle",
            WalkStatus::Running => "running",
            WalkStatus::Paused => "paused",
            WalkStatus::Stuck => "stuck",
        }
    }
}

/// Snapshot of a shared reset counter taken when an engine is created.
#[derive(Debug, Clone)]
pub struct Generation {
    counter: Arc<AtomicU64>,
    value: u64,
}

impl Generation {
    /// Captures the counter's current value.
    pub fn current(counter: &Arc<AtomicU64>) -> Self {
        Self {
            counter: counter.clone(),
            value: counter.load(Ordering::SeqCst),
        }
    }

    /// A generation nobody else can advance.
    pub fn detached() -> Self {
        Self::current(&Arc::new(AtomicU64::new(0)))
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.value
    }

    /// Fails with [`WalkError::Superseded`] once the counter moved on.
    pub fn check(&self) -> WalkResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(WalkError::Superseded)
        }
    }
}

/// What a step (plain or branching) did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Last step number consumed
    pub step: u64,
    /// Node the walk moved away from (after any backtracking)
    pub from: String,
    /// Nodes visited by this step, in visit order
    pub visited: Vec<String>,
    /// New current node
    pub current: String,
    /// Position restored by backtracking, if any
    pub backtracked_to: Option<String>,
    /// Ids excluded while backtracking
    pub avoided: BTreeSet<String>,
    /// Nodes created by this step
    pub new_nodes: usize,
}

/// Outcome of toggling the highlight selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    /// The node was already selected; selection cleared
    Cleared,
    /// Node selected; `path` runs from it to the seed when connected
    Selected {
        node_id: String,
        path: Option<Vec<String>>,
    },
}

/// Aggregate counters of a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkStats {
    pub status: WalkStatus,
    pub step_count: u64,
    pub node_count: usize,
    pub walk_edges: usize,
    pub similarity_edges: usize,
    pub max_finite_depth: u32,
    pub current_title: Option<String>,
    pub branch_factor: usize,
}

/// Immutable view of the graph and walk state handed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub generation: u64,
    pub status: WalkStatus,
    pub seed: Option<String>,
    pub current: Option<String>,
    pub previous: Option<String>,
    pub stack: Vec<String>,
    pub nodes: Vec<WalkNode>,
    pub edges: Vec<GraphEdge>,
    pub edge_counts: EdgeCounts,
    pub max_finite_depth: u32,
    pub step_count: u64,
    pub branch_factor: usize,
    pub selected: Option<String>,
    pub highlight: Vec<String>,
    pub taken_at: DateTime<Utc>,
}

impl GraphSnapshot {
    /// Snapshot of a walk that has not started.
    pub fn empty(generation: u64, branch_factor: usize) -> Self {
        Self {
            generation,
            status: WalkStatus::Idle,
            seed: None,
            current: None,
            previous: None,
            stack: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            edge_counts: EdgeCounts::default(),
            max_finite_depth: 0,
            step_count: 0,
            branch_factor,
            selected: None,
            highlight: Vec::new(),
            taken_at: Utc::now(),
        }
    }
}

/// Candidates found for the next move.
struct Candidates {
    from: String,
    links: Vec<String>,
    backtracked_to: Option<String>,
    avoided: BTreeSet<String>,
}

/// State machine for one run.
pub struct WalkEngine {
    config: WalkConfig,
    store: GraphStore,
    /// Seed first, current node on top
    stack: Vec<String>,
    current: Option<String>,
    previous: Option<String>,
    status: WalkStatus,
    step_count: u64,
    log: VisitLog,
    rng: StdRng,
    generation: Generation,
    selected: Option<String>,
    highlight: Vec<String>,
}

impl WalkEngine {
    /// Creates an idle engine bound to `generation`.
    pub fn new(config: WalkConfig, generation: Generation) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store: GraphStore::new(config.similarity.clone()),
            log: VisitLog::new(config.max_log_items),
            stack: Vec::new(),
            current: None,
            previous: None,
            status: WalkStatus::Idle,
            step_count: 0,
            rng,
            generation,
            selected: None,
            highlight: Vec::new(),
            config,
        }
    }

    /// Engine that can only be reset through [`reset`](Self::reset).
    pub fn standalone(config: WalkConfig) -> Self {
        Self::new(config, Generation::detached())
    }

    // ===== Lifecycle =====

    /// Seeds a new walk at `title` and enters `Running`.
    ///
    /// Any previous walk state is discarded first. If the seed cannot be
    /// resolved the engine stays `Idle` with an empty graph.
    pub async fn start(&mut self, source: &dyn LinkSource, title: &str) -> WalkResult<VisitEntry> {
        if canonicalize(title).is_empty() {
            return Err(WalkError::InvalidTitle(title.to_string()));
        }

        self.clear_state();

        let generation = self.generation.clone();
        let ensured = match self
            .store
            .ensure_node_checked(source, title, || generation.check())
            .await
        {
            Ok(ensured) => ensured,
            Err(e) => {
                self.clear_state();
                return Err(e);
            }
        };

        let id = ensured.id;
        self.store.set_seed(&id);
        let entry = self.visit(&id, None, 0);
        self.stack.push(id.clone());
        self.current = Some(id.clone());
        self.previous = None;
        self.status = WalkStatus::Running;

        info!("Walk started at '{}'", id);
        Ok(entry)
    }

    /// Stops scheduling further steps. No-op unless `Running`.
    pub fn pause(&mut self) {
        if self.status == WalkStatus::Running {
            self.status = WalkStatus::Paused;
            info!("Walk paused at step {}", self.step_count);
        }
    }

    /// Re-enters `Running`. Requires a current node.
    pub fn resume(&mut self) -> WalkResult<()> {
        if self.current.is_none() {
            return Err(WalkError::NotResumable);
        }
        self.status = WalkStatus::Running;
        info!("Walk resumed at step {}", self.step_count);
        Ok(())
    }

    /// Discards the graph, stack, seed, counters and log; back to `Idle`.
    pub fn reset(&mut self) {
        self.clear_state();
        self.rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!("Walk reset");
    }

    fn clear_state(&mut self) {
        self.store = GraphStore::new(self.config.similarity.clone());
        self.log = VisitLog::new(self.config.max_log_items);
        self.stack.clear();
        self.current = None;
        self.previous = None;
        self.status = WalkStatus::Idle;
        self.step_count = 0;
        self.selected = None;
        self.highlight.clear();
    }

    /// Sets the pages visited per step.
    pub fn set_branch_factor(&mut self, factor: usize) -> WalkResult<()> {
        if factor == 0 || factor > MAX_BRANCH_FACTOR {
            return Err(WalkError::InvalidBranchFactor(factor));
        }
        self.config.branch_factor = factor;
        if self.config.is_experimental() {
            warn!("Branch factor {} is experimental and may be slow", factor);
        }
        Ok(())
    }

    // ===== Stepping =====

    /// One step with the configured branch factor.
    pub async fn advance(&mut self, source: &dyn LinkSource) -> WalkResult<StepReport> {
        let factor = self.config.branch_factor;
        if factor > 1 {
            self.step_branching(source, factor).await
        } else {
            self.step(source).await
        }
    }

    /// Moves to one random neighbor of the current node, backtracking first
    /// when the current node has no usable links.
    pub async fn step(&mut self, source: &dyn LinkSource) -> WalkResult<StepReport> {
        let result = self.step_single(source).await;
        self.settle(&result);
        result
    }

    /// Visits up to `n` distinct neighbors at once and continues from one of
    /// them. `n == 1` is a plain [`step`](Self::step).
    pub async fn step_branching(&mut self, source: &dyn LinkSource, n: usize) -> WalkResult<StepReport> {
        if n == 0 || n > MAX_BRANCH_FACTOR {
            return Err(WalkError::InvalidBranchFactor(n));
        }
        if n == 1 {
            return self.step(source).await;
        }

        let result = self.step_multi(source, n).await;
        self.settle(&result);
        result
    }

    fn settle(&mut self, result: &WalkResult<StepReport>) {
        match result {
            Err(WalkError::Fetch(e)) => {
                if self.status == WalkStatus::Running {
                    self.status = WalkStatus::Paused;
                }
                error!("Step aborted by link source failure: {}", e);
            }
            Err(WalkError::NoLinksAvailable) => {
                warn!("Walk stuck after {} steps", self.step_count);
            }
            _ => {}
        }
    }

    async fn step_single(&mut self, source: &dyn LinkSource) -> WalkResult<StepReport> {
        let candidates = self.ensure_links_available(source).await?;
        let target = self.pick_next(&candidates.links);

        let generation = self.generation.clone();
        let ensured = self
            .store
            .ensure_node_checked(source, &target, || generation.check())
            .await?;

        self.step_count += 1;
        let step = self.step_count;
        self.visit(&ensured.id, Some(&candidates.from), step);

        self.stack.push(ensured.id.clone());
        self.previous = Some(candidates.from.clone());
        self.current = Some(ensured.id.clone());

        debug!("Step {}: {} -> {}", step, candidates.from, ensured.id);

        Ok(StepReport {
            step,
            from: candidates.from,
            visited: vec![ensured.id.clone()],
            current: ensured.id,
            backtracked_to: candidates.backtracked_to,
            avoided: candidates.avoided,
            new_nodes: usize::from(ensured.is_new),
        })
    }

    async fn step_multi(&mut self, source: &dyn LinkSource, n: usize) -> WalkResult<StepReport> {
        let candidates = self.ensure_links_available(source).await?;

        let mut seen = HashSet::new();
        let mut pool: Vec<String> = candidates
            .links
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        pool.shuffle(&mut self.rng);
        pool.truncate(n);

        let missing: Vec<String> = pool
            .iter()
            .filter(|id| !self.store.contains(id))
            .cloned()
            .collect();

        // All-or-none: one failed fetch aborts the batch before any mutation
        let fetched = try_join_all(
            missing
                .iter()
                .map(|id| GraphStore::fetch_node_data(source, id)),
        )
        .await?;
        self.generation.check()?;

        let mut new_nodes = 0;
        for node in fetched {
            if self.store.insert_fetched(node).is_new {
                new_nodes += 1;
            }
        }

        for branch in &pool {
            self.step_count += 1;
            let step = self.step_count;
            self.visit(branch, Some(&candidates.from), step);
        }

        let chosen = pool
            .choose(&mut self.rng)
            .cloned()
            .ok_or(WalkError::NoLinksAvailable)?;

        self.stack.push(chosen.clone());
        self.previous = Some(candidates.from.clone());
        self.current = Some(chosen.clone());

        debug!(
            "Branching step {}: {} -> {} branches, continuing at {}",
            self.step_count,
            candidates.from,
            pool.len(),
            chosen
        );

        Ok(StepReport {
            step: self.step_count,
            from: candidates.from,
            visited: pool,
            current: chosen,
            backtracked_to: candidates.backtracked_to,
            avoided: candidates.avoided,
            new_nodes,
        })
    }

    /// Finds usable links for the current node, backtracking along the walk
    /// stack while the position is exhausted.
    async fn ensure_links_available(&mut self, source: &dyn LinkSource) -> WalkResult<Candidates> {
        let mut from = self.current.clone().ok_or(WalkError::NoSeed)?;
        let mut avoided = BTreeSet::new();
        let mut backtracked_to = None;

        loop {
            let links = source.resolve_links(&from).await?;
            self.generation.check()?;

            let usable: Vec<String> = links
                .into_iter()
                .filter(|l| *l != from && !avoided.contains(l))
                .collect();

            if !usable.is_empty() {
                return Ok(Candidates {
                    from,
                    links: usable,
                    backtracked_to,
                    avoided,
                });
            }

            avoided.insert(from.clone());
            if !self.backtrack_one(&mut avoided) {
                self.status = WalkStatus::Stuck;
                return Err(WalkError::NoLinksAvailable);
            }

            from = self.current.clone().ok_or(WalkError::NoSeed)?;
            warn!("Dead end, backtracked to '{}' (avoiding {})", from, avoided.len());
            backtracked_to = Some(from.clone());
        }
    }

    /// Pops one position off the walk stack. Returns false (and clears the
    /// stack) when there is nothing left to return to.
    fn backtrack_one(&mut self, avoided: &mut BTreeSet<String>) -> bool {
        if self.stack.len() <= 1 {
            self.stack.clear();
            self.current = None;
            self.previous = None;
            return false;
        }

        if let Some(discarded) = self.stack.pop() {
            avoided.insert(discarded);
        }
        self.current = self.stack.last().cloned();
        self.previous = self
            .stack
            .len()
            .checked_sub(2)
            .and_then(|i| self.stack.get(i))
            .cloned();
        true
    }

    /// Uniform choice that steers away from the immediate predecessor
    /// whenever another candidate exists.
    fn pick_next(&mut self, candidates: &[String]) -> String {
        let choice = &candidates[self.rng.gen_range(0..candidates.len())];

        if candidates.len() > 1 && self.previous.as_deref() == Some(choice.as_str()) {
            let alternatives: Vec<&String> = candidates
                .iter()
                .filter(|c| self.previous.as_deref() != Some(c.as_str()))
                .collect();
            if let Some(alt) = alternatives.choose(&mut self.rng) {
                return (*alt).clone();
            }
        }

        choice.clone()
    }

    /// Records a visit on an existing node and its walk edge from `from`.
    fn visit(&mut self, id: &str, from: Option<&str>, step: u64) -> VisitEntry {
        if let Some(from) = from {
            self.store.upsert_walk_edge(from, id);
        }
        let entry = match self.store.record_visit(id) {
            Some(node) => VisitEntry::from_node(node, step),
            None => VisitEntry {
                id: id.to_string(),
                title: crate::models::prettify(id),
                url: String::new(),
                summary: String::new(),
                visits: 0,
                step,
            },
        };
        self.store.refresh_depths();
        self.log.record(entry.clone());
        entry
    }

    // ===== Selection =====

    /// Toggles the highlight on `id`.
    pub fn select_node(&mut self, id: &str) -> Selection {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
            self.highlight.clear();
            return Selection::Cleared;
        }

        let path = self.store.path_to_seed(id);
        self.selected = Some(id.to_string());
        self.highlight = path.clone().unwrap_or_default();

        Selection::Selected {
            node_id: id.to_string(),
            path,
        }
    }

    // ===== Accessors =====

    pub fn find_path_to_seed(&self, id: &str) -> Option<Vec<String>> {
        self.store.path_to_seed(id)
    }

    pub fn status(&self) -> WalkStatus {
        self.status
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn visit_log(&self) -> Vec<VisitEntry> {
        self.log.entries()
    }

    pub fn stats(&self) -> WalkStats {
        let counts = self.store.edge_counts();
        WalkStats {
            status: self.status,
            step_count: self.step_count,
            node_count: self.store.len(),
            walk_edges: counts.walk,
            similarity_edges: counts.similarity,
            max_finite_depth: self.store.max_finite_depth(),
            current_title: self
                .current
                .as_deref()
                .and_then(|id| self.store.node(id))
                .map(|n| n.title.clone()),
            branch_factor: self.config.branch_factor,
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            generation: self.generation.value(),
            status: self.status,
            seed: self.store.seed().map(str::to_string),
            current: self.current.clone(),
            previous: self.previous.clone(),
            stack: self.stack.clone(),
            nodes: self.store.nodes().to_vec(),
            edges: self.store.edges().to_vec(),
            edge_counts: self.store.edge_counts(),
            max_finite_depth: self.store.max_finite_depth(),
            step_count: self.step_count,
            branch_factor: self.config.branch_factor,
            selected: self.selected.clone(),
            highlight: self.highlight.clone(),
            taken_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Depth, EdgeKind, EdgeWeight};
    use crate::services::link_source::MockLinkSource;

    fn engine() -> WalkEngine {
        WalkEngine::standalone(WalkConfig::new().with_rng_seed(42))
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Builds stack `path` directly, creating nodes and walk edges.
    async fn place_on_path(engine: &mut WalkEngine, source: &MockLinkSource, path: &[&str]) {
        engine.start(source, path[0]).await.unwrap();
        for pair in path.windows(2) {
            let ensured = engine.store.ensure_node(source, pair[1]).await.unwrap();
            engine.step_count += 1;
            let step = engine.step_count;
            engine.visit(&ensured.id, Some(pair[0]), step);
            engine.stack.push(ensured.id.clone());
            engine.previous = Some(pair[0].to_string());
            engine.current = Some(ensured.id);
        }
    }

    #[tokio::test]
    async fn test_start_seeds_walk() {
        let source = MockLinkSource::new().with_page("A", &["B"], &["x"]);
        let mut engine = engine();

        let entry = engine.start(&source, "A").await.unwrap();

        assert_eq!(entry.step, 0);
        assert_eq!(engine.status(), WalkStatus::Running);
        assert_eq!(engine.current(), Some("A"));
        assert_eq!(engine.stack(), &["A".to_string()]);
        assert_eq!(engine.store().seed(), Some("A"));
        assert_eq!(engine.store().node("A").unwrap().depth, Depth::Finite(0));
        assert_eq!(engine.store().node("A").unwrap().visit_count, 1);
        assert_eq!(engine.find_path_to_seed("A"), Some(vec!["A".to_string()]));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_idle() {
        let source = MockLinkSource::new().with_failing_title("A");
        let mut engine = engine();

        assert!(matches!(engine.start(&source, "A").await, Err(WalkError::Fetch(_))));
        assert_eq!(engine.status(), WalkStatus::Idle);
        assert!(engine.store().is_empty());

        assert!(matches!(
            engine.start(&source, "  ").await,
            Err(WalkError::InvalidTitle(_))
        ));
    }

    #[tokio::test]
    async fn test_step_without_seed() {
        let source = MockLinkSource::new();
        let mut engine = engine();
        assert_eq!(engine.step(&source).await.unwrap_err(), WalkError::NoSeed);
    }

    #[tokio::test]
    async fn test_single_step_from_seed() {
        let source = MockLinkSource::new()
            .with_page("A", &["B", "C"], &["x", "y"])
            .with_page("B", &[], &["x"])
            .with_page("C", &[], &["z"]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        let report = engine.step(&source).await.unwrap();
        let chosen = report.current.clone();

        assert!(chosen == "B" || chosen == "C");
        assert_eq!(report.step, 1);
        assert_eq!(report.from, "A");
        assert!(report.backtracked_to.is_none());
        assert!(report.avoided.is_empty());

        let walk_edges: Vec<&GraphEdge> = engine
            .store()
            .edges()
            .iter()
            .filter(|e| e.kind() == EdgeKind::Walk)
            .collect();
        assert_eq!(walk_edges.len(), 1);
        assert_eq!(walk_edges[0].weight, EdgeWeight::Walk(1));
        assert!(engine.store().edge("A", &chosen, EdgeKind::Walk).is_some());

        assert_eq!(engine.current(), Some(chosen.as_str()));
        assert_eq!(engine.previous(), Some("A"));
        assert_eq!(engine.store().node(&chosen).unwrap().depth, Depth::Finite(1));
        assert_eq!(engine.stats().step_count, 1);
        assert_eq!(engine.visit_log().len(), 2);
    }

    #[tokio::test]
    async fn test_predecessor_avoided_when_alternative_exists() {
        let source = MockLinkSource::new()
            .with_page("A", &["B"], &[])
            .with_page("B", &["C", "A"], &[])
            .with_page("C", &[], &[]);

        for seed in 0..10 {
            let mut engine = WalkEngine::standalone(WalkConfig::new().with_rng_seed(seed));
            engine.start(&source, "A").await.unwrap();
            engine.step(&source).await.unwrap();
            let report = engine.step(&source).await.unwrap();
            assert_eq!(report.current, "C");
        }
    }

    #[tokio::test]
    async fn test_backtrack_to_predecessor_as_sole_candidate() {
        let source = MockLinkSource::new()
            .with_page("A", &["B"], &[])
            .with_page("B", &["C", "A"], &[])
            .with_page("C", &[], &[]);
        let mut engine = engine();
        place_on_path(&mut engine, &source, &["A", "B", "C"]).await;

        let report = engine.step(&source).await.unwrap();

        assert_eq!(report.backtracked_to.as_deref(), Some("B"));
        assert_eq!(report.avoided, ids(&["C"]));
        assert_eq!(report.from, "B");
        assert_eq!(report.current, "A");
        assert_eq!(engine.stack(), &["A".to_string(), "B".to_string(), "A".to_string()]);
        assert_eq!(
            engine.store().edge("A", "B", EdgeKind::Walk).unwrap().weight,
            EdgeWeight::Walk(2)
        );
    }

    #[tokio::test]
    async fn test_backtrack_twice() {
        let source = MockLinkSource::new()
            .with_page("A", &["B", "D"], &[])
            .with_page("B", &["C"], &[])
            .with_page("C", &[], &[])
            .with_page("D", &[], &[]);
        let mut engine = engine();
        place_on_path(&mut engine, &source, &["A", "B", "C"]).await;

        let report = engine.step(&source).await.unwrap();

        assert_eq!(report.backtracked_to.as_deref(), Some("A"));
        assert_eq!(report.avoided, ids(&["B", "C"]));
        assert_eq!(report.current, "D");
        assert_eq!(engine.stack(), &["A".to_string(), "D".to_string()]);
    }

    #[tokio::test]
    async fn test_backtrack_exhausted_is_stuck() {
        let source = MockLinkSource::new()
            .with_page("A", &["B"], &[])
            .with_page("B", &["C"], &[])
            .with_page("C", &[], &[]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();
        engine.step(&source).await.unwrap();
        engine.step(&source).await.unwrap();
        assert_eq!(engine.current(), Some("C"));

        let err = engine.step(&source).await.unwrap_err();

        assert_eq!(err, WalkError::NoLinksAvailable);
        assert_eq!(engine.status(), WalkStatus::Stuck);
        assert!(engine.stack().is_empty());
        assert!(engine.current().is_none());
        assert!(engine.previous().is_none());
        assert_eq!(engine.store().len(), 3);
        assert_eq!(engine.resume(), Err(WalkError::NotResumable));
    }

    #[tokio::test]
    async fn test_fetch_failure_pauses_without_mutation() {
        let source = MockLinkSource::new()
            .with_page("A", &["B"], &[])
            .with_failing_title("B");
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        let err = engine.step(&source).await.unwrap_err();

        assert!(matches!(err, WalkError::Fetch(_)));
        assert_eq!(engine.status(), WalkStatus::Paused);
        assert_eq!(engine.store().len(), 1);
        assert!(engine.store().edges().is_empty());
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.current(), Some("A"));
    }

    #[tokio::test]
    async fn test_superseded_step_does_not_mutate() {
        let counter = Arc::new(AtomicU64::new(0));
        let source = MockLinkSource::new().with_page("A", &["B"], &[]);
        let mut engine = WalkEngine::new(WalkConfig::new(), Generation::current(&counter));
        engine.start(&source, "A").await.unwrap();

        counter.fetch_add(1, Ordering::SeqCst);

        assert_eq!(engine.step(&source).await.unwrap_err(), WalkError::Superseded);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.status(), WalkStatus::Running);
    }

    #[tokio::test]
    async fn test_superseded_branching_step_does_not_mutate() {
        let counter = Arc::new(AtomicU64::new(0));
        let source = MockLinkSource::new()
            .with_page("A", &["B", "C", "D"], &[])
            .with_latency(std::time::Duration::from_millis(100));
        let mut engine = WalkEngine::new(
            WalkConfig::new().with_rng_seed(5),
            Generation::current(&counter),
        );
        engine.start(&source, "A").await.unwrap();
        let links_before = source.counters().links.load(Ordering::SeqCst);

        // Bumped once the link fetch is done and the batch fetch is pending
        let bump = async {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let (result, _) = tokio::join!(engine.step_branching(&source, 3), bump);

        assert_eq!(result.unwrap_err(), WalkError::Superseded);
        assert_eq!(source.counters().links.load(Ordering::SeqCst), links_before + 1);
        assert!(source.counters().tags.load(Ordering::SeqCst) >= 4);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().edge_counts().walk, 0);
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.stack().len(), 1);
        assert_eq!(engine.current(), Some("A"));
    }

    #[tokio::test]
    async fn test_branching_step() {
        let source = MockLinkSource::new()
            .with_page("A", &["B", "C", "D", "E"], &["x"])
            .with_page("B", &[], &["x"])
            .with_page("C", &[], &[])
            .with_page("D", &[], &[])
            .with_page("E", &[], &[]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        let report = engine.step_branching(&source, 3).await.unwrap();

        assert_eq!(report.visited.len(), 3);
        assert_eq!(report.new_nodes, 3);
        assert_eq!(report.step, 3);
        assert_eq!(engine.step_count(), 3);
        assert!(report.visited.contains(&report.current));
        assert_eq!(engine.store().len(), 4);
        assert_eq!(engine.store().edge_counts().walk, 3);
        assert_eq!(engine.stack().len(), 2);
        assert_eq!(engine.current(), Some(report.current.as_str()));
        for branch in &report.visited {
            assert_eq!(engine.store().node(branch).unwrap().depth, Depth::Finite(1));
        }
    }

    #[tokio::test]
    async fn test_branching_larger_than_pool() {
        let source = MockLinkSource::new().with_page("A", &["B", "C"], &[]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        let report = engine.step_branching(&source, 10).await.unwrap();

        assert_eq!(report.visited.len(), 2);
        assert_eq!(engine.step_count(), 2);
    }

    #[tokio::test]
    async fn test_branching_fetch_failure_is_all_or_none() {
        let source = MockLinkSource::new()
            .with_page("A", &["B", "C"], &[])
            .with_page("B", &[], &[])
            .with_failing_title("C");
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        let err = engine.step_branching(&source, 2).await.unwrap_err();

        assert!(matches!(err, WalkError::Fetch(_)));
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.status(), WalkStatus::Paused);
    }

    #[tokio::test]
    async fn test_branch_factor_bounds() {
        let source = MockLinkSource::new().with_page("A", &["B"], &[]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();

        assert_eq!(
            engine.step_branching(&source, 0).await.unwrap_err(),
            WalkError::InvalidBranchFactor(0)
        );
        assert_eq!(engine.set_branch_factor(51), Err(WalkError::InvalidBranchFactor(51)));
        assert!(engine.set_branch_factor(20).is_ok());
        assert_eq!(engine.stats().branch_factor, 20);
    }

    #[tokio::test]
    async fn test_pause_resume_reset() {
        let source = MockLinkSource::new().with_page("A", &["B"], &[]);
        let mut engine = engine();

        assert_eq!(engine.resume(), Err(WalkError::NotResumable));

        engine.start(&source, "A").await.unwrap();
        engine.pause();
        assert_eq!(engine.status(), WalkStatus::Paused);
        engine.resume().unwrap();
        assert_eq!(engine.status(), WalkStatus::Running);

        engine.step(&source).await.unwrap();
        engine.reset();

        assert_eq!(engine.status(), WalkStatus::Idle);
        assert!(engine.store().is_empty());
        assert!(engine.stack().is_empty());
        assert!(engine.visit_log().is_empty());
        assert_eq!(engine.step_count(), 0);
    }

    #[tokio::test]
    async fn test_select_node_toggles() {
        let source = MockLinkSource::new().with_page("A", &["B"], &[]);
        let mut engine = engine();
        engine.start(&source, "A").await.unwrap();
        engine.step(&source).await.unwrap();

        let selection = engine.select_node("B");
        assert_eq!(
            selection,
            Selection::Selected {
                node_id: "B".to_string(),
                path: Some(vec!["B".to_string(), "A".to_string()]),
            }
        );
        assert_eq!(engine.snapshot().highlight, vec!["B".to_string(), "A".to_string()]);

        assert_eq!(engine.select_node("B"), Selection::Cleared);
        assert!(engine.snapshot().highlight.is_empty());
        assert!(engine.snapshot().selected.is_none());
    }
}
