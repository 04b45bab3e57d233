//! Run controller: owns the walk engine and drives it from a background loop.
//!
//! Steps are single-flight. A step requested while another is in flight is
//! dropped, not queued. Reset bumps a generation counter before touching the
//! engine so an in-flight step abandons its work instead of mutating the
//! replacement.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::WalkConfig;
use super::error::{WalkError, WalkResult};
use super::feedback::{Feedback, VisitEntry};
use super::link_source::LinkSource;
use super::walker::{
    Generation, GraphSnapshot, Selection, StepReport, WalkEngine, WalkStats, WalkStatus,
};
use crate::graph::PathIndex;

/// Capacity of the feedback broadcast channel.
const FEEDBACK_CHANNEL_CAPACITY: usize = 64;

/// Back-off used by the run loop when a manual step holds the slot.
const BUSY_BACKOFF: Duration = Duration::from_millis(10);

/// Result of a step request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum StepOutcome {
    Advanced(StepReport),
    /// Another step was in flight; nothing happened
    Skipped,
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Read-side copy of the engine, replaced after every command and step.
struct Published {
    snapshot: GraphSnapshot,
    stats: WalkStats,
    log: Vec<VisitEntry>,
    paths: PathIndex,
}

impl Published {
    fn of(engine: &WalkEngine) -> Self {
        Self {
            snapshot: engine.snapshot(),
            stats: engine.stats(),
            log: engine.visit_log(),
            paths: engine.store().path_index(),
        }
    }
}

struct Shared {
    source: Arc<dyn LinkSource>,
    config: RwLock<WalkConfig>,
    engine: Mutex<WalkEngine>,
    in_flight: AtomicBool,
    running: AtomicBool,
    generation: Arc<AtomicU64>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    published: RwLock<Published>,
    feedback_tx: broadcast::Sender<Feedback>,
    last_feedback: RwLock<Option<Feedback>>,
}

/// Cloneable handle to the single walk of this process.
#[derive(Clone)]
pub struct RunController {
    shared: Arc<Shared>,
}

impl RunController {
    /// Creates a controller with an idle engine.
    pub fn new(source: Arc<dyn LinkSource>, config: WalkConfig) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let engine = WalkEngine::new(config.clone(), Generation::current(&generation));
        let published = Published::of(&engine);
        let (feedback_tx, _) = broadcast::channel(FEEDBACK_CHANNEL_CAPACITY);

        info!(
            "Run controller ready (provider: {}, branch factor: {})",
            source.provider_name(),
            config.branch_factor
        );

        Self {
            shared: Arc::new(Shared {
                source,
                config: RwLock::new(config),
                engine: Mutex::new(engine),
                in_flight: AtomicBool::new(false),
                running: AtomicBool::new(false),
                generation,
                loop_handle: Mutex::new(None),
                published: RwLock::new(published),
                feedback_tx,
                last_feedback: RwLock::new(None),
            }),
        }
    }

    /// Receives every feedback message emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Feedback> {
        self.shared.feedback_tx.subscribe()
    }

    // ===== Commands =====

    /// Starts a new walk at `title` and runs it in the background.
    pub async fn start(&self, title: &str) -> WalkResult<VisitEntry> {
        self.start_with(title, true).await
    }

    /// Starts a new walk at `title` without scheduling steps.
    pub async fn start_paused(&self, title: &str) -> WalkResult<VisitEntry> {
        self.start_with(title, false).await
    }

    async fn start_with(&self, title: &str, autorun: bool) -> WalkResult<VisitEntry> {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);

        let config = self.shared.config.read().await.clone();
        let mut engine = self.shared.engine.lock().await;
        *engine = WalkEngine::new(config, Generation::current(&self.shared.generation));

        let result = engine.start(self.shared.source.as_ref(), title).await;
        if result.is_ok() && !autorun {
            engine.pause();
        }
        if !matches!(result, Err(WalkError::Superseded)) {
            self.publish(&engine).await;
        }
        drop(engine);

        match result {
            Ok(entry) => {
                self.emit(Feedback::success(format!("Walk started at {}", entry.title)))
                    .await;
                if autorun {
                    self.shared.running.store(true, Ordering::SeqCst);
                    self.ensure_loop().await;
                }
                Ok(entry)
            }
            Err(WalkError::Superseded) => {
                debug!("Start at {:?} abandoned after reset", title);
                Err(WalkError::Superseded)
            }
            Err(e) => {
                self.emit(Feedback::new(
                    format!("Could not start walk at {:?}: {}", title, e),
                    e.severity(),
                ))
                .await;
                Err(e)
            }
        }
    }

    /// Runs one step now. Returns [`StepOutcome::Skipped`] if a step is
    /// already in flight.
    pub async fn step(&self) -> WalkResult<StepOutcome> {
        self.run_step(false).await
    }

    /// Stops the run loop after any in-flight step. Reports only when a
    /// running walk was actually paused.
    pub async fn pause(&self) {
        self.shared.running.store(false, Ordering::SeqCst);

        let mut engine = self.shared.engine.lock().await;
        let was_running = engine.status() == WalkStatus::Running;
        engine.pause();
        self.publish(&engine).await;
        drop(engine);

        if was_running {
            self.emit(Feedback::success("Walk paused")).await;
        }
    }

    /// Restarts the run loop. Fails when there is no current node.
    pub async fn resume(&self) -> WalkResult<()> {
        let mut engine = self.shared.engine.lock().await;
        if let Err(e) = engine.resume() {
            drop(engine);
            self.emit(Feedback::new(e.to_string(), e.severity())).await;
            return Err(e);
        }
        self.publish(&engine).await;
        drop(engine);

        self.shared.running.store(true, Ordering::SeqCst);
        self.ensure_loop().await;
        self.emit(Feedback::success("Walk resumed")).await;
        Ok(())
    }

    /// Discards the walk. An in-flight step is abandoned.
    pub async fn reset(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.running.store(false, Ordering::SeqCst);

        let config = self.shared.config.read().await.clone();
        let mut engine = self.shared.engine.lock().await;
        *engine = WalkEngine::new(config, Generation::current(&self.shared.generation));
        self.publish(&engine).await;
        drop(engine);

        self.emit(Feedback::success("Walk reset")).await;
    }

    /// Sets pages per step; kept across resets.
    pub async fn set_branch_factor(&self, factor: usize) -> WalkResult<usize> {
        let mut engine = self.shared.engine.lock().await;
        if let Err(e) = engine.set_branch_factor(factor) {
            drop(engine);
            self.emit(Feedback::new(e.to_string(), e.severity())).await;
            return Err(e);
        }
        let experimental = engine.config().is_experimental();
        self.shared.config.write().await.branch_factor = factor;
        self.publish(&engine).await;
        drop(engine);

        let feedback = if experimental {
            Feedback::warning(format!("Branch factor {} is experimental", factor))
        } else {
            Feedback::success(format!("Branch factor set to {}", factor))
        };
        self.emit(feedback).await;
        Ok(factor)
    }

    /// Toggles the path-to-seed highlight for `node_id`.
    pub async fn select_node(&self, node_id: &str) -> Selection {
        let mut engine = self.shared.engine.lock().await;
        let selection = engine.select_node(node_id);
        self.publish(&engine).await;
        drop(engine);

        let feedback = match &selection {
            Selection::Cleared => Feedback::success("Selection cleared"),
            Selection::Selected { path: Some(path), .. } => Feedback::success(format!(
                "Path to seed: {} hops",
                path.len().saturating_sub(1)
            )),
            Selection::Selected { node_id, path: None } => {
                Feedback::warning(format!("No path from {} to the seed", node_id))
            }
        };
        self.emit(feedback).await;
        selection
    }

    // ===== Queries =====

    // Queries read the published copy and never wait on an in-flight step.

    /// Shortest path from `node_id` to the seed over the published graph.
    pub async fn find_path_to_seed(&self, node_id: &str) -> Option<Vec<String>> {
        self.shared.published.read().await.paths.path_to_seed(node_id)
    }

    /// Latest published snapshot.
    pub async fn snapshot(&self) -> GraphSnapshot {
        self.shared.published.read().await.snapshot.clone()
    }

    pub async fn stats(&self) -> WalkStats {
        self.shared.published.read().await.stats.clone()
    }

    pub async fn visit_log(&self) -> Vec<VisitEntry> {
        self.shared.published.read().await.log.clone()
    }

    pub async fn last_feedback(&self) -> Option<Feedback> {
        self.shared.last_feedback.read().await.clone()
    }

    /// Whether the configured branch factor is in the experimental range.
    pub async fn is_experimental(&self) -> bool {
        self.shared.config.read().await.is_experimental()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_step_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn provider_name(&self) -> &str {
        self.shared.source.provider_name()
    }

    // ===== Internals =====

    async fn run_step(&self, scheduled: bool) -> WalkResult<StepOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.shared.in_flight) else {
            debug!("Step already in flight, skipping");
            return Ok(StepOutcome::Skipped);
        };

        let mut engine = self.shared.engine.lock().await;
        // Paused or reset while waiting for the engine
        if scheduled && !self.shared.running.load(Ordering::SeqCst) {
            return Ok(StepOutcome::Skipped);
        }
        let result = engine.advance(self.shared.source.as_ref()).await;
        if !matches!(result, Err(WalkError::Superseded)) {
            self.publish(&engine).await;
        }
        drop(engine);

        match result {
            Ok(report) => {
                if let Some(to) = &report.backtracked_to {
                    self.emit(Feedback::warning(format!("Dead end, backtracked to {}", to)))
                        .await;
                }
                Ok(StepOutcome::Advanced(report))
            }
            Err(WalkError::Superseded) => {
                debug!("Step abandoned after reset");
                Err(WalkError::Superseded)
            }
            Err(e) => {
                if e.halts_run() {
                    self.shared.running.store(false, Ordering::SeqCst);
                }
                self.emit(Feedback::new(e.to_string(), e.severity())).await;
                Err(e)
            }
        }
    }

    /// Spawns the run loop unless one is alive.
    async fn ensure_loop(&self) {
        let mut handle = self.shared.loop_handle.lock().await;
        if handle.is_some() {
            return;
        }

        let controller = self.clone();
        *handle = Some(tokio::spawn(async move {
            controller.run_loop().await;
        }));
    }

    async fn run_loop(&self) {
        info!("Run loop started");

        loop {
            if !self.shared.running.load(Ordering::SeqCst) {
                // Exit decision is made under the handle lock so a concurrent
                // ensure_loop either sees this task alive or sees it gone.
                let mut handle = self.shared.loop_handle.lock().await;
                if !self.shared.running.load(Ordering::SeqCst) {
                    *handle = None;
                    break;
                }
                continue;
            }

            match self.run_step(true).await {
                Ok(StepOutcome::Skipped) => {
                    tokio::time::sleep(BUSY_BACKOFF).await;
                    continue;
                }
                Ok(StepOutcome::Advanced(_)) | Err(WalkError::Superseded) => {}
                Err(e) => {
                    warn!("Run loop step failed: {}", e);
                }
            }

            let delay = self.shared.config.read().await.step_delay;
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
        }

        info!("Run loop stopped");
    }

    async fn publish(&self, engine: &WalkEngine) {
        *self.shared.published.write().await = Published::of(engine);
    }

    async fn emit(&self, feedback: Feedback) {
        debug!("Feedback ({:?}): {}", feedback.severity, feedback.message);
        // No subscribers is fine
        let _ = self.shared.feedback_tx.send(feedback.clone());
        *self.shared.last_feedback.write().await = Some(feedback);
    }
}
