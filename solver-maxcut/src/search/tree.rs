//! Branch-and-bound tree controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{BranchingSelector, NodeQueue, SearchNode};
use crate::bounding::BoundingEngine;
use crate::cuts::{HypermetricSeparator, Separator};
use crate::error::MaxCutResult;
use crate::model::{Incumbent, MaxCutSolution, Problem, SolveStatus};
use crate::oracle::{Heuristic, HyperplaneRounding, MixingOracle, RelaxationOracle};
use crate::settings::Settings;

/// Cooperative cancellation flag.
///
/// Clones share the flag; the solver checks it before each node.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Create an unset handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the solver to stop at the next node.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Branch-and-bound solver for one Max-Cut problem.
///
/// Owns the node queue, the incumbent and the bounding engine. The incumbent
/// stays readable after [`MaxCutSolver::solve`] fails.
pub struct MaxCutSolver {
    /// Problem being solved.
    problem: Problem,

    /// Node queue.
    queue: NodeQueue,

    /// Branching variable selector.
    branching: BranchingSelector,

    /// Per-node bounding.
    engine: BoundingEngine,

    /// Best known cut.
    incumbent: Incumbent,

    /// Next node ID to assign.
    next_node_id: u64,

    /// Nodes evaluated (root and every created child).
    nodes_evaluated: u64,

    /// Nodes pruned by bound.
    nodes_pruned: u64,

    /// Bound computed at the root.
    root_bound: Option<f64>,

    /// Start time.
    start_time: Option<Instant>,

    /// Cancellation flag.
    stop: StopHandle,

    /// Settings.
    settings: Settings,
}

impl MaxCutSolver {
    /// Create a solver with the default oracles.
    pub fn new(problem: Problem, settings: Settings) -> MaxCutResult<Self> {
        Self::with_collaborators(
            problem,
            settings,
            Box::new(MixingOracle::default()),
            Box::new(HyperplaneRounding::default()),
            Box::new(HypermetricSeparator::default()),
        )
    }

    /// Create a solver with custom oracles.
    pub fn with_collaborators(
        problem: Problem,
        settings: Settings,
        oracle: Box<dyn RelaxationOracle>,
        heuristic: Box<dyn Heuristic>,
        separator: Box<dyn Separator>,
    ) -> MaxCutResult<Self> {
        settings.validate()?;
        let num_vars = problem.num_vars();

        Ok(Self {
            queue: NodeQueue::new(settings.queue_capacity),
            branching: BranchingSelector::new(settings.branching_rule),
            engine: BoundingEngine::new(settings.clone(), oracle, heuristic, separator),
            incumbent: Incumbent::trivial(num_vars),
            next_node_id: 1, // 0 reserved for root
            nodes_evaluated: 0,
            nodes_pruned: 0,
            root_bound: None,
            start_time: None,
            stop: StopHandle::new(),
            problem,
            settings,
        })
    }

    /// Handle that stops the search from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Problem being solved.
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Best known cut.
    pub fn incumbent(&self) -> &Incumbent {
        &self.incumbent
    }

    /// Run the search to completion or until a stop condition.
    pub fn solve(&mut self) -> MaxCutResult<MaxCutSolution> {
        let started = Instant::now();
        self.start_time = Some(started);

        if let Some(status) = self.check_stop(false) {
            log::info!("Search stopped before the root node");
            return Ok(self.finalize(status));
        }

        let mut root = SearchNode::root(self.problem.num_vars());
        self.nodes_evaluated += 1;

        if root.is_leaf() {
            self.offer(&root.partial_assignment(), root.id);
            self.root_bound = Some(self.incumbent.value);
        } else {
            let nb = self
                .engine
                .bound(&self.problem, &mut root, &mut self.incumbent, started)?;
            root.upper_bound = nb.bound;
            self.root_bound = Some(nb.bound);

            if self.settings.detailed_output {
                log::info!(
                    "Root node: plain bound {:.3}, bound {:.3}, incumbent {:.0}",
                    nb.plain_bound,
                    nb.bound,
                    self.incumbent.value
                );
            }

            if self.incumbent.can_prune(root.upper_bound) {
                self.nodes_pruned += 1;
            } else {
                self.queue.push(root)?;
            }
        }

        let mut status = SolveStatus::Optimal;
        while let Some(node) = self.queue.pop() {
            if let Some(stop) = self.check_stop(true) {
                let abandoned = 1 + std::iter::from_fn(|| self.queue.pop()).count();
                log::info!("Search stopped ({:?}), {} open nodes discarded", stop, abandoned);
                status = stop;
                break;
            }

            self.expand(node, started)?;
            self.log_progress();
        }

        self.log_summary();
        Ok(self.finalize(status))
    }

    /// Branch on a popped node and bound its children.
    fn expand(&mut self, node: SearchNode, started: Instant) -> MaxCutResult<()> {
        let Some(decision) = self.branching.select(&node) else {
            self.offer(&node.partial_assignment(), node.id);
            return Ok(());
        };
        if self.settings.detailed_output {
            log::info!("Branching on x[{}] = {:.2}", decision.var, decision.frac);
        }

        for value in [0, 1] {
            let id = self.next_node_id;
            self.next_node_id += 1;
            let mut child = node.child(id, decision.var, value);
            self.nodes_evaluated += 1;

            if child.is_leaf() {
                self.offer(&child.partial_assignment(), child.id);
                continue;
            }

            let nb = self
                .engine
                .bound(&self.problem, &mut child, &mut self.incumbent, started)?;
            child.upper_bound = nb.bound;

            if self.incumbent.can_prune(child.upper_bound) {
                self.nodes_pruned += 1;
            } else {
                self.queue.push(child)?;
            }
        }

        Ok(())
    }

    /// Offer a complete assignment to the incumbent.
    fn offer(&mut self, x: &[u8], node_id: u64) -> bool {
        let improved = self.incumbent.offer(&self.problem, x);
        if improved {
            log::info!("Node {} Feasible solution {:.0}", node_id, self.incumbent.value);
        }
        improved
    }

    /// Check the stop conditions.
    ///
    /// Root-only mode applies to popped nodes only.
    fn check_stop(&self, after_root: bool) -> Option<SolveStatus> {
        if self.stop.is_stopped() {
            return Some(SolveStatus::Interrupted);
        }
        if let (Some(limit), Some(start)) = (self.settings.time_limit, self.start_time) {
            if start.elapsed() >= limit {
                return Some(SolveStatus::TimeLimit);
            }
        }
        if after_root && self.settings.root_only {
            return Some(SolveStatus::RootOnly);
        }
        None
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Build the solution report from the current state.
    ///
    /// Also usable after a failed solve to recover the best cut found.
    pub fn finalize(&self, status: SolveStatus) -> MaxCutSolution {
        MaxCutSolution {
            status,
            best_value: self.incumbent.value,
            x: self.incumbent.vertex_sides(),
            root_bound: self.root_bound,
            nodes_evaluated: self.nodes_evaluated,
            incumbent_updates: self.incumbent.update_count,
            solve_time: self
                .start_time
                .map(|t| t.elapsed())
                .unwrap_or_default(),
        }
    }

    /// Log progress (if detailed output is on).
    fn log_progress(&self) {
        if !self.settings.detailed_output || self.queue.total_popped() % 100 != 0 {
            return;
        }

        log::info!(
            "Nodes: {} ({} open) | Bound: {:.3} | Incumbent: {:.0} | Time: {:.1}s",
            self.nodes_evaluated,
            self.queue.len(),
            self.queue.best_bound(),
            self.incumbent.value,
            self.elapsed_ms() as f64 / 1000.0,
        );
    }

    /// Log queue and cutting-plane totals (if detailed output is on).
    fn log_summary(&self) {
        if !self.settings.detailed_output {
            return;
        }

        log::info!(
            "Nodes queued: {} | popped: {} | pruned: {}",
            self.queue.total_added(),
            self.queue.total_popped(),
            self.nodes_pruned,
        );
        for (family, stats) in self.engine.cut_stats() {
            log::info!(
                "{} inequalities: {} added, {} purged, peak {}",
                family,
                stats.total_added,
                stats.total_purged,
                stats.peak_size,
            );
        }
    }

    /// Get statistics for display.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes_evaluated: self.nodes_evaluated,
            nodes_pruned: self.nodes_pruned,
            nodes_open: self.queue.len() as u64,
            nodes_queued: self.queue.total_added(),
            incumbent_updates: self.incumbent.update_count,
            best_bound: self.queue.best_bound(),
            incumbent_value: self.incumbent.value,
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// Statistics from the B&B tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    /// Nodes evaluated so far.
    pub nodes_evaluated: u64,
    /// Children discarded by the bound test.
    pub nodes_pruned: u64,
    /// Nodes still in the queue.
    pub nodes_open: u64,
    /// Nodes ever pushed to the queue.
    pub nodes_queued: u64,
    /// Incumbent improvements.
    pub incumbent_updates: u64,
    /// Best open bound (-inf if the queue is empty).
    pub best_bound: f64,
    /// Incumbent value.
    pub incumbent_value: f64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
}
