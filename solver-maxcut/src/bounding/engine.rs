//! Bounding engine: relaxation, heuristic and cutting-plane refinement.

use std::time::{Duration, Instant};

use nalgebra::DMatrix;

use super::bundle::{evaluate_dual, BundleEntry, BundleMethod, BundleStore};
use crate::cuts::{CutFamily, CutPoolStats, CutSet, SeparationRound, Separator};
use crate::error::MaxCutResult;
use crate::model::{Incumbent, Problem, Subproblem};
use crate::oracle::{Heuristic, RelaxationOracle};
use crate::search::SearchNode;
use crate::settings::Settings;

/// Triangle violation below which larger families are separated too.
const HIGHER_FAMILY_THRESHOLD: f64 = 0.3;

/// Growth of the bundle step size per outer pass.
const STEP_GROWTH: f64 = 1.05;

/// How bounding a node ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundingOutcome {
    /// Bound fell below the incumbent threshold.
    Pruned,

    /// Refinement skipped: the plain bound is too far above the incumbent.
    GivenUp,

    /// Refinement converged or hit its iteration cap.
    Refined,
}

/// One outer pass of the refinement loop.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Outer pass number (1-based).
    pub iteration: usize,

    /// Time since the solve started.
    pub elapsed: Duration,

    /// Bound after the bundle run.
    pub bound: f64,

    /// Bundle size after the bundle run.
    pub bundle_size: usize,

    /// Oracle calls made by the bundle run.
    pub inner_iterations: usize,

    /// Serious steps taken by the bundle run.
    pub serious_steps: usize,

    /// Separation rounds that followed (empty on the final pass).
    pub rounds: Vec<SeparationRound>,

    /// Active inequalities per family after separation.
    pub active: [usize; 3],
}

/// Result of bounding one node.
#[derive(Debug, Clone)]
pub struct NodeBound {
    /// Upper bound on every cut in the node's subtree.
    pub bound: f64,

    /// Terminal state.
    pub outcome: BoundingOutcome,

    /// Bound of the relaxation without inequalities.
    pub plain_bound: f64,

    /// Refinement passes, in order.
    pub trace: Vec<IterationRecord>,
}

/// Computes node bounds.
///
/// Owns the injected oracles and the workspaces reused from node to node.
pub struct BoundingEngine {
    settings: Settings,
    oracle: Box<dyn RelaxationOracle>,
    heuristic: Box<dyn Heuristic>,
    separator: Box<dyn Separator>,

    /// Active inequalities (reset per node).
    cuts: CutSet,

    /// Bundle workspace (reset per node).
    store: BundleStore,

    /// Gap closed by refinement at the root.
    root_gap: Option<f64>,
}

impl BoundingEngine {
    /// Create an engine with the given collaborators.
    pub fn new(
        settings: Settings,
        oracle: Box<dyn RelaxationOracle>,
        heuristic: Box<dyn Heuristic>,
        separator: Box<dyn Separator>,
    ) -> Self {
        Self {
            cuts: CutSet::new(settings.max_cuts_per_family),
            store: BundleStore::new(settings.max_bundle),
            root_gap: None,
            settings,
            oracle,
            heuristic,
            separator,
        }
    }

    /// Gap closed at the root (plain bound minus refined bound), once known.
    pub fn root_gap(&self) -> Option<f64> {
        self.root_gap
    }

    /// Cumulative pool statistics per family, over every node bounded so far.
    pub fn cut_stats(&self) -> [(CutFamily, &CutPoolStats); 3] {
        CutFamily::ALL.map(|family| (family, self.cuts.pool(family).stats()))
    }

    /// Compute an upper bound for `node`.
    ///
    /// Updates the node's fractional vector and offers heuristic cuts to the
    /// incumbent on the way.
    pub fn bound(
        &mut self,
        problem: &Problem,
        node: &mut SearchNode,
        incumbent: &mut Incumbent,
        started: Instant,
    ) -> MaxCutResult<NodeBound> {
        let is_root = node.depth == 0;
        self.cuts.clear();

        let sub = problem.subproblem(node);
        let relaxation = self.oracle.solve(&sub.l)?;
        node.update_fractional(&relaxation.x);

        let plain_bound = relaxation.value + sub.fixed_value;
        let mut result = NodeBound {
            bound: plain_bound,
            outcome: BoundingOutcome::Refined,
            plain_bound,
            trace: Vec::new(),
        };

        self.offer_heuristic(problem, &sub, node, &relaxation.x, incumbent);

        if incumbent.can_prune(plain_bound) {
            result.outcome = BoundingOutcome::Pruned;
            return Ok(result);
        }

        if !is_root && self.settings.use_diff {
            if let Some(gap) = self.root_gap {
                if plain_bound > incumbent.value + gap + 1.0 {
                    result.outcome = BoundingOutcome::GivenUp;
                    return Ok(result);
                }
            }
        }

        let first = self.separate(&relaxation.x, CutFamily::Triangle)?;
        if self.cuts.is_empty() {
            self.cache_root_gap(is_root, &result);
            return Ok(result);
        }

        let n_tri = self.cuts.pool(CutFamily::Triangle).len() as f64;
        let viol3 = first.max_violation;
        let t = 0.5 * (plain_bound - incumbent.value) / (n_tri * viol3 * viol3);
        let mut method = BundleMethod::new(t, relaxation.value);
        self.store
            .reset(BundleEntry::new(&sub.l, &self.cuts, relaxation.x.clone()));

        if self.settings.detailed_output {
            log::info!(
                "{:>4} {:>8} {:>12} {:>5} {:>7} {:>8} {:>6} {:>7} {:>7}",
                "iter", "time", "bound", "bdl", "steps", "viol3", "triag", "purged", "added"
            );
        }

        let mut bdl_iter = self.settings.init_bundle_iter;
        let mut old_f = relaxation.value;
        let max_outer = self.settings.max_outer_iter;
        let mut count = 0;

        loop {
            count += 1;
            let run = method.run(
                self.oracle.as_mut(),
                &sub.l,
                &mut self.cuts,
                &mut self.store,
                bdl_iter,
            )?;
            let f = run.value;
            // Every pass yields a valid bound, so keep the tightest one seen
            result.bound = result.bound.min(f + sub.fixed_value);
            node.update_fractional(&run.x);

            let mut record = IterationRecord {
                iteration: count,
                elapsed: started.elapsed(),
                bound: result.bound,
                bundle_size: self.store.len(),
                inner_iterations: run.iterations,
                serious_steps: run.serious_steps,
                rounds: Vec::new(),
                active: self.active_counts(),
            };

            if incumbent.can_prune(result.bound) {
                result.outcome = BoundingOutcome::Pruned;
                self.finish_pass(&mut result, record);
                break;
            }

            self.offer_heuristic(problem, &sub, node, &run.x, incumbent);
            if incumbent.can_prune(result.bound) {
                result.outcome = BoundingOutcome::Pruned;
                self.finish_pass(&mut result, record);
                break;
            }

            // Stop when the projected progress cannot close the gap
            let gap = result.bound - incumbent.value;
            let remaining = (max_outer - count.min(max_outer)) as f64;
            if count >= max_outer
                || (count >= self.settings.min_outer_iter && gap - 1.0 > (old_f - f) * remaining)
            {
                result.outcome = BoundingOutcome::Refined;
                self.finish_pass(&mut result, record);
                break;
            }
            old_f = f;

            let triangles = self.separate(&run.x, CutFamily::Triangle)?;
            record.rounds.push(triangles);
            if triangles.max_violation < HIGHER_FAMILY_THRESHOLD {
                if self.settings.include_pent {
                    record.rounds.push(self.separate(&run.x, CutFamily::Pentagonal)?);
                }
                if self.settings.include_hepta {
                    record.rounds.push(self.separate(&run.x, CutFamily::Heptagonal)?);
                }
            }
            record.active = self.active_counts();

            // New center: the surviving multipliers, zero for new inequalities
            let gamma = self.cuts.multipliers();
            let (value, entry) = evaluate_dual(self.oracle.as_mut(), &sub.l, &self.cuts, &gamma)?;
            self.store.refresh_subgradients(&self.cuts);
            self.store.push(entry)?;
            method.recenter(value);
            method.scale_step(STEP_GROWTH);
            bdl_iter = (bdl_iter + 1).min(self.settings.max_bundle_iter);

            self.finish_pass(&mut result, record);
        }

        self.cache_root_gap(is_root, &result);
        Ok(result)
    }

    /// Remember the gap closed at the root once refinement was entered.
    fn cache_root_gap(&mut self, is_root: bool, result: &NodeBound) {
        if is_root && self.root_gap.is_none() {
            self.root_gap = Some(result.plain_bound - result.bound);
        }
    }

    fn separate(&mut self, x: &DMatrix<f64>, family: CutFamily) -> MaxCutResult<SeparationRound> {
        self.separator
            .separate(x, self.cuts.pool_mut(family), &self.settings)
    }

    fn active_counts(&self) -> [usize; 3] {
        CutFamily::ALL.map(|family| self.cuts.pool(family).len())
    }

    fn offer_heuristic(
        &mut self,
        problem: &Problem,
        sub: &Subproblem,
        node: &SearchNode,
        x: &DMatrix<f64>,
        incumbent: &mut Incumbent,
    ) {
        let partial = node.partial_assignment();
        let candidate = self.heuristic.run(problem, sub, node, x, &partial);
        if incumbent.offer(problem, &candidate) {
            log::info!("Node {} Feasible solution {:.0}", node.id, incumbent.value);
        }
    }

    fn finish_pass(&self, result: &mut NodeBound, record: IterationRecord) {
        if self.settings.detailed_output {
            let mut line = format!(
                "{:>4} {:>7.2}s {:>12.4} {:>5} {:>7}",
                record.iteration,
                record.elapsed.as_secs_f64(),
                record.bound,
                record.bundle_size,
                format!("{}/{}", record.serious_steps, record.inner_iterations)
            );
            for round in &record.rounds {
                let active = record.active[match round.family {
                    CutFamily::Triangle => 0,
                    CutFamily::Pentagonal => 1,
                    CutFamily::Heptagonal => 2,
                }];
                line.push_str(&format!(
                    " {:>8.1e} {:>6} {:>7} {:>7}",
                    round.max_violation,
                    active,
                    format!("-{}", round.purged),
                    format!("+{}", round.added)
                ));
            }
            log::info!("{}", line);
        }
        result.trace.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuts::{CutPool, HypermetricSeparator, Inequality};
    use crate::oracle::{HyperplaneRounding, MixingOracle, Relaxation};

    /// Heuristic that never improves on the node's fixings.
    struct KeepPartial;

    impl Heuristic for KeepPartial {
        fn run(
            &mut self,
            _problem: &Problem,
            _sub: &Subproblem,
            _node: &SearchNode,
            _x: &DMatrix<f64>,
            partial: &[u8],
        ) -> Vec<u8> {
            partial.to_vec()
        }
    }

    fn engine(settings: Settings) -> BoundingEngine {
        BoundingEngine::new(
            settings,
            Box::new(MixingOracle::default()),
            Box::new(HyperplaneRounding::default()),
            Box::new(HypermetricSeparator::default()),
        )
    }

    fn engine_without_heuristic(settings: Settings) -> BoundingEngine {
        BoundingEngine::new(
            settings,
            Box::new(MixingOracle::default()),
            Box::new(KeepPartial),
            Box::new(HypermetricSeparator::default()),
        )
    }

    /// Identity primal matrix whatever the multipliers, so the dual never moves.
    struct IdentityOracle;

    impl RelaxationOracle for IdentityOracle {
        fn solve(&mut self, c: &DMatrix<f64>) -> MaxCutResult<Relaxation> {
            Ok(Relaxation {
                x: DMatrix::identity(c.nrows(), c.ncols()),
                value: c.trace(),
            })
        }
    }

    /// Keeps one triangle active and reports a fixed triangle violation.
    struct FixedTriangle {
        violation: f64,
    }

    impl Separator for FixedTriangle {
        fn separate(
            &mut self,
            _x: &DMatrix<f64>,
            pool: &mut CutPool,
            _settings: &Settings,
        ) -> MaxCutResult<SeparationRound> {
            let mut round = SeparationRound {
                family: pool.family(),
                max_violation: 0.0,
                added: 0,
                purged: 0,
            };
            if pool.family() == CutFamily::Triangle {
                round.max_violation = self.violation;
                let triangle = Inequality::new(CutFamily::Triangle, &[0, 1, 2], &[1, 1, 1]);
                if pool.add(triangle)? {
                    round.added = 1;
                }
            }
            Ok(round)
        }
    }

    /// Never finds a violated inequality.
    struct NoCuts;

    impl Separator for NoCuts {
        fn separate(
            &mut self,
            _x: &DMatrix<f64>,
            pool: &mut CutPool,
            _settings: &Settings,
        ) -> MaxCutResult<SeparationRound> {
            Ok(SeparationRound {
                family: pool.family(),
                max_violation: 0.0,
                added: 0,
                purged: 0,
            })
        }
    }

    fn scripted_engine(settings: Settings, violation: f64) -> BoundingEngine {
        BoundingEngine::new(
            settings,
            Box::new(IdentityOracle),
            Box::new(KeepPartial),
            Box::new(FixedTriangle { violation }),
        )
    }

    /// Families separated in the first refinement pass.
    fn first_pass_families(violation: f64, include_pent: bool, include_hepta: bool) -> Vec<CutFamily> {
        let prob = weighted_cycle(5, 4.0);
        let settings = Settings {
            min_outer_iter: 2,
            max_outer_iter: 2,
            include_pent,
            include_hepta,
            ..Settings::quiet()
        };
        let mut eng = scripted_engine(settings, violation);
        let mut node = SearchNode::root(4);
        let mut inc = Incumbent::trivial(4);

        let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.trace.len(), 2);
        assert!(nb.trace[1].rounds.is_empty());
        nb.trace[0].rounds.iter().map(|r| r.family).collect()
    }

    fn brute_force(prob: &Problem, node: &SearchNode) -> f64 {
        let free: Vec<usize> = node.free_vars().collect();
        let mut best = f64::NEG_INFINITY;
        for mask in 0..1u64 << free.len() {
            let mut x = node.partial_assignment();
            for (b, &i) in free.iter().enumerate() {
                x[i] = ((mask >> b) & 1) as u8;
            }
            best = best.max(prob.evaluate(&x));
        }
        best
    }

    fn complete_graph(n: usize) -> Problem {
        let mut edges = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                edges.push((i, j, 1.0));
            }
        }
        Problem::from_edges(n, &edges).unwrap()
    }

    fn weighted_cycle(n: usize, w: f64) -> Problem {
        let edges: Vec<(usize, usize, f64)> = (0..n).map(|i| (i, (i + 1) % n, w)).collect();
        Problem::from_edges(n, &edges).unwrap()
    }

    fn cycle(n: usize) -> Problem {
        weighted_cycle(n, 1.0)
    }

    #[test]
    fn test_single_edge_is_pruned_by_heuristic() {
        let prob = Problem::from_edges(2, &[(0, 1, 3.0)]).unwrap();
        let mut node = SearchNode::root(1);
        let mut inc = Incumbent::trivial(1);
        let mut eng = engine(Settings::quiet());

        let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
        assert_eq!(inc.value, 3.0);
        assert_eq!(nb.outcome, BoundingOutcome::Pruned);
        assert!(nb.bound >= 3.0 - 1e-9);
        assert!(nb.trace.is_empty());
    }

    #[test]
    fn test_odd_clique_pruned_after_plain_bound() {
        // K5: max cut 6, basic SDP bound 6.25.
        let prob = complete_graph(5);
        let mut node = SearchNode::root(4);
        let mut inc = Incumbent::trivial(4);
        let mut eng = engine(Settings::quiet());

        let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
        assert!(nb.bound >= brute_force(&prob, &node) - 1e-6);
        assert_eq!(inc.value, 6.0);
        assert_eq!(nb.outcome, BoundingOutcome::Pruned);
        assert!(eng.root_gap().is_none());
    }

    #[test]
    fn test_refinement_tightens_cycle_bound() {
        // C5: max cut 4, basic SDP bound about 4.52; triangles are violated.
        let prob = cycle(5);
        let settings = Settings {
            min_outer_iter: 2,
            max_outer_iter: 4,
            ..Settings::quiet()
        };
        let mut node = SearchNode::root(4);
        let mut inc = Incumbent::trivial(4);
        let mut eng = engine_without_heuristic(settings);

        let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.outcome, BoundingOutcome::Refined);
        assert!(nb.plain_bound > 4.4);
        assert!(nb.bound >= 4.0 - 1e-6);
        assert!(nb.bound < nb.plain_bound);
        assert!(!nb.trace.is_empty() && nb.trace.len() <= 4);
        assert!(nb.trace[0].rounds.iter().any(|r| r.family == CutFamily::Triangle));
        for record in &nb.trace {
            assert!(record.bundle_size <= Settings::default().max_bundle);
        }

        let gap = eng.root_gap().unwrap();
        assert!((gap - (nb.plain_bound - nb.bound)).abs() < 1e-12);
    }

    #[test]
    fn test_given_up_below_root() {
        let prob = cycle(5);
        let mut eng = engine_without_heuristic(Settings {
            min_outer_iter: 1,
            max_outer_iter: 1,
            ..Settings::quiet()
        });

        let mut inc = Incumbent::trivial(4);
        let mut root = SearchNode::root(4);
        eng.bound(&prob, &mut root, &mut inc, Instant::now()).unwrap();
        let gap = eng.root_gap().unwrap();
        assert!(gap >= 0.0);

        // Incumbent 0 is far below the child's plain bound.
        let mut child = root.child(1, 0, 1);
        let nb = eng.bound(&prob, &mut child, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.outcome, BoundingOutcome::GivenUp);
        assert_eq!(nb.bound, nb.plain_bound);
        assert!(nb.trace.is_empty());
    }

    #[test]
    fn test_fixed_node_bounds_are_sound() {
        let edges = [
            (0, 1, 3.0),
            (1, 2, 1.0),
            (2, 3, 4.0),
            (3, 4, 2.0),
            (4, 5, 5.0),
            (0, 5, 1.0),
            (1, 4, 2.0),
            (0, 3, 3.0),
        ];
        let prob = Problem::from_edges(6, &edges).unwrap();
        let mut eng = engine_without_heuristic(Settings::quiet());

        let root = SearchNode::root(5);
        for (var, value) in [(0, 0), (0, 1), (3, 1)] {
            let mut node = root.child(1, var, value);
            let mut inc = Incumbent::trivial(5);
            let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
            assert!(nb.bound >= brute_force(&prob, &node) - 1e-6);
            assert_eq!(node.frac[var], f64::from(value));
        }
    }

    #[test]
    fn test_root_gap_cached_when_no_cut_is_found() {
        let prob = cycle(5);
        let mut eng = BoundingEngine::new(
            Settings::quiet(),
            Box::new(MixingOracle::default()),
            Box::new(KeepPartial),
            Box::new(NoCuts),
        );

        let mut inc = Incumbent::trivial(4);
        let mut root = SearchNode::root(4);
        let nb = eng.bound(&prob, &mut root, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.outcome, BoundingOutcome::Refined);
        assert_eq!(nb.bound, nb.plain_bound);
        assert_eq!(eng.root_gap(), Some(0.0));

        // The shortcut now applies below the root
        let mut child = root.child(1, 0, 1);
        let nb = eng.bound(&prob, &mut child, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.outcome, BoundingOutcome::GivenUp);
    }

    #[test]
    fn test_stagnating_bound_stops_before_cap() {
        let prob = weighted_cycle(5, 4.0);
        let settings = Settings {
            min_outer_iter: 3,
            max_outer_iter: 10,
            ..Settings::quiet()
        };
        let mut eng = scripted_engine(settings, 0.5);
        let mut node = SearchNode::root(4);
        let mut inc = Incumbent::trivial(4);

        let nb = eng.bound(&prob, &mut node, &mut inc, Instant::now()).unwrap();
        assert_eq!(nb.outcome, BoundingOutcome::Refined);
        assert_eq!(nb.trace.len(), 3);
        assert!((nb.bound - nb.plain_bound).abs() < 1e-9);
        for record in &nb.trace {
            assert_eq!(record.active, [1, 0, 0]);
        }

        let (family, stats) = eng.cut_stats()[0];
        assert_eq!(family, CutFamily::Triangle);
        assert_eq!(stats.total_added, 1);
    }

    #[test]
    fn test_larger_families_follow_triangle_violation() {
        use CutFamily::{Heptagonal, Pentagonal, Triangle};

        assert_eq!(first_pass_families(0.5, true, true), vec![Triangle]);
        assert_eq!(first_pass_families(0.3, true, true), vec![Triangle]);
        assert_eq!(
            first_pass_families(0.1, true, true),
            vec![Triangle, Pentagonal, Heptagonal]
        );
        assert_eq!(first_pass_families(0.1, false, true), vec![Triangle, Heptagonal]);
        assert_eq!(first_pass_families(0.1, true, false), vec![Triangle, Pentagonal]);
        assert_eq!(first_pass_families(0.1, false, false), vec![Triangle]);
    }
}
