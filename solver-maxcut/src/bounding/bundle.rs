//! Proximal bundle method for the Lagrangian dual of the cut-strengthened
//! relaxation.
//!
//! For active inequalities `A(X) <= b` with multipliers `gamma >= 0` the dual
//! function is
//!
//! ```text
//! f(gamma) = b'gamma + phi(M - A^* gamma)
//! ```
//!
//! where `phi` is the relaxation oracle value. Every oracle answer `X_i`
//! yields the linearization `F_i + G_i'gamma` with `F_i = <M, X_i>` and
//! `G_i = b - A(X_i)`, which underestimates `f` everywhere.

use nalgebra::{DMatrix, DVector};

use crate::cuts::CutSet;
use crate::error::{MaxCutError, MaxCutResult};
use crate::oracle::RelaxationOracle;

/// Bounds on the proximal step size.
const T_MIN: f64 = 1e-6;
const T_MAX: f64 = 1e6;

/// Relative predicted decrease below which the method has converged.
const DESCENT_TOL: f64 = 1e-6;

/// Fraction of the predicted decrease a serious step must achieve.
const SERIOUS_FRACTION: f64 = 0.1;

/// Simplex weights below this are dropped from the bundle.
const LAMBDA_TOL: f64 = 1e-8;

const MASTER_ROUNDS: usize = 10;
const QP_ITERATIONS: usize = 50;

/// One linearization of the dual function.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Primal matrix returned by the oracle.
    pub x: DMatrix<f64>,

    /// `<M, X>`.
    pub value: f64,

    /// `b - A(X)` for the current cut set.
    pub subgradient: DVector<f64>,
}

impl BundleEntry {
    /// Build the linearization of a primal matrix for the current cut set.
    pub fn new(m: &DMatrix<f64>, cuts: &CutSet, x: DMatrix<f64>) -> Self {
        Self {
            value: m.dot(&x),
            subgradient: cuts.subgradient(&x),
            x,
        }
    }

    /// Value of the linearization at `gamma`.
    pub fn model_value(&self, gamma: &DVector<f64>) -> f64 {
        self.value + self.subgradient.dot(gamma)
    }
}

/// Bounded collection of linearizations.
#[derive(Debug, Clone)]
pub struct BundleStore {
    entries: Vec<BundleEntry>,
    capacity: usize,
}

impl BundleStore {
    /// Create an empty store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Discard everything and keep `entry` as the sole element.
    pub fn reset(&mut self, entry: BundleEntry) {
        self.entries.clear();
        self.entries.push(entry);
    }

    /// Append an entry.
    pub fn push(&mut self, entry: BundleEntry) -> MaxCutResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(MaxCutError::BundleOverflow {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Recompute every subgradient after the cut set changed.
    pub fn refresh_subgradients(&mut self, cuts: &CutSet) {
        for entry in &mut self.entries {
            entry.subgradient = cuts.subgradient(&entry.x);
        }
    }

    /// Drop entries whose weight is below the tolerance, keeping the newest.
    ///
    /// `lambda` is filtered alongside.
    fn drop_inactive(&mut self, lambda: &mut Vec<f64>) {
        debug_assert_eq!(lambda.len(), self.entries.len());
        let last = self.entries.len().saturating_sub(1);
        let keep: Vec<bool> = lambda
            .iter()
            .enumerate()
            .map(|(i, &w)| i == last || w >= LAMBDA_TOL)
            .collect();

        let mut idx = 0;
        self.entries.retain(|_| {
            idx += 1;
            keep[idx - 1]
        });
        let mut idx = 0;
        lambda.retain(|_| {
            idx += 1;
            keep[idx - 1]
        });
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Evaluate the dual function at `gamma`.
///
/// Returns `f(gamma)` and the linearization at the oracle's primal matrix.
pub fn evaluate_dual(
    oracle: &mut dyn RelaxationOracle,
    m: &DMatrix<f64>,
    cuts: &CutSet,
    gamma: &DVector<f64>,
) -> MaxCutResult<(f64, BundleEntry)> {
    let c = cuts.lagrangian(m, gamma);
    let relaxation = oracle.solve(&c)?;
    let value = cuts.rhs().dot(gamma) + relaxation.value;
    Ok((value, BundleEntry::new(m, cuts, relaxation.x)))
}

/// Result of a bundle run.
#[derive(Debug, Clone)]
pub struct BundleRun {
    /// Dual value at the stability center.
    pub value: f64,

    /// Aggregate primal matrix `sum lambda_i X_i`.
    pub x: DMatrix<f64>,

    /// Inner iterations performed (oracle calls).
    pub iterations: usize,

    /// Serious steps taken.
    pub serious_steps: usize,
}

/// State of the proximal bundle method across runs at one node.
///
/// The stability center is the multiplier vector stored in the cut pools;
/// `center_value` is `f` there.
#[derive(Debug, Clone)]
pub struct BundleMethod {
    /// Proximal step size.
    pub t: f64,

    /// Dual value at the stability center.
    center_value: f64,

    /// Simplex weights of the bundle entries.
    lambda: Vec<f64>,

    serious_streak: usize,
    null_streak: usize,
}

impl BundleMethod {
    /// Start with step size `t` at a center whose dual value is `center_value`.
    pub fn new(t: f64, center_value: f64) -> Self {
        Self {
            t: t.clamp(T_MIN, T_MAX),
            center_value,
            lambda: Vec::new(),
            serious_streak: 0,
            null_streak: 0,
        }
    }

    /// Move the center after the multipliers were reset from the pools.
    pub fn recenter(&mut self, value: f64) {
        self.center_value = value;
    }

    /// Scale the step size.
    pub fn scale_step(&mut self, factor: f64) {
        self.t = (self.t * factor).clamp(T_MIN, T_MAX);
    }

    /// Run at most `max_iter` iterations from the multipliers held in `cuts`.
    ///
    /// On return the pools hold the new stability center.
    pub fn run(
        &mut self,
        oracle: &mut dyn RelaxationOracle,
        m: &DMatrix<f64>,
        cuts: &mut CutSet,
        store: &mut BundleStore,
        max_iter: usize,
    ) -> MaxCutResult<BundleRun> {
        let mut gamma_hat = cuts.multipliers();
        let mut iterations = 0;
        let mut serious_steps = 0;

        if cuts.is_empty() || store.is_empty() {
            self.align_lambda(store.len());
            return Ok(BundleRun {
                value: self.center_value,
                x: self.aggregate(store),
                iterations,
                serious_steps,
            });
        }

        for _ in 0..max_iter {
            let (gamma, model) = self.solve_master(store, &gamma_hat);
            let delta = self.center_value - model;
            if delta <= DESCENT_TOL * (1.0 + self.center_value.abs()) {
                break;
            }

            let (value, entry) = evaluate_dual(oracle, m, cuts, &gamma)?;
            iterations += 1;

            store.drop_inactive(&mut self.lambda);
            store.push(entry)?;
            self.lambda.push(0.0);

            if self.center_value - value >= SERIOUS_FRACTION * delta {
                gamma_hat = gamma;
                self.center_value = value;
                serious_steps += 1;
                self.null_streak = 0;
                self.serious_streak += 1;
                if self.serious_streak >= 2 {
                    self.scale_step(1.5);
                    self.serious_streak = 0;
                }
            } else {
                self.serious_streak = 0;
                self.null_streak += 1;
                if self.null_streak >= 3 {
                    self.scale_step(0.7);
                    self.null_streak = 0;
                }
            }
        }

        cuts.set_multipliers(&gamma_hat);
        Ok(BundleRun {
            value: self.center_value,
            x: self.aggregate(store),
            iterations,
            serious_steps,
        })
    }

    /// Resize the weights to the store, keeping them on the simplex.
    fn align_lambda(&mut self, n: usize) {
        self.lambda.resize(n, 0.0);
        let sum: f64 = self.lambda.iter().sum();
        if n > 0 && sum <= 0.0 {
            self.lambda.iter_mut().for_each(|w| *w = 0.0);
            self.lambda[n - 1] = 1.0;
        } else if sum > 0.0 {
            self.lambda.iter_mut().for_each(|w| *w /= sum);
        }
    }

    /// Weighted average of the bundle's primal matrices.
    fn aggregate(&self, store: &BundleStore) -> DMatrix<f64> {
        let entries = store.entries();
        let dim = entries.first().map(|e| e.x.nrows()).unwrap_or(0);
        let mut x = DMatrix::zeros(dim, dim);
        let total: f64 = self.lambda.iter().sum();
        if total <= 0.0 {
            if let Some(last) = entries.last() {
                x.copy_from(&last.x);
            }
            return x;
        }
        for (entry, &w) in entries.iter().zip(&self.lambda) {
            if w > 0.0 {
                x += &entry.x * (w / total);
            }
        }
        x
    }

    /// Solve the proximal master problem through its dual.
    ///
    /// Returns the trial point and the model value there.
    fn solve_master(&mut self, store: &BundleStore, gamma_hat: &DVector<f64>) -> (DVector<f64>, f64) {
        let entries = store.entries();
        let n = entries.len();
        let t = self.t;
        self.align_lambda(n);

        let g = DMatrix::from_columns(
            &entries.iter().map(|e| e.subgradient.clone()).collect::<Vec<_>>(),
        );
        let f = DVector::from_iterator(n, entries.iter().map(|e| e.value));
        let q = g.transpose() * &g;
        let base = &f + g.transpose() * gamma_hat;
        let trace = q.trace();

        let mut lambda = DVector::from_vec(self.lambda.clone());
        for _ in 0..MASTER_ROUNDS {
            let eta = (&g * &lambda - gamma_hat / t).map(|v| v.max(0.0));
            let c = &base + g.transpose() * eta * t;

            if t * trace <= 1e-12 {
                // Linear objective: best vertex of the simplex
                let best = c.argmax().0;
                lambda.fill(0.0);
                lambda[best] = 1.0;
                continue;
            }

            let step = 1.0 / (t * trace);
            for _ in 0..QP_ITERATIONS {
                let grad = &q * &lambda * t - &c;
                lambda = project_simplex(&(&lambda - grad * step));
            }
        }

        self.lambda = lambda.iter().copied().collect();
        let gamma = (gamma_hat - &g * &lambda * t).map(|v| v.max(0.0));
        let model = entries
            .iter()
            .map(|e| e.model_value(&gamma))
            .fold(f64::NEG_INFINITY, f64::max);
        (gamma, model)
    }
}

/// Euclidean projection onto the unit simplex.
fn project_simplex(v: &DVector<f64>) -> DVector<f64> {
    let mut sorted: Vec<f64> = v.iter().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (i + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }
    v.map(|x| (x - theta).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuts::{CutFamily, Inequality};
    use crate::model::Problem;
    use crate::oracle::{MixingOracle, RelaxationOracle};
    use crate::search::SearchNode;

    #[test]
    fn test_project_simplex() {
        let p = project_simplex(&DVector::from_vec(vec![0.5, 0.5, 0.5]));
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|&x| (x - 1.0 / 3.0).abs() < 1e-12));

        let p = project_simplex(&DVector::from_vec(vec![3.0, 0.0, -1.0]));
        assert_eq!(p, DVector::from_vec(vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_store_capacity() {
        let cuts = CutSet::new(10);
        let m = DMatrix::identity(2, 2);
        let mut store = BundleStore::new(2);
        store.reset(BundleEntry::new(&m, &cuts, DMatrix::identity(2, 2)));
        store.push(BundleEntry::new(&m, &cuts, DMatrix::identity(2, 2))).unwrap();

        let err = store
            .push(BundleEntry::new(&m, &cuts, DMatrix::identity(2, 2)))
            .unwrap_err();
        assert!(matches!(err, MaxCutError::BundleOverflow { capacity: 2 }));
        assert_eq!(store.len(), 2);

        store.reset(BundleEntry::new(&m, &cuts, DMatrix::identity(2, 2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drop_keeps_newest() {
        let cuts = CutSet::new(10);
        let m = DMatrix::identity(1, 1);
        let mut store = BundleStore::new(10);
        store.reset(BundleEntry::new(&m, &cuts, DMatrix::identity(1, 1)));
        store.push(BundleEntry::new(&m, &cuts, DMatrix::identity(1, 1))).unwrap();
        store.push(BundleEntry::new(&m, &cuts, DMatrix::identity(1, 1))).unwrap();

        let mut lambda = vec![1.0, 0.0, 0.0];
        store.drop_inactive(&mut lambda);
        assert_eq!(store.len(), 2);
        assert_eq!(lambda, vec![1.0, 0.0]);
    }

    #[test]
    fn test_no_cuts_returns_immediately() {
        let prob = Problem::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let sub = prob.subproblem(&SearchNode::root(2));
        let mut oracle = MixingOracle::default();
        let rel = oracle.solve(&sub.l).unwrap();

        let mut cuts = CutSet::new(10);
        let mut store = BundleStore::new(10);
        store.reset(BundleEntry::new(&sub.l, &cuts, rel.x.clone()));

        let mut method = BundleMethod::new(1.0, rel.value);
        let run = method
            .run(&mut oracle, &sub.l, &mut cuts, &mut store, 5)
            .unwrap();
        assert_eq!(run.iterations, 0);
        assert_eq!(run.value, rel.value);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_triangle_cut_closes_gap() {
        // Unit triangle: the SDP bound is 9/4, the max cut is 2 and the
        // triangle inequality makes the relaxation exact.
        let prob = Problem::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let sub = prob.subproblem(&SearchNode::root(2));
        let mut oracle = MixingOracle::default();
        let rel = oracle.solve(&sub.l).unwrap();

        // In the +-1 frame of the subproblem the optimal SDP point violates
        // the triangle with signs (1, 1, -1).
        let mut cuts = CutSet::new(10);
        let ineq = Inequality::new(CutFamily::Triangle, &[0, 1, 2], &[1, 1, -1]);
        assert!(ineq.violation_at(&rel.x) > 0.1);
        cuts.pool_mut(CutFamily::Triangle).add(ineq).unwrap();

        let mut store = BundleStore::new(400);
        store.reset(BundleEntry::new(&sub.l, &cuts, rel.x.clone()));
        let mut method = BundleMethod::new(1.0, rel.value);

        let mut value = rel.value;
        for _ in 0..10 {
            value = method
                .run(&mut oracle, &sub.l, &mut cuts, &mut store, 10)
                .unwrap()
                .value;
        }

        assert!(value < rel.value - 0.1);
        assert!(value >= 2.0 - 1e-6);
        assert!(store.len() <= store.capacity());
        assert!(cuts.multipliers()[0] > 0.0);
    }
}
