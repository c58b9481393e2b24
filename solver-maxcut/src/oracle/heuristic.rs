//! Hyperplane rounding with 1-opt local search.

use nalgebra::linalg::SymmetricEigen;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Heuristic;
use crate::model::{Problem, Subproblem};
use crate::search::SearchNode;

/// Goemans-Williamson rounding of the relaxation.
///
/// Each trial draws a random hyperplane through the origin and puts a free
/// variable on side 1 iff its vector falls on the other side than the
/// reference vector. Every rounded vector, and the bare partial assignment,
/// is then improved by single flips of free variables.
pub struct HyperplaneRounding {
    rng: StdRng,

    /// Random hyperplanes per call.
    pub trials: usize,
}

impl HyperplaneRounding {
    /// Create a heuristic with a fixed random seed.
    pub fn new(seed: u64, trials: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            trials,
        }
    }

    /// Rows of `V` with `V V' = X` (negative eigenvalues clipped).
    fn factor(x: &DMatrix<f64>) -> DMatrix<f64> {
        let eig = SymmetricEigen::new(x.clone());
        let mut v = eig.eigenvectors;
        for (mut col, &lambda) in v.column_iter_mut().zip(eig.eigenvalues.iter()) {
            col *= lambda.max(0.0).sqrt();
        }
        v
    }
}

impl Default for HyperplaneRounding {
    fn default() -> Self {
        Self::new(0x6777, 10)
    }
}

/// Flip single free variables while that increases the cut.
fn one_opt(problem: &Problem, free: &[usize], x: &mut [u8]) {
    loop {
        let mut improved = false;
        for &i in free {
            if problem.flip_gain(x, i) > 1e-9 {
                x[i] = 1 - x[i];
                improved = true;
            }
        }
        if !improved {
            break;
        }
    }
}

impl Heuristic for HyperplaneRounding {
    fn run(
        &mut self,
        problem: &Problem,
        sub: &Subproblem,
        _node: &SearchNode,
        x: &DMatrix<f64>,
        partial: &[u8],
    ) -> Vec<u8> {
        let mut best = partial.to_vec();
        one_opt(problem, &sub.free, &mut best);
        let mut best_value = problem.evaluate(&best);

        if sub.free.is_empty() {
            return best;
        }

        let v = Self::factor(x);
        let k = v.nrows();
        let reference = sub.reference();

        for _ in 0..self.trials {
            let r = DVector::from_fn(v.ncols(), |_, _| self.rng.random_range(-1.0..1.0));
            let side: Vec<bool> = (0..k).map(|i| v.row(i).transpose().dot(&r) >= 0.0).collect();

            let mut candidate = partial.to_vec();
            for (a, &var) in sub.free.iter().enumerate() {
                candidate[var] = u8::from(side[a] != side[reference]);
            }
            one_opt(problem, &sub.free, &mut candidate);

            let value = problem.evaluate(&candidate);
            if value > best_value {
                best_value = value;
                best = candidate;
            }
        }

        best
    }
}
