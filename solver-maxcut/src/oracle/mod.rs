//! Relaxation and primal heuristic oracles used by the bounding engine.

mod heuristic;
mod mixing;

use nalgebra::DMatrix;

use crate::error::MaxCutResult;
use crate::model::{Problem, Subproblem};
use crate::search::SearchNode;

pub use heuristic::HyperplaneRounding;
pub use mixing::MixingOracle;

/// Result of a relaxation solve.
#[derive(Debug, Clone)]
pub struct Relaxation {
    /// Primal matrix (unit diagonal, PSD).
    pub x: DMatrix<f64>,

    /// Upper bound on `<C, X>` over all unit-diagonal PSD matrices.
    pub value: f64,
}

/// Solver for the basic SDP relaxation `max <C, X>, diag(X) = e, X PSD`.
pub trait RelaxationOracle {
    /// Solve the relaxation for a symmetric objective `c`.
    ///
    /// The returned value must be a valid upper bound, whatever the quality
    /// of the returned primal matrix.
    fn solve(&mut self, c: &DMatrix<f64>) -> MaxCutResult<Relaxation>;
}

/// Primal heuristic producing feasible cuts from a relaxation.
pub trait Heuristic {
    /// Build a complete 0/1 vector over the branching variables.
    ///
    /// `partial` carries the node's fixed values (free entries are 0). The
    /// result must agree with `partial` on every fixed variable.
    fn run(
        &mut self,
        problem: &Problem,
        sub: &Subproblem,
        node: &SearchNode,
        x: &DMatrix<f64>,
        partial: &[u8],
    ) -> Vec<u8>;
}
