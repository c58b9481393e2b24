//! Exact Max-Cut by branch-and-bound with SDP bounds.
//!
//! Every node of a best-first search tree is bounded by the basic
//! semidefinite relaxation of Max-Cut, tightened with hypermetric
//! inequalities:
//!
//! - **Triangle** inequalities, enumerated exhaustively
//! - **Pentagonal** and **heptagonal** inequalities, found by randomized search
//!
//! The inequality multipliers are optimized by a proximal bundle method on
//! the Lagrangian dual, so every bound along the way is valid.
//!
//! # Algorithm
//!
//! The last vertex is fixed to side 0 and each other vertex is a 0/1
//! branching variable. A node fixes some variables; its bound is the
//! relaxation value of the restricted problem plus the contribution of the
//! fixed part. A node survives only if its bound is at least the incumbent
//! plus one, which is exact because edge weights are integral.
//!
//! The relaxation, the primal heuristic and the separation routine are
//! traits ([`RelaxationOracle`], [`Heuristic`], [`Separator`]); the defaults
//! are a low-rank mixing method, hyperplane rounding and a hypermetric
//! separator.
//!
//! # Example
//!
//! ```
//! use solver_maxcut::{solve_maxcut, Problem, Settings};
//!
//! // Path 1 - 2 - 3 with weights 2 and 3
//! let prob = Problem::from_edges(3, &[(0, 1, 2.0), (1, 2, 3.0)])?;
//! let sol = solve_maxcut(&prob, &Settings::quiet())?;
//!
//! assert_eq!(sol.best_value, 5.0);
//! assert_eq!(sol.cut_vertices(), vec![2]);
//! # Ok::<(), solver_maxcut::MaxCutError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounding;
pub mod cuts;
pub mod error;
pub mod model;
pub mod oracle;
pub mod search;
pub mod settings;

// Re-export main types
pub use bounding::{BoundingEngine, BoundingOutcome, NodeBound};
pub use cuts::{CutFamily, HypermetricSeparator, Separator};
pub use error::{MaxCutError, MaxCutResult};
pub use model::{Incumbent, MaxCutSolution, Problem, SolveStatus, Subproblem};
pub use oracle::{Heuristic, HyperplaneRounding, MixingOracle, Relaxation, RelaxationOracle};
pub use search::{MaxCutSolver, SearchNode, StopHandle};
pub use settings::{BranchingRule, Settings};

/// Main solve entry point.
///
/// Solves a Max-Cut problem with the default oracles.
pub fn solve_maxcut(prob: &Problem, settings: &Settings) -> MaxCutResult<MaxCutSolution> {
    let mut solver = MaxCutSolver::new(prob.clone(), settings.clone())?;
    solver.solve()
}
