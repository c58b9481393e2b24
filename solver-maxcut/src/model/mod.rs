//! Problem and solution types for the Max-Cut solver.

mod problem;
mod solution;

pub use problem::{Problem, Subproblem};
pub use solution::{Incumbent, MaxCutSolution, SolveStatus};
