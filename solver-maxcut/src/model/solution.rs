//! Max-Cut solution types.

use std::time::Duration;

use super::Problem;

/// Status of the Max-Cut solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Search tree exhausted; the incumbent is optimal.
    Optimal,

    /// Only the root node was evaluated (root-only mode).
    RootOnly,

    /// Time limit reached, best solution returned.
    TimeLimit,

    /// Stop was requested through a [`crate::StopHandle`].
    Interrupted,
}

impl SolveStatus {
    /// Returns true if optimality was proven.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    /// Returns true if the search ended before the tree was exhausted.
    pub fn is_stopped(&self) -> bool {
        !self.is_optimal()
    }
}

/// Complete Max-Cut solution with diagnostics.
#[derive(Debug, Clone)]
pub struct MaxCutSolution {
    /// Solve status.
    pub status: SolveStatus,

    /// Best cut value found.
    pub best_value: f64,

    /// 0/1 side of each vertex. The last vertex is always on side 0.
    pub x: Vec<u8>,

    /// Bound computed at the root node (None if the root was never evaluated).
    pub root_bound: Option<f64>,

    /// Number of B&B nodes evaluated (root and every created child).
    pub nodes_evaluated: u64,

    /// Number of times the incumbent was improved.
    pub incumbent_updates: u64,

    /// Wall-clock solve time.
    pub solve_time: Duration,
}

impl MaxCutSolution {
    /// True if the search stopped early.
    pub fn stopped(&self) -> bool {
        self.status.is_stopped()
    }

    /// 1-based indices of the vertices on side 1.
    pub fn cut_vertices(&self) -> Vec<usize> {
        self.x
            .iter()
            .enumerate()
            .filter(|&(_, &side)| side == 1)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// Tracks the best known feasible cut (incumbent).
///
/// [`Incumbent::offer`] is the only write path; the value never decreases.
#[derive(Debug, Clone)]
pub struct Incumbent {
    /// Best 0/1 vector over the branching variables.
    pub solution: Vec<u8>,

    /// Cut value of the incumbent.
    pub value: f64,

    /// Number of times the incumbent was improved.
    pub update_count: u64,
}

impl Incumbent {
    /// Start from the trivial cut (every vertex on side 0, value 0).
    pub fn trivial(num_vars: usize) -> Self {
        Self {
            solution: vec![0; num_vars],
            value: 0.0,
            update_count: 0,
        }
    }

    /// Evaluate `x` and keep it if it is strictly better.
    ///
    /// Returns true if the incumbent was improved.
    pub fn offer(&mut self, problem: &Problem, x: &[u8]) -> bool {
        let value = problem.evaluate(x);
        if value > self.value {
            self.solution.clear();
            self.solution.extend_from_slice(&x[..problem.num_vars()]);
            self.value = value;
            self.update_count += 1;
            true
        } else {
            false
        }
    }

    /// Smallest bound a node needs to stay alive.
    ///
    /// Cut values are integral, so a subtree whose bound is below
    /// `value + 1` cannot contain a better cut.
    pub fn prune_threshold(&self) -> f64 {
        self.value + 1.0
    }

    /// Whether a subtree with the given upper bound can be discarded.
    pub fn can_prune(&self, upper_bound: f64) -> bool {
        upper_bound < self.prune_threshold()
    }

    /// Vertex sides including the fixed last vertex.
    pub fn vertex_sides(&self) -> Vec<u8> {
        let mut sides = self.solution.clone();
        sides.push(0);
        sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> Problem {
        // 1 -(2)- 2 -(3)- 3
        Problem::from_edges(3, &[(0, 1, 2.0), (1, 2, 3.0)]).unwrap()
    }

    #[test]
    fn test_incumbent_only_improves() {
        let prob = path3();
        let mut inc = Incumbent::trivial(2);
        assert_eq!(inc.value, 0.0);

        assert!(inc.offer(&prob, &[1, 0])); // cuts edge 1-2 only
        assert_eq!(inc.value, 2.0);
        assert_eq!(inc.update_count, 1);

        // Equal value is not an improvement
        assert!(!inc.offer(&prob, &[1, 0]));
        // Worse value rejected
        assert!(!inc.offer(&prob, &[0, 0]));
        assert_eq!(inc.value, 2.0);

        assert!(inc.offer(&prob, &[0, 1])); // cuts both edges
        assert_eq!(inc.value, 5.0);
        assert_eq!(inc.solution, vec![0, 1]);
        assert_eq!(inc.update_count, 2);
    }

    #[test]
    fn test_prune_threshold() {
        let mut inc = Incumbent::trivial(2);
        inc.value = 10.0;

        assert!(inc.can_prune(10.9));
        assert!(!inc.can_prune(11.0));
        assert!(!inc.can_prune(15.0));
    }

    #[test]
    fn test_cut_vertices() {
        let sol = MaxCutSolution {
            status: SolveStatus::Optimal,
            best_value: 5.0,
            x: vec![0, 1, 0],
            root_bound: Some(5.0),
            nodes_evaluated: 1,
            incumbent_updates: 1,
            solve_time: Duration::ZERO,
        };
        assert_eq!(sol.cut_vertices(), vec![2]);
        assert!(!sol.stopped());
    }

    #[test]
    fn test_status_methods() {
        assert!(SolveStatus::Optimal.is_optimal());
        assert!(SolveStatus::TimeLimit.is_stopped());
        assert!(SolveStatus::RootOnly.is_stopped());
        assert!(SolveStatus::Interrupted.is_stopped());
    }
}
