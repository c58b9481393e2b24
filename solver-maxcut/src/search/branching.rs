//! Branching variable selection.

use super::SearchNode;
use crate::settings::BranchingRule;

/// A branching decision.
#[derive(Debug, Clone)]
pub struct BranchDecision {
    /// Variable to branch on.
    pub var: usize,

    /// Fractional value of the variable in the node relaxation.
    pub frac: f64,

    /// Distance of `frac` from 0.5 (for logging/debugging).
    pub score: f64,
}

/// Branching variable selector.
///
/// Picks among the free variables of a node by their fractional values.
/// Ties go to the lowest index.
#[derive(Debug, Clone, Copy)]
pub struct BranchingSelector {
    /// Branching rule to use.
    rule: BranchingRule,
}

impl BranchingSelector {
    /// Create a new branching selector.
    pub fn new(rule: BranchingRule) -> Self {
        Self { rule }
    }

    /// Select a branching variable.
    ///
    /// Returns None if every variable of the node is fixed.
    pub fn select(&self, node: &SearchNode) -> Option<BranchDecision> {
        let mut best: Option<BranchDecision> = None;

        for var in node.free_vars() {
            let frac = node.frac[var];
            let score = (0.5 - frac).abs();
            let better = match &best {
                None => true,
                Some(b) => match self.rule {
                    BranchingRule::MostFractional => score < b.score,
                    BranchingRule::LeastFractional => score > b.score,
                },
            };
            if better {
                best = Some(BranchDecision { var, frac, score });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_frac(frac: &[f64]) -> SearchNode {
        let mut node = SearchNode::root(frac.len());
        node.frac = frac.to_vec();
        node
    }

    #[test]
    fn test_most_fractional() {
        let node = node_with_frac(&[0.9, 0.45, 0.1, 0.6]);
        let d = BranchingSelector::new(BranchingRule::MostFractional)
            .select(&node)
            .unwrap();
        assert_eq!(d.var, 1);
        assert!((d.score - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_least_fractional() {
        let node = node_with_frac(&[0.9, 0.45, 0.02, 0.6]);
        let d = BranchingSelector::new(BranchingRule::LeastFractional)
            .select(&node)
            .unwrap();
        assert_eq!(d.var, 2);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let node = node_with_frac(&[0.3, 0.7, 0.3]);
        let most = BranchingSelector::new(BranchingRule::MostFractional);
        assert_eq!(most.select(&node).unwrap().var, 0);

        let least = BranchingSelector::new(BranchingRule::LeastFractional);
        assert_eq!(least.select(&node).unwrap().var, 0);
    }

    #[test]
    fn test_fixed_variables_are_skipped() {
        // Variable 1 is the most fractional but already fixed.
        let mut node = node_with_frac(&[0.9, 0.5, 0.8]);
        node.fixed[1] = true;
        let d = BranchingSelector::new(BranchingRule::MostFractional)
            .select(&node)
            .unwrap();
        assert_eq!(d.var, 2);
    }

    #[test]
    fn test_leaf_has_no_decision() {
        let node = SearchNode::root(2).child(1, 0, 0).child(2, 1, 1);
        let selector = BranchingSelector::new(BranchingRule::MostFractional);
        assert!(selector.select(&node).is_none());
    }
}
