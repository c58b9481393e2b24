//! Search node representation.

use nalgebra::DMatrix;

/// A node in the B&B search tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Unique node identifier.
    pub id: u64,

    /// Depth in the tree (0 for root).
    pub depth: usize,

    /// Which variables are fixed.
    pub fixed: Vec<bool>,

    /// Values of the fixed variables (0 elsewhere).
    pub sol: Vec<u8>,

    /// Relaxation value of each variable in [0, 1], equal to the fixed value
    /// for fixed variables. Guides branching.
    pub frac: Vec<f64>,

    /// Upper bound on any cut reachable from this node.
    pub upper_bound: f64,
}

impl SearchNode {
    /// Create the root node over `num_vars` free variables.
    pub fn root(num_vars: usize) -> Self {
        Self {
            id: 0,
            depth: 0,
            fixed: vec![false; num_vars],
            sol: vec![0; num_vars],
            frac: vec![0.5; num_vars],
            upper_bound: f64::INFINITY,
        }
    }

    /// Create a child that additionally fixes `var` to `value`.
    pub fn child(&self, id: u64, var: usize, value: u8) -> Self {
        debug_assert!(!self.fixed[var], "variable {var} is already fixed");

        let mut fixed = self.fixed.clone();
        let mut sol = self.sol.clone();
        let mut frac = self.frac.clone();
        fixed[var] = true;
        sol[var] = value;
        frac[var] = f64::from(value);

        Self {
            id,
            depth: self.depth + 1,
            fixed,
            sol,
            frac,
            upper_bound: self.upper_bound, // Inherit parent's bound initially
        }
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.fixed.len()
    }

    /// Number of fixed variables.
    pub fn num_fixed(&self) -> usize {
        self.fixed.iter().filter(|&&f| f).count()
    }

    /// A node is a leaf once every variable is fixed.
    pub fn is_leaf(&self) -> bool {
        self.num_fixed() == self.num_vars()
    }

    /// Indices of the free variables, in order.
    pub fn free_vars(&self) -> impl Iterator<Item = usize> + '_ {
        self.fixed
            .iter()
            .enumerate()
            .filter(|&(_, &f)| !f)
            .map(|(i, _)| i)
    }

    /// Fixed values, with every free variable set to 0.
    pub fn partial_assignment(&self) -> Vec<u8> {
        self.fixed
            .iter()
            .zip(&self.sol)
            .map(|(&f, &v)| if f { v } else { 0 })
            .collect()
    }

    /// Refresh the fractional vector from a subproblem primal matrix.
    ///
    /// Free variables read the reference column (last column of `x`),
    /// mapped from [-1, 1] to [0, 1]. Fixed variables take their fixed value.
    pub fn update_fractional(&mut self, x: &DMatrix<f64>) {
        let reference = x.ncols() - 1;
        let mut index = 0;
        for i in 0..self.num_vars() {
            if self.fixed[i] {
                self.frac[i] = f64::from(self.sol[i]);
            } else {
                self.frac[i] = (0.5 * (x[(index, reference)] + 1.0)).clamp(0.0, 1.0);
                index += 1;
            }
        }
    }
}
