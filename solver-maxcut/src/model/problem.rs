//! Max-Cut problem representation and subproblem construction.

use nalgebra::DMatrix;

use crate::error::{MaxCutError, MaxCutResult};
use crate::search::SearchNode;

/// Root Max-Cut problem.
///
/// The last vertex is fixed to side 0, so a cut is described by a 0/1 vector
/// over the first `n - 1` vertices. With `Q` the leading block of the graph
/// Laplacian, the objective matrix is
///
/// ```text
/// L = [ Q      Q e   ]
///     [ (Q e)' e'Q e ]
/// ```
///
/// and the cut value of `x` is `x' Q x`.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective matrix (n × n). Row/column `n - 1` belongs to the reference vertex.
    pub l: DMatrix<f64>,

    /// Number of edges read from the instance.
    num_edges: usize,
}

/// Restricted problem at a search node.
///
/// The relaxation works in ±1 space over the free variables plus a trailing
/// reference coordinate. For any ±1 vector `y` over the free variables,
/// `[y; 1]' l [y; 1] + fixed_value` equals the root objective of the
/// completed 0/1 vector `x_free = (y + 1) / 2`.
#[derive(Debug, Clone)]
pub struct Subproblem {
    /// Objective matrix (k × k with k = free.len() + 1).
    pub l: DMatrix<f64>,

    /// Root variable index of each free subproblem coordinate.
    pub free: Vec<usize>,

    /// Objective contribution of the fixed variables alone.
    pub fixed_value: f64,
}

impl Subproblem {
    /// Dimension of the subproblem matrix.
    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    /// Index of the reference coordinate.
    pub fn reference(&self) -> usize {
        self.free.len()
    }
}

impl Problem {
    /// Build a problem from a 0-based weighted edge list.
    ///
    /// Repeated edges overwrite earlier weights and self-loops are ignored.
    /// Weights must be integral: pruning relies on integer cut values.
    pub fn from_edges(num_vertices: usize, edges: &[(usize, usize, f64)]) -> MaxCutResult<Self> {
        if num_vertices == 0 {
            return Err(MaxCutError::InvalidProblem(
                "Number of vertices has to be positive".to_string(),
            ));
        }

        let mut adj = DMatrix::<f64>::zeros(num_vertices, num_vertices);
        for &(i, j, w) in edges {
            if i >= num_vertices || j >= num_vertices {
                return Err(MaxCutError::InvalidProblem(format!(
                    "Edge ({}, {}) references a vertex outside 1..={}",
                    i + 1,
                    j + 1,
                    num_vertices
                )));
            }
            if !w.is_finite() || w.fract() != 0.0 {
                return Err(MaxCutError::InvalidProblem(format!(
                    "Edge ({}, {}) has non-integral weight {}",
                    i + 1,
                    j + 1,
                    w
                )));
            }
            if i == j {
                log::warn!("Ignoring self-loop on vertex {}", i + 1);
                continue;
            }
            adj[(i, j)] = w;
            adj[(j, i)] = w;
        }

        let mut problem = Self::from_adjacency(&adj)?;
        problem.num_edges = edges.len();
        Ok(problem)
    }

    /// Build a problem from a symmetric adjacency matrix.
    ///
    /// The diagonal is ignored. Off-diagonal weights must be finite,
    /// integral and symmetric.
    pub fn from_adjacency(adj: &DMatrix<f64>) -> MaxCutResult<Self> {
        let n = adj.nrows();
        if n == 0 || adj.ncols() != n {
            return Err(MaxCutError::InvalidProblem(format!(
                "Adjacency matrix must be square and non-empty, got {}x{}",
                n,
                adj.ncols()
            )));
        }
        for i in 0..n {
            for j in i + 1..n {
                let w = adj[(i, j)];
                if !w.is_finite() || w.fract() != 0.0 {
                    return Err(MaxCutError::InvalidProblem(format!(
                        "Edge ({}, {}) has non-integral weight {}",
                        i + 1,
                        j + 1,
                        w
                    )));
                }
                if adj[(j, i)] != w {
                    return Err(MaxCutError::InvalidProblem(format!(
                        "Adjacency matrix is not symmetric at ({}, {})",
                        i + 1,
                        j + 1
                    )));
                }
            }
        }
        let m = n - 1;

        let mut l = DMatrix::<f64>::zeros(n, n);
        let mut total = 0.0;
        for i in 0..m {
            let degree: f64 = adj.row(i).iter().sum::<f64>() - adj[(i, i)];
            let mut row_sum = 0.0;
            for j in 0..m {
                let lap = if i == j { degree } else { -adj[(i, j)] };
                l[(i, j)] = lap;
                row_sum += lap;
            }
            l[(i, m)] = row_sum;
            l[(m, i)] = row_sum;
            total += row_sum;
        }
        l[(m, m)] = total;

        let num_edges = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| adj[(i, j)] != 0.0)
            .count();

        Ok(Self { l, num_edges })
    }

    /// Number of graph vertices.
    pub fn num_vertices(&self) -> usize {
        self.l.nrows()
    }

    /// Number of branching variables (all vertices but the fixed last one).
    pub fn num_vars(&self) -> usize {
        self.l.nrows() - 1
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Cut value of a 0/1 vector over the branching variables.
    pub fn evaluate(&self, x: &[u8]) -> f64 {
        let m = self.num_vars();
        debug_assert!(x.len() >= m);

        let mut value = 0.0;
        for i in (0..m).filter(|&i| x[i] == 1) {
            for j in (0..m).filter(|&j| x[j] == 1) {
                value += self.l[(i, j)];
            }
        }
        value
    }

    /// Change in cut value when variable `i` of `x` is flipped.
    pub fn flip_gain(&self, x: &[u8], i: usize) -> f64 {
        let m = self.num_vars();
        let d = if x[i] == 1 { -1.0 } else { 1.0 };
        let qx: f64 = (0..m).filter(|&j| x[j] == 1).map(|j| self.l[(i, j)]).sum();
        2.0 * d * qx + self.l[(i, i)] * d * d
    }

    /// Build the restricted problem for a node.
    ///
    /// Fixed variables are substituted out; their mutual contribution is
    /// returned as `fixed_value` and their coupling with free variables is
    /// folded into the reference row.
    pub fn subproblem(&self, node: &SearchNode) -> Subproblem {
        let m = self.num_vars();
        let free: Vec<usize> = (0..m).filter(|&i| !node.fixed[i]).collect();
        let fixed_ones: Vec<usize> = (0..m)
            .filter(|&i| node.fixed[i] && node.sol[i] == 1)
            .collect();

        let mut fixed_value = 0.0;
        for &i in &fixed_ones {
            for &j in &fixed_ones {
                fixed_value += self.l[(i, j)];
            }
        }

        let k = free.len();
        let mut l = DMatrix::<f64>::zeros(k + 1, k + 1);
        let mut corner = 0.0;
        for (a, &i) in free.iter().enumerate() {
            let coupling: f64 = fixed_ones.iter().map(|&j| self.l[(i, j)]).sum();
            let mut row_sum = 0.0;
            for (b, &j) in free.iter().enumerate() {
                let q = self.l[(i, j)];
                l[(a, b)] = 0.25 * q;
                row_sum += q;
            }
            let linear = row_sum + 2.0 * coupling;
            l[(a, k)] = 0.25 * linear;
            l[(k, a)] = 0.25 * linear;
            corner += row_sum + 4.0 * coupling;
        }
        l[(k, k)] = 0.25 * corner;

        Subproblem {
            l,
            free,
            fixed_value,
        }
    }
}
