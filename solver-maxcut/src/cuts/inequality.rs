//! A single hypermetric inequality.

use nalgebra::DMatrix;

use super::CutFamily;

/// Active inequality `-sum_{a<b} s_a s_b X[v_a, v_b] <= (k - 1) / 2`.
///
/// Vertices are stored in increasing order and the first sign is +1, so
/// equal inequalities have equal representations.
#[derive(Debug, Clone)]
pub struct Inequality {
    /// Family tag.
    pub family: CutFamily,

    /// Subproblem indices, strictly increasing.
    pub vertices: Vec<usize>,

    /// Sign of each vertex.
    pub signs: Vec<i8>,

    /// Violation when last separated.
    pub violation: f64,

    /// Dual multiplier (nonnegative).
    pub multiplier: f64,
}

impl Inequality {
    /// Build an inequality in canonical form.
    pub fn new(family: CutFamily, vertices: &[usize], signs: &[i8]) -> Self {
        debug_assert_eq!(vertices.len(), family.size());
        debug_assert_eq!(signs.len(), family.size());

        let mut pairs: Vec<(usize, i8)> = vertices.iter().copied().zip(signs.iter().copied()).collect();
        pairs.sort_unstable_by_key(|&(v, _)| v);
        let flip = if pairs[0].1 < 0 { -1 } else { 1 };

        Self {
            family,
            vertices: pairs.iter().map(|&(v, _)| v).collect(),
            signs: pairs.iter().map(|&(_, s)| s * flip).collect(),
            violation: 0.0,
            multiplier: 0.0,
        }
    }

    /// Right-hand side `(k - 1) / 2`.
    pub fn rhs(&self) -> f64 {
        self.family.rhs()
    }

    /// Left-hand side `A_c(X)`.
    pub fn lhs(&self, x: &DMatrix<f64>) -> f64 {
        let k = self.vertices.len();
        let mut sum = 0.0;
        for a in 0..k {
            for b in a + 1..k {
                let s = f64::from(self.signs[a] * self.signs[b]);
                sum += s * x[(self.vertices[a], self.vertices[b])];
            }
        }
        -sum
    }

    /// Violation at `x` (positive means violated).
    pub fn violation_at(&self, x: &DMatrix<f64>) -> f64 {
        self.lhs(x) - self.rhs()
    }

    /// Add `weight * A_c^*` to `c`, i.e. the symmetric matrix whose inner
    /// product with `X` is `weight * A_c(X)`.
    pub fn add_adjoint(&self, weight: f64, c: &mut DMatrix<f64>) {
        let k = self.vertices.len();
        for a in 0..k {
            for b in a + 1..k {
                let entry = -0.5 * weight * f64::from(self.signs[a] * self.signs[b]);
                let (i, j) = (self.vertices[a], self.vertices[b]);
                c[(i, j)] += entry;
                c[(j, i)] += entry;
            }
        }
    }

    /// Key identifying the inequality regardless of its multiplier.
    pub fn key(&self) -> (Vec<usize>, Vec<i8>) {
        (self.vertices.clone(), self.signs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank_one(y: &[f64]) -> DMatrix<f64> {
        let n = y.len();
        DMatrix::from_fn(n, n, |i, j| y[i] * y[j])
    }

    #[test]
    fn test_canonical_form() {
        let a = Inequality::new(CutFamily::Triangle, &[4, 1, 2], &[-1, 1, -1]);
        assert_eq!(a.vertices, vec![1, 2, 4]);
        assert_eq!(a.signs, vec![1, -1, -1]);

        let b = Inequality::new(CutFamily::Triangle, &[1, 2, 4], &[-1, 1, 1]);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_valid_for_every_cut() {
        for family in CutFamily::ALL {
            let k = family.size();
            let vertices: Vec<usize> = (0..k).collect();
            for signs in family.sign_patterns() {
                let ineq = Inequality::new(family, &vertices, &signs);
                for mask in 0..1u32 << k {
                    let y: Vec<f64> = (0..k)
                        .map(|b| if (mask >> b) & 1 == 1 { 1.0 } else { -1.0 })
                        .collect();
                    assert!(ineq.violation_at(&rank_one(&y)) <= 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_violated_by_uniform_matrix() {
        // X = -1/2 off the diagonal violates the all-plus triangle.
        let x = DMatrix::from_fn(3, 3, |i, j| if i == j { 1.0 } else { -0.5 });
        let ineq = Inequality::new(CutFamily::Triangle, &[0, 1, 2], &[1, 1, 1]);
        assert!((ineq.violation_at(&x) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_adjoint_matches_lhs() {
        let x = DMatrix::from_fn(6, 6, |i, j| if i == j { 1.0 } else { 0.1 * (i + 2 * j) as f64 - 0.7 });
        let x = (&x + x.transpose()) * 0.5;
        let ineq = Inequality::new(CutFamily::Pentagonal, &[0, 2, 3, 4, 5], &[1, -1, 1, 1, -1]);

        let mut c = DMatrix::zeros(6, 6);
        ineq.add_adjoint(2.0, &mut c);
        assert!((c.dot(&x) - 2.0 * ineq.lhs(&x)).abs() < 1e-12);
    }
}
