//! Low-rank coordinate ascent for the basic SDP relaxation.

use nalgebra::linalg::SymmetricEigen;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Relaxation, RelaxationOracle};
use crate::error::{MaxCutError, MaxCutResult};

/// Mixing-method oracle.
///
/// Keeps one unit vector per coordinate in dimension `ceil(sqrt(2k)) + 1`
/// and updates them cyclically, each step maximizing `<C, V'V>` in one
/// column. The reported value is the dual bound
/// `sum(y) - k * lambda_min(Diag(y) - C)` with `y_i = sum_j C_ij X_ij`,
/// which is valid for any iterate.
pub struct MixingOracle {
    rng: StdRng,

    /// Maximum sweeps over all coordinates.
    pub max_sweeps: usize,

    /// Relative objective change that ends the sweeps.
    pub tol: f64,
}

impl MixingOracle {
    /// Create an oracle with a fixed random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_sweeps: 300,
            tol: 1e-7,
        }
    }

    fn random_factor(&mut self, rank: usize, k: usize) -> DMatrix<f64> {
        let mut v = DMatrix::from_fn(rank, k, |_, _| self.rng.random_range(-1.0..1.0));
        for mut col in v.column_iter_mut() {
            let norm = col.norm();
            if norm > 1e-12 {
                col /= norm;
            } else {
                col.fill(0.0);
                col[0] = 1.0;
            }
        }
        v
    }
}

impl Default for MixingOracle {
    fn default() -> Self {
        Self::new(0x6d6978)
    }
}

impl RelaxationOracle for MixingOracle {
    fn solve(&mut self, c: &DMatrix<f64>) -> MaxCutResult<Relaxation> {
        let k = c.nrows();
        if c.iter().any(|v| !v.is_finite()) {
            return Err(MaxCutError::Oracle(format!(
                "objective of dimension {} has non-finite entries",
                k
            )));
        }
        if k == 1 {
            return Ok(Relaxation {
                x: DMatrix::identity(1, 1),
                value: c[(0, 0)],
            });
        }

        let rank = k.min(((2.0 * k as f64).sqrt().ceil() as usize) + 1);
        let mut v = self.random_factor(rank, k);
        let mut objective = (v.transpose() * &v).dot(c);

        for _ in 0..self.max_sweeps {
            for i in 0..k {
                let mut g = &v * c.column(i);
                g.axpy(-c[(i, i)], &v.column(i), 1.0);
                let norm = g.norm();
                if norm > 1e-12 {
                    v.set_column(i, &(g / norm));
                }
            }

            let next = (v.transpose() * &v).dot(c);
            let change = (next - objective).abs();
            objective = next;
            if change <= self.tol * (1.0 + objective.abs()) {
                break;
            }
        }

        let x = v.transpose() * &v;
        let y: Vec<f64> = (0..k).map(|i| c.row(i).dot(&x.row(i))).collect();
        let mut z = -c;
        for (i, &yi) in y.iter().enumerate() {
            z[(i, i)] += yi;
        }
        if z.iter().any(|v| !v.is_finite()) {
            return Err(MaxCutError::Oracle(format!(
                "relaxation of dimension {} diverged",
                k
            )));
        }
        let lambda_min = SymmetricEigen::new(z)
            .eigenvalues
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let value = y.iter().sum::<f64>() - k as f64 * lambda_min;

        if !value.is_finite() {
            return Err(MaxCutError::Oracle(format!(
                "relaxation of dimension {} produced a non-finite result",
                k
            )));
        }

        Ok(Relaxation { x, value })
    }
}
