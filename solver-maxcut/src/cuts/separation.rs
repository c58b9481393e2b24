//! Separation of violated hypermetric inequalities.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use super::{CutFamily, CutPool, Inequality, PURGE_TOLERANCE};
use crate::error::MaxCutResult;
use crate::settings::Settings;

/// Summary of one separation round for one family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationRound {
    /// Family that was separated.
    pub family: CutFamily,

    /// Largest violation seen (0 if nothing was violated).
    pub max_violation: f64,

    /// Inequalities added.
    pub added: usize,

    /// Inequalities purged before separating.
    pub purged: usize,
}

/// Cutting-plane oracle.
///
/// A round purges the pool's inactive inequalities, then adds newly violated
/// ones found at `x`.
pub trait Separator {
    /// Run one separation round on `pool` at the primal matrix `x`.
    fn separate(
        &mut self,
        x: &DMatrix<f64>,
        pool: &mut CutPool,
        settings: &Settings,
    ) -> MaxCutResult<SeparationRound>;
}

/// Separator for triangle, pentagonal and heptagonal inequalities.
///
/// Triangles are enumerated exhaustively. Larger families are searched by
/// randomized local search over vertex subsets.
pub struct HypermetricSeparator {
    rng: StdRng,

    /// Candidate replacement vertices tried per position in local search.
    swap_candidates: usize,

    /// Maximum improving passes per local search.
    max_passes: usize,
}

impl HypermetricSeparator {
    /// Create a separator with a fixed random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            swap_candidates: 8,
            max_passes: 3,
        }
    }

    fn separate_triangles(
        &mut self,
        x: &DMatrix<f64>,
        pool: &mut CutPool,
        settings: &Settings,
    ) -> MaxCutResult<(f64, usize)> {
        let n = x.nrows();
        let patterns = CutFamily::Triangle.sign_patterns();
        let mut max_violation: f64 = 0.0;
        let mut candidates: Vec<Inequality> = Vec::new();

        for i in 0..n {
            for j in i + 1..n {
                for l in j + 1..n {
                    for signs in &patterns {
                        let mut ineq = Inequality::new(CutFamily::Triangle, &[i, j, l], signs);
                        let violation = ineq.violation_at(x);
                        max_violation = max_violation.max(violation);
                        if violation > settings.violated_ineq && !pool.contains(&ineq) {
                            ineq.violation = violation;
                            candidates.push(ineq);
                        }
                    }
                }
            }
        }

        // Most violated first
        candidates.sort_by(|a, b| b.violation.total_cmp(&a.violation));

        let mut added = 0;
        for ineq in candidates.into_iter().take(settings.tri_ineq) {
            if pool.add(ineq)? {
                added += 1;
            }
        }
        Ok((max_violation, added))
    }

    /// Best sign pattern for a vertex subset, with its violation.
    fn best_pattern(
        x: &DMatrix<f64>,
        family: CutFamily,
        subset: &[usize],
        patterns: &[Vec<i8>],
    ) -> (f64, usize) {
        let k = subset.len();
        let mut best = (f64::NEG_INFINITY, 0);
        for (p, signs) in patterns.iter().enumerate() {
            let mut sum = 0.0;
            for a in 0..k {
                for b in a + 1..k {
                    sum += f64::from(signs[a] * signs[b]) * x[(subset[a], subset[b])];
                }
            }
            let violation = -sum - family.rhs();
            if violation > best.0 {
                best = (violation, p);
            }
        }
        best
    }

    fn separate_by_search(
        &mut self,
        x: &DMatrix<f64>,
        pool: &mut CutPool,
        trials: usize,
        settings: &Settings,
    ) -> MaxCutResult<(f64, usize)> {
        let family = pool.family();
        let n = x.nrows();
        let k = family.size();
        let patterns = family.sign_patterns();
        let mut max_violation: f64 = 0.0;
        let mut added = 0;

        for _ in 0..trials {
            let mut subset = index::sample(&mut self.rng, n, k).into_vec();
            let (mut violation, mut pattern) = Self::best_pattern(x, family, &subset, &patterns);

            // Greedy vertex swaps
            for _ in 0..self.max_passes {
                let mut improved = false;
                for pos in 0..k {
                    for _ in 0..self.swap_candidates.min(n - k) {
                        let v = self.rng.random_range(0..n);
                        if subset.contains(&v) {
                            continue;
                        }
                        let old = subset[pos];
                        subset[pos] = v;
                        let (cand, cand_pattern) = Self::best_pattern(x, family, &subset, &patterns);
                        if cand > violation + 1e-12 {
                            violation = cand;
                            pattern = cand_pattern;
                            improved = true;
                        } else {
                            subset[pos] = old;
                        }
                    }
                }
                if !improved {
                    break;
                }
            }

            max_violation = max_violation.max(violation);
            if violation > settings.violated_ineq {
                let mut ineq = Inequality::new(family, &subset, &patterns[pattern]);
                ineq.violation = violation;
                if pool.add(ineq)? {
                    added += 1;
                }
            }
        }
        Ok((max_violation, added))
    }
}

impl Default for HypermetricSeparator {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

impl Separator for HypermetricSeparator {
    fn separate(
        &mut self,
        x: &DMatrix<f64>,
        pool: &mut CutPool,
        settings: &Settings,
    ) -> MaxCutResult<SeparationRound> {
        let family = pool.family();
        let purged = pool.purge(PURGE_TOLERANCE);

        let (max_violation, added) = if x.nrows() < family.size() {
            (0.0, 0)
        } else {
            match family {
                CutFamily::Triangle => self.separate_triangles(x, pool, settings)?,
                CutFamily::Pentagonal => {
                    self.separate_by_search(x, pool, settings.pent_trials, settings)?
                }
                CutFamily::Heptagonal => {
                    self.separate_by_search(x, pool, settings.hepta_trials, settings)?
                }
            }
        };

        Ok(SeparationRound {
            family,
            max_violation,
            added,
            purged,
        })
    }
}
