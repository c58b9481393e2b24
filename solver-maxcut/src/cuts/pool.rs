//! Active inequality pools.
//!
//! One [`CutPool`] per family holds the inequalities currently in the
//! Lagrangian together with their dual multipliers. [`CutSet`] groups the three
//! pools and maps them to a single dual vector in the fixed order
//! triangle, pentagonal, heptagonal.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};

use super::{CutFamily, Inequality};
use crate::error::{MaxCutError, MaxCutResult};

/// Statistics for a cut pool.
#[derive(Debug, Default, Clone)]
pub struct CutPoolStats {
    /// Total inequalities added.
    pub total_added: usize,

    /// Total inequalities purged.
    pub total_purged: usize,

    /// Peak pool size.
    pub peak_size: usize,
}

/// Active inequalities of one family.
#[derive(Debug, Clone)]
pub struct CutPool {
    /// Family stored in this pool.
    family: CutFamily,

    /// Active inequalities, in insertion order.
    cuts: Vec<Inequality>,

    /// Keys of the active inequalities.
    keys: HashSet<(Vec<usize>, Vec<i8>)>,

    /// Maximum number of active inequalities.
    capacity: usize,

    /// Statistics.
    stats: CutPoolStats,
}

impl CutPool {
    /// Create an empty pool.
    pub fn new(family: CutFamily, capacity: usize) -> Self {
        Self {
            family,
            cuts: Vec::new(),
            keys: HashSet::new(),
            capacity,
            stats: CutPoolStats::default(),
        }
    }

    /// Family stored in this pool.
    pub fn family(&self) -> CutFamily {
        self.family
    }

    /// Whether an equal inequality is already active.
    pub fn contains(&self, ineq: &Inequality) -> bool {
        self.keys.contains(&ineq.key())
    }

    /// Add an inequality with a zero multiplier.
    ///
    /// Returns false if it was already active.
    pub fn add(&mut self, mut ineq: Inequality) -> MaxCutResult<bool> {
        debug_assert_eq!(ineq.family, self.family);

        if !self.keys.insert(ineq.key()) {
            return Ok(false);
        }
        if self.cuts.len() >= self.capacity {
            self.keys.remove(&ineq.key());
            return Err(MaxCutError::CutPoolOverflow {
                family: self.family,
                capacity: self.capacity,
            });
        }

        ineq.multiplier = 0.0;
        self.cuts.push(ineq);
        self.stats.total_added += 1;
        self.stats.peak_size = self.stats.peak_size.max(self.cuts.len());
        Ok(true)
    }

    /// Remove inequalities whose multiplier is below `tol`.
    ///
    /// Returns the number removed.
    pub fn purge(&mut self, tol: f64) -> usize {
        let before = self.cuts.len();
        self.cuts.retain(|c| c.multiplier >= tol);
        let removed = before - self.cuts.len();

        if removed > 0 {
            self.keys = self.cuts.iter().map(Inequality::key).collect();
            self.stats.total_purged += removed;
        }
        removed
    }

    /// Remove every inequality.
    pub fn clear(&mut self) {
        self.cuts.clear();
        self.keys.clear();
    }

    /// Active inequalities.
    pub fn cuts(&self) -> &[Inequality] {
        &self.cuts
    }

    /// Mutable access to the active inequalities.
    pub fn cuts_mut(&mut self) -> &mut [Inequality] {
        &mut self.cuts
    }

    /// Number of active inequalities.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Check if no inequality is active.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Get statistics.
    pub fn stats(&self) -> &CutPoolStats {
        &self.stats
    }
}

/// The three family pools viewed as one Lagrangian.
#[derive(Debug, Clone)]
pub struct CutSet {
    pools: [CutPool; 3],
}

impl CutSet {
    /// Create empty pools, each holding at most `capacity` inequalities.
    pub fn new(capacity: usize) -> Self {
        Self {
            pools: CutFamily::ALL.map(|family| CutPool::new(family, capacity)),
        }
    }

    fn slot(family: CutFamily) -> usize {
        match family {
            CutFamily::Triangle => 0,
            CutFamily::Pentagonal => 1,
            CutFamily::Heptagonal => 2,
        }
    }

    /// Pool of one family.
    pub fn pool(&self, family: CutFamily) -> &CutPool {
        &self.pools[Self::slot(family)]
    }

    /// Mutable pool of one family.
    pub fn pool_mut(&mut self, family: CutFamily) -> &mut CutPool {
        &mut self.pools[Self::slot(family)]
    }

    /// Remove every inequality from every pool.
    pub fn clear(&mut self) {
        self.pools.iter_mut().for_each(CutPool::clear);
    }

    /// Total number of active inequalities.
    pub fn len(&self) -> usize {
        self.pools.iter().map(CutPool::len).sum()
    }

    /// Check if no inequality is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All active inequalities in dual-vector order.
    pub fn iter(&self) -> impl Iterator<Item = &Inequality> {
        self.pools.iter().flat_map(|p| p.cuts().iter())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Inequality> {
        self.pools.iter_mut().flat_map(|p| p.cuts_mut().iter_mut())
    }

    /// Right-hand side vector `b`.
    pub fn rhs(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.iter().map(Inequality::rhs))
    }

    /// Current multipliers as one dual vector.
    pub fn multipliers(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.iter().map(|c| c.multiplier))
    }

    /// Store a dual vector back into the pools.
    pub fn set_multipliers(&mut self, gamma: &DVector<f64>) {
        debug_assert_eq!(gamma.len(), self.len());
        for (cut, &g) in self.iter_mut().zip(gamma.iter()) {
            cut.multiplier = g.max(0.0);
        }
    }

    /// Constraint map `A(X)`.
    pub fn apply(&self, x: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.iter().map(|c| c.lhs(x)))
    }

    /// Subgradient of the dual function at a primal matrix, `b - A(X)`.
    pub fn subgradient(&self, x: &DMatrix<f64>) -> DVector<f64> {
        self.rhs() - self.apply(x)
    }

    /// Lagrangian objective `M - A^* gamma`.
    pub fn lagrangian(&self, m: &DMatrix<f64>, gamma: &DVector<f64>) -> DMatrix<f64> {
        let mut c = m.clone();
        for (cut, &g) in self.iter().zip(gamma.iter()) {
            if g != 0.0 {
                cut.add_adjoint(-g, &mut c);
            }
        }
        c
    }
}
