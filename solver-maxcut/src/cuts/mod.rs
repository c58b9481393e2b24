//! Hypermetric cutting planes for the SDP relaxation.
//!
//! Every family is an odd-clique inequality in ±1 space: for a k-subset S
//! with signs s,
//!
//! ```text
//! sum_{a<b in S} s_a s_b X_ab >= -(k - 1) / 2
//! ```
//!
//! - Triangle (k = 3)
//! - Pentagonal (k = 5)
//! - Heptagonal (k = 7)

mod inequality;
mod pool;
mod separation;

use std::fmt;

pub use inequality::Inequality;
pub use pool::{CutPool, CutPoolStats, CutSet};
pub use separation::{HypermetricSeparator, SeparationRound, Separator};

/// Multipliers below this value mark an inequality as inactive.
pub const PURGE_TOLERANCE: f64 = 1e-5;

/// Inequality family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutFamily {
    /// Three-vertex inequalities.
    Triangle,

    /// Five-vertex inequalities.
    Pentagonal,

    /// Seven-vertex inequalities.
    Heptagonal,
}

impl CutFamily {
    /// All families in dual-vector order.
    pub const ALL: [CutFamily; 3] = [
        CutFamily::Triangle,
        CutFamily::Pentagonal,
        CutFamily::Heptagonal,
    ];

    /// Number of vertices in one inequality.
    pub fn size(&self) -> usize {
        match self {
            CutFamily::Triangle => 3,
            CutFamily::Pentagonal => 5,
            CutFamily::Heptagonal => 7,
        }
    }

    /// Right-hand side of the `<=` form, `(k - 1) / 2`.
    pub fn rhs(&self) -> f64 {
        (self.size() - 1) as f64 / 2.0
    }

    /// Sign patterns up to a global flip (the first sign is always +1).
    pub fn sign_patterns(&self) -> Vec<Vec<i8>> {
        let k = self.size();
        (0..1u32 << (k - 1))
            .map(|mask| {
                std::iter::once(1)
                    .chain((0..k - 1).map(|b| if (mask >> b) & 1 == 1 { -1 } else { 1 }))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for CutFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutFamily::Triangle => write!(f, "triangle"),
            CutFamily::Pentagonal => write!(f, "pentagonal"),
            CutFamily::Heptagonal => write!(f, "heptagonal"),
        }
    }
}
