//! Error types for the Max-Cut solver.

use thiserror::Error;

use crate::cuts::CutFamily;

/// Errors that can occur while solving a Max-Cut instance.
///
/// The capacity variants mean a design limit was too small for the
/// instance. They stop the run, but the caller can still read the incumbent.
#[derive(Error, Debug)]
pub enum MaxCutError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Settings are inconsistent
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// A parameter file entry could not be understood
    #[error("Invalid parameter `{name}` on line {line}: {reason}")]
    InvalidParameter {
        /// Parameter name as written in the file.
        name: String,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// Branching strategy code is neither least- nor most-fractional
    #[error("Invalid branching strategy code {0} (expected 0 = least fractional, 1 = most fractional)")]
    InvalidBranchingStrategy(i64),

    /// Bundle reached its capacity
    #[error("Bundle size too large ({capacity} entries); raise `max_bundle`")]
    BundleOverflow {
        /// Configured bundle capacity.
        capacity: usize,
    },

    /// A cutting-plane pool reached its capacity
    #[error("Too many {family} inequalities ({capacity}); raise the pool capacity")]
    CutPoolOverflow {
        /// Family whose pool overflowed.
        family: CutFamily,
        /// Configured pool capacity.
        capacity: usize,
    },

    /// Priority queue reached its capacity
    #[error("Priority queue is full ({capacity} nodes); raise `queue_capacity`")]
    QueueOverflow {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Relaxation oracle produced an unusable result
    #[error("Relaxation oracle failed: {0}")]
    Oracle(String),
}

/// Result type for Max-Cut operations.
pub type MaxCutResult<T> = Result<T, MaxCutError>;
