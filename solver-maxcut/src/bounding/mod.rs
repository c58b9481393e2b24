//! Per-node upper bounds.
//!
//! The [`BoundingEngine`] solves the basic relaxation of a node, then
//! tightens it with hypermetric inequalities whose multipliers are optimized
//! by the [`BundleMethod`].

pub mod bundle;
mod engine;

pub use bundle::{BundleEntry, BundleMethod, BundleRun, BundleStore};
pub use engine::{BoundingEngine, BoundingOutcome, IterationRecord, NodeBound};
