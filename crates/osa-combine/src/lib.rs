//! OSA Combine - incremental set-algebra over observable collections
//!
//! This crate maintains a derived collection equal to a boolean set-algebra
//! combination of N live source collections:
//! - `SetOp`: union, intersection, symmetric difference, relative complement
//! - `Combination`: the expression;  `run` starts an engine
//! - `CombinedStream`: the maintained result, consumable as a stream itself
//!
//! # Incremental maintenance
//!
//! The engine never recomputes the result from scratch.  Per incoming batch
//! from source `s`:
//!
//! ```text
//! On batch B from source s:
//!   replay B into tracker[s]          // per-source occurrence counts
//!   for each item B touched:          // candidates only
//!     should   = op(item, trackers)
//!     present  = result.contains(item)
//!     add / refresh / remove accordingly
//!   emit result's recorded edits      // one batch out, if non-empty
//! ```
//!
//! Items a batch did not touch are never re-evaluated:  their tracker
//! entries are unchanged, so their combined membership is unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use osa_combine::{union, SetOp};
//! use osa_stream::SourceSet;
//!
//! let staff = SourceSet::new();
//! let guests = SourceSet::new();
//! staff.extend(["ada", "brin"]);
//!
//! let everyone = union(vec![staff.as_stream(), guests.as_stream()])?;
//! guests.add("cleo");
//!
//! assert_eq!(everyone.snapshot(), vec!["ada", "brin", "cleo"]);
//! # Ok::<(), osa_combine::CombineError>(())
//! ```

pub mod combiner;
pub mod error;
pub mod op;

// Re-export main types for convenience
pub use combiner::{
    intersection, relative_complement, symmetric_difference, union, CombinedStream, Combination,
};
pub use error::CombineError;
pub use op::SetOp;
