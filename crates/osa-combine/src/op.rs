//! The four combination operators.

use osa_core::tracker::OccurrenceTracker;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// How combined membership is decided across the per-source trackers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOp {
    /// Present in at least one source.
    Union,
    /// Present in every source.
    Intersection,
    /// Present in exactly one source.
    SymmetricDifference,
    /// Present in the first source and in none of the others.
    RelativeComplement,
}

impl SetOp {
    /// Fewest sources for which the operator is meaningful.  Combinations
    /// below this are rejected at construction.
    pub fn min_sources(self) -> usize {
        match self {
            SetOp::Union | SetOp::Intersection => 1,
            SetOp::SymmetricDifference | SetOp::RelativeComplement => 2,
        }
    }

    /// Decide combined membership of one item from the tracker states.
    /// Tracker order is the source order the combination was built with,
    /// which only `RelativeComplement` is sensitive to.
    pub fn evaluate<T: Eq + Hash>(self, item: &T, trackers: &[OccurrenceTracker<T>]) -> bool {
        match self {
            SetOp::Union => trackers.iter().any(|t| t.contains(item)),
            SetOp::Intersection => trackers.iter().all(|t| t.contains(item)),
            SetOp::SymmetricDifference => {
                trackers.iter().filter(|t| t.contains(item)).count() == 1
            }
            SetOp::RelativeComplement => trackers.split_first().is_some_and(|(first, rest)| {
                first.contains(item) && !rest.iter().any(|t| t.contains(item))
            }),
        }
    }
}

impl std::fmt::Display for SetOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SetOp::Union => "union",
            SetOp::Intersection => "intersection",
            SetOp::SymmetricDifference => "symmetric difference",
            SetOp::RelativeComplement => "relative complement",
        };
        write!(f, "{}", name)
    }
}
