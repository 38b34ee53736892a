//! Error types shared across the engine.

use thiserror::Error;

/// Removing an item whose tracked occurrence count is already zero.
///
/// Occurrence bookkeeping only stays correct while every remove matches an
/// earlier add.  Hitting this means the upstream emitted unbalanced edits,
/// which is a logic bug, not a transient condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("remove of an item with zero tracked occurrences")]
pub struct UntrackedRemove;

/// Terminal failures reported on a change stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The source at `index` emitted a remove for an item it never added.
    #[error("source {index} emitted an unbalanced remove")]
    UnbalancedEdit { index: usize },

    /// A source failed and will emit nothing further.
    #[error("source failed: {0}")]
    Source(String),
}
