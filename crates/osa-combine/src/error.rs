//! Configuration errors, surfaced at construction time and never later.

use crate::op::SetOp;
use thiserror::Error;

/// Errors from building a combination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    /// The operator needs more sources than were supplied.
    #[error("{op} needs at least {required} source(s), got {actual}")]
    TooFewSources {
        op: SetOp,
        required: usize,
        actual: usize,
    },
}
