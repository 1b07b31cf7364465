//! Crate-wide error type.
//!
//! Grounded on the flat, `Display`-only error enum the teacher uses for its
//! simplest error modules (`server/src/util/error.rs`): a handful of named
//! variants plus `Display`, no external error-derive dependency.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Grid(GridError),
    Queue(QueueError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid error: {e}"),
            Self::Queue(e) => write!(f, "work queue error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<GridError> for Error {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

/// Errors raised by [`crate::grid::Grid`] mutation.
#[derive(Debug, PartialEq, Eq)]
pub enum GridError {
    /// A leaf at the minimum quad side (`S = 1`) would need to split to
    /// admit a new bucket, but splitting requires `S >= 2`. The source
    /// leaves this case unhandled; this port surfaces it instead of
    /// recursing or looping forever (see design notes, open question 2).
    SplitTooSmall,
    /// An internal invariant (bucket/child uniqueness, non-null leaf on
    /// insert) was violated. Reaching this indicates a bug in the
    /// implementation, not a runtime condition a caller can recover from.
    Invariant(&'static str),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SplitTooSmall => {
                write!(f, "cannot split a minimum-size leaf further")
            }
            Self::Invariant(what) => write!(f, "invariant violated: {what}"),
        }
    }
}

impl std::error::Error for GridError {}

/// Errors raised by [`crate::queue::WorkQueue`].
#[derive(Debug, PartialEq, Eq)]
pub enum QueueError {
    /// `start(n)` managed to spawn zero of the `n` requested workers.
    StartFailed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartFailed => write!(f, "failed to start any worker threads"),
        }
    }
}

impl std::error::Error for QueueError {}
