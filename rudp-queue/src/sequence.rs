//! Sequence Interface
//!
//! The operations shared by the indexed list and its capability views, plus
//! the error taxonomy they report.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Ordering relation used for sorting and sorted insertion
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Build a [`Comparator`] from a closure
pub fn comparator<T, F>(f: F) -> Comparator<T>
where
    F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Comparator using the natural order of `T`
pub fn natural_order<T: Ord + 'static>() -> Comparator<T> {
    Arc::new(|a: &T, b: &T| a.cmp(b))
}

/// What a view permits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Size cannot change; values can be replaced and reordered
    FixedSize,
    /// Nothing can change
    ReadOnly,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::FixedSize => write!(f, "fixed-size"),
            Capability::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// Broad class of a [`SequenceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed an argument the current state cannot accept
    Precondition,
    /// Operation is forbidden by the view or ordering mode
    Capability,
    /// No ordering relation is available
    Invariant,
    /// A validation hook refused the value
    Rejected,
}

/// Sequence errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Sequence is empty")]
    Empty,

    #[error("Sequence is closed")]
    Closed,

    #[error("Operation '{operation}' not permitted on a {capability} sequence")]
    NotPermitted {
        operation: &'static str,
        capability: Capability,
    },

    #[error("Positional insert into a sequence that maintains sort order")]
    UnorderedInsert,

    #[error("No comparator configured")]
    NoComparator,

    #[error("Value rejected: {0}")]
    Rejected(String),
}

impl SequenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SequenceError::IndexOutOfRange { .. }
            | SequenceError::Empty
            | SequenceError::Closed => ErrorKind::Precondition,
            SequenceError::NotPermitted { .. } | SequenceError::UnorderedInsert => {
                ErrorKind::Capability
            }
            SequenceError::NoComparator => ErrorKind::Invariant,
            SequenceError::Rejected(_) => ErrorKind::Rejected,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Capability`
    pub fn is_capability_violation(&self) -> bool {
        self.kind() == ErrorKind::Capability
    }
}

/// An indexed, optionally ordered sequence
pub trait Sequence<T> {
    /// Number of elements
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`
    fn get(&self, index: usize) -> Result<&T, SequenceError>;

    /// Replace the element at `index`, returning the old value
    fn set(&mut self, index: usize, value: T) -> Result<T, SequenceError>;

    /// Insert at `index` (`index == len` appends)
    fn insert_at(&mut self, index: usize, value: T) -> Result<(), SequenceError>;

    /// Append, or insert at the sorted position when order is maintained;
    /// returns the index the value landed at
    fn push(&mut self, value: T) -> Result<usize, SequenceError>;

    /// Remove and return the element at `index`
    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError>;

    /// Remove every element
    fn clear(&mut self) -> Result<(), SequenceError>;

    /// Stable in-place sort by the configured comparator
    fn sort(&mut self) -> Result<(), SequenceError>;

    /// Reverse element order in place
    fn reverse(&mut self) -> Result<(), SequenceError>;

    /// Replace the comparator; with `maintain_sorted` the sequence is sorted
    /// now and kept sorted on every later push
    fn set_comparator(
        &mut self,
        comparator: Option<Comparator<T>>,
        maintain_sorted: bool,
    ) -> Result<(), SequenceError>;

    /// Whether the sequence keeps itself sorted
    fn is_sorted_maintained(&self) -> bool;

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        false
    }
}
