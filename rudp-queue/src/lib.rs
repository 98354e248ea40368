//! Indexed Priority Queue
//!
//! This crate implements the outbound queue of the transport: an
//! anchor-indexed linked list, capability views over it, a thread-safe
//! blocking wrapper, and the priority queue built from those pieces.

pub mod list;
pub mod priority;
pub mod sequence;
pub mod sync;
pub mod view;

pub use list::{Hooks, IndexedList, Iter};
pub use priority::{PriorityQueue, Prioritized};
pub use sequence::{
    comparator, natural_order, Capability, Comparator, ErrorKind, Sequence, SequenceError,
};
pub use sync::Synchronized;
pub use view::{FixedSize, ReadOnly};
