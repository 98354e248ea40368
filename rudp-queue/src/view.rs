//! Capability Views
//!
//! Wrappers that narrow what a [`Sequence`] permits. A fixed-size view
//! keeps the element count constant but still allows replacing and
//! reordering; a read-only view allows nothing beyond reads.

use crate::sequence::{Capability, Comparator, Sequence, SequenceError};

fn not_permitted(operation: &'static str, capability: Capability) -> SequenceError {
    SequenceError::NotPermitted {
        operation,
        capability,
    }
}

/// View that forbids changes to the element count
#[derive(Debug)]
pub struct FixedSize<S> {
    inner: S,
}

impl<S> FixedSize<S> {
    pub fn new(inner: S) -> Self {
        FixedSize { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<T, S: Sequence<T>> Sequence<T> for FixedSize<S> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Result<&T, SequenceError> {
        self.inner.get(index)
    }

    fn set(&mut self, index: usize, value: T) -> Result<T, SequenceError> {
        self.inner.set(index, value)
    }

    fn insert_at(&mut self, _index: usize, _value: T) -> Result<(), SequenceError> {
        Err(not_permitted("insert_at", Capability::FixedSize))
    }

    fn push(&mut self, _value: T) -> Result<usize, SequenceError> {
        Err(not_permitted("push", Capability::FixedSize))
    }

    fn remove_at(&mut self, _index: usize) -> Result<T, SequenceError> {
        Err(not_permitted("remove_at", Capability::FixedSize))
    }

    fn clear(&mut self) -> Result<(), SequenceError> {
        Err(not_permitted("clear", Capability::FixedSize))
    }

    fn sort(&mut self) -> Result<(), SequenceError> {
        self.inner.sort()
    }

    fn reverse(&mut self) -> Result<(), SequenceError> {
        self.inner.reverse()
    }

    fn set_comparator(
        &mut self,
        comparator: Option<Comparator<T>>,
        maintain_sorted: bool,
    ) -> Result<(), SequenceError> {
        self.inner.set_comparator(comparator, maintain_sorted)
    }

    fn is_sorted_maintained(&self) -> bool {
        self.inner.is_sorted_maintained()
    }

    fn is_fixed_size(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }
}

/// View that forbids every mutation
#[derive(Debug)]
pub struct ReadOnly<S> {
    inner: S,
}

impl<S> ReadOnly<S> {
    pub fn new(inner: S) -> Self {
        ReadOnly { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<T, S: Sequence<T>> Sequence<T> for ReadOnly<S> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Result<&T, SequenceError> {
        self.inner.get(index)
    }

    fn set(&mut self, _index: usize, _value: T) -> Result<T, SequenceError> {
        Err(not_permitted("set", Capability::ReadOnly))
    }

    fn insert_at(&mut self, _index: usize, _value: T) -> Result<(), SequenceError> {
        Err(not_permitted("insert_at", Capability::ReadOnly))
    }

    fn push(&mut self, _value: T) -> Result<usize, SequenceError> {
        Err(not_permitted("push", Capability::ReadOnly))
    }

    fn remove_at(&mut self, _index: usize) -> Result<T, SequenceError> {
        Err(not_permitted("remove_at", Capability::ReadOnly))
    }

    fn clear(&mut self) -> Result<(), SequenceError> {
        Err(not_permitted("clear", Capability::ReadOnly))
    }

    fn sort(&mut self) -> Result<(), SequenceError> {
        Err(not_permitted("sort", Capability::ReadOnly))
    }

    fn reverse(&mut self) -> Result<(), SequenceError> {
        Err(not_permitted("reverse", Capability::ReadOnly))
    }

    fn set_comparator(
        &mut self,
        _comparator: Option<Comparator<T>>,
        _maintain_sorted: bool,
    ) -> Result<(), SequenceError> {
        Err(not_permitted("set_comparator", Capability::ReadOnly))
    }

    fn is_sorted_maintained(&self) -> bool {
        self.inner.is_sorted_maintained()
    }

    fn is_fixed_size(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
