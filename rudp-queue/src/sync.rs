//! Synchronized Sequence
//!
//! Wraps any [`Sequence`] in a single mutex so it can be shared between
//! threads, and adds blocking pops that sleep on a condition variable until
//! an element arrives or the sequence is closed.

use crate::sequence::{Comparator, Sequence, SequenceError};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe wrapper around a sequence
///
/// Every operation takes the one lock, so compound operations through
/// [`lock`](Self::lock) are atomic with respect to other callers.
pub struct Synchronized<T, S> {
    inner: Mutex<S>,
    available: Condvar,
    closed: AtomicBool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: Sequence<T>> Synchronized<T, S> {
    pub fn new(inner: S) -> Self {
        Synchronized {
            inner: Mutex::new(inner),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// Hold the lock for a compound operation
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clone of the element at `index`
    pub fn get_cloned(&self, index: usize) -> Result<T, SequenceError>
    where
        T: Clone,
    {
        self.inner.lock().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: T) -> Result<T, SequenceError> {
        self.inner.lock().set(index, value)
    }

    pub fn insert_at(&self, index: usize, value: T) -> Result<(), SequenceError> {
        let mut guard = self.inner.lock();
        if self.is_closed() {
            return Err(SequenceError::Closed);
        }
        guard.insert_at(index, value)?;
        self.available.notify_one();
        Ok(())
    }

    /// Push and wake one waiter; refused once closed
    pub fn push(&self, value: T) -> Result<usize, SequenceError> {
        let mut guard = self.inner.lock();
        if self.is_closed() {
            return Err(SequenceError::Closed);
        }
        let index = guard.push(value)?;
        self.available.notify_one();
        Ok(index)
    }

    pub fn remove_at(&self, index: usize) -> Result<T, SequenceError> {
        self.inner.lock().remove_at(index)
    }

    /// Remove the first element without blocking
    pub fn pop_front(&self) -> Result<T, SequenceError> {
        let mut guard = self.inner.lock();
        if guard.is_empty() {
            return Err(SequenceError::Empty);
        }
        guard.remove_at(0)
    }

    /// Block until an element is available and remove it
    ///
    /// Returns `None` once the sequence is closed, even if elements remain.
    pub fn wait_pop_front(&self) -> Option<T> {
        let mut guard = self.inner.lock();
        loop {
            if self.is_closed() {
                return None;
            }
            if !guard.is_empty() {
                return guard.remove_at(0).ok();
            }
            self.available.wait(&mut guard);
        }
    }

    /// Like [`wait_pop_front`](Self::wait_pop_front) but gives up after
    /// `timeout`
    pub fn wait_pop_front_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock();
        loop {
            if self.is_closed() {
                return None;
            }
            if !guard.is_empty() {
                return guard.remove_at(0).ok();
            }
            if self.available.wait_until(&mut guard, deadline).timed_out() {
                if self.is_closed() || guard.is_empty() {
                    return None;
                }
                return guard.remove_at(0).ok();
            }
        }
    }

    /// Remove every element and return them in order
    pub fn drain(&self) -> Vec<T> {
        let mut guard = self.inner.lock();
        let mut drained = Vec::with_capacity(guard.len());
        while !guard.is_empty() {
            match guard.remove_at(0) {
                Ok(value) => drained.push(value),
                Err(_) => break,
            }
        }
        drained
    }

    pub fn clear(&self) -> Result<(), SequenceError> {
        self.inner.lock().clear()
    }

    pub fn sort(&self) -> Result<(), SequenceError> {
        self.inner.lock().sort()
    }

    pub fn reverse(&self) -> Result<(), SequenceError> {
        self.inner.lock().reverse()
    }

    pub fn set_comparator(
        &self,
        comparator: Option<Comparator<T>>,
        maintain_sorted: bool,
    ) -> Result<(), SequenceError> {
        self.inner.lock().set_comparator(comparator, maintain_sorted)
    }

    /// Wake every waiter, make later waits return `None` and refuse
    /// later inserts
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = self.inner.lock();
        self.available.notify_all();
        tracing::debug!("Synchronized sequence closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}
