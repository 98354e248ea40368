//! Blocking Priority Queue
//!
//! A [`Synchronized`] sorted list keyed by each element's priority. Lower
//! priority values dequeue first; equal priorities dequeue in the order
//! they were enqueued.

use crate::list::IndexedList;
use crate::sequence::{comparator, SequenceError};
use crate::sync::Synchronized;
use std::time::Duration;

/// Elements that carry a dequeue priority (lower is more urgent)
pub trait Prioritized {
    fn priority(&self) -> u8;
}

/// Multi-producer priority queue with blocking dequeue
pub struct PriorityQueue<T> {
    queue: Synchronized<T, IndexedList<T>>,
}

impl<T: Prioritized + 'static> PriorityQueue<T> {
    pub fn new() -> Self {
        let list = IndexedList::sorted_by(comparator(|a: &T, b: &T| {
            a.priority().cmp(&b.priority())
        }));
        PriorityQueue {
            queue: Synchronized::new(list),
        }
    }

    /// Add an element behind every element of equal or higher urgency
    pub fn enqueue(&self, item: T) -> Result<usize, SequenceError> {
        self.queue.push(item)
    }

    /// Remove the most urgent element without blocking
    pub fn dequeue(&self) -> Result<T, SequenceError> {
        self.queue.pop_front()
    }

    /// Clone of the most urgent element
    pub fn peek(&self) -> Result<T, SequenceError>
    where
        T: Clone,
    {
        self.queue.get_cloned(0)
    }

    /// Block until an element is available; `None` once closed
    pub fn wait_dequeue(&self) -> Option<T> {
        self.queue.wait_pop_front()
    }

    pub fn wait_dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        self.queue.wait_pop_front_timeout(timeout)
    }

    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Remove and return every queued element in dequeue order
    pub fn drain(&self) -> Vec<T> {
        self.queue.drain()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&self) {
        // Clearing an unwrapped list never fails
        let _ = self.queue.clear();
    }
}

impl<T: Prioritized + 'static> Default for PriorityQueue<T> {
    fn default() -> Self {
        PriorityQueue::new()
    }
}
