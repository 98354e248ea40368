//! Anchor-Indexed Linked List
//!
//! A doubly-linked list stored in an arena of slots. Besides the first and
//! last nodes the list keeps a middle anchor that always sits at index
//! `len / 2`, so indexed access walks from whichever of the three anchors is
//! closest instead of always starting at the head.
//!
//! The middle anchor is never recomputed by traversal: each insert or remove
//! moves it by at most one node, depending on the parity of the length and
//! on which side of the midpoint the change happened.
//!
//! Sorting and reversal swap values between nodes rather than relinking, so
//! the anchors stay valid without any fix-up.

use crate::sequence::{natural_order, Comparator, Sequence, SequenceError};
use std::cmp::Ordering;
use std::fmt;
use std::mem;

type NodeId = usize;

struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    /// Pre-sort position, used to break comparator ties during a sort
    rank: usize,
}

type ValidateHook<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;
type IndexHook<T> = Box<dyn Fn(usize, &T) + Send + Sync>;
type SetHook<T> = Box<dyn Fn(usize, usize, &T, &T) + Send + Sync>;
type ClearHook = Box<dyn Fn(usize) + Send + Sync>;

/// Optional callbacks run around mutations
///
/// `validate` runs before a value enters the list and can refuse it. The
/// others run after the mutation has been applied.
pub struct Hooks<T> {
    validate: Option<ValidateHook<T>>,
    on_insert: Option<IndexHook<T>>,
    on_remove: Option<IndexHook<T>>,
    on_set: Option<SetHook<T>>,
    on_clear: Option<ClearHook>,
}

impl<T> Hooks<T> {
    pub fn new() -> Self {
        Hooks {
            validate: None,
            on_insert: None,
            on_remove: None,
            on_set: None,
            on_clear: None,
        }
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(f));
        self
    }

    /// Called with the index the value was inserted at
    pub fn on_insert<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &T) + Send + Sync + 'static,
    {
        self.on_insert = Some(Box::new(f));
        self
    }

    /// Called with the index the value was removed from
    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &T) + Send + Sync + 'static,
    {
        self.on_remove = Some(Box::new(f));
        self
    }

    /// Called with the index that was replaced, the index the new value
    /// now occupies, the old value and the new value
    ///
    /// The two indices differ only in a sorted list, where the new value
    /// moves to its sorted position.
    pub fn on_set<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize, &T, &T) + Send + Sync + 'static,
    {
        self.on_set = Some(Box::new(f));
        self
    }

    /// Called with the number of elements removed
    pub fn on_clear<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_clear = Some(Box::new(f));
        self
    }

    fn check(&self, value: &T) -> Result<(), SequenceError> {
        match &self.validate {
            Some(validate) => validate(value).map_err(SequenceError::Rejected),
            None => Ok(()),
        }
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Hooks::new()
    }
}

/// Doubly-linked list with first/middle/last anchors
pub struct IndexedList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
    first: Option<NodeId>,
    middle: Option<NodeId>,
    last: Option<NodeId>,
    len: usize,
    comparator: Option<Comparator<T>>,
    maintain_sorted: bool,
    hooks: Hooks<T>,
}

impl<T> IndexedList<T> {
    /// Create an empty, unordered list
    pub fn new() -> Self {
        IndexedList {
            slots: Vec::new(),
            free: Vec::new(),
            first: None,
            middle: None,
            last: None,
            len: 0,
            comparator: None,
            maintain_sorted: false,
            hooks: Hooks::new(),
        }
    }

    /// Create an empty list kept sorted by `comparator`
    pub fn sorted_by(comparator: Comparator<T>) -> Self {
        let mut list = IndexedList::new();
        list.comparator = Some(comparator);
        list.maintain_sorted = true;
        list
    }

    /// Attach mutation hooks
    pub fn with_hooks(mut self, hooks: Hooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_sorted_maintained(&self) -> bool {
        self.maintain_sorted
    }

    pub fn comparator(&self) -> Option<&Comparator<T>> {
        self.comparator.as_ref()
    }

    pub fn first(&self) -> Option<&T> {
        self.first.map(|id| &self.node(id).value)
    }

    pub fn last(&self) -> Option<&T> {
        self.last.map(|id| &self.node(id).value)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Result<&T, SequenceError> {
        self.check_index(index)?;
        Ok(&self.node(self.node_at(index)).value)
    }

    /// Mutable element at `index`
    ///
    /// Changing the sort key of an element in a sorted list breaks ordering;
    /// use [`set`](Self::set) for that.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, SequenceError> {
        self.check_index(index)?;
        let id = self.node_at(index);
        Ok(&mut self.node_mut(id).value)
    }

    /// Replace the element at `index`, returning the old value
    ///
    /// In a sorted list the new value is moved to its sorted position.
    pub fn set(&mut self, index: usize, value: T) -> Result<T, SequenceError> {
        self.check_index(index)?;
        self.hooks.check(&value)?;

        if self.maintain_sorted {
            let old = self.unlink(index);
            let position = self.sorted_position(&value);
            self.link(position, value);
            if let Some(on_set) = &self.hooks.on_set {
                on_set(index, position, &old, self.get_linked(position));
            }
            return Ok(old);
        }

        let id = self.node_at(index);
        let old = mem::replace(&mut self.node_mut(id).value, value);
        if let Some(on_set) = &self.hooks.on_set {
            on_set(index, index, &old, &self.node(id).value);
        }
        Ok(old)
    }

    /// Insert at `index` (`index == len` appends)
    ///
    /// Fails with [`SequenceError::UnorderedInsert`] on a sorted list.
    pub fn insert_at(&mut self, index: usize, value: T) -> Result<(), SequenceError> {
        if self.maintain_sorted {
            return Err(SequenceError::UnorderedInsert);
        }
        if index > self.len {
            return Err(SequenceError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.hooks.check(&value)?;

        self.link(index, value);
        if let Some(on_insert) = &self.hooks.on_insert {
            on_insert(index, self.get_linked(index));
        }
        Ok(())
    }

    /// Append, or insert at the sorted position when order is maintained
    ///
    /// Equal elements keep insertion order: the new value goes after every
    /// element that compares equal to it.
    pub fn push(&mut self, value: T) -> Result<usize, SequenceError> {
        self.hooks.check(&value)?;

        let index = if self.maintain_sorted {
            self.sorted_position(&value)
        } else {
            self.len
        };

        self.link(index, value);
        if let Some(on_insert) = &self.hooks.on_insert {
            on_insert(index, self.get_linked(index));
        }
        Ok(index)
    }

    /// Remove and return the element at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        self.check_index(index)?;
        let value = self.unlink(index);
        if let Some(on_remove) = &self.hooks.on_remove {
            on_remove(index, &value);
        }
        Ok(value)
    }

    /// Remove and return the first element
    pub fn pop_front(&mut self) -> Result<T, SequenceError> {
        if self.is_empty() {
            return Err(SequenceError::Empty);
        }
        self.remove_at(0)
    }

    /// Remove every element
    pub fn clear(&mut self) {
        let removed = self.len;
        self.slots.clear();
        self.free.clear();
        self.first = None;
        self.middle = None;
        self.last = None;
        self.len = 0;
        if let Some(on_clear) = &self.hooks.on_clear {
            on_clear(removed);
        }
    }

    /// Index where `value` would be inserted to keep the list sorted
    pub fn index_of_sorted(&self, value: &T) -> Result<usize, SequenceError> {
        if self.comparator.is_none() {
            return Err(SequenceError::NoComparator);
        }
        Ok(self.sorted_position(value))
    }

    /// Stable in-place sort by the configured comparator
    pub fn sort(&mut self) -> Result<(), SequenceError> {
        let comparator = self.comparator.clone().ok_or(SequenceError::NoComparator)?;
        let Some(first) = self.first else {
            return Ok(());
        };

        let mut cursor = self.first;
        let mut rank = 0;
        while let Some(id) = cursor {
            let node = self.node_mut(id);
            node.rank = rank;
            rank += 1;
            cursor = node.next;
        }

        self.quicksort(first, self.len, &comparator);
        Ok(())
    }

    /// Reverse element order in place
    pub fn reverse(&mut self) {
        let (mut front, mut back) = (self.first, self.last);
        for _ in 0..self.len / 2 {
            let (Some(a), Some(b)) = (front, back) else {
                break;
            };
            self.swap_values(a, b);
            front = self.node(a).next;
            back = self.node(b).prev;
        }
    }

    /// Replace the comparator
    ///
    /// With `maintain_sorted` the list is sorted immediately and kept sorted
    /// afterwards; that requires a comparator.
    pub fn set_comparator(
        &mut self,
        comparator: Option<Comparator<T>>,
        maintain_sorted: bool,
    ) -> Result<(), SequenceError> {
        if maintain_sorted && comparator.is_none() {
            return Err(SequenceError::NoComparator);
        }
        self.comparator = comparator;
        self.maintain_sorted = maintain_sorted;
        if maintain_sorted {
            self.sort()?;
        }
        Ok(())
    }

    /// Iterate front to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.first,
            remaining: self.len,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SequenceError> {
        if index >= self.len {
            if self.len == 0 {
                return Err(SequenceError::Empty);
            }
            return Err(SequenceError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node<T> {
        self.slots[id].as_ref().expect("anchor points at a live node")
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.slots[id].as_mut().expect("anchor points at a live node")
    }

    fn get_linked(&self, index: usize) -> &T {
        &self.node(self.node_at(index)).value
    }

    /// Node at `index`, walking from the nearest anchor; `index < len`
    fn node_at(&self, index: usize) -> NodeId {
        debug_assert!(index < self.len);
        let mid_index = self.len / 2;
        let from_first = index;
        let from_middle = index.abs_diff(mid_index);
        let from_last = self.len - 1 - index;

        let walk = |start: Option<NodeId>, steps: usize, forward: bool| {
            let mut id = start.expect("non-empty list has anchors");
            for _ in 0..steps {
                let node = self.node(id);
                let step = if forward { node.next } else { node.prev };
                id = step.expect("walk stays inside the list");
            }
            id
        };

        if from_first <= from_middle && from_first <= from_last {
            walk(self.first, from_first, true)
        } else if from_last <= from_middle {
            walk(self.last, from_last, false)
        } else {
            walk(self.middle, from_middle, index > mid_index)
        }
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Link a new node so that it ends up at `index`; `index <= len`
    fn link(&mut self, index: usize, value: T) {
        let next = (index < self.len).then(|| self.node_at(index));
        let prev = match next {
            Some(id) => self.node(id).prev,
            None => self.last,
        };

        let id = self.alloc(Node {
            value,
            prev,
            next,
            rank: 0,
        });

        match prev {
            Some(p) => self.node_mut(p).next = Some(id),
            None => self.first = Some(id),
        }
        match next {
            Some(n) => self.node_mut(n).prev = Some(id),
            None => self.last = Some(id),
        }

        let old_len = self.len;
        self.len += 1;

        match self.middle {
            None => self.middle = Some(id),
            Some(mid) => {
                let mid_index = old_len / 2;
                if old_len % 2 == 0 {
                    // Target index stays put; the old middle shifted right
                    if index <= mid_index {
                        self.middle = self.node(mid).prev;
                    }
                } else if index > mid_index {
                    // Target index advanced; the old middle did not move
                    self.middle = self.node(mid).next;
                }
            }
        }
    }

    /// Unlink the node at `index` and return its value; `index < len`
    fn unlink(&mut self, index: usize) -> T {
        let id = self.node_at(index);
        let old_len = self.len;

        if old_len == 1 {
            self.middle = None;
        } else if let Some(mid) = self.middle {
            let mid_index = old_len / 2;
            if old_len % 2 == 0 {
                if index >= mid_index {
                    self.middle = self.node(mid).prev;
                }
            } else if index <= mid_index {
                self.middle = self.node(mid).next;
            }
        }

        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.last = prev,
        }

        self.len -= 1;
        self.free.push(id);
        self.slots[id]
            .take()
            .expect("unlinked node was live")
            .value
    }

    /// First index whose element sorts strictly after `value`
    fn sorted_position(&self, value: &T) -> usize {
        let Some(comparator) = &self.comparator else {
            return self.len;
        };

        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if comparator(self.get_linked(mid), value) == Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    fn swap_values(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = self.slots.split_at_mut(hi);
        let x = left[lo].as_mut().expect("swap source is live");
        let y = right[0].as_mut().expect("swap target is live");
        mem::swap(&mut x.value, &mut y.value);
        mem::swap(&mut x.rank, &mut y.rank);
    }

    fn sorts_before(&self, a: NodeId, b: NodeId, comparator: &Comparator<T>) -> bool {
        let (x, y) = (self.node(a), self.node(b));
        match comparator(&x.value, &y.value) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => x.rank < y.rank,
        }
    }

    #[inline]
    fn next_of(&self, id: NodeId) -> NodeId {
        self.node(id).next.expect("range stays inside the list")
    }

    #[inline]
    fn prev_of(&self, id: NodeId) -> NodeId {
        self.node(id).prev.expect("range stays inside the list")
    }

    /// Quicksort the `len` nodes starting at `lo`
    ///
    /// The first node is the pivot. Recursion goes into the smaller
    /// partition and the larger one is handled by the loop, which bounds
    /// stack depth by `log2(len)`.
    fn quicksort(&mut self, mut lo: NodeId, mut len: usize, comparator: &Comparator<T>) {
        while len > 1 {
            let pivot = lo;
            let mut store = lo;
            let mut low_count = 0;
            let mut cursor = self.next_of(lo);

            for step in 1..len {
                if self.sorts_before(cursor, pivot, comparator) {
                    store = self.next_of(store);
                    self.swap_values(store, cursor);
                    low_count += 1;
                }
                if step + 1 < len {
                    cursor = self.next_of(cursor);
                }
            }
            self.swap_values(pivot, store);

            let high_count = len - 1 - low_count;
            if low_count < high_count {
                if low_count > 1 {
                    self.quicksort(lo, low_count, comparator);
                }
                lo = self.next_of(store);
                len = high_count;
            } else {
                if high_count > 1 {
                    let high_start = self.next_of(store);
                    self.quicksort(high_start, high_count, comparator);
                }
                len = low_count;
            }
        }
    }
}

impl<T: Ord + 'static> IndexedList<T> {
    /// Create an empty list kept in natural order
    pub fn sorted() -> Self {
        IndexedList::sorted_by(natural_order())
    }
}

impl<T> Default for IndexedList<T> {
    fn default() -> Self {
        IndexedList::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for IndexedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for IndexedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = IndexedList::new();
        for value in iter {
            let len = list.len;
            list.link(len, value);
        }
        list
    }
}

/// Front-to-back iterator over an [`IndexedList`]
pub struct Iter<'a, T> {
    list: &'a IndexedList<T>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let id = self.cursor?;
        let node = self.list.node(id);
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a IndexedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> Sequence<T> for IndexedList<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<&T, SequenceError> {
        IndexedList::get(self, index)
    }

    fn set(&mut self, index: usize, value: T) -> Result<T, SequenceError> {
        IndexedList::set(self, index, value)
    }

    fn insert_at(&mut self, index: usize, value: T) -> Result<(), SequenceError> {
        IndexedList::insert_at(self, index, value)
    }

    fn push(&mut self, value: T) -> Result<usize, SequenceError> {
        IndexedList::push(self, value)
    }

    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        IndexedList::remove_at(self, index)
    }

    fn clear(&mut self) -> Result<(), SequenceError> {
        IndexedList::clear(self);
        Ok(())
    }

    fn sort(&mut self) -> Result<(), SequenceError> {
        IndexedList::sort(self)
    }

    fn reverse(&mut self) -> Result<(), SequenceError> {
        IndexedList::reverse(self);
        Ok(())
    }

    fn set_comparator(
        &mut self,
        comparator: Option<Comparator<T>>,
        maintain_sorted: bool,
    ) -> Result<(), SequenceError> {
        IndexedList::set_comparator(self, comparator, maintain_sorted)
    }

    fn is_sorted_maintained(&self) -> bool {
        self.maintain_sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::comparator;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    impl<T> IndexedList<T> {
        /// Walk the links and check every anchor against its definition
        fn assert_anchors(&self) {
            let mut forward = Vec::new();
            let mut cursor = self.first;
            while let Some(id) = cursor {
                forward.push(id);
                cursor = self.node(id).next;
            }
            assert_eq!(forward.len(), self.len);
            assert_eq!(self.first, forward.first().copied());
            assert_eq!(self.last, forward.last().copied());
            assert_eq!(self.middle, forward.get(self.len / 2).copied());

            let mut backward = Vec::new();
            let mut cursor = self.last;
            while let Some(id) = cursor {
                backward.push(id);
                cursor = self.node(id).prev;
            }
            backward.reverse();
            assert_eq!(forward, backward);
        }
    }

    fn contents<T: Clone>(list: &IndexedList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_push_and_get() {
        let mut list = IndexedList::new();
        for i in 0..10 {
            assert_eq!(list.push(i).unwrap(), i as usize);
            list.assert_anchors();
        }
        for i in 0..10 {
            assert_eq!(*list.get(i).unwrap(), i);
        }
        assert_eq!(list.first(), Some(&0));
        assert_eq!(list.last(), Some(&9));
    }

    #[test]
    fn test_insert_at_positions() {
        let mut list: IndexedList<i32> = IndexedList::new();
        list.insert_at(0, 2).unwrap();
        list.insert_at(0, 0).unwrap();
        list.insert_at(1, 1).unwrap();
        list.insert_at(3, 4).unwrap();
        list.insert_at(3, 3).unwrap();
        list.assert_anchors();
        assert_eq!(contents(&list), vec![0, 1, 2, 3, 4]);

        assert_eq!(
            list.insert_at(7, 9),
            Err(SequenceError::IndexOutOfRange { index: 7, len: 5 })
        );
    }

    #[test]
    fn test_remove_keeps_anchors() {
        let mut list: IndexedList<usize> = (0..9).collect();
        list.assert_anchors();

        assert_eq!(list.remove_at(4).unwrap(), 4);
        list.assert_anchors();
        assert_eq!(list.remove_at(0).unwrap(), 0);
        list.assert_anchors();
        assert_eq!(list.remove_at(6).unwrap(), 8);
        list.assert_anchors();
        assert_eq!(contents(&list), vec![1, 2, 3, 5, 6, 7]);

        while !list.is_empty() {
            let mid = list.len() / 2;
            list.remove_at(mid).unwrap();
            list.assert_anchors();
        }
        assert_eq!(list.first(), None);
    }

    #[test]
    fn test_empty_access() {
        let mut list: IndexedList<u8> = IndexedList::new();
        assert_eq!(list.get(0), Err(SequenceError::Empty));
        assert_eq!(list.pop_front(), Err(SequenceError::Empty));
        assert_eq!(list.remove_at(0), Err(SequenceError::Empty));

        list.push(1).unwrap();
        assert_eq!(
            list.get(1),
            Err(SequenceError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_slot_reuse() {
        let mut list: IndexedList<u32> = (0..4).collect();
        list.remove_at(1).unwrap();
        list.remove_at(1).unwrap();
        list.push(10).unwrap();
        list.push(11).unwrap();
        assert_eq!(list.slots.len(), 4);
        list.assert_anchors();
        assert_eq!(contents(&list), vec![0, 3, 10, 11]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut list: IndexedList<(u8, char)> = vec![
            (3, 'a'),
            (1, 'b'),
            (3, 'c'),
            (2, 'd'),
            (1, 'e'),
            (3, 'f'),
            (2, 'g'),
        ]
        .into_iter()
        .collect();

        list.set_comparator(Some(comparator(|a: &(u8, char), b| a.0.cmp(&b.0))), false)
            .unwrap();
        list.sort().unwrap();
        list.assert_anchors();
        assert_eq!(
            contents(&list),
            vec![
                (1, 'b'),
                (1, 'e'),
                (2, 'd'),
                (2, 'g'),
                (3, 'a'),
                (3, 'c'),
                (3, 'f')
            ]
        );
    }

    #[test]
    fn test_sort_large_sorted_input() {
        // Already-sorted input is the worst case for a first-node pivot
        let mut list: IndexedList<u32> = (0..2000).collect();
        list.set_comparator(Some(natural_order()), false).unwrap();
        list.sort().unwrap();
        assert!(list.iter().copied().eq(0..2000));

        list.reverse();
        list.sort().unwrap();
        assert!(list.iter().copied().eq(0..2000));
    }

    #[test]
    fn test_sort_without_comparator() {
        let mut list: IndexedList<u8> = vec![2, 1].into_iter().collect();
        assert_eq!(list.sort(), Err(SequenceError::NoComparator));
        assert_eq!(
            list.set_comparator(None, true),
            Err(SequenceError::NoComparator)
        );
    }

    #[test]
    fn test_reverse() {
        for n in 0..7 {
            let mut list: IndexedList<usize> = (0..n).collect();
            list.reverse();
            list.assert_anchors();
            assert_eq!(contents(&list), (0..n).rev().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_sorted_insertion_fifo_ties() {
        let mut list = IndexedList::sorted_by(comparator(|a: &(u8, u32), b| a.0.cmp(&b.0)));
        let input = [(5, 0), (2, 1), (5, 2), (7, 3), (2, 4), (5, 5)];
        for item in input {
            list.push(item).unwrap();
            list.assert_anchors();
        }
        assert_eq!(
            contents(&list),
            vec![(2, 1), (2, 4), (5, 0), (5, 2), (5, 5), (7, 3)]
        );

        assert_eq!(list.index_of_sorted(&(5, 99)).unwrap(), 5);
        assert_eq!(list.index_of_sorted(&(0, 99)).unwrap(), 0);
        assert_eq!(list.insert_at(0, (1, 1)), Err(SequenceError::UnorderedInsert));
    }

    #[test]
    fn test_set_comparator_sorts_existing() {
        let mut list: IndexedList<i32> = vec![5, -1, 3, 0].into_iter().collect();
        list.set_comparator(Some(natural_order()), true).unwrap();
        assert!(list.is_sorted_maintained());
        assert_eq!(contents(&list), vec![-1, 0, 3, 5]);
        assert_eq!(list.push(4).unwrap(), 3);
    }

    #[test]
    fn test_set_in_sorted_list_moves_value() {
        let mut list = IndexedList::sorted();
        for v in [10, 20, 30, 40] {
            list.push(v).unwrap();
        }
        assert_eq!(list.set(0, 35).unwrap(), 10);
        list.assert_anchors();
        assert_eq!(contents(&list), vec![20, 30, 35, 40]);

        let mut plain: IndexedList<i32> = vec![1, 2, 3].into_iter().collect();
        assert_eq!(plain.set(1, 9).unwrap(), 2);
        assert_eq!(contents(&plain), vec![1, 9, 3]);
    }

    #[test]
    fn test_hooks() {
        let inserted = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let cleared = Arc::new(AtomicUsize::new(0));

        let hooks = Hooks::new()
            .validate(|v: &i32| {
                if *v < 0 {
                    Err(format!("negative value {}", v))
                } else {
                    Ok(())
                }
            })
            .on_insert({
                let inserted = inserted.clone();
                move |_, _| {
                    inserted.fetch_add(1, AtomicOrdering::SeqCst);
                }
            })
            .on_remove({
                let removed = removed.clone();
                move |_, _| {
                    removed.fetch_add(1, AtomicOrdering::SeqCst);
                }
            })
            .on_clear({
                let cleared = cleared.clone();
                move |n| {
                    cleared.fetch_add(n, AtomicOrdering::SeqCst);
                }
            });

        let mut list = IndexedList::new().with_hooks(hooks);
        list.push(1).unwrap();
        list.push(2).unwrap();
        list.insert_at(0, 0).unwrap();
        assert_eq!(
            list.push(-5),
            Err(SequenceError::Rejected("negative value -5".to_string()))
        );
        list.remove_at(1).unwrap();
        list.clear();

        assert_eq!(inserted.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(removed.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(cleared.load(AtomicOrdering::SeqCst), 2);
        assert!(list.is_empty());
    }

    #[test]
    fn test_set_hook_reports_new_position() {
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hooks = Hooks::new().on_set({
            let events = events.clone();
            move |from, to, old: &i32, new: &i32| events.lock().push((from, to, *old, *new))
        });

        let mut sorted = IndexedList::sorted().with_hooks(hooks);
        for v in [10, 20, 30, 40] {
            sorted.push(v).unwrap();
        }
        sorted.set(0, 35).unwrap();
        assert_eq!(contents(&sorted), vec![20, 30, 35, 40]);
        assert_eq!(sorted.get(2).unwrap(), &35);

        sorted.set_comparator(None, false).unwrap();
        sorted.set(1, 99).unwrap();
        assert_eq!(*events.lock(), vec![(0, 2, 10, 35), (1, 1, 30, 99)]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(usize, u16),
            Remove(usize),
            Push(u16),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Op::Insert(i, v)),
                any::<usize>().prop_map(Op::Remove),
                any::<u16>().prop_map(Op::Push),
            ]
        }

        proptest! {
            #[test]
            fn prop_indexed_access_matches_traversal(ops in prop::collection::vec(op_strategy(), 0..200)) {
                let mut list = IndexedList::new();
                let mut model: Vec<u16> = Vec::new();

                for op in ops {
                    match op {
                        Op::Insert(i, v) => {
                            let i = i % (model.len() + 1);
                            list.insert_at(i, v).unwrap();
                            model.insert(i, v);
                        }
                        Op::Remove(i) if !model.is_empty() => {
                            let i = i % model.len();
                            prop_assert_eq!(list.remove_at(i).unwrap(), model.remove(i));
                        }
                        Op::Remove(_) => {}
                        Op::Push(v) => {
                            list.push(v).unwrap();
                            model.push(v);
                        }
                    }
                    list.assert_anchors();
                }

                let traversal: Vec<u16> = list.iter().copied().collect();
                prop_assert_eq!(&traversal, &model);
                for (i, expected) in model.iter().enumerate() {
                    prop_assert_eq!(list.get(i).unwrap(), expected);
                }
            }

            #[test]
            fn prop_sort_matches_stable_sort(values in prop::collection::vec((0u8..8, any::<u16>()), 0..300)) {
                let mut list: IndexedList<(u8, u16)> = values.iter().copied().collect();
                list.set_comparator(Some(comparator(|a: &(u8, u16), b| a.0.cmp(&b.0))), false).unwrap();
                list.sort().unwrap();
                list.assert_anchors();

                let mut expected = values.clone();
                expected.sort_by_key(|v| v.0);
                prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), expected);
            }
        }
    }
}
