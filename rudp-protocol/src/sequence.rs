//! Sequence Number Handling
//!
//! Frames carry a 16-bit sequence number that wraps around. This module
//! provides a wrapped sequence number type whose comparisons and arithmetic
//! hold across the wrap boundary.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Maximum sequence number value
pub const MAX_SEQ_NUMBER: u16 = u16::MAX;

/// Sequence number with 16-bit wraparound semantics
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SeqNumber(u16);

impl SeqNumber {
    /// Create a new sequence number
    #[inline]
    pub const fn new(value: u16) -> Self {
        SeqNumber(value)
    }

    /// Get the raw sequence number value
    #[inline]
    pub fn as_raw(self) -> u16 {
        self.0
    }

    /// Increment the sequence number by 1
    #[inline]
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Get the next sequence number
    #[inline]
    pub fn next(self) -> Self {
        SeqNumber(self.0.wrapping_add(1))
    }

    /// Signed distance from this sequence number to another
    ///
    /// Positive values mean `other` is ahead of `self`. Distances are taken
    /// the short way around the ring, so they lie in `-32768..=32767`.
    #[inline]
    pub fn distance_to(self, other: SeqNumber) -> i16 {
        other.0.wrapping_sub(self.0) as i16
    }

    /// Check if this sequence number is less than another (accounting for wraparound)
    #[inline]
    pub fn lt(self, other: SeqNumber) -> bool {
        self.distance_to(other) > 0
    }

    /// Check if this sequence number is less than or equal to another
    #[inline]
    pub fn le(self, other: SeqNumber) -> bool {
        self == other || self.lt(other)
    }

    /// Check if this sequence number is greater than another
    #[inline]
    pub fn gt(self, other: SeqNumber) -> bool {
        self.distance_to(other) < 0
    }

    /// Check if this sequence number is greater than or equal to another
    #[inline]
    pub fn ge(self, other: SeqNumber) -> bool {
        self == other || self.gt(other)
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SeqNumber {
    fn from(value: u16) -> Self {
        SeqNumber(value)
    }
}

impl From<SeqNumber> for u16 {
    fn from(seq: SeqNumber) -> u16 {
        seq.0
    }
}

impl Add<u16> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u16) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u16> for SeqNumber {
    fn add_assign(&mut self, rhs: u16) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

impl Sub for SeqNumber {
    type Output = i16;

    /// Signed distance between two sequence numbers
    fn sub(self, rhs: SeqNumber) -> i16 {
        rhs.distance_to(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_wraparound() {
        let mut seq = SeqNumber::new(MAX_SEQ_NUMBER);
        seq.increment();
        assert_eq!(seq.as_raw(), 0);
        assert_eq!(SeqNumber::new(100).next().as_raw(), 101);
    }

    #[test]
    fn test_distance_simple() {
        let a = SeqNumber::new(100);
        let b = SeqNumber::new(200);
        assert_eq!(a.distance_to(b), 100);
        assert_eq!(b.distance_to(a), -100);
    }

    #[test]
    fn test_distance_wraparound() {
        let a = SeqNumber::new(MAX_SEQ_NUMBER - 10);
        let b = SeqNumber::new(10);
        assert_eq!(a.distance_to(b), 21);
        assert_eq!(b.distance_to(a), -21);
    }

    #[test]
    fn test_comparison_wraparound() {
        let a = SeqNumber::new(MAX_SEQ_NUMBER - 10);
        let b = SeqNumber::new(10);

        assert!(a.lt(b));
        assert!(b.gt(a));
        assert!(a.le(a));
        assert!(b.ge(b));
    }

    #[test]
    fn test_arithmetic() {
        let mut seq = SeqNumber::new(MAX_SEQ_NUMBER - 1);
        assert_eq!((seq + 5).as_raw(), 3);
        seq += 2;
        assert_eq!(seq.as_raw(), 0);
        assert_eq!(SeqNumber::new(3) - SeqNumber::new(MAX_SEQ_NUMBER), 4);
    }
}
