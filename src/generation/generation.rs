//! Generation - monotonically advancing point in time for deferred reclamation
//!
//! Generations only ever increase, but the counter is allowed to wrap. Every
//! comparison therefore goes through the signed difference of two values
//! instead of the raw integers, which is why this type does not implement
//! `Ord`.

use std::fmt;

/// A writer-assigned generation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Creates a generation with the given raw value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the following generation, wrapping at `u64::MAX`.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns true if `self` is strictly older than `other`.
    #[inline]
    pub fn is_before(&self, other: Generation) -> bool {
        (self.0.wrapping_sub(other.0) as i64) < 0
    }

    /// Number of generations `older` lies behind `self`.
    ///
    /// Only meaningful when `older` is not ahead of `self`.
    #[inline]
    pub fn distance_from(&self, older: Generation) -> u64 {
        self.0.wrapping_sub(older.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_before_simple() {
        let g1 = Generation::new(1);
        let g2 = Generation::new(2);
        assert!(g1.is_before(g2));
        assert!(!g2.is_before(g1));
        assert!(!g1.is_before(g1));
    }

    #[test]
    fn test_is_before_across_wraparound() {
        let last = Generation::new(u64::MAX);
        let first = last.next();
        assert_eq!(first.value(), 0);
        assert!(last.is_before(first));
        assert!(!first.is_before(last));
    }

    #[test]
    fn test_distance_from() {
        let older = Generation::new(u64::MAX - 1);
        let newer = Generation::new(2);
        assert_eq!(newer.distance_from(older), 4);
        assert_eq!(newer.distance_from(newer), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Generation::new(17).to_string(), "17");
    }
}
