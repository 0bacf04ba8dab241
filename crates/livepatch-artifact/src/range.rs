//! Changed-line ranges used for highlighting

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive, 1-indexed span of lines in a new document version
///
/// # Invariants
/// - `start >= 1`
/// - `end >= start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeRange {
    start: usize,
    end: usize,
}

impl ChangeRange {
    /// Build a range, clamping to the invariants
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        let start = start.max(1);
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Single-line range
    #[inline]
    #[must_use]
    pub fn line(line: usize) -> Self {
        Self::new(line, line)
    }

    /// First line
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last line (inclusive)
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of lines covered
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one line
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `line` falls inside
    #[inline]
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }

    /// Extend this range to cover `other` when they overlap
    ///
    /// Returns `false` and leaves `self` untouched when they are disjoint.
    pub fn merge(&mut self, other: Self) -> bool {
        if other.start > self.end || other.end < self.start {
            return false;
        }
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        true
    }
}

impl fmt::Display for ChangeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
