//! Livepatch Line Diff
//!
//! Computes which lines of a new document version differ from an old one and
//! reduces them to a minimal, sorted list of [`ChangeRange`]s for highlighting.
//!
//! # Removal policy
//!
//! A removed line has no presence in the new text. A run of removals with no
//! accompanying insertion collapses to a single-line marker at the deletion
//! point, clamped into the new document (`1..=line_count`, or line 1 when the
//! new document is empty). Removals never produce ranges taller than one line.
//!
//! # Example
//!
//! ```rust
//! use livepatch_diff::compute_changed_ranges;
//!
//! let ranges = compute_changed_ranges("a\nb\nc\n", "a\nB\nc\n");
//! assert_eq!(ranges.len(), 1);
//! assert_eq!((ranges[0].start(), ranges[0].end()), (2, 2));
//! ```

#![warn(unreachable_pub)]

pub use livepatch_artifact::ChangeRange;
use similar::{Algorithm, ChangeTag, TextDiff};

/// Classification of one line in the diff walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTag {
    /// Present in both versions
    Unchanged,
    /// Only in the new version
    Added,
    /// Only in the old version
    Removed,
}

/// One step of the line diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOp<'a> {
    /// Classification
    pub tag: LineTag,
    /// Line text without its terminator
    pub text: &'a str,
}

/// Split into lines; a trailing newline does not add an empty final line.
#[inline]
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Number of lines under [`split_lines`]
#[inline]
#[must_use]
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Ordered line operations turning `old` into `new` (Myers)
#[must_use]
pub fn line_ops<'a>(old: &'a str, new: &'a str) -> Vec<LineOp<'a>> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old_lines, &new_lines);

    diff.iter_all_changes()
        .map(|change| LineOp {
            tag: match change.tag() {
                ChangeTag::Equal => LineTag::Unchanged,
                ChangeTag::Insert => LineTag::Added,
                ChangeTag::Delete => LineTag::Removed,
            },
            text: change.value(),
        })
        .collect()
}

/// Changed-line ranges of `new` relative to `old`
///
/// Pure and total: identical inputs yield an empty list, an empty `old`
/// yields one range over all of `new`.
#[must_use]
pub fn compute_changed_ranges(old: &str, new: &str) -> Vec<ChangeRange> {
    if old == new {
        return Vec::new();
    }

    let mut builder = RangeBuilder::new(line_count(new));
    let mut line = 1;

    for op in line_ops(old, new) {
        match op.tag {
            LineTag::Unchanged => {
                builder.close();
                line += 1;
            }
            LineTag::Added => {
                builder.extend(line);
                line += 1;
            }
            LineTag::Removed => builder.mark(line),
        }
    }

    builder.finish()
}

/// Accumulates ranges during the diff walk
#[derive(Debug)]
struct RangeBuilder {
    new_line_count: usize,
    /// `(start, last added line)`; `None` while the open range is removals only
    open: Option<(usize, Option<usize>)>,
    ranges: Vec<ChangeRange>,
}

impl RangeBuilder {
    fn new(new_line_count: usize) -> Self {
        Self {
            new_line_count,
            open: None,
            ranges: Vec::new(),
        }
    }

    /// An added line at `line`
    fn extend(&mut self, line: usize) {
        match &mut self.open {
            Some((_, end)) => *end = Some(line),
            None => self.open = Some((line, Some(line))),
        }
    }

    /// A removed line at the current position
    fn mark(&mut self, line: usize) {
        if self.open.is_none() {
            self.open = Some((line, None));
        }
    }

    fn close(&mut self) {
        let Some((start, end)) = self.open.take() else {
            return;
        };
        let range = match end {
            Some(end) => ChangeRange::new(start, end),
            None => ChangeRange::line(start.min(self.new_line_count.max(1))),
        };
        let merged = match self.ranges.last_mut() {
            Some(last) => last.merge(range),
            None => false,
        };
        if !merged {
            self.ranges.push(range);
        }
    }

    fn finish(mut self) -> Vec<ChangeRange> {
        self.close();
        self.ranges
    }
}
