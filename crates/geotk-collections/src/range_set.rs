//! Sets of values stored as sorted, disjoint half-open ranges.

use std::fmt;
use std::ops::Range;

/// A set of `T` represented by half-open ranges `[start, end)`.
///
/// Ranges are kept sorted and disjoint; adding a range merges it with every
/// range it overlaps or touches, removing one splits the ranges it cuts.
/// Empty ranges (`start >= end`) are ignored.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RangeSet<T> {
    ranges: Vec<Range<T>>,
}

impl<T> Default for RangeSet<T> {
    fn default() -> Self {
        Self { ranges: Vec::new() }
    }
}

impl<T: Ord + Copy> RangeSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `range`, returning whether the set changed.
    pub fn add(&mut self, range: Range<T>) -> bool {
        if range.start >= range.end {
            return false;
        }

        // First range that ends at or after the new start: it touches or
        // overlaps when it starts at or before the new end.
        let first = self.ranges.partition_point(|r| r.end < range.start);
        let mut last = first;
        let mut merged = range.clone();
        while last < self.ranges.len() && self.ranges[last].start <= range.end {
            merged.start = merged.start.min(self.ranges[last].start);
            merged.end = merged.end.max(self.ranges[last].end);
            last += 1;
        }

        if last == first + 1 && self.ranges[first] == merged {
            return false;
        }
        self.ranges.splice(first..last, std::iter::once(merged));
        true
    }

    /// Remove `range`, returning whether the set changed.
    pub fn remove(&mut self, range: Range<T>) -> bool {
        if range.start >= range.end {
            return false;
        }

        let first = self.ranges.partition_point(|r| r.end <= range.start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start < range.end {
            last += 1;
        }
        if first == last {
            return false;
        }

        let mut kept = Vec::with_capacity(2);
        let head = &self.ranges[first];
        if head.start < range.start {
            kept.push(head.start..range.start);
        }
        let tail = &self.ranges[last - 1];
        if tail.end > range.end {
            kept.push(range.end..tail.end);
        }
        self.ranges.splice(first..last, kept);
        true
    }

    pub fn contains(&self, value: T) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= value);
        idx < self.ranges.len() && self.ranges[idx].start <= value
    }

    /// Whether every value of `range` is in the set.
    pub fn encloses(&self, range: &Range<T>) -> bool {
        if range.start >= range.end {
            return true;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        idx < self.ranges.len()
            && self.ranges[idx].start <= range.start
            && self.ranges[idx].end >= range.end
    }

    /// Whether any value of `range` is in the set.
    pub fn intersects(&self, range: &Range<T>) -> bool {
        if range.start >= range.end {
            return false;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        idx < self.ranges.len() && self.ranges[idx].start < range.end
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range<T>> {
        self.ranges.iter()
    }

    /// Number of disjoint ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Smallest value in the set.
    pub fn first(&self) -> Option<T> {
        self.ranges.first().map(|r| r.start)
    }

    /// Exclusive upper bound of the set.
    pub fn last(&self) -> Option<T> {
        self.ranges.last().map(|r| r.end)
    }

    pub fn union(&self, other: &RangeSet<T>) -> RangeSet<T> {
        let mut out = self.clone();
        for range in other.iter() {
            out.add(range.clone());
        }
        out
    }

    pub fn intersection(&self, other: &RangeSet<T>) -> RangeSet<T> {
        let mut out = RangeSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = &self.ranges[i];
            let b = &other.ranges[j];
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start < end {
                out.ranges.push(start..end);
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        out
    }
}

impl<T: Ord + Copy> FromIterator<Range<T>> for RangeSet<T> {
    fn from_iter<I: IntoIterator<Item = Range<T>>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord + Copy> Extend<Range<T>> for RangeSet<T> {
    fn extend<I: IntoIterator<Item = Range<T>>>(&mut self, iter: I) {
        for range in iter {
            self.add(range);
        }
    }
}

impl<'a, T> IntoIterator for &'a RangeSet<T> {
    type Item = &'a Range<T>;
    type IntoIter = std::slice::Iter<'a, Range<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for RangeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ranges.iter()).finish()
    }
}
