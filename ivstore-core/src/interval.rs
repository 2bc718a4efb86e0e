use std::cmp::Ordering;

/// Sentinel used by engine internals to mark an interval with no container.
pub const NOT_CONTAINED: i32 = i32::MIN;

/// Sentinel used by engine internals while containment has not been decided.
pub const CONTAINMENT_UNKNOWN: i32 = 0;

/// The capability every stored payload must provide.
///
/// An interval is a closed range `[begin, end]` over `i32` coordinates with
/// `begin <= end`; behaviour for `begin > end` is undefined. Value equality
/// goes through [`equals_interval`](Interval::equals_interval), which is
/// distinct from plain coordinate equality: two intervals with the same
/// coordinates but different payloads are *not* equal.
pub trait Interval {
    /// Inclusive lower bound.
    fn begin(&self) -> i32;

    /// Inclusive upper bound.
    fn end(&self) -> i32;

    /// Value equality used by `contains` and `remove`. Implementations must
    /// compare coordinates *and* any distinguishing payload fields.
    fn equals_interval(&self, other: &Self) -> bool;

    /// Answers true if this interval contains (or matches) the given
    /// interval, based solely on begin and end.
    #[inline]
    fn contains_interval<I: Interval + ?Sized>(&self, other: &I) -> bool {
        other.begin() >= self.begin() && other.end() <= self.end()
    }

    /// Answers true if this interval properly contains the given interval,
    /// that is, contains it and is larger than it.
    #[inline]
    fn properly_contains_interval<I: Interval + ?Sized>(&self, other: &I) -> bool {
        self.contains_interval(other)
            && (other.begin() > self.begin() || other.end() < self.end())
    }

    /// Answers true if this interval and the other share at least one
    /// position.
    #[inline]
    fn overlaps_interval<I: Interval + ?Sized>(&self, other: &I) -> bool {
        self.overlaps_range(other.begin(), other.end())
    }

    /// Answers true if this interval overlaps the closed range `[from, to]`.
    #[inline]
    fn overlaps_range(&self, from: i32, to: i32) -> bool {
        self.begin() <= to && self.end() >= from
    }
}

/// Tie-break direction for intervals that share a begin position.
///
/// Both orderings sort by begin ascending; they differ only on equal begins:
/// big-endian puts the longer interval first (`[10,100]` ahead of
/// `[10,80]`), little-endian the shorter. Big-endian is the default because
/// a stable big-endian sort places every container immediately before the
/// intervals it contains, which is what the nest-building sweeps rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl SortOrder {
    /// The ordering function for this tie-break direction.
    #[inline]
    pub fn compare<T: Interval>(&self, a: &T, b: &T) -> Ordering {
        match self {
            SortOrder::BigEndian => compare_big_endian(a, b),
            SortOrder::LittleEndian => compare_little_endian(a, b),
        }
    }
}

/// Compare by begin ascending, ties broken by end descending.
#[inline]
pub fn compare_big_endian<T: Interval>(a: &T, b: &T) -> Ordering {
    match a.begin().cmp(&b.begin()) {
        Ordering::Equal => b.end().cmp(&a.end()),
        order => order,
    }
}

/// Compare by begin ascending, ties broken by end ascending.
#[inline]
pub fn compare_little_endian<T: Interval>(a: &T, b: &T) -> Ordering {
    match a.begin().cmp(&b.begin()) {
        Ordering::Equal => a.end().cmp(&b.end()),
        order => order,
    }
}

/// Sort intervals by begin position ascending (forward strand order).
pub fn sort_by_begin<T: Interval>(intervals: &mut [T]) {
    intervals.sort_by_key(|i| i.begin());
}

/// Sort intervals by end position descending (reverse strand order).
pub fn sort_by_end_descending<T: Interval>(intervals: &mut [T]) {
    intervals.sort_by(|a, b| b.end().cmp(&a.end()));
}
