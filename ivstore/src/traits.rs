use std::cmp::Ordering;

use ivstore_core::Interval;

/// The operations every interval store engine provides.
///
/// Implementors keep a multiset of intervals (duplicates under
/// [`equals_interval`](Interval::equals_interval) are allowed unless the
/// caller asks otherwise) and answer inclusive overlap queries against it.
///
/// Reads that depend on the secondary index (`find_overlaps`, `depth`,
/// `width`, `is_valid`) take `&mut self`: an engine is free to defer index
/// maintenance after mutations and catch up on the next such read.
/// Membership checks and iteration stay `&self` and tolerate any pending
/// buffered mutation.
pub trait IntervalStore<T: Interval + Clone> {
    /// Builds a store seeded with the given intervals. The input order does
    /// not matter; the store sorts during construction.
    fn build(intervals: Vec<T>) -> Self
    where
        Self: Sized;

    /// Adds one interval, allowing duplicates. Answers whether the interval
    /// was added.
    fn add(&mut self, interval: T) -> bool {
        self.add_checked(interval, true)
    }

    /// Adds one interval, optionally rejecting it when an equal interval
    /// (by [`equals_interval`](Interval::equals_interval)) is already
    /// stored. Answers whether the interval was added.
    fn add_checked(&mut self, interval: T, allow_duplicates: bool) -> bool;

    /// Removes the first stored interval equal to `entry`. Answers whether
    /// anything was removed; a missing entry is not an error.
    fn remove(&mut self, entry: &T) -> bool;

    /// Answers true if some stored interval equals `entry`.
    fn contains(&self, entry: &T) -> bool;

    /// The number of stored intervals, counting pending additions and
    /// discounting pending deletions.
    fn len(&self) -> usize;

    /// Answers true if the store holds no intervals.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every interval and resets the secondary index.
    fn clear(&mut self);

    /// Collects every stored interval overlapping the closed range
    /// `[from, to]` into a fresh vector. Order is engine-specific but
    /// deterministic for a fixed store content and query.
    fn find_overlaps(&mut self, from: i32, to: i32) -> Vec<T> {
        let mut result = Vec::new();
        self.find_overlaps_into(from, to, &mut result);
        result
    }

    /// As [`find_overlaps`](IntervalStore::find_overlaps), appending into a
    /// caller-provided buffer.
    fn find_overlaps_into(&mut self, from: i32, to: i32, result: &mut Vec<T>);

    /// The maximum proper-containment chain length: 0 for an empty store,
    /// 1 when no stored interval properly contains another.
    fn depth(&mut self) -> usize;

    /// The number of top-level intervals, those not properly contained by
    /// any other stored interval.
    fn width(&mut self) -> usize;

    /// Answers true if the engine's structural invariants hold. A false
    /// answer indicates an engine bug, not caller misuse.
    fn is_valid(&mut self) -> bool;

    /// Forces any deferred work and rebuilds the secondary index from the
    /// current intervals. Required after mutating a stored payload's
    /// coordinates in place. Idempotent.
    fn revalidate(&mut self) -> bool;

    /// Iterates the stored intervals in no guaranteed order. The iterator
    /// does not support removal.
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a T> + 'a>;
}

pub(crate) struct ContainmentStats {
    pub depth: usize,
    pub width: usize,
}

/// Sweep the intervals in big-endian order with a containment stack:
/// containers precede their contents, so the stack height at each interval
/// is the length of its proper-containment chain, and an interval arriving
/// at an empty stack is top-level.
pub(crate) fn containment_stats<'a, T, I>(intervals: I) -> ContainmentStats
where
    T: Interval + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut spans: Vec<(i32, i32)> = intervals.map(|iv| (iv.begin(), iv.end())).collect();
    spans.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => b.1.cmp(&a.1),
        unequal => unequal,
    });

    let mut stack: Vec<(i32, i32)> = Vec::new();
    let mut depth = 0;
    let mut width = 0;
    for (begin, end) in spans {
        while let Some(&(pb, pe)) = stack.last() {
            let properly = pb <= begin && pe >= end && (begin > pb || end < pe);
            if properly {
                break;
            }
            stack.pop();
        }
        if stack.is_empty() {
            width += 1;
        }
        stack.push((begin, end));
        depth = depth.max(stack.len());
    }
    ContainmentStats { depth, width }
}
