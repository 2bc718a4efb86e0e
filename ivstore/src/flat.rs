//! The packed engine: the whole nest structure in contiguous integer arrays.
//!
//! [`FlatNestStore`] produces the same overlap answers as the reference
//! [`NcListStore`](crate::NcListStore) but stores everything in three flat
//! arrays: the sorted intervals themselves, a permutation (`nests`) in which
//! every parent's children occupy one contiguous binary-searchable block,
//! and the offset/length bookkeeping for those blocks. Two virtual nodes are
//! reserved past the end of the interval range: `root`, holding the
//! top-level nested subtrees, and `unnested`, holding top-level intervals
//! with nothing beneath them so the common shallow case skips the tree walk.
//!
//! Incremental mutation is buffered: adds that cannot extend the sorted
//! tail go to a stash threaded by per-gap insertion chains, removes flip a
//! bit in a deletion bitmap, and the next index-dependent read runs one
//! finalisation pass that merges, compacts, re-sorts as needed, and rebuilds
//! the nest arrays.

use log::warn;

use ivstore_core::{Interval, SortOrder, CONTAINMENT_UNKNOWN, NOT_CONTAINED};

use crate::search::{
    binary_identity_search, compare_range, first_end_not_before_by, DeletionBits,
};
use crate::traits::{containment_stats, IntervalStore};

/// Where an incoming interval should go, relative to the sorted array and
/// any pending insertion chains.
enum Slot {
    /// An equal interval exists and duplicates are disallowed.
    Duplicate,
    /// Sorts after everything stored: extend the sorted tail directly.
    Append,
    /// Becomes the new head of the insertion chain at this gap.
    Gap(usize),
    /// Links into a chain behind the given stash entry.
    AfterStash(usize),
}

/// Child-parent test used for the nest assignment. The strict inequality on
/// at least one endpoint stops equal-coordinate runs from stacking into
/// arbitrarily deep chains.
#[inline]
fn is_nested(child_begin: i32, child_end: i32, parent_begin: i32, parent_end: i32) -> bool {
    parent_begin <= child_begin && parent_end > child_end
        || parent_begin < child_begin && parent_end == child_end
}

/// The packed interval store.
#[derive(Debug, Clone)]
pub struct FlatNestStore<T> {
    /// Canonical storage; sorted under `order` whenever `sorted` is true.
    intervals: Vec<T>,
    order: SortOrder,
    presort: bool,
    sorted: bool,
    /// True when a mutation has outdated the nest arrays.
    tainted: bool,

    min_start: i32,
    max_start: i32,
    max_end: i32,

    /// Pending adds, linked into per-gap chains sorted descending.
    stash: Vec<T>,
    /// Chain heads per gap (gap k = before `intervals[k]`), 1-based stash
    /// links with `CONTAINMENT_UNKNOWN` as the empty link.
    head: Vec<i32>,
    /// Chain tails, parallel to `stash`, same encoding.
    next: Vec<i32>,

    /// Pending removals by sorted index.
    deleted: DeletionBits,
    n_deleted: usize,

    /// Permutation of interval indexes grouping every nest contiguously.
    nests: Vec<u32>,
    /// Block start per nest position, plus the two virtual nodes.
    nest_offsets: Vec<u32>,
    /// Block length per nest position, plus the two virtual nodes.
    nest_lengths: Vec<u32>,
    root: usize,
    unnested: usize,
}

impl<T: Interval + Clone> Default for FlatNestStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Interval + Clone> FlatNestStore<T> {
    /// An empty big-endian store.
    pub fn new() -> Self {
        Self::with_order(SortOrder::BigEndian)
    }

    /// An empty store with the given tie-break order.
    pub fn with_order(order: SortOrder) -> Self {
        FlatNestStore {
            intervals: Vec::new(),
            order,
            presort: true,
            sorted: true,
            tainted: true,
            min_start: i32::MAX,
            max_start: i32::MIN,
            max_end: i32::MAX,
            stash: Vec::new(),
            head: Vec::new(),
            next: Vec::new(),
            deleted: DeletionBits::new(),
            n_deleted: 0,
            nests: Vec::new(),
            nest_offsets: Vec::new(),
            nest_lengths: Vec::new(),
            root: 0,
            unnested: 0,
        }
    }

    /// A store seeded with intervals. With `presort` the input is sorted and
    /// indexed immediately; without it every add is a plain append and the
    /// first index-dependent read pays for one full sort.
    pub fn from_intervals(intervals: Vec<T>, order: SortOrder, presort: bool) -> Self {
        let mut store = Self::with_order(order);
        store.presort = presort;
        if intervals.is_empty() {
            return store;
        }
        store.intervals = intervals;
        for iv in &store.intervals {
            store.min_start = store.min_start.min(iv.begin());
            store.max_start = store.max_start.max(iv.begin());
        }
        store.sorted = false;
        store.tainted = true;
        if presort {
            store.ensure_finalized();
        }
        store
    }

    /// The i-th interval in the configured order, finalising first.
    pub fn get(&mut self, i: usize) -> Option<&T> {
        self.ensure_finalized();
        self.intervals.get(i)
    }

    fn update_min_max(&mut self) {
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => {
                self.min_start = first.begin();
                self.max_start = last.begin();
            }
            _ => {
                self.min_start = i32::MAX;
                self.max_start = i32::MIN;
            }
        }
    }

    /// Decide where an interval goes. Only called on a sorted store; walks
    /// the pending chain at the landing gap so chains stay sorted and
    /// pending duplicates are caught.
    fn find_slot(&self, interval: &T, allow_duplicates: bool) -> Slot {
        let pos = match binary_identity_search(&self.intervals, interval, self.order, None) {
            Ok(_) if !allow_duplicates => return Slot::Duplicate,
            Ok(i) => i + 1,
            Err(pos) => pos,
        };
        if pos == self.intervals.len() {
            // the tail gap never carries a chain: anything sorting after the
            // last interval extends the array directly
            return Slot::Append;
        }
        if self.stash.is_empty() {
            return Slot::Gap(pos);
        }

        let begin = interval.begin();
        let end = interval.end();
        let mut after = None;
        let mut link = self.head[pos];
        while link != CONTAINMENT_UNKNOWN {
            let sid = (link - 1) as usize;
            let pending = &self.stash[sid];
            match compare_range(pending, begin, end, self.order) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    if !allow_duplicates && pending.equals_interval(interval) {
                        return Slot::Duplicate;
                    }
                    after = Some(sid);
                }
                std::cmp::Ordering::Greater => after = Some(sid),
            }
            link = self.next[sid];
        }
        match after {
            Some(sid) => Slot::AfterStash(sid),
            None => Slot::Gap(pos),
        }
    }

    fn stash_at_gap(&mut self, gap: usize, interval: T) {
        if self.head.is_empty() {
            self.head = vec![CONTAINMENT_UNKNOWN; self.intervals.len() + 1];
        }
        self.stash.push(interval);
        self.next.push(self.head[gap]);
        self.head[gap] = self.stash.len() as i32;
    }

    fn stash_after(&mut self, prev: usize, interval: T) {
        self.stash.push(interval);
        self.next.push(self.next[prev]);
        self.next[prev] = self.stash.len() as i32;
    }

    /// Merge the stash back into sorted position in a single pass: each
    /// gap's chain is traversed (it is sorted descending from the head) and
    /// written out reversed, just before the interval it precedes.
    fn finalize_addition(&mut self) {
        if self.stash.is_empty() {
            return;
        }
        let count = self.intervals.len();
        let old = std::mem::take(&mut self.intervals);
        let stash = std::mem::take(&mut self.stash);
        let head = std::mem::take(&mut self.head);
        let next = std::mem::take(&mut self.next);

        let mut slots: Vec<Option<T>> = stash.into_iter().map(Some).collect();
        let mut merged = Vec::with_capacity(count + slots.len());
        let mut chain = Vec::new();
        for (gap, iv) in old.into_iter().enumerate() {
            drain_chain(gap, &head, &next, &mut slots, &mut chain, &mut merged);
            merged.push(iv);
        }
        drain_chain(count, &head, &next, &mut slots, &mut chain, &mut merged);

        self.intervals = merged;
        self.update_min_max();
    }

    /// Compact the array over the deletion bitmap, reclaiming flagged slots.
    fn finalize_deletion(&mut self) {
        if self.n_deleted == 0 {
            return;
        }
        let deleted = std::mem::take(&mut self.deleted);
        let mut index = 0;
        self.intervals.retain(|_| {
            let keep = !deleted.get(index);
            index += 1;
            keep
        });
        self.deleted = deleted;
        self.deleted.clear_all();
        self.n_deleted = 0;
    }

    /// Drain whichever mutation buffer is pending, or re-sort outright.
    fn sort_now(&mut self) {
        if !self.stash.is_empty() {
            self.finalize_addition();
        } else if self.n_deleted > 0 {
            self.finalize_deletion();
        } else {
            let order = self.order;
            self.intervals.sort_by(|a, b| order.compare(a, b));
        }
        self.update_min_max();
        self.sorted = true;
    }

    /// Ensure all addition, deletion, and sorting has been applied and the
    /// nest arrays reflect the current intervals.
    fn ensure_finalized(&mut self) {
        if self.tainted {
            if !self.sorted || !self.stash.is_empty() || self.n_deleted > 0 {
                self.sort_now();
            }
            if !self.intervals.is_empty() {
                self.create_arrays();
            }
            self.tainted = false;
        }
    }

    /// Rebuild `nests`, `nest_offsets`, and `nest_lengths` from the sorted
    /// array.
    ///
    /// Phase one assigns every interval its container: the nearest previous
    /// interval (walking the container chain monotonically upward) that
    /// nests it, or one of the two virtual nodes. Phase two allocates each
    /// container's contiguous block from its child count, then writes every
    /// interval into its container's next free slot.
    fn create_arrays(&mut self) {
        let count = self.intervals.len();
        let len = count + 2;
        self.root = count;
        self.unnested = count + 1;

        self.nests.clear();
        self.nests.resize(count, 0);
        self.nest_offsets.clear();
        self.nest_offsets.resize(len, 0);
        self.nest_lengths.clear();
        self.nest_lengths.resize(len, 0);

        let root = self.root as i32;
        let unnested = self.unnested as i32;
        let mut container = vec![NOT_CONTAINED; count];
        let mut counts = vec![0u32; len];

        container[0] = unnested;
        counts[self.unnested] = 1;

        // memories for the previous unnested interval and the previous
        // nested-level index
        let mut begin_last2 = self.intervals[0].begin();
        let mut end_last2 = self.intervals[0].end();
        let mut pt_last_not2 = root;

        self.max_end = self.intervals[0].end();

        for i in 1..count {
            let begin = self.intervals[i].begin();
            let end = self.intervals[i].end();
            self.max_end = self.max_end.max(end);

            let mut pt = i as i32 - 1;
            container[i] = unnested;

            let mut nested = is_nested(begin, end, begin_last2, end_last2);
            if nested {
                // inside the last unnested interval: the last nested-level
                // interval (or the root, for a fresh subtree) is the
                // candidate parent, while the unnested interval itself
                // stays in the shallow block
                pt = pt_last_not2;
                nested = pt == root
                    || is_nested(
                        begin,
                        end,
                        self.intervals[pt as usize].begin(),
                        self.intervals[pt as usize].end(),
                    );
                if !nested {
                    container[i] = root;
                }
            }

            if nested {
                container[i] = pt;
            } else {
                // walk up the container chain for the nearest enclosing
                // ancestor
                loop {
                    pt = container[pt as usize];
                    if pt >= root {
                        break;
                    }
                    if is_nested(
                        begin,
                        end,
                        self.intervals[pt as usize].begin(),
                        self.intervals[pt as usize].end(),
                    ) {
                        container[i] = pt;
                        break;
                    }
                }
            }

            counts[container[i] as usize] += 1;
            if container[i] == unnested {
                begin_last2 = begin;
                end_last2 = end;
            } else {
                pt_last_not2 = i as i32;
            }
        }

        // phase two: the unnested block leads, the root block follows it,
        // and every container's block is carved out the first time one of
        // its children is written
        let mut start_pt = vec![0usize; len];
        start_pt[self.root] = self.root;
        start_pt[self.unnested] = self.unnested;
        self.nest_offsets[self.root] = counts[self.unnested];
        let mut next_start = (counts[self.root] + counts[self.unnested]) as usize;

        for i in 0..count {
            let owner = start_pt[container[i] as usize];
            let p = (self.nest_offsets[owner] + self.nest_lengths[owner]) as usize;
            self.nest_lengths[owner] += 1;
            self.nests[p] = i as u32;
            if counts[i] > 0 {
                start_pt[i] = p;
                self.nest_offsets[p] = next_start as u32;
                next_start += counts[i] as usize;
            }
        }
    }

    /// The shallow path: one binary search over the unnested block, then a
    /// forward scan.
    fn search_unnested(&self, from: i32, to: i32, result: &mut Vec<T>) {
        let start = self.nest_offsets[self.unnested] as usize;
        let end = start + self.nest_lengths[self.unnested] as usize;
        let block = &self.nests[start..end];
        for &ix in &block[first_end_not_before_by(block, &self.intervals, from)..] {
            let iv = &self.intervals[ix as usize];
            if iv.begin() > to {
                break;
            }
            result.push(iv.clone());
        }
    }

    /// The main search over one nest's contiguous block, recursing into any
    /// hit that is itself a container.
    fn search_nest(&self, nest: usize, from: i32, to: i32, result: &mut Vec<T>) {
        let start = self.nest_offsets[nest] as usize;
        let n = self.nest_lengths[nest] as usize;
        let end = start + n;
        let first = &self.intervals[self.nests[start] as usize];
        let last = &self.intervals[self.nests[end - 1] as usize];

        if last.end() < from || first.begin() > to {
            return;
        }
        let mut pt = match n {
            1 => start,
            // two entries and the block wasn't rejected: the answer starts
            // at whichever of them reaches the query
            2 => {
                if first.end() >= from {
                    start
                } else {
                    end - 1
                }
            }
            _ => start + first_end_not_before_by(&self.nests[start..end], &self.intervals, from),
        };
        while pt < end {
            let iv = &self.intervals[self.nests[pt] as usize];
            if iv.begin() > to {
                break;
            }
            result.push(iv.clone());
            if self.nest_lengths[pt] > 0 {
                self.search_nest(pt, from, to, result);
            }
            pt += 1;
        }
    }

    /// The stored intervals as an indented nest dump.
    pub fn pretty_print(&mut self) -> String {
        self.ensure_finalized();
        let mut out = String::new();
        if self.intervals.is_empty() {
            return out;
        }
        out.push_str("unnested:\n");
        self.dump(self.unnested, &mut out, 1);
        out.push_str("nested:\n");
        self.dump(self.root, &mut out, 1);
        out
    }

    fn dump(&self, nest: usize, out: &mut String, depth: usize) {
        let start = self.nest_offsets[nest] as usize;
        let end = start + self.nest_lengths[nest] as usize;
        for pt in start..end {
            let iv = &self.intervals[self.nests[pt] as usize];
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{}-{}\n", iv.begin(), iv.end()));
            if self.nest_lengths[pt] > 0 {
                self.dump(pt, out, depth + 1);
            }
        }
    }
}

/// Append one gap's pending chain in ascending order (the chain is kept
/// descending from its head).
fn drain_chain<T>(
    gap: usize,
    head: &[i32],
    next: &[i32],
    slots: &mut [Option<T>],
    chain: &mut Vec<usize>,
    out: &mut Vec<T>,
) {
    chain.clear();
    let mut link = head[gap];
    while link != CONTAINMENT_UNKNOWN {
        let sid = (link - 1) as usize;
        chain.push(sid);
        link = next[sid];
    }
    for &sid in chain.iter().rev() {
        out.push(slots[sid].take().unwrap());
    }
}

impl<T: Interval + Clone> IntervalStore<T> for FlatNestStore<T> {
    fn build(intervals: Vec<T>) -> Self {
        Self::from_intervals(intervals, SortOrder::BigEndian, true)
    }

    fn add_checked(&mut self, interval: T, allow_duplicates: bool) -> bool {
        if self.n_deleted > 0 {
            self.finalize_deletion();
        }
        self.tainted = true;

        let begin = interval.begin();
        if self.presort && self.sorted {
            match self.find_slot(&interval, allow_duplicates) {
                Slot::Duplicate => return false,
                Slot::Append => {
                    self.intervals.push(interval);
                    if !self.head.is_empty() {
                        self.head.push(CONTAINMENT_UNKNOWN);
                    }
                }
                Slot::Gap(gap) => self.stash_at_gap(gap, interval),
                Slot::AfterStash(prev) => self.stash_after(prev, interval),
            }
        } else {
            if !allow_duplicates
                && self.intervals.iter().any(|iv| iv.equals_interval(&interval))
            {
                return false;
            }
            self.sorted = false;
            self.intervals.push(interval);
        }

        self.min_start = self.min_start.min(begin);
        self.max_start = self.max_start.max(begin);
        true
    }

    fn remove(&mut self, entry: &T) -> bool {
        if self.intervals.is_empty() && self.stash.is_empty() {
            return false;
        }
        if !self.sorted || !self.stash.is_empty() {
            self.sort_now();
        }
        match binary_identity_search(&self.intervals, entry, self.order, Some(&self.deleted)) {
            Ok(i) => {
                if self.n_deleted == 0 {
                    self.deleted.clear_all();
                }
                self.deleted.set(i);
                self.n_deleted += 1;
                self.tainted = true;
                true
            }
            Err(_) => false,
        }
    }

    fn contains(&self, entry: &T) -> bool {
        if self.sorted {
            let ignore = (self.n_deleted > 0).then_some(&self.deleted);
            if binary_identity_search(&self.intervals, entry, self.order, ignore).is_ok() {
                return true;
            }
            self.stash.iter().any(|iv| iv.equals_interval(entry))
        } else {
            self.intervals.iter().any(|iv| iv.equals_interval(entry))
        }
    }

    fn len(&self) -> usize {
        self.intervals.len() + self.stash.len() - self.n_deleted
    }

    fn clear(&mut self) {
        self.intervals.clear();
        self.stash.clear();
        self.head.clear();
        self.next.clear();
        self.deleted.clear_all();
        self.n_deleted = 0;
        self.nests.clear();
        self.nest_offsets.clear();
        self.nest_lengths.clear();
        self.sorted = true;
        self.tainted = true;
        self.min_start = i32::MAX;
        self.max_start = i32::MIN;
        self.max_end = i32::MAX;
    }

    fn find_overlaps_into(&mut self, from: i32, to: i32, result: &mut Vec<T>) {
        if self.n_deleted == 0 {
            match self.intervals.len() + self.stash.len() {
                0 => return,
                1 => {
                    let iv = self.intervals.first().or_else(|| self.stash.first()).unwrap();
                    if iv.overlaps_range(from, to) {
                        result.push(iv.clone());
                    }
                    return;
                }
                _ => {}
            }
        }

        self.ensure_finalized();
        if self.intervals.is_empty() || from > self.max_end || to < self.min_start {
            return;
        }
        if self.nest_lengths[self.unnested] > 0 {
            self.search_unnested(from, to, result);
        }
        if self.nest_lengths[self.root] > 0 {
            self.search_nest(self.root, from, to, result);
        }
    }

    fn depth(&mut self) -> usize {
        self.ensure_finalized();
        containment_stats(self.intervals.iter()).depth
    }

    fn width(&mut self) -> usize {
        self.ensure_finalized();
        containment_stats(self.intervals.iter()).width
    }

    fn is_valid(&mut self) -> bool {
        self.ensure_finalized();
        let count = self.intervals.len();
        if count == 0 {
            return true;
        }

        let mut seen = vec![false; count];
        for &ix in &self.nests {
            if seen[ix as usize] {
                warn!("nest permutation repeats index {}", ix);
                return false;
            }
            seen[ix as usize] = true;
        }
        let total: u32 = self.nest_lengths.iter().sum();
        if total as usize != count {
            warn!("nest lengths sum to {} for {} intervals", total, count);
            return false;
        }

        for nest in (0..count).chain([self.root, self.unnested]) {
            let n = self.nest_lengths[nest] as usize;
            if n == 0 {
                continue;
            }
            let start = self.nest_offsets[nest] as usize;
            let block = &self.nests[start..start + n];
            for pair in block.windows(2) {
                if self.intervals[pair[1] as usize].begin()
                    < self.intervals[pair[0] as usize].begin()
                {
                    warn!("nest {} is not ordered by begin", nest);
                    return false;
                }
            }
            if nest < count {
                let parent = &self.intervals[self.nests[nest] as usize];
                for &child in block {
                    if !parent.contains_interval(&self.intervals[child as usize]) {
                        warn!(
                            "nest {}-{} does not contain child {}-{}",
                            parent.begin(),
                            parent.end(),
                            self.intervals[child as usize].begin(),
                            self.intervals[child as usize].end()
                        );
                        return false;
                    }
                }
            }
        }
        true
    }

    fn revalidate(&mut self) -> bool {
        if !self.stash.is_empty() {
            self.finalize_addition();
        }
        if self.n_deleted > 0 {
            self.finalize_deletion();
        }
        self.sorted = false;
        self.tainted = true;
        self.ensure_finalized();
        true
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a T> + 'a> {
        let deleted = &self.deleted;
        let skip = self.n_deleted > 0;
        Box::new(
            self.intervals
                .iter()
                .enumerate()
                .filter(move |(i, _)| !skip || !deleted.get(*i))
                .map(|(_, iv)| iv)
                .chain(self.stash.iter()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ivstore_core::{Feature, Span};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn sorted_spans(mut result: Vec<Span>) -> Vec<Span> {
        result.sort_by(ivstore_core::compare_big_endian);
        result
    }

    #[fixture]
    fn mixed_spans() -> Vec<Span> {
        // co-located, overlapping, and nested
        vec![
            Span::new(40, 40),
            Span::new(22, 28),
            Span::new(10, 20),
            Span::new(10, 21),
            Span::new(20, 30),
            Span::new(24, 26),
            Span::new(15, 22),
            Span::new(10, 20),
            Span::new(22, 28),
            Span::new(40, 40),
        ]
    }

    #[rstest]
    fn test_build_sorts_and_indexes(mixed_spans: Vec<Span>) {
        let mut store = FlatNestStore::build(mixed_spans);

        assert_eq!(store.len(), 10);
        assert!(store.is_valid());
        assert_eq!(store.get(0), Some(&Span::new(10, 21)));
        assert_eq!(store.get(1), Some(&Span::new(10, 20)));
        assert_eq!(store.get(9), Some(&Span::new(40, 40)));
        assert_eq!(store.get(10), None);
    }

    #[rstest]
    fn test_find_overlaps(mixed_spans: Vec<Span>) {
        let mut store = FlatNestStore::build(mixed_spans);

        assert_eq!(
            sorted_spans(store.find_overlaps(21, 23)),
            vec![
                Span::new(10, 21),
                Span::new(15, 22),
                Span::new(20, 30),
                Span::new(22, 28),
                Span::new(22, 28),
            ]
        );
        assert_eq!(
            sorted_spans(store.find_overlaps(29, 35)),
            vec![Span::new(20, 30)]
        );
        assert_eq!(
            sorted_spans(store.find_overlaps(40, 40)),
            vec![Span::new(40, 40), Span::new(40, 40)]
        );
        assert!(store.find_overlaps(41, 100).is_empty());
        assert!(store.find_overlaps(-10, 9).is_empty());
    }

    #[test]
    fn test_incremental_add_keeps_order() {
        let mut store: FlatNestStore<Span> = FlatNestStore::new();

        assert!(store.add(Span::new(10, 50)));
        assert!(store.add(Span::new(10, 40)));
        assert!(store.add(Span::new(20, 30)));
        // out-of-tail adds land in the stash until the next query
        assert!(store.add(Span::new(15, 25)));
        assert!(store.add(Span::new(12, 13)));
        assert_eq!(store.len(), 5);

        let hits = store.find_overlaps(14, 22);
        assert_eq!(
            sorted_spans(hits),
            vec![
                Span::new(10, 50),
                Span::new(10, 40),
                Span::new(15, 25),
                Span::new(20, 30),
            ]
        );

        // the merged array is fully sorted
        let flat: Vec<Span> = store.iter().cloned().collect();
        assert_eq!(
            flat,
            vec![
                Span::new(10, 50),
                Span::new(10, 40),
                Span::new(12, 13),
                Span::new(15, 25),
                Span::new(20, 30),
            ]
        );
        assert!(store.is_valid());
    }

    #[test]
    fn test_duplicate_checking_sees_pending_adds() {
        let mut store: FlatNestStore<Feature> = FlatNestStore::new();

        assert!(store.add_checked(Feature::new(10, 50, "a"), false));
        assert!(store.add_checked(Feature::new(12, 20, "b"), false));
        // pending in the stash, not yet merged
        assert!(store.add_checked(Feature::new(11, 30, "c"), false));

        assert!(!store.add_checked(Feature::new(11, 30, "c"), false));
        assert!(!store.add_checked(Feature::new(10, 50, "a"), false));
        assert!(store.add_checked(Feature::new(11, 30, "c2"), false));
        assert_eq!(store.len(), 4);
        assert!(store.contains(&Feature::new(11, 30, "c")));
    }

    #[test]
    fn test_remove_uses_deletion_bitmap() {
        let mut store = FlatNestStore::build(vec![
            Span::new(10, 20),
            Span::new(12, 14),
            Span::new(30, 40),
        ]);

        assert!(store.remove(&Span::new(10, 20)));
        assert!(!store.remove(&Span::new(10, 20)));
        assert_eq!(store.len(), 2);

        // pending delete is visible before finalisation
        assert!(!store.contains(&Span::new(10, 20)));
        assert!(store.contains(&Span::new(12, 14)));
        assert_eq!(store.iter().count(), 2);

        assert_eq!(
            sorted_spans(store.find_overlaps(0, 100)),
            vec![Span::new(12, 14), Span::new(30, 40)]
        );
        assert_eq!(store.depth(), 1);
        assert!(store.is_valid());
    }

    #[test]
    fn test_insert_then_remove_round_trip() {
        let seed = vec![Span::new(10, 20), Span::new(15, 25), Span::new(30, 40)];
        let mut store = FlatNestStore::build(seed.clone());
        let before = sorted_spans(store.find_overlaps(0, 100));

        assert!(store.add(Span::new(15, 25)));
        assert!(store.remove(&Span::new(15, 25)));

        assert_eq!(store.len(), seed.len());
        assert_eq!(sorted_spans(store.find_overlaps(0, 100)), before);
    }

    #[test]
    fn test_unsorted_mode_defers_everything() {
        let mut store = FlatNestStore::from_intervals(
            vec![Span::new(30, 40), Span::new(10, 20), Span::new(12, 14)],
            SortOrder::BigEndian,
            false,
        );
        store.add(Span::new(35, 36));
        assert_eq!(store.len(), 4);

        assert_eq!(
            sorted_spans(store.find_overlaps(11, 13)),
            vec![Span::new(10, 20), Span::new(12, 14)]
        );
        assert_eq!(store.get(0), Some(&Span::new(10, 20)));
        assert!(store.is_valid());
    }

    #[test]
    fn test_little_endian_order() {
        let mut store = FlatNestStore::from_intervals(
            vec![Span::new(10, 100), Span::new(10, 80), Span::new(10, 90)],
            SortOrder::LittleEndian,
            true,
        );

        assert_eq!(store.get(0), Some(&Span::new(10, 80)));
        assert_eq!(store.get(2), Some(&Span::new(10, 100)));
        assert_eq!(store.find_overlaps(85, 95).len(), 2);
    }

    #[test]
    fn test_depth_and_width() {
        let mut store = FlatNestStore::build(vec![
            Span::new(10, 20),
            Span::new(15, 25),
            Span::new(30, 40),
            Span::new(32, 38),
            Span::new(33, 35),
            Span::new(34, 37),
            Span::new(35, 36),
        ]);

        assert_eq!(store.depth(), 4);
        assert_eq!(store.width(), 3);

        assert!(store.remove(&Span::new(34, 37)));
        assert_eq!(store.depth(), 3);
        assert!(store.remove(&Span::new(33, 35)));
        assert_eq!(store.depth(), 3);
        assert!(store.remove(&Span::new(32, 38)));
        assert_eq!(store.depth(), 2);
    }

    #[test]
    fn test_empty_and_single() {
        let mut store: FlatNestStore<Span> = FlatNestStore::new();
        assert!(store.is_empty());
        assert!(store.find_overlaps(i32::MIN, i32::MAX).is_empty());
        assert_eq!(store.depth(), 0);
        assert_eq!(store.width(), 0);

        store.add(Span::new(5, 5));
        assert_eq!(store.find_overlaps(5, 5), vec![Span::new(5, 5)]);
        assert_eq!(store.find_overlaps(-1, 6), vec![Span::new(5, 5)]);
        assert!(store.find_overlaps(-1, 4).is_empty());
        assert!(store.find_overlaps(6, 6).is_empty());
        assert_eq!(store.depth(), 1);

        store.clear();
        assert!(store.is_empty());
        assert!(store.find_overlaps(0, 10).is_empty());
    }

    #[test]
    fn test_revalidate_after_coordinate_mutation() {
        let mut store = FlatNestStore::build(vec![Span::new(10, 20), Span::new(12, 14)]);
        assert_eq!(store.find_overlaps(15, 18), vec![Span::new(10, 20)]);

        // coordinates mutated externally: rebuild on demand
        let rebuilt: Vec<Span> = store
            .iter()
            .map(|iv| {
                if iv.equals_interval(&Span::new(12, 14)) {
                    Span::new(12, 44)
                } else {
                    *iv
                }
            })
            .collect();
        let mut store = FlatNestStore::from_intervals(rebuilt, SortOrder::BigEndian, true);
        assert!(store.revalidate());
        assert!(store.revalidate());
        assert_eq!(
            sorted_spans(store.find_overlaps(30, 50)),
            vec![Span::new(12, 44)]
        );
        assert!(store.is_valid());
    }

    #[rstest]
    fn test_pretty_print_shows_nesting(mixed_spans: Vec<Span>) {
        let mut store = FlatNestStore::build(mixed_spans);
        let dump = store.pretty_print();
        assert!(dump.contains("unnested:"));
        assert!(dump.contains("nested:"));
        assert!(dump.contains("24-26"));
    }
}
