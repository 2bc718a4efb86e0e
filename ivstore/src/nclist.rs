//! The reference engine: a Nested Containment List beneath a flat top level.
//!
//! An adapted implementation of NCList as described in the paper
//!
//! > Nested Containment List (NCList): a new algorithm for accelerating
//! > interval query of genome alignment and interval databases
//! > - Alexander V. Alekseyenko, Christopher J. Lee
//! > <https://doi.org/10.1093/bioinformatics/btl647>
//!
//! [`NcListStore`] keeps the common shallow case fast by holding top-level,
//! mutually non-containing intervals in a plain sorted vector and pushing
//! only properly-contained intervals down into the recursive [`NcList`].

use std::fmt::{self, Display};

use log::warn;

use ivstore_core::{compare_big_endian, Interval};

use crate::search::{first_end_not_before, last_begin_not_after};
use crate::traits::{containment_stats, IntervalStore};

/// One node of the containment tree: a root interval plus the list of
/// interval groups nested inside it.
#[derive(Debug, Clone)]
pub struct NcNode<T> {
    region: T,
    subregions: Option<NcList<T>>,
}

impl<T: Interval + Clone> NcNode<T> {
    fn new(region: T) -> Self {
        NcNode {
            region,
            subregions: None,
        }
    }

    /// Builds a node from a sorted run whose first element contains every
    /// following element.
    fn from_sorted(chunk: Vec<T>) -> Self {
        let mut items = chunk.into_iter();
        let region = items.next().unwrap();
        let rest: Vec<T> = items.collect();
        NcNode {
            region,
            subregions: (!rest.is_empty()).then(|| NcList::from_sorted(rest)),
        }
    }

    /// The root interval held by this node.
    pub fn region(&self) -> &T {
        &self.region
    }

    #[inline]
    fn begin(&self) -> i32 {
        self.region.begin()
    }

    #[inline]
    fn end(&self) -> i32 {
        self.region.end()
    }

    /// The number of intervals in this node's subtree, root included.
    pub fn size(&self) -> usize {
        1 + self.subregions.as_ref().map_or(0, |s| s.size())
    }

    fn add_node(&mut self, node: NcNode<T>) {
        match &mut self.subregions {
            Some(sub) => sub.add_node(node),
            None => {
                let mut sub = NcList::new();
                sub.add_node(node);
                self.subregions = Some(sub);
            }
        }
    }

    fn find_overlaps(&self, from: i32, to: i32, result: &mut Vec<T>) {
        if self.region.overlaps_range(from, to) {
            result.push(self.region.clone());
        }
        if let Some(sub) = &self.subregions {
            sub.find_overlaps_into(from, to, result);
        }
    }

    fn contains_entry(&self, entry: &T) -> bool {
        self.region.equals_interval(entry)
            || self.subregions.as_ref().is_some_and(|s| s.contains(entry))
    }

    fn remove(&mut self, entry: &T) -> bool {
        let removed = match &mut self.subregions {
            Some(sub) => sub.remove(entry),
            None => false,
        };
        if removed && self.subregions.as_ref().is_some_and(|s| s.is_empty()) {
            self.subregions = None;
        }
        removed
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a T>) {
        out.push(&self.region);
        if let Some(sub) = &self.subregions {
            sub.collect_refs(out);
        }
    }

    fn is_valid(&self) -> bool {
        match &self.subregions {
            Some(sub) => sub.is_valid_within(self.begin(), self.end()),
            None => true,
        }
    }

    fn pretty_print(&self, out: &mut String, indent: usize) {
        out.push_str(&" ".repeat(indent));
        out.push_str(&format!("{}-{}\n", self.begin(), self.end()));
        if let Some(sub) = &self.subregions {
            sub.pretty_print(out, indent + 2);
        }
    }
}

impl<T: Interval> Display for NcNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.region.begin(), self.region.end())?;
        if let Some(sub) = &self.subregions {
            write!(f, " {}", sub)?;
        }
        Ok(())
    }
}

/// A list, in start-position order, of sibling nodes whose subtrees hold
/// mutually non-containing root intervals.
#[derive(Debug, Clone)]
pub struct NcList<T> {
    /// The number of interval instances represented, across all levels.
    size: usize,
    subranges: Vec<NcNode<T>>,
}

impl<T> Default for NcList<T> {
    fn default() -> Self {
        NcList {
            size: 0,
            subranges: Vec::new(),
        }
    }
}

/// Partition a sorted slice into maximal subranges `(lo, hi)` such that
/// `items[lo]` properly contains every following item of its subrange.
fn partition_sorted<T: Interval>(items: &[T]) -> Vec<(usize, usize)> {
    let mut sublists = Vec::new();
    if items.is_empty() {
        return sublists;
    }
    let mut list_start = 0;
    let mut last_parent = 0;
    for i in 1..items.len() {
        if !items[last_parent].properly_contains_interval(&items[i]) {
            sublists.push((list_start, i - 1));
            list_start = i;
            last_parent = i;
        }
    }
    sublists.push((list_start, items.len() - 1));
    sublists
}

impl<T: Interval + Clone> NcList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an NCList from intervals in any order.
    pub fn build(mut items: Vec<T>) -> Self {
        items.sort_by(compare_big_endian);
        Self::from_sorted(items)
    }

    /// Builds from a big-endian-sorted vector, so that a container always
    /// precedes its contents.
    fn from_sorted(mut items: Vec<T>) -> Self {
        let size = items.len();
        let bounds = partition_sorted(&items);
        let mut subranges = Vec::with_capacity(bounds.len());
        for &(lo, _) in bounds.iter().rev() {
            subranges.push(NcNode::from_sorted(items.split_off(lo)));
        }
        subranges.reverse();
        NcList { size, subranges }
    }

    /// The number of intervals stored, across all levels.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Adds one interval.
    pub fn add(&mut self, entry: T) {
        self.add_node(NcNode::new(entry));
    }

    /// The first sibling whose end does not precede `from`.
    fn find_first_overlap(&self, from: i32) -> usize {
        self.subranges.partition_point(|n| n.end() < from)
    }

    /// Adds one node at the correct place in the tree.
    ///
    /// Cases, relative to the current sibling level:
    /// 1. precedes all subranges - prepend
    /// 2. follows all subranges - append
    /// 3. matches a subrange's coordinates - insert adjacent
    /// 4. properly enclosed by a subrange - recurse into it
    /// 5. properly encloses one or more subranges - push them inside it
    /// 6. spans two subranges without enclosing either - insert between them
    fn add_node(&mut self, node: NcNode<T>) {
        let start = node.begin();
        let end = node.end();
        self.size += node.size();

        let mut enclosing = false;
        let mut first_enclosed = 0;
        let mut last_enclosed = 0;

        let mut j = self.find_first_overlap(start);
        while j < self.subranges.len() {
            if self.subranges[j].begin() == start && self.subranges[j].end() == end {
                // matching interval - insert adjacent
                self.subranges.insert(j, node);
                return;
            }

            if end < self.subranges[j].begin() && !enclosing {
                // lies between subranges j-1 and j
                self.subranges.insert(j, node);
                return;
            }

            if self.subranges[j]
                .region
                .properly_contains_interval(&node.region)
            {
                self.subranges[j].add_node(node);
                return;
            }

            if start <= self.subranges[j].begin() {
                if end >= self.subranges[j].end() {
                    // encloses this subrange (and possibly preceding ones);
                    // keep scanning for the maximal run it encloses
                    if !enclosing {
                        first_enclosed = j;
                    }
                    last_enclosed = j;
                    enclosing = true;
                    j += 1;
                    continue;
                }
                // spans from before this subrange to inside it
                if enclosing {
                    self.push(node, first_enclosed, last_enclosed);
                } else {
                    self.subranges.insert(j, node);
                }
                return;
            }
            j += 1;
        }

        // drops through when the new range encloses all remaining siblings
        // or follows the last one
        if enclosing {
            self.push(node, first_enclosed, last_enclosed);
        } else {
            self.subranges.push(node);
        }
    }

    /// Replace subranges `first..=last` with `node`, nesting them inside it.
    ///
    /// Panics on invalid containment: every displaced subrange must lie
    /// within the node's range, anything else is an engine bug.
    fn push(&mut self, mut node: NcNode<T>, first: usize, last: usize) {
        for child in self.subranges.drain(first..=last) {
            if !node.region.contains_interval(&child.region) {
                panic!(
                    "invalid containment: can't push {}-{} inside {}-{}",
                    child.begin(),
                    child.end(),
                    node.begin(),
                    node.end()
                );
            }
            node.add_node(child);
        }
        self.subranges.insert(first, node);
    }

    /// Answers true if some stored interval equals `entry`.
    pub fn contains(&self, entry: &T) -> bool {
        let to = entry.end();
        for candidate in &self.subranges[self.find_first_overlap(entry.begin())..] {
            if candidate.begin() > to {
                break;
            }
            if candidate.contains_entry(entry) {
                return true;
            }
        }
        false
    }

    /// Collects every stored interval overlapping `[from, to]`.
    pub fn find_overlaps(&self, from: i32, to: i32) -> Vec<T> {
        let mut result = Vec::new();
        self.find_overlaps_into(from, to, &mut result);
        result
    }

    /// As [`find_overlaps`](NcList::find_overlaps), appending into a
    /// caller-provided buffer.
    pub fn find_overlaps_into(&self, from: i32, to: i32, result: &mut Vec<T>) {
        for candidate in &self.subranges[self.find_first_overlap(from)..] {
            if candidate.begin() > to {
                break;
            }
            candidate.find_overlaps(from, to, result);
        }
    }

    /// Removes the first interval equal to `entry`, promoting any children
    /// of the removed node back into the tree. Answers whether an interval
    /// was removed.
    pub fn remove(&mut self, entry: &T) -> bool {
        let mut i = self.find_first_overlap(entry.begin());
        while i < self.subranges.len() {
            if self.subranges[i].begin() > entry.begin() {
                return false;
            }
            if self.subranges[i].region.equals_interval(entry) {
                let node = self.subranges.remove(i);
                self.size -= node.size();
                if let Some(sub) = node.subregions {
                    for child in sub.subranges {
                        self.add_node(child);
                    }
                }
                return true;
            }
            if self.subranges[i].remove(entry) {
                self.size -= 1;
                return true;
            }
            i += 1;
        }
        false
    }

    /// Answers true if the nesting containment rules are obeyed.
    pub fn is_valid(&self) -> bool {
        let counted: usize = self.subranges.iter().map(NcNode::size).sum();
        if counted != self.size {
            warn!("nclist size {} but counted {}", self.size, counted);
            return false;
        }
        self.is_valid_within(i32::MIN, i32::MAX)
    }

    /// Subranges must lie within `start..=end`, be ordered by begin
    /// ascending, and no sibling may properly contain its neighbour.
    fn is_valid_within(&self, start: i32, end: i32) -> bool {
        let mut last: Option<&NcNode<T>> = None;
        for subrange in &self.subranges {
            if subrange.begin() < start || subrange.end() > end {
                warn!(
                    "nclist range {}-{} outside parent {}-{}",
                    subrange.begin(),
                    subrange.end(),
                    start,
                    end
                );
                return false;
            }
            if let Some(prev) = last {
                if subrange.begin() < prev.begin() {
                    warn!(
                        "nclist range {}-{} starts before {}-{}",
                        subrange.begin(),
                        subrange.end(),
                        prev.begin(),
                        prev.end()
                    );
                    return false;
                }
                if subrange.region.properly_contains_interval(&prev.region)
                    || prev.region.properly_contains_interval(&subrange.region)
                {
                    warn!(
                        "nclist sibling containment between {}-{} and {}-{}",
                        prev.begin(),
                        prev.end(),
                        subrange.begin(),
                        subrange.end()
                    );
                    return false;
                }
            }
            last = Some(subrange);
            if !subrange.is_valid() {
                return false;
            }
        }
        true
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a T>) {
        for subrange in &self.subranges {
            subrange.collect_refs(out);
        }
    }

    fn pretty_print(&self, out: &mut String, indent: usize) {
        for subrange in &self.subranges {
            subrange.pretty_print(out, indent);
        }
    }

    fn clear(&mut self) {
        self.subranges.clear();
        self.size = 0;
    }
}

/// Formats the tree as a bracketed list, e.g.
/// `[1-100 [10-30 [10-20]], 15-30 [20-20]]`.
impl<T: Interval> Display for NcList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, subrange) in self.subranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", subrange)?;
        }
        write!(f, "]")
    }
}

/// The reference interval store.
///
/// Top-level intervals that contain nothing and are contained by nothing at
/// their level live in `non_nested`, sorted by begin; everything else goes
/// to the `nested` NCList. Mutation is applied immediately, there are no
/// deferred buffers in this engine.
#[derive(Debug, Clone, Default)]
pub struct NcListStore<T> {
    non_nested: Vec<T>,
    nested: Option<NcList<T>>,
}

impl<T: Interval + Clone> NcListStore<T> {
    pub fn new() -> Self {
        NcListStore {
            non_nested: Vec::new(),
            nested: None,
        }
    }

    /// Try to place an interval in the top-level list, keeping it free of
    /// mutual containment. Gives the interval back when it must nest.
    fn try_add_non_nested(&mut self, entry: T) -> Option<T> {
        let begin = entry.begin();
        let pos = self.non_nested.partition_point(|iv| iv.begin() < begin);

        if pos > 0 && self.non_nested[pos - 1].properly_contains_interval(&entry) {
            return Some(entry);
        }
        if pos < self.non_nested.len() {
            let following = &self.non_nested[pos];
            if entry.properly_contains_interval(following)
                || following.properly_contains_interval(&entry)
            {
                return Some(entry);
            }
        }

        self.non_nested.insert(pos, entry);
        None
    }

    fn add_nested(&mut self, entry: T) {
        self.nested.get_or_insert_with(NcList::new).add(entry);
    }

    /// Removes from the top-level list only. The list is begin-sorted with
    /// no mutual containment, so ends are non-decreasing too.
    fn remove_non_nested(&mut self, entry: &T) -> bool {
        let from = entry.begin();
        let start = self.non_nested.partition_point(|iv| iv.begin() < from);
        for i in start..self.non_nested.len() {
            if self.non_nested[i].begin() > from {
                break;
            }
            if self.non_nested[i].equals_interval(entry) {
                self.non_nested.remove(i);
                return true;
            }
        }
        false
    }

    fn find_non_nested_overlaps(&self, from: i32, to: i32, result: &mut Vec<T>) {
        let start = first_end_not_before(&self.non_nested, from);
        if let Some(last) = last_begin_not_after(&self.non_nested, to) {
            for iv in &self.non_nested[start..=last] {
                if iv.end() >= from {
                    result.push(iv.clone());
                }
            }
        }
    }

    /// The stored intervals as an indented tree.
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        for iv in &self.non_nested {
            out.push_str(&format!("{}-{}\n", iv.begin(), iv.end()));
        }
        if let Some(nested) = &self.nested {
            nested.pretty_print(&mut out, 2);
        }
        out
    }
}

impl<T: Interval + Clone> IntervalStore<T> for NcListStore<T> {
    /// Builds from intervals in any order: the input is sorted big-endian
    /// and partitioned so each subrange root lands in the top-level list
    /// while its contents go to the NCList.
    fn build(intervals: Vec<T>) -> Self {
        let mut items = intervals;
        items.sort_by(compare_big_endian);

        let bounds = partition_sorted(&items);
        let mut non_nested = Vec::with_capacity(bounds.len());
        let mut nested_items = Vec::new();
        for &(lo, _) in bounds.iter().rev() {
            let chunk = items.split_off(lo);
            let mut chunk = chunk.into_iter();
            non_nested.push(chunk.next().unwrap());
            nested_items.extend(chunk);
        }
        non_nested.reverse();

        NcListStore {
            non_nested,
            nested: (!nested_items.is_empty()).then(|| NcList::build(nested_items)),
        }
    }

    fn add_checked(&mut self, interval: T, allow_duplicates: bool) -> bool {
        if !allow_duplicates && self.contains(&interval) {
            return false;
        }
        if let Some(rejected) = self.try_add_non_nested(interval) {
            self.add_nested(rejected);
        }
        true
    }

    fn remove(&mut self, entry: &T) -> bool {
        if self.remove_non_nested(entry) {
            return true;
        }
        let removed = self.nested.as_mut().is_some_and(|n| n.remove(entry));
        if removed && self.nested.as_ref().is_some_and(NcList::is_empty) {
            self.nested = None;
        }
        removed
    }

    fn contains(&self, entry: &T) -> bool {
        let from = entry.begin();
        let pos = self.non_nested.partition_point(|iv| iv.begin() < from);
        for iv in &self.non_nested[pos..] {
            if iv.begin() > from {
                break;
            }
            if iv.equals_interval(entry) {
                return true;
            }
        }
        self.nested.as_ref().is_some_and(|n| n.contains(entry))
    }

    fn len(&self) -> usize {
        self.non_nested.len() + self.nested.as_ref().map_or(0, NcList::size)
    }

    fn clear(&mut self) {
        self.non_nested.clear();
        if let Some(nested) = &mut self.nested {
            nested.clear();
        }
        self.nested = None;
    }

    fn find_overlaps_into(&mut self, from: i32, to: i32, result: &mut Vec<T>) {
        self.find_non_nested_overlaps(from, to, result);
        if let Some(nested) = &self.nested {
            nested.find_overlaps_into(from, to, result);
        }
    }

    fn depth(&mut self) -> usize {
        containment_stats(self.iter()).depth
    }

    fn width(&mut self) -> usize {
        containment_stats(self.iter()).width
    }

    fn is_valid(&mut self) -> bool {
        for pair in self.non_nested.windows(2) {
            if pair[1].begin() < pair[0].begin() {
                warn!(
                    "non-nested start order broken: {}-{} before {}-{}",
                    pair[0].begin(),
                    pair[0].end(),
                    pair[1].begin(),
                    pair[1].end()
                );
                return false;
            }
            if pair[0].properly_contains_interval(&pair[1])
                || pair[1].properly_contains_interval(&pair[0])
            {
                warn!(
                    "non-nested containment between {}-{} and {}-{}",
                    pair[0].begin(),
                    pair[0].end(),
                    pair[1].begin(),
                    pair[1].end()
                );
                return false;
            }
        }
        self.nested.as_ref().map_or(true, NcList::is_valid)
    }

    fn revalidate(&mut self) -> bool {
        let mut items: Vec<T> = Vec::with_capacity(self.len());
        items.extend(self.non_nested.drain(..));
        if let Some(nested) = self.nested.take() {
            let mut refs = Vec::new();
            nested.collect_refs(&mut refs);
            items.extend(refs.into_iter().cloned());
        }
        *self = Self::build(items);
        true
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a T> + 'a> {
        let mut nested_refs = Vec::new();
        if let Some(nested) = &self.nested {
            nested.collect_refs(&mut nested_refs);
        }
        Box::new(self.non_nested.iter().chain(nested_refs))
    }
}
