//! Binary-search primitives shared by the engines.
//!
//! All three searches operate on arrays sorted under one of the two interval
//! orderings and stay correct across runs of equal-begin (and equal-end)
//! intervals: after a coordinate collision the identity search widens
//! linearly in both directions until either value equality is found or the
//! coordinate run ends.

use std::cmp::Ordering;

use ivstore_core::{Interval, SortOrder};

/// Within `intervals`, the lowest index whose end is not before `from`, or
/// `intervals.len()` when every end precedes it.
///
/// The slice must have non-decreasing ends; both engines guarantee this for
/// the slices they search (a begin-sorted run with no mutual containment
/// cannot have a decreasing end).
#[inline]
pub fn first_end_not_before<T: Interval>(intervals: &[T], from: i32) -> usize {
    intervals.partition_point(|iv| iv.end() < from)
}

/// As [`first_end_not_before`], over a permutation of indexes into
/// `intervals` rather than the intervals themselves.
#[inline]
pub fn first_end_not_before_by<T: Interval>(nest: &[u32], intervals: &[T], from: i32) -> usize {
    nest.partition_point(|&ix| intervals[ix as usize].end() < from)
}

/// Within the begin-sorted `intervals`, the highest index whose begin does
/// not exceed `to`, or `None` when every interval starts after it.
#[inline]
pub fn last_begin_not_after<T: Interval>(intervals: &[T], to: i32) -> Option<usize> {
    intervals.partition_point(|iv| iv.begin() <= to).checked_sub(1)
}

/// Compare a stored interval against query coordinates under the given
/// ordering, for insertion-point purposes.
#[inline]
pub fn compare_range<T: Interval>(iv: &T, begin: i32, end: i32, order: SortOrder) -> Ordering {
    match iv.begin().cmp(&begin) {
        Ordering::Equal => match order {
            SortOrder::BigEndian => end.cmp(&iv.end()),
            SortOrder::LittleEndian => iv.end().cmp(&end),
        },
        unequal => unequal,
    }
}

/// Locate an interval satisfying `equals_interval(target)` in a sorted
/// array, skipping indexes flagged in `ignore`.
///
/// Answers `Ok(index)` when a match is found, else `Err(insertion_point)` so
/// callers can reuse the search for ordered insertion.
pub fn binary_identity_search<T: Interval>(
    intervals: &[T],
    target: &T,
    order: SortOrder,
    ignore: Option<&DeletionBits>,
) -> Result<usize, usize> {
    let r0 = target.begin();
    let r1 = target.end();

    // envelope short-circuits
    if intervals.is_empty() || r0 < intervals[0].begin() {
        return Err(0);
    }
    if r0 > intervals[intervals.len() - 1].begin() {
        return Err(intervals.len());
    }

    let live = |i: usize| ignore.map_or(true, |bits| !bits.get(i));

    let mut lo: i64 = 0;
    let mut hi: i64 = intervals.len() as i64 - 1;
    while lo <= hi {
        let mid = ((lo + hi) >> 1) as usize;
        match compare_range(&intervals[mid], r0, r1, order) {
            Ordering::Less => lo = mid as i64 + 1,
            Ordering::Greater => hi = mid as i64 - 1,
            Ordering::Equal => {
                if live(mid) && intervals[mid].equals_interval(target) {
                    return Ok(mid);
                }

                // collision: widen over the coordinate run in both directions
                for i in mid + 1..=hi as usize {
                    let iv = &intervals[i];
                    if iv.begin() != r0 || iv.end() != r1 {
                        break;
                    }
                    if live(i) && iv.equals_interval(target) {
                        return Ok(i);
                    }
                }
                for i in (lo as usize..mid).rev() {
                    let iv = &intervals[i];
                    let run_ended = iv.begin() != r0
                        || match order {
                            SortOrder::BigEndian => r1 < iv.end(),
                            SortOrder::LittleEndian => iv.end() < r1,
                        };
                    if run_ended {
                        return Err(i + 1);
                    }
                    if live(i) && iv.equals_interval(target) {
                        return Ok(i);
                    }
                }
                return Err(mid);
            }
        }
    }
    Err(lo as usize)
}

/// A grow-on-demand bit set flagging pending deletions by index.
#[derive(Debug, Clone, Default)]
pub struct DeletionBits {
    words: Vec<u64>,
}

impl DeletionBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag index `i`, growing the word array as needed.
    pub fn set(&mut self, i: usize) {
        let word = i / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (i % 64);
    }

    /// Answers true if index `i` is flagged.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .is_some_and(|w| w & (1 << (i % 64)) != 0)
    }

    /// Drop every flag, keeping the allocation.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// The lowest flagged index at or after `from`, if any.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let mut word = from / 64;
        if word >= self.words.len() {
            return None;
        }
        let mut bits = self.words[word] & (!0u64 << (from % 64));
        loop {
            if bits != 0 {
                return Some(word * 64 + bits.trailing_zeros() as usize);
            }
            word += 1;
            if word >= self.words.len() {
                return None;
            }
            bits = self.words[word];
        }
    }

    /// The lowest unflagged index at or after `from`.
    pub fn next_clear_bit(&self, from: usize) -> usize {
        let mut word = from / 64;
        if word >= self.words.len() {
            return from;
        }
        let mut bits = !self.words[word] & (!0u64 << (from % 64));
        loop {
            if bits != 0 {
                return word * 64 + bits.trailing_zeros() as usize;
            }
            word += 1;
            if word >= self.words.len() {
                return word * 64;
            }
            bits = !self.words[word];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ivstore_core::{compare_big_endian, Feature, Span};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn sorted_spans() -> Vec<Span> {
        let mut spans = vec![
            Span::new(5, 5),
            Span::new(10, 100),
            Span::new(10, 80),
            Span::new(10, 80),
            Span::new(20, 30),
            Span::new(35, 40),
        ];
        spans.sort_by(compare_big_endian);
        spans
    }

    #[rstest]
    fn test_first_end_not_before(sorted_spans: Vec<Span>) {
        assert_eq!(first_end_not_before(&sorted_spans, 0), 0);
        assert_eq!(first_end_not_before(&sorted_spans, 6), 1);
        assert_eq!(first_end_not_before(&sorted_spans, 101), sorted_spans.len());
    }

    #[rstest]
    fn test_last_begin_not_after(sorted_spans: Vec<Span>) {
        assert_eq!(last_begin_not_after(&sorted_spans, 4), None);
        assert_eq!(last_begin_not_after(&sorted_spans, 5), Some(0));
        assert_eq!(last_begin_not_after(&sorted_spans, 12), Some(3));
        assert_eq!(last_begin_not_after(&sorted_spans, 1000), Some(5));
    }

    #[rstest]
    fn test_identity_search_found(sorted_spans: Vec<Span>) {
        let hit = binary_identity_search(
            &sorted_spans,
            &Span::new(20, 30),
            SortOrder::BigEndian,
            None,
        );
        assert_eq!(hit, Ok(4));
    }

    #[rstest]
    fn test_identity_search_insertion_points(sorted_spans: Vec<Span>) {
        // before everything
        assert_eq!(
            binary_identity_search(&sorted_spans, &Span::new(1, 2), SortOrder::BigEndian, None),
            Err(0)
        );
        // after everything
        assert_eq!(
            binary_identity_search(
                &sorted_spans,
                &Span::new(50, 60),
                SortOrder::BigEndian,
                None
            ),
            Err(sorted_spans.len())
        );
        // inside the begin==10 run
        let pos = binary_identity_search(
            &sorted_spans,
            &Span::new(10, 90),
            SortOrder::BigEndian,
            None,
        )
        .unwrap_err();
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_identity_search_widens_over_equal_coordinates() {
        let mut features = vec![
            Feature::new(10, 20, "a"),
            Feature::new(10, 20, "b"),
            Feature::new(10, 20, "c"),
            Feature::new(10, 20, "d"),
        ];
        features.sort_by(compare_big_endian);

        for f in &features {
            let found =
                binary_identity_search(&features, f, SortOrder::BigEndian, None).unwrap();
            assert!(features[found].equals_interval(f));
        }
        assert!(binary_identity_search(
            &features,
            &Feature::new(10, 20, "missing"),
            SortOrder::BigEndian,
            None
        )
        .is_err());
    }

    #[test]
    fn test_identity_search_honours_ignore_mask() {
        let spans = vec![Span::new(1, 2), Span::new(3, 4), Span::new(5, 6)];
        let mut bits = DeletionBits::new();
        bits.set(1);

        assert_eq!(
            binary_identity_search(&spans, &Span::new(3, 4), SortOrder::BigEndian, Some(&bits)),
            Err(1)
        );
        assert_eq!(
            binary_identity_search(&spans, &Span::new(5, 6), SortOrder::BigEndian, Some(&bits)),
            Ok(2)
        );
    }

    #[test]
    fn test_deletion_bits_scanning() {
        let mut bits = DeletionBits::new();
        bits.set(3);
        bits.set(64);
        bits.set(65);

        assert!(bits.get(3) && bits.get(64) && bits.get(65));
        assert!(!bits.get(4) && !bits.get(1000));

        assert_eq!(bits.next_set_bit(0), Some(3));
        assert_eq!(bits.next_set_bit(4), Some(64));
        assert_eq!(bits.next_set_bit(66), None);

        assert_eq!(bits.next_clear_bit(3), 4);
        assert_eq!(bits.next_clear_bit(64), 66);

        bits.clear_all();
        assert_eq!(bits.next_set_bit(0), None);
    }
}
