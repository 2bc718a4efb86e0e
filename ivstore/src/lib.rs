//! In-memory interval indexes with logarithmic overlap queries.
//!
//! This crate stores collections of closed integer intervals, each carrying a
//! user payload, and answers overlap queries (every stored interval that
//! intersects `[from, to]`) in logarithmic or near-logarithmic time.
//! Two competing engines implement the same [`IntervalStore`] facade:
//!
//! - [`NcListStore`] is the reference engine, a tree of nested interval
//!   groups (a Nested Containment List) beneath a flat list of top-level
//!   intervals.
//! - [`FlatNestStore`] is a packed-array equivalent that keeps the whole nest
//!   structure in contiguous integer arrays for cache locality, and buffers
//!   incremental mutation so a burst of adds costs O(log n) each.
//!
//! ## Quick start
//!
//! ```rust
//! use ivstore::{FlatNestStore, IntervalStore};
//! use ivstore_core::Span;
//!
//! let mut store = FlatNestStore::build(vec![
//!     Span::new(10, 20),
//!     Span::new(12, 18),
//!     Span::new(40, 50),
//! ]);
//!
//! let hits = store.find_overlaps(15, 30);
//! assert_eq!(hits.len(), 2);
//!
//! store.add(Span::new(25, 30));
//! assert_eq!(store.find_overlaps(15, 30).len(), 3);
//! ```
//!
//! Payloads implement the [`Interval`](ivstore_core::Interval) capability
//! from [`ivstore_core`]; see that crate for the ready-made [`Span`] and
//! [`Feature`] types.
//!
//! Engines are single-threaded: mutation must be externally serialised
//! against queries. Between a mutation and the next query an engine may run
//! a deferred finalisation pass that sorts, compacts, and rebuilds its
//! secondary index; this is invisible except for the time it takes.
//!
//! [`Span`]: ivstore_core::Span
//! [`Feature`]: ivstore_core::Feature

/// Flat-nest engine.
///
/// See [`FlatNestStore`] for details.
pub mod flat;

/// Nested Containment List engine.
///
/// See [`NcListStore`] for details.
pub mod nclist;

/// Binary-search primitives shared by the engines.
pub mod search;

/// The store facade trait.
///
/// See [`IntervalStore`].
pub mod traits;

// re-exports
pub use self::flat::FlatNestStore;
pub use self::nclist::{NcList, NcListStore};
pub use self::traits::IntervalStore;

/// The kind of interval store to use.
///
/// * `NcList` - the reference Nested Containment List engine. Simple,
///   pointerful, mutation is applied immediately.
/// * `FlatNest` - the packed-array engine. Same answers, contiguous
///   storage, lazily finalised mutation buffers.
pub enum StoreType {
    /// Use the Nested Containment List engine.
    NcList,
    /// Use the flat-nest engine.
    FlatNest,
}

impl StoreType {
    /// Builds a store of this kind behind the common facade.
    pub fn build<T>(&self, intervals: Vec<T>) -> Box<dyn IntervalStore<T>>
    where
        T: ivstore_core::Interval + Clone + 'static,
    {
        match self {
            StoreType::NcList => Box::new(NcListStore::build(intervals)),
            StoreType::FlatNest => Box::new(FlatNestStore::build(intervals)),
        }
    }
}
