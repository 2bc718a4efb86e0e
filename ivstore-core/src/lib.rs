//! Core building blocks for the [ivstore](https://github.com/ivstore/ivstore)
//! interval indexes.
//!
//! This crate defines the *interval capability*, the [`Interval`] trait that
//! every stored payload implements, together with the two total orderings
//! used by the engines and a pair of ready-made payload types
//! ([`Span`](models::Span) and [`Feature`](models::Feature)).
//!
//! The engine crates build on this one; user code only needs it to implement
//! [`Interval`] for its own payload type:
//!
//! ```rust
//! use ivstore_core::Interval;
//!
//! struct Exon {
//!     begin: i32,
//!     end: i32,
//!     transcript: String,
//! }
//!
//! impl Interval for Exon {
//!     fn begin(&self) -> i32 {
//!         self.begin
//!     }
//!
//!     fn end(&self) -> i32 {
//!         self.end
//!     }
//!
//!     fn equals_interval(&self, other: &Self) -> bool {
//!         self.begin == other.begin
//!             && self.end == other.end
//!             && self.transcript == other.transcript
//!     }
//! }
//! ```

pub mod errors;
pub mod interval;
pub mod models;

// re-exports
pub use self::errors::IntervalError;
pub use self::interval::{
    compare_big_endian, compare_little_endian, sort_by_begin, sort_by_end_descending, Interval,
    SortOrder, CONTAINMENT_UNKNOWN, NOT_CONTAINED,
};
pub use self::models::{Feature, Span};
