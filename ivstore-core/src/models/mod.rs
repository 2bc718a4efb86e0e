//! Ready-made payload types implementing the interval capability.

pub mod feature;
pub mod span;

pub use self::feature::Feature;
pub use self::span::Span;
