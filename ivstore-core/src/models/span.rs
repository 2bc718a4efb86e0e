use std::fmt::{self, Display};

use crate::errors::IntervalError;
use crate::interval::Interval;

/// A bare start-end range with no payload.
///
/// Two spans are equal when their coordinates are equal. The fields are
/// public so coordinates can be adjusted in place; a store holding the span
/// must be revalidated after any such mutation.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub struct Span {
    pub begin: i32,
    pub end: i32,
}

impl Span {
    /// Create a span. `begin` must not exceed `end`; the bounds are not
    /// checked here, use [`try_new`](Span::try_new) for validated input.
    #[inline]
    pub fn new(begin: i32, end: i32) -> Self {
        Span { begin, end }
    }

    /// Create a span, rejecting reversed bounds.
    pub fn try_new(begin: i32, end: i32) -> Result<Self, IntervalError> {
        if begin > end {
            return Err(IntervalError::InvalidRange { begin, end });
        }
        Ok(Span { begin, end })
    }

    /// Number of positions covered, inclusive of both ends.
    #[inline]
    pub fn width(&self) -> i64 {
        i64::from(self.end) - i64::from(self.begin) + 1
    }
}

impl Interval for Span {
    #[inline]
    fn begin(&self) -> i32 {
        self.begin
    }

    #[inline]
    fn end(&self) -> i32 {
        self.end
    }

    #[inline]
    fn equals_interval(&self, other: &Self) -> bool {
        self.begin == other.begin && self.end == other.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}
