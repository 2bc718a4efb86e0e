use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::IntervalError;
use crate::interval::Interval;

/// A described range: a [`Span`](crate::models::Span)-like payload whose
/// equality also requires matching descriptions, so two features with the
/// same coordinates but different descriptions are distinct store entries.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Feature {
    pub begin: i32,
    pub end: i32,
    pub description: String,
}

impl Feature {
    /// Create a feature. `begin` must not exceed `end`; use
    /// [`try_new`](Feature::try_new) for validated input.
    pub fn new(begin: i32, end: i32, description: impl Into<String>) -> Self {
        Feature {
            begin,
            end,
            description: description.into(),
        }
    }

    /// Create a feature, rejecting reversed bounds.
    pub fn try_new(
        begin: i32,
        end: i32,
        description: impl Into<String>,
    ) -> Result<Self, IntervalError> {
        if begin > end {
            return Err(IntervalError::InvalidRange { begin, end });
        }
        Ok(Feature {
            begin,
            end,
            description: description.into(),
        })
    }
}

impl Interval for Feature {
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
        self.begin == other.begin && self.end == other.end && self.description == other.description
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.begin, self.end, self.description)
    }
}

impl FromStr for Feature {
    type Err = IntervalError;

    /// Parse the `begin:end:description` form produced by [`Display`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let begin = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(|| IntervalError::Parse(s.to_string()))?;
        let end = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(|| IntervalError::Parse(s.to_string()))?;
        let description = parts.next().unwrap_or_default();
        Feature::try_new(begin, end, description)
    }
}
