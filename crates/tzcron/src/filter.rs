//! Occurrence filters.
//!
//! A filter inspects each localized candidate and either accepts it, skips it,
//! or ends the sequence. The year token of an expression becomes a
//! [`YearFilter`]; callers add their own (business-day calendars and the like).

use std::fmt;

use chrono::Datelike;

use crate::Occurrence;
use crate::error::ExpressionError;

/// Outcome of testing one candidate against a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Keep the candidate.
    Accept,
    /// Drop the candidate and keep iterating.
    Skip,
    /// Drop the candidate and end the sequence.
    Stop,
}

impl FilterVerdict {
    /// Combines two verdicts: `Stop` wins over `Skip`, which wins over `Accept`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Stop, _) | (_, Self::Stop) => Self::Stop,
            (Self::Skip, _) | (_, Self::Skip) => Self::Skip,
            (Self::Accept, Self::Accept) => Self::Accept,
        }
    }
}

impl From<bool> for FilterVerdict {
    fn from(keep: bool) -> Self {
        if keep { Self::Accept } else { Self::Skip }
    }
}

/// A check applied to every candidate occurrence of a schedule.
pub trait OccurrenceFilter {
    fn check(&self, occurrence: &Occurrence) -> FilterVerdict;
}

impl<F> OccurrenceFilter for F
where
    F: Fn(&Occurrence) -> FilterVerdict,
{
    fn check(&self, occurrence: &Occurrence) -> FilterVerdict {
        self(occurrence)
    }
}

/// Adapts a boolean predicate: `true` accepts, `false` skips.
#[derive(Debug, Clone, Copy)]
pub struct Predicate<F>(F);

/// Wraps a boolean predicate as an [`OccurrenceFilter`].
pub fn predicate<F>(keep: F) -> Predicate<F>
where
    F: Fn(&Occurrence) -> bool,
{
    Predicate(keep)
}

impl<F> OccurrenceFilter for Predicate<F>
where
    F: Fn(&Occurrence) -> bool,
{
    fn check(&self, occurrence: &Occurrence) -> FilterVerdict {
        FilterVerdict::from((self.0)(occurrence))
    }
}

const YEAR_DIGITS: usize = 4;

/// Restricts a schedule to one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    /// `*`: every year.
    Any,
    Year(i32),
}

impl YearFilter {
    /// ## Summary
    /// Parses the year token of an expression.
    ///
    /// ## Errors
    /// Returns `ExpressionError::InvalidYear` unless the token is `*` or
    /// exactly four ASCII digits.
    pub fn parse(token: &str) -> Result<Self, ExpressionError> {
        if token == "*" {
            return Ok(Self::Any);
        }
        if token.len() != YEAR_DIGITS || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ExpressionError::InvalidYear {
                token: token.to_string(),
            });
        }
        token
            .parse::<i32>()
            .map(Self::Year)
            .map_err(|_err| ExpressionError::InvalidYear {
                token: token.to_string(),
            })
    }

    /// Years before the target are skipped; the first year past it stops the
    /// sequence, since candidates arrive in chronological order.
    #[must_use]
    pub fn verdict(&self, at: &impl Datelike) -> FilterVerdict {
        match self {
            Self::Any => FilterVerdict::Accept,
            Self::Year(year) => match at.year().cmp(year) {
                std::cmp::Ordering::Less => FilterVerdict::Skip,
                std::cmp::Ordering::Equal => FilterVerdict::Accept,
                std::cmp::Ordering::Greater => FilterVerdict::Stop,
            },
        }
    }
}

impl OccurrenceFilter for YearFilter {
    fn check(&self, occurrence: &Occurrence) -> FilterVerdict {
        self.verdict(occurrence)
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}
