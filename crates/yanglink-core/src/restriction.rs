//! Range and length restrictions.
//!
//! A restriction is written as an expression such as `1..10 | 20..max`.
//! [`RestrictionExpr`] keeps the parsed but unresolved form: bounds may
//! still be the `min`/`max` keywords and literals are not yet scaled.
//! Resolving an expression against a [`ValueDomain`] yields a
//! [`RestrictionSet`], an ordered list of disjoint, ascending intervals.
//!
//! All numeric domains (signed and unsigned integers, lengths, and
//! fraction-digit-scaled decimals) are represented as `i128`, which holds
//! every `int64`/`uint64` value and every scaled `decimal64` value.

use std::fmt;

use thiserror::Error;

/// Errors produced while parsing or resolving a restriction expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestrictionError {
    #[error("malformed restriction `{0}`")]
    Syntax(String),

    #[error("invalid value `{0}` in restriction")]
    InvalidValue(String),

    #[error("value `{value}` has more than {fraction_digits} fraction digits")]
    TooManyFractionDigits { value: String, fraction_digits: u8 },

    #[error("restriction bound `{0}` is outside the allowed range of the type")]
    OutOfDomain(String),

    #[error("restriction parts must be disjoint and in ascending order")]
    NotAscending,
}

/// One side of a restriction interval as written in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBound {
    Min,
    Max,
    Literal(String),
}

impl RawBound {
    fn parse(text: &str) -> Result<Self, RestrictionError> {
        match text.trim() {
            "" => Err(RestrictionError::Syntax(text.to_string())),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            literal => Ok(Self::Literal(literal.to_string())),
        }
    }
}

impl fmt::Display for RawBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Literal(text) => f.write_str(text),
        }
    }
}

/// A parsed, unresolved restriction expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionExpr {
    parts: Vec<(RawBound, RawBound)>,
}

impl RestrictionExpr {
    /// Parses `a..b | c | d..e`.
    ///
    /// ```
    /// use yanglink_core::restriction::RestrictionExpr;
    ///
    /// let expr = RestrictionExpr::parse("1..10 | 20..max").unwrap();
    /// assert_eq!(expr.to_string(), "1..10 | 20..max");
    /// ```
    pub fn parse(text: &str) -> Result<Self, RestrictionError> {
        let parts = text
            .split('|')
            .map(|part| match part.split_once("..") {
                Some((lower, upper)) => Ok((RawBound::parse(lower)?, RawBound::parse(upper)?)),
                None => {
                    let bound = RawBound::parse(part)?;
                    Ok((bound.clone(), bound))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[(RawBound, RawBound)] {
        &self.parts
    }

    /// Resolves the expression against `domain`.
    ///
    /// `min` and `max` refer to `inherited` when given (the lowest and highest
    /// bound of the restriction this one narrows), otherwise to the domain's
    /// absolute bounds.
    pub fn resolve(
        &self,
        domain: ValueDomain,
        inherited: Option<&RestrictionSet<i128>>,
    ) -> Result<RestrictionSet<i128>, RestrictionError> {
        let (lowest, highest) = inherited
            .and_then(|set| set.lowest().zip(set.highest()))
            .unwrap_or((domain.min, domain.max));

        let resolve_bound = |bound: &RawBound| -> Result<i128, RestrictionError> {
            let value = match bound {
                RawBound::Min => lowest,
                RawBound::Max => highest,
                RawBound::Literal(text) => domain.parse_literal(text)?,
            };
            if value < domain.min || value > domain.max {
                return Err(RestrictionError::OutOfDomain(bound.to_string()));
            }
            Ok(value)
        };

        let intervals = self
            .parts
            .iter()
            .map(|(lower, upper)| Ok(Interval::new(resolve_bound(lower)?, resolve_bound(upper)?)))
            .collect::<Result<Vec<_>, RestrictionError>>()?;

        RestrictionSet::new(intervals)
    }
}

impl fmt::Display for RestrictionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (lower, upper)) in self.parts.iter().enumerate() {
            if idx > 0 {
                f.write_str(" | ")?;
            }
            if lower == upper {
                write!(f, "{lower}")?;
            } else {
                write!(f, "{lower}..{upper}")?;
            }
        }
        Ok(())
    }
}

/// The value space a restriction is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDomain {
    min: i128,
    max: i128,
    fraction_digits: u8,
}

impl ValueDomain {
    /// An integer domain `[min, max]`.
    pub const fn integer(min: i128, max: i128) -> Self {
        Self {
            min,
            max,
            fraction_digits: 0,
        }
    }

    /// The `decimal64` domain for the given fraction digits. Values are
    /// stored scaled by `10^fraction_digits`, so the bounds are the full
    /// `i64` range.
    pub const fn decimal(fraction_digits: u8) -> Self {
        Self {
            min: i64::MIN as i128,
            max: i64::MAX as i128,
            fraction_digits,
        }
    }

    /// The length domain: non-negative 64-bit counts.
    pub const fn length() -> Self {
        Self::integer(0, u64::MAX as i128)
    }

    pub fn min(&self) -> i128 {
        self.min
    }

    pub fn max(&self) -> i128 {
        self.max
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    /// Parses a literal into the domain's scaled representation.
    pub fn parse_literal(&self, text: &str) -> Result<i128, RestrictionError> {
        let invalid = || RestrictionError::InvalidValue(text.to_string());
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) || (digits.contains('.') && frac_part.is_empty()) {
            return Err(invalid());
        }
        if self.fraction_digits == 0 && digits.contains('.') {
            return Err(invalid());
        }
        if frac_part.len() > self.fraction_digits as usize {
            return Err(RestrictionError::TooManyFractionDigits {
                value: text.to_string(),
                fraction_digits: self.fraction_digits,
            });
        }

        let scale = 10i128.pow(u32::from(self.fraction_digits));
        let int_value: i128 = int_part.parse().map_err(|_| invalid())?;
        let frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            let padded = 10i128.pow((self.fraction_digits as usize - frac_part.len()) as u32);
            frac_part.parse::<i128>().map_err(|_| invalid())? * padded
        };

        let magnitude = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| RestrictionError::OutOfDomain(text.to_string()))?;

        Ok(if negative { -magnitude } else { magnitude })
    }
}

/// A closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    start: T,
    end: T,
}

impl<T: Ord + Copy> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> T {
        self.start
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn contains(&self, value: T) -> bool {
        self.start <= value && value <= self.end
    }

    /// Returns `true` if `other` lies entirely inside this interval.
    pub fn encloses(&self, other: &Interval<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// An ordered, disjoint, ascending set of closed intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestrictionSet<T> {
    intervals: Vec<Interval<T>>,
}

impl<T: Ord + Copy> RestrictionSet<T> {
    /// Builds a set, rejecting empty, inverted, overlapping or unordered intervals.
    pub fn new(intervals: Vec<Interval<T>>) -> Result<Self, RestrictionError> {
        if intervals.is_empty() {
            return Err(RestrictionError::Syntax(String::new()));
        }
        let mut previous_end: Option<T> = None;
        for interval in &intervals {
            if interval.start > interval.end {
                return Err(RestrictionError::NotAscending);
            }
            if previous_end.is_some_and(|end| interval.start <= end) {
                return Err(RestrictionError::NotAscending);
            }
            previous_end = Some(interval.end);
        }
        Ok(Self { intervals })
    }

    /// A set holding the single interval `[start, end]`.
    pub fn single(start: T, end: T) -> Result<Self, RestrictionError> {
        Self::new(vec![Interval::new(start, end)])
    }

    pub fn intervals(&self) -> &[Interval<T>] {
        &self.intervals
    }

    pub fn lowest(&self) -> Option<T> {
        self.intervals.first().map(Interval::start)
    }

    pub fn highest(&self) -> Option<T> {
        self.intervals.last().map(Interval::end)
    }

    pub fn contains(&self, value: T) -> bool {
        self.intervals.iter().any(|interval| interval.contains(value))
    }

    /// Returns `true` if every interval of `self` is enclosed by some
    /// interval of `other`.
    pub fn is_subset_of(&self, other: &RestrictionSet<T>) -> bool {
        self.intervals
            .iter()
            .all(|mine| other.intervals.iter().any(|theirs| theirs.encloses(mine)))
    }
}

impl<T: fmt::Display> fmt::Display for RestrictionSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, interval) in self.intervals.iter().enumerate() {
            if idx > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}..{}", interval.start, interval.end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT8: ValueDomain = ValueDomain::integer(-128, 127);

    fn set(text: &str, domain: ValueDomain) -> RestrictionSet<i128> {
        RestrictionExpr::parse(text)
            .unwrap()
            .resolve(domain, None)
            .unwrap()
    }

    #[test]
    fn test_parse_single_values_and_ranges() {
        let expr = RestrictionExpr::parse("1 | 3..5 | min..0").unwrap();
        assert_eq!(expr.parts().len(), 3);
        assert_eq!(expr.parts()[0], (RawBound::Literal("1".into()), RawBound::Literal("1".into())));
        assert_eq!(expr.parts()[2].0, RawBound::Min);
    }

    #[test]
    fn test_parse_rejects_empty_part() {
        assert!(RestrictionExpr::parse("1..5 | ").is_err());
        assert!(RestrictionExpr::parse("..5").is_err());
    }

    #[test]
    fn test_resolve_min_max_against_domain() {
        let resolved = set("min..max", INT8);
        assert_eq!(resolved.lowest(), Some(-128));
        assert_eq!(resolved.highest(), Some(127));
    }

    #[test]
    fn test_resolve_min_max_against_inherited() {
        let inherited = set("10..20", INT8);
        let resolved = RestrictionExpr::parse("min..15")
            .unwrap()
            .resolve(INT8, Some(&inherited))
            .unwrap();
        assert_eq!(resolved.lowest(), Some(10));
        assert_eq!(resolved.highest(), Some(15));
    }

    #[test]
    fn test_resolve_out_of_domain() {
        let err = RestrictionExpr::parse("0..300")
            .unwrap()
            .resolve(INT8, None)
            .unwrap_err();
        assert_eq!(err, RestrictionError::OutOfDomain("300".into()));
    }

    #[test]
    fn test_resolve_rejects_overlap_and_order() {
        let overlap = RestrictionExpr::parse("1..10 | 5..20").unwrap().resolve(INT8, None);
        assert_eq!(overlap.unwrap_err(), RestrictionError::NotAscending);

        let inverted = RestrictionExpr::parse("10..1").unwrap().resolve(INT8, None);
        assert_eq!(inverted.unwrap_err(), RestrictionError::NotAscending);

        let unordered = RestrictionExpr::parse("20..30 | 1..5").unwrap().resolve(INT8, None);
        assert_eq!(unordered.unwrap_err(), RestrictionError::NotAscending);
    }

    #[test]
    fn test_decimal_scaling() {
        let domain = ValueDomain::decimal(2);
        assert_eq!(domain.parse_literal("1.5").unwrap(), 150);
        assert_eq!(domain.parse_literal("-0.25").unwrap(), -25);
        assert_eq!(domain.parse_literal("3").unwrap(), 300);
        assert!(matches!(
            domain.parse_literal("1.234"),
            Err(RestrictionError::TooManyFractionDigits { .. })
        ));
    }

    #[test]
    fn test_integer_domain_rejects_decimal() {
        assert!(INT8.parse_literal("1.5").is_err());
        assert!(INT8.parse_literal("abc").is_err());
        assert!(INT8.parse_literal("-").is_err());
    }

    #[test]
    fn test_subset() {
        let parent = set("1..10 | 20..30", INT8);
        assert!(set("2..5 | 21..22", INT8).is_subset_of(&parent));
        assert!(!set("0..20", INT8).is_subset_of(&parent));
        assert!(!set("5..25", INT8).is_subset_of(&parent));
    }

    #[test]
    fn test_display() {
        assert_eq!(set("1..2 | 5", INT8).to_string(), "1..2 | 5..5");
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn interval_strategy() -> impl Strategy<Value = (i128, i128)> {
        (-1000i128..1000, 0i128..500).prop_map(|(start, width)| (start, start + width))
    }

    fn value_strategy() -> impl Strategy<Value = i128> {
        -2000i128..2000
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Every value accepted by a subset is accepted by its superset.
    fn check_subset_accepts_only_parent_values(
        parent: (i128, i128),
        child: (i128, i128),
        value: i128,
    ) -> Result<(), TestCaseError> {
        let parent = RestrictionSet::single(parent.0, parent.1).unwrap();
        let child = RestrictionSet::single(child.0, child.1).unwrap();

        if child.is_subset_of(&parent) && child.contains(value) {
            prop_assert!(parent.contains(value));
        }
        Ok(())
    }

    /// A set is always a subset of itself.
    fn check_subset_is_reflexive(interval: (i128, i128)) -> Result<(), TestCaseError> {
        let set = RestrictionSet::single(interval.0, interval.1).unwrap();
        prop_assert!(set.is_subset_of(&set));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn subset_accepts_only_parent_values(
            parent in interval_strategy(),
            child in interval_strategy(),
            value in value_strategy(),
        ) {
            check_subset_accepts_only_parent_values(parent, child, value)?;
        }

        #[test]
        fn subset_is_reflexive(interval in interval_strategy()) {
            check_subset_is_reflexive(interval)?;
        }
    }
}
