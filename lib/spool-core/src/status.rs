//! Status code classification.

/// Inclusive range of HTTP status codes.
///
/// # Example
///
/// ```
/// use spool_core::StatusCodeRange;
///
/// let client_errors = StatusCodeRange::new(400, 499);
/// assert!(client_errors.contains(404));
/// assert!(!client_errors.contains(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCodeRange {
    /// Lowest matching code.
    pub low: u16,
    /// Highest matching code.
    pub high: u16,
}

impl StatusCodeRange {
    /// Everything that is not 2xx: `[300, 599]`.
    pub const NON_2XX: Self = Self::new(300, 599);
    /// Client errors: `[400, 499]`.
    pub const CLIENT_ERRORS: Self = Self::new(400, 499);
    /// Server errors: `[500, 599]`.
    pub const SERVER_ERRORS: Self = Self::new(500, 599);

    /// Create a range `[low, high]`.
    #[must_use]
    pub const fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    /// A range matching exactly one code.
    #[must_use]
    pub const fn single(code: u16) -> Self {
        Self::new(code, code)
    }

    /// `low <= code <= high`.
    #[must_use]
    pub const fn contains(&self, code: u16) -> bool {
        self.low <= code && code <= self.high
    }
}

impl From<u16> for StatusCodeRange {
    fn from(code: u16) -> Self {
        Self::single(code)
    }
}

impl From<std::ops::RangeInclusive<u16>> for StatusCodeRange {
    fn from(range: std::ops::RangeInclusive<u16>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Returns `true` if `code` falls in any of `ranges`.
#[must_use]
pub fn in_ranges(code: u16, ranges: &[StatusCodeRange]) -> bool {
    ranges.iter().any(|range| range.contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_are_inclusive() {
        let range = StatusCodeRange::new(400, 499);
        assert!(range.contains(400));
        assert!(range.contains(499));
        assert!(!range.contains(399));
        assert!(!range.contains(500));
    }

    #[test]
    fn non_2xx_default() {
        assert!(StatusCodeRange::NON_2XX.contains(301));
        assert!(StatusCodeRange::NON_2XX.contains(503));
        assert!(!StatusCodeRange::NON_2XX.contains(200));
        assert!(!StatusCodeRange::NON_2XX.contains(204));
    }

    #[test]
    fn in_any_range() {
        let ranges = [StatusCodeRange::single(429), StatusCodeRange::SERVER_ERRORS];
        assert!(in_ranges(429, &ranges));
        assert!(in_ranges(502, &ranges));
        assert!(!in_ranges(404, &ranges));
        assert!(!in_ranges(200, &[]));
    }

    #[test]
    fn conversions() {
        assert_eq!(StatusCodeRange::from(404), StatusCodeRange::new(404, 404));
        assert_eq!(
            StatusCodeRange::from(500..=504),
            StatusCodeRange::new(500, 504)
        );
    }
}
