//! Half-open expansion windows.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{RuleError, RuleResult};

/// A half-open interval `[start, end)` over UTC instants.
///
/// An instant exactly at `start` is inside the window; an instant exactly at
/// `end` is not. `start == end` is a valid, empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// ## Summary
    /// Builds a window from explicit bounds.
    ///
    /// ## Errors
    /// Returns an error if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RuleResult<Self> {
        if end < start {
            return Err(RuleError::WindowInverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// ## Summary
    /// Builds the window `[start, start + length)`.
    ///
    /// ## Errors
    /// Returns an error if `length` is negative or pushes the end off the
    /// calendar.
    pub fn starting_at(start: DateTime<Utc>, length: TimeDelta) -> RuleResult<Self> {
        let Some(end) = start.checked_add_signed(length) else {
            return Err(RuleError::WindowOverflow {
                start,
                days: length.num_days(),
            });
        };
        Self::new(start, end)
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// ## Summary
    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = TimeWindow::new(instant(10), instant(9)).unwrap_err();
        assert!(matches!(err, RuleError::WindowInverted { .. }));
    }

    #[test]
    fn start_is_inside_end_is_not() {
        let window = TimeWindow::new(instant(1), instant(10)).unwrap();
        assert!(window.contains(instant(1)));
        assert!(window.contains(instant(9)));
        assert!(!window.contains(instant(10)));
    }

    #[test]
    fn empty_window_contains_nothing() {
        let window = TimeWindow::new(instant(5), instant(5)).unwrap();
        assert!(!window.contains(instant(5)));
    }

    #[test]
    fn starting_at_adds_the_length() {
        let window = TimeWindow::starting_at(instant(1), TimeDelta::days(9)).unwrap();
        assert_eq!(window.end(), instant(10));
    }

    #[test]
    fn negative_length_is_rejected() {
        let err = TimeWindow::starting_at(instant(10), TimeDelta::days(-1)).unwrap_err();
        assert!(matches!(err, RuleError::WindowInverted { .. }));
    }
}
