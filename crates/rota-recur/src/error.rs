use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rule and window validation failures.
///
/// Every variant names the offending value so a stored rule can be diagnosed
/// from the error message alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("interval must be at least 1, got {0}")]
    IntervalOutOfRange(u32),

    #[error("day-of-week index must be 0 (Sunday) through 6 (Saturday), got {0}")]
    WeekdayOutOfRange(u8),

    #[error(
        "day-of-month must be 1 through 31, got {0}; counting from the end of the month is not supported"
    )]
    MonthDayOutOfRange(i32),

    #[error("month must be 1 through 12, got {0}")]
    MonthOutOfRange(u32),

    #[error("count must be at least 1")]
    CountOutOfRange,

    #[error("window end {end} precedes window start {start}")]
    WindowInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("window of {days} days starting at {start} overflows the calendar")]
    WindowOverflow { start: DateTime<Utc>, days: i64 },
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
