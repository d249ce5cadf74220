//! The recurrence rule model stored alongside an event series.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

/// Expansion frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of the week, indexed the way stored rules index it: 0 is Sunday,
/// 6 is Saturday. Serialized as the bare index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// ## Summary
    /// Returns the Sunday-based index of this weekday.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    /// ## Summary
    /// Returns the weekday of a calendar date.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
        }
    }
}

impl TryFrom<u8> for Weekday {
    type Error = RuleError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Sunday),
            1 => Ok(Self::Monday),
            2 => Ok(Self::Tuesday),
            3 => Ok(Self::Wednesday),
            4 => Ok(Self::Thursday),
            5 => Ok(Self::Friday),
            6 => Ok(Self::Saturday),
            out_of_range => Err(RuleError::WeekdayOutOfRange(out_of_range)),
        }
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.index()
    }
}

/// A recurrence rule as stored on an event series.
///
/// Field meaning by frequency:
/// - `by_day` expands a WEEKLY rule to the listed weekdays and narrows a
///   MONTHLY or YEARLY rule to dates falling on them. DAILY ignores it.
/// - `by_month_day` supplies the candidate days of the month for MONTHLY and
///   YEARLY rules. Days a month does not have are skipped, never rolled over.
/// - `by_month` supplies the months of a YEARLY rule.
///
/// `count` and `until` may both be present; whichever ends the series first
/// wins. `until` is inclusive. `exceptions` suppress emission but still count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub by_day: Vec<Weekday>,
    #[serde(default)]
    pub by_month_day: Vec<i32>,
    #[serde(default)]
    pub by_month: Vec<u32>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exceptions: Vec<DateTime<Utc>>,
}

const fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    /// ## Summary
    /// Creates a rule that repeats every period of `frequency` with no
    /// modifiers and no end.
    #[must_use]
    pub const fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            count: None,
            until: None,
            exceptions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_by_day(mut self, by_day: Vec<Weekday>) -> Self {
        self.by_day = by_day;
        self
    }

    #[must_use]
    pub fn with_by_month_day(mut self, by_month_day: Vec<i32>) -> Self {
        self.by_month_day = by_month_day;
        self
    }

    #[must_use]
    pub fn with_by_month(mut self, by_month: Vec<u32>) -> Self {
        self.by_month = by_month;
        self
    }

    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub const fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_exceptions(mut self, exceptions: Vec<DateTime<Utc>>) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// ## Summary
    /// Checks every field against its documented range.
    ///
    /// Typed fields cannot hold out-of-range weekdays or frequencies, so this
    /// covers the numeric fields that arrive unchecked from stored JSON.
    ///
    /// ## Errors
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> RuleResult<()> {
        if self.interval < 1 {
            return Err(RuleError::IntervalOutOfRange(self.interval));
        }
        for &day in &self.by_month_day {
            if !(1..=31).contains(&day) {
                return Err(RuleError::MonthDayOutOfRange(day));
            }
        }
        for &month in &self.by_month {
            if !(1..=12).contains(&month) {
                return Err(RuleError::MonthOutOfRange(month));
            }
        }
        if let Some(count) = self.count
            && count < 1
        {
            return Err(RuleError::CountOutOfRange);
        }
        Ok(())
    }
}
