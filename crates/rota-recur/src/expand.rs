//! Expansion of recurrence rules into occurrence start times.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::ops::ControlFlow;

use crate::error::RuleResult;
use crate::rule::{Frequency, RecurrenceRule, Weekday};
use crate::window::TimeWindow;

/// ## Summary
/// Expands `rule` into the occurrence start times that fall inside `window`,
/// in strictly increasing order with no duplicates.
///
/// `series_start` is the first occurrence of the series and anchors every
/// period. Candidates are recomputed from it for each period index, so a
/// monthly rule starting on the 31st skips short months instead of sliding
/// to their last day for good.
///
/// The window is half-open and `until` is inclusive. `count` is absolute:
/// every occurrence from `series_start` onward consumes it, including
/// occurrences before the window and occurrences suppressed by `exceptions`.
/// Candidates before `series_start` and calendar dates that do not exist are
/// not occurrences and consume nothing.
///
/// ## Errors
/// Returns an error if the rule fails validation.
pub fn expand(
    rule: &RecurrenceRule,
    series_start: DateTime<Utc>,
    window: TimeWindow,
) -> RuleResult<Vec<DateTime<Utc>>> {
    rule.validate()?;

    let mut expansion = Expansion::new(rule, series_start, window);
    match rule.frequency {
        Frequency::Daily => expansion.run_daily(),
        Frequency::Weekly => expansion.run_weekly(),
        Frequency::Monthly => expansion.run_monthly(),
        Frequency::Yearly => expansion.run_yearly(),
    }
    let occurrences = expansion.into_occurrences();
    tracing::trace!(
        frequency = %rule.frequency,
        occurrences = occurrences.len(),
        "expanded recurrence rule"
    );
    Ok(occurrences)
}

/// Walks candidates in chronological order and applies the occurrence gates
/// shared by every frequency.
struct Expansion<'a> {
    rule: &'a RecurrenceRule,
    series_start: DateTime<Utc>,
    /// Clock time carried onto every candidate date.
    start_time: NaiveTime,
    window: TimeWindow,
    /// Sorted, deduplicated copies of the rule's modifier sets.
    by_day: Vec<Weekday>,
    month_days: Vec<u32>,
    months: Vec<u32>,
    exceptions: Vec<DateTime<Utc>>,
    /// Occurrences seen so far, emitted or not. Compared against `count`.
    seen: u64,
    occurrences: Vec<DateTime<Utc>>,
}

impl<'a> Expansion<'a> {
    fn new(rule: &'a RecurrenceRule, series_start: DateTime<Utc>, window: TimeWindow) -> Self {
        let mut by_day = rule.by_day.clone();
        by_day.sort_unstable();
        by_day.dedup();

        // The series start supplies the day of the month and the month when
        // the rule lists none.
        let mut month_days: Vec<u32> = if rule.by_month_day.is_empty() {
            vec![series_start.day()]
        } else {
            rule.by_month_day
                .iter()
                .filter_map(|&day| u32::try_from(day).ok())
                .collect()
        };
        month_days.sort_unstable();
        month_days.dedup();

        let mut months = if rule.by_month.is_empty() {
            vec![series_start.month()]
        } else {
            rule.by_month.clone()
        };
        months.sort_unstable();
        months.dedup();

        let mut exceptions = rule.exceptions.clone();
        exceptions.sort_unstable();
        exceptions.dedup();

        Self {
            rule,
            series_start,
            start_time: series_start.time(),
            window,
            by_day,
            month_days,
            months,
            exceptions,
            seen: 0,
            occurrences: Vec::new(),
        }
    }

    fn into_occurrences(self) -> Vec<DateTime<Utc>> {
        self.occurrences
    }

    /// Feeds one candidate through the shared gates. Callers must offer
    /// candidates in increasing order.
    ///
    /// `Break` ends the expansion: the candidate crossed `until` or the
    /// window end, or it consumed the last of `count`.
    fn offer(&mut self, candidate: DateTime<Utc>) -> ControlFlow<()> {
        // Candidates before the series start are artifacts of period
        // enumeration, not occurrences. They consume nothing.
        if candidate < self.series_start {
            return ControlFlow::Continue(());
        }
        if let Some(until) = self.rule.until
            && candidate > until
        {
            return ControlFlow::Break(());
        }
        if candidate >= self.window.end() {
            return ControlFlow::Break(());
        }
        self.seen += 1;
        if self.exceptions.binary_search(&candidate).is_err()
            && candidate >= self.window.start()
        {
            self.occurrences.push(candidate);
        }
        if let Some(count) = self.rule.count
            && self.seen >= u64::from(count)
        {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn run_daily(&mut self) {
        self.run_fixed_step(i64::from(self.rule.interval));
    }

    fn run_weekly(&mut self) {
        if self.by_day.is_empty() {
            // Without byDay the weekday of the series start carries through.
            self.run_fixed_step(i64::from(self.rule.interval) * 7);
            return;
        }

        // Weeks run Sunday through Saturday; week zero contains the series
        // start. Its listed days that land before the start are skipped by
        // the gates.
        let back_to_sunday =
            u64::from(self.series_start.weekday().num_days_from_sunday());
        let Some(week_anchor) = self
            .series_start
            .date_naive()
            .checked_sub_days(Days::new(back_to_sunday))
        else {
            return;
        };

        let week_step = u64::from(self.rule.interval) * 7;
        let by_day = self.by_day.clone();
        'weeks: for period in 0_u64.. {
            let Some(offset) = period.checked_mul(week_step) else {
                break;
            };
            let Some(week_start) = week_anchor.checked_add_days(Days::new(offset)) else {
                break;
            };
            for &day in &by_day {
                let Some(date) =
                    week_start.checked_add_days(Days::new(u64::from(day.index())))
                else {
                    break 'weeks;
                };
                let candidate = self.at_start_time(date);
                if self.offer(candidate).is_break() {
                    break 'weeks;
                }
            }
        }
    }

    fn run_monthly(&mut self) {
        let anchor_year = self.series_start.year();
        let anchor_month = self.series_start.month();

        let month_days = self.month_days.clone();
        'periods: for period in 0_i64.. {
            let Some(delta) = i64::from(self.rule.interval).checked_mul(period) else {
                break;
            };
            let Some((year, month)) = shift_month(anchor_year, anchor_month, delta) else {
                break;
            };
            let Some(month_first) = NaiveDate::from_ymd_opt(year, month, 1) else {
                break;
            };
            // A month whose listed days all overflow its length offers no
            // candidates; this floor keeps the scan bounded regardless.
            if self.at_start_time(month_first) >= self.window.end() {
                break;
            }
            for &day in &month_days {
                // Days the month does not have are skipped, never clamped.
                let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                    continue;
                };
                if !self.day_allowed(date) {
                    continue;
                }
                let candidate = self.at_start_time(date);
                if self.offer(candidate).is_break() {
                    break 'periods;
                }
            }
        }
    }

    fn run_yearly(&mut self) {
        let anchor_year = self.series_start.year();

        let months = self.months.clone();
        let month_days = self.month_days.clone();
        'periods: for period in 0_i64.. {
            let Some(offset) = i64::from(self.rule.interval).checked_mul(period) else {
                break;
            };
            let Some(year) = i64::from(anchor_year)
                .checked_add(offset)
                .and_then(|year| i32::try_from(year).ok())
            else {
                break;
            };
            let Some(year_first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                break;
            };
            if self.at_start_time(year_first) >= self.window.end() {
                break;
            }
            for &month in &months {
                for &day in &month_days {
                    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                        continue;
                    };
                    if !self.day_allowed(date) {
                        continue;
                    }
                    let candidate = self.at_start_time(date);
                    if self.offer(candidate).is_break() {
                        break 'periods;
                    }
                }
            }
        }
    }

    /// Daily stepping, also used for weekly rules without byDay.
    fn run_fixed_step(&mut self, step_days: i64) {
        for period in 0_i64.. {
            let Some(days) = step_days.checked_mul(period) else {
                break;
            };
            let Some(delta) = TimeDelta::try_days(days) else {
                break;
            };
            let Some(candidate) = self.series_start.checked_add_signed(delta) else {
                break;
            };
            if self.offer(candidate).is_break() {
                break;
            }
        }
    }

    /// byDay narrows monthly and yearly candidates.
    fn day_allowed(&self, date: NaiveDate) -> bool {
        self.by_day.is_empty() || self.by_day.binary_search(&Weekday::of(date)).is_ok()
    }

    fn at_start_time(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(self.start_time).and_utc()
    }
}

/// Adds `delta` months to a year/month pair without building a date.
fn shift_month(year: i32, month: u32, delta: i64) -> Option<(i32, u32)> {
    let base = i64::from(year)
        .checked_mul(12)?
        .checked_add(i64::from(month) - 1)?;
    let shifted = base.checked_add(delta)?;
    let year = i32::try_from(shifted.div_euclid(12)).ok()?;
    let month = u32::try_from(shifted.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .unwrap()
    }

    fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeWindow {
        TimeWindow::new(start, end).unwrap()
    }

    #[test]
    fn daily_with_interval_steps_over_days() {
        let rule = RecurrenceRule::new(Frequency::Daily).with_interval(2);
        let start = utc(2025, 1, 1, 9, 0);
        let out = expand(
            &rule,
            start,
            window(utc(2025, 1, 1, 0, 0), utc(2025, 1, 8, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 1, 9, 0),
                utc(2025, 1, 3, 9, 0),
                utc(2025, 1, 5, 9, 0),
                utc(2025, 1, 7, 9, 0),
            ]
        );
    }

    #[test]
    fn weekly_by_day_skips_listed_days_before_the_series_start() {
        // 2025-01-01 was a Wednesday; Monday of that week precedes the start.
        let rule = RecurrenceRule::new(Frequency::Weekly)
            .with_by_day(vec![Weekday::Monday, Weekday::Friday])
            .with_count(3);
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2024, 12, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 3, 9, 0),
                utc(2025, 1, 6, 9, 0),
                utc(2025, 1, 10, 9, 0),
            ]
        );
    }

    #[test]
    fn weekly_interval_two_skips_alternate_weeks() {
        let rule = RecurrenceRule::new(Frequency::Weekly)
            .with_interval(2)
            .with_by_day(vec![Weekday::Monday, Weekday::Friday]);
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 1, 20, 0, 0)),
        )
        .unwrap();
        // Week of Dec 29 (Fri Jan 3), then the week of Jan 12.
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 3, 9, 0),
                utc(2025, 1, 13, 9, 0),
                utc(2025, 1, 17, 9, 0),
            ]
        );
    }

    #[test]
    fn exceptions_suppress_emission_but_consume_count() {
        let rule = RecurrenceRule::new(Frequency::Daily)
            .with_count(5)
            .with_exceptions(vec![utc(2025, 1, 2, 9, 0)]);
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 1, 9, 0),
                utc(2025, 1, 3, 9, 0),
                utc(2025, 1, 4, 9, 0),
                utc(2025, 1, 5, 9, 0),
            ]
        );
    }

    #[test]
    fn occurrences_before_the_window_consume_count() {
        let rule = RecurrenceRule::new(Frequency::Daily).with_count(10);
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 8, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        // Seven occurrences land before the window and use up the budget.
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 8, 9, 0),
                utc(2025, 1, 9, 9, 0),
                utc(2025, 1, 10, 9, 0),
            ]
        );
    }

    #[test]
    fn monthly_on_the_31st_skips_short_months() {
        let rule = RecurrenceRule::new(Frequency::Monthly);
        let out = expand(
            &rule,
            utc(2025, 1, 31, 10, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 8, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 31, 10, 0),
                utc(2025, 3, 31, 10, 0),
                utc(2025, 5, 31, 10, 0),
                utc(2025, 7, 31, 10, 0),
            ]
        );
    }

    #[test]
    fn skipped_short_months_do_not_consume_count() {
        let rule = RecurrenceRule::new(Frequency::Monthly).with_count(3);
        let out = expand(
            &rule,
            utc(2025, 1, 31, 10, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2026, 1, 1, 0, 0)),
        )
        .unwrap();
        // Feb and Apr have no 31st; the third occurrence is in May.
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 31, 10, 0),
                utc(2025, 3, 31, 10, 0),
                utc(2025, 5, 31, 10, 0),
            ]
        );
    }

    #[test]
    fn until_is_inclusive() {
        let rule = RecurrenceRule::new(Frequency::Daily).with_until(utc(2025, 1, 3, 9, 0));
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.last(), Some(&utc(2025, 1, 3, 9, 0)));
    }

    #[test]
    fn an_instant_just_before_until_is_the_last_occurrence() {
        let rule = RecurrenceRule::new(Frequency::Daily)
            .with_until(utc(2025, 1, 3, 8, 59));
        let out = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn yearly_leap_day_only_lands_on_leap_years() {
        let rule = RecurrenceRule::new(Frequency::Yearly);
        let out = expand(
            &rule,
            utc(2024, 2, 29, 12, 0),
            window(utc(2024, 1, 1, 0, 0), utc(2029, 1, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(out, vec![utc(2024, 2, 29, 12, 0), utc(2028, 2, 29, 12, 0)]);
    }

    #[test]
    fn yearly_by_month_emits_in_calendar_order() {
        let rule = RecurrenceRule::new(Frequency::Yearly).with_by_month(vec![9, 3]);
        let out = expand(
            &rule,
            utc(2025, 3, 15, 8, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2027, 1, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 3, 15, 8, 0),
                utc(2025, 9, 15, 8, 0),
                utc(2026, 3, 15, 8, 0),
                utc(2026, 9, 15, 8, 0),
            ]
        );
    }

    #[test]
    fn monthly_by_day_narrows_to_matching_weekdays() {
        // The 13th of the month, Fridays only.
        let rule = RecurrenceRule::new(Frequency::Monthly)
            .with_by_month_day(vec![13])
            .with_by_day(vec![Weekday::Friday]);
        let out = expand(
            &rule,
            utc(2025, 1, 13, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2027, 1, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 6, 13, 9, 0),
                utc(2026, 2, 13, 9, 0),
                utc(2026, 3, 13, 9, 0),
                utc(2026, 11, 13, 9, 0),
            ]
        );
    }

    #[test]
    fn duplicate_month_days_emit_once() {
        let rule =
            RecurrenceRule::new(Frequency::Monthly).with_by_month_day(vec![20, 5, 20, 5]);
        let out = expand(
            &rule,
            utc(2025, 1, 5, 7, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 3, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                utc(2025, 1, 5, 7, 0),
                utc(2025, 1, 20, 7, 0),
                utc(2025, 2, 5, 7, 0),
                utc(2025, 2, 20, 7, 0),
            ]
        );
    }

    #[test]
    fn output_is_strictly_increasing() {
        let rule = RecurrenceRule::new(Frequency::Weekly)
            .with_by_day(vec![Weekday::Saturday, Weekday::Sunday, Weekday::Wednesday]);
        let out = expand(
            &rule,
            utc(2025, 1, 1, 23, 30),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 4, 1, 0, 0)),
        )
        .unwrap();
        assert!(!out.is_empty());
        assert!(out.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn empty_window_yields_nothing() {
        let rule = RecurrenceRule::new(Frequency::Daily);
        let at = utc(2025, 1, 1, 9, 0);
        let out = expand(&rule, at, window(at, at)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn series_starting_after_the_window_yields_nothing() {
        let rule = RecurrenceRule::new(Frequency::Daily);
        let out = expand(
            &rule,
            utc(2025, 3, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_rule_is_reported_before_any_work() {
        let rule = RecurrenceRule::new(Frequency::Daily).with_interval(0);
        let err = expand(
            &rule,
            utc(2025, 1, 1, 9, 0),
            window(utc(2025, 1, 1, 0, 0), utc(2025, 2, 1, 0, 0)),
        )
        .unwrap_err();
        assert_eq!(err, crate::error::RuleError::IntervalOutOfRange(0));
    }

    #[test]
    fn shift_month_wraps_across_year_boundaries() {
        assert_eq!(shift_month(2025, 11, 3), Some((2026, 2)));
        assert_eq!(shift_month(2025, 1, 12), Some((2026, 1)));
        assert_eq!(shift_month(2025, 6, 0), Some((2025, 6)));
        assert_eq!(shift_month(2025, 12, 1), Some((2026, 1)));
    }
}
