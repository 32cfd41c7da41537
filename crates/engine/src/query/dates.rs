//! Relative date windows
//!
//! Every date operator reduces to a [`Window`] computed from the clock's
//! current instant, the configured week start, the relative-day rule and
//! the fiscal calendar. All arithmetic is in UTC; day-based windows start
//! and end at UTC midnight.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use memcrm_core::{parse_datetime, Value};

use crate::config::{EngineConfig, RelativeDayWindow};
use crate::fiscal::midnight;

use super::expression::ConditionOperator;

/// Half-open (or closed) time interval; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Upper bound
    pub end: Option<DateTime<Utc>>,
    /// True when `end` itself is inside the window
    pub end_inclusive: bool,
}

impl Window {
    fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            end_inclusive: false,
        }
    }

    fn through(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            end_inclusive: true,
        }
    }

    fn before(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
            end_inclusive: false,
        }
    }

    fn from(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
            end_inclusive: false,
        }
    }

    /// True when `t` lies inside the window.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        let after_start = self.start.map(|s| t >= s).unwrap_or(true);
        let before_end = match self.end {
            None => true,
            Some(e) if self.end_inclusive => t <= e,
            Some(e) => t < e,
        };
        after_start && before_end
    }
}

/// Evaluate a date operator against a non-null attribute value.
///
/// Values that are not dates (after parsing text) never match.
pub fn matches(
    operator: ConditionOperator,
    operands: &[Value],
    value: &Value,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> bool {
    let Some(t) = as_datetime(value) else {
        return false;
    };
    match operator {
        ConditionOperator::NotOn => window(ConditionOperator::On, operands, now, config)
            .map(|w| !w.contains(t))
            .unwrap_or(false),
        ConditionOperator::InFiscalPeriod => count(operands, 0)
            .map(|p| i64::from(config.fiscal_calendar.period(t)) == p)
            .unwrap_or(false),
        other => window(other, operands, now, config)
            .map(|w| w.contains(t))
            .unwrap_or(false),
    }
}

/// Window of a date operator; `None` for missing or invalid operands.
pub fn window(
    operator: ConditionOperator,
    operands: &[Value],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Option<Window> {
    use ConditionOperator::*;

    let today = now.date_naive();
    let day = |offset: i64| midnight(today + Duration::days(offset));
    let fiscal = &config.fiscal_calendar;

    Some(match operator {
        Today => Window::between(day(0), day(1)),
        Yesterday => Window::between(day(-1), day(0)),
        Tomorrow => Window::between(day(1), day(2)),
        Last7Days => last_days(7, now, config),
        Next7Days => next_days(7, now, config),

        LastXHours => Window::through(now - Duration::hours(count(operands, 0)?), now),
        NextXHours => Window::through(now, now + Duration::hours(count(operands, 0)?)),
        LastXDays => last_days(count(operands, 0)?, now, config),
        NextXDays => next_days(count(operands, 0)?, now, config),
        LastXWeeks => last_days(count(operands, 0)? * 7, now, config),
        NextXWeeks => next_days(count(operands, 0)? * 7, now, config),
        LastXMonths => {
            let n = months(operands)?;
            Window::through(anchor_start(now, config).checked_sub_months(n)?, now)
        }
        NextXMonths => {
            let n = months(operands)?;
            Window::through(now, anchor_end(now, config).checked_add_months(n)?)
        }
        LastXYears => {
            Window::through(anchor_start(now, config).checked_sub_months(years(operands)?)?, now)
        }
        NextXYears => {
            Window::through(now, anchor_end(now, config).checked_add_months(years(operands)?)?)
        }

        OlderThanXMinutes => Window::before(now - Duration::minutes(count(operands, 0)?)),
        OlderThanXHours => Window::before(now - Duration::hours(count(operands, 0)?)),
        OlderThanXDays => Window::before(day(-count(operands, 0)?)),
        OlderThanXWeeks => Window::before(day(-count(operands, 0)? * 7)),
        OlderThanXMonths => Window::before(day(0).checked_sub_months(months(operands)?)?),
        OlderThanXYears => Window::before(day(0).checked_sub_months(years(operands)?)?),

        ThisWeek => week(today, 0, config),
        LastWeek => week(today, -1, config),
        NextWeek => week(today, 1, config),
        ThisMonth => month(today, 0)?,
        LastMonth => month(today, -1)?,
        NextMonth => month(today, 1)?,
        ThisYear => year(today.year())?,
        LastYear => year(today.year() - 1)?,
        NextYear => year(today.year() + 1)?,

        On => {
            let d = operand_date(operands)?;
            Window::between(midnight(d), midnight(d + Duration::days(1)))
        }
        OnOrBefore => Window::before(midnight(operand_date(operands)? + Duration::days(1))),
        OnOrAfter => Window::from(midnight(operand_date(operands)?)),

        InFiscalYear => {
            let (start, end) = fiscal.year_bounds(i32::try_from(count(operands, 0)?).ok()?);
            Window::between(start, end)
        }
        InFiscalPeriodAndYear => {
            let (start, end) = fiscal_period(operands, config)?;
            Window::between(start, end)
        }
        InOrBeforeFiscalPeriodAndYear => Window::before(fiscal_period(operands, config)?.1),
        InOrAfterFiscalPeriodAndYear => Window::from(fiscal_period(operands, config)?.0),
        ThisFiscalYear | LastFiscalYear | NextFiscalYear => {
            let delta = match operator {
                LastFiscalYear => -1,
                NextFiscalYear => 1,
                _ => 0,
            };
            let (start, end) = fiscal.year_bounds(fiscal.fiscal_year(now) + delta);
            Window::between(start, end)
        }
        ThisFiscalPeriod | LastFiscalPeriod | NextFiscalPeriod => {
            let delta = match operator {
                LastFiscalPeriod => -1,
                NextFiscalPeriod => 1,
                _ => 0,
            };
            let (y, p) = fiscal.shift_period(fiscal.fiscal_year(now), fiscal.period(now), delta);
            let (start, end) = fiscal.period_bounds(y, p)?;
            Window::between(start, end)
        }
        _ => return None,
    })
}

fn last_days(days: i64, now: DateTime<Utc>, config: &EngineConfig) -> Window {
    match config.relative_day_window {
        RelativeDayWindow::Calendar => {
            Window::through(midnight(now.date_naive() - Duration::days(days)), now)
        }
        RelativeDayWindow::Rolling => Window::through(now - Duration::days(days), now),
    }
}

fn next_days(days: i64, now: DateTime<Utc>, config: &EngineConfig) -> Window {
    match config.relative_day_window {
        RelativeDayWindow::Calendar => Window::between(
            now,
            midnight(now.date_naive() + Duration::days(days + 1)),
        ),
        RelativeDayWindow::Rolling => Window::through(now, now + Duration::days(days)),
    }
}

/// Start anchor of month/year look-backs.
fn anchor_start(now: DateTime<Utc>, config: &EngineConfig) -> DateTime<Utc> {
    match config.relative_day_window {
        RelativeDayWindow::Calendar => midnight(now.date_naive()),
        RelativeDayWindow::Rolling => now,
    }
}

/// End anchor of month/year look-aheads.
fn anchor_end(now: DateTime<Utc>, config: &EngineConfig) -> DateTime<Utc> {
    match config.relative_day_window {
        RelativeDayWindow::Calendar => midnight(now.date_naive() + Duration::days(1)),
        RelativeDayWindow::Rolling => now,
    }
}

fn week(today: NaiveDate, offset: i64, config: &EngineConfig) -> Window {
    let since_start = (7 + today.weekday().num_days_from_monday()
        - config.week_start.num_days_from_monday())
        % 7;
    let start = today - Duration::days(i64::from(since_start)) + Duration::weeks(offset);
    Window::between(midnight(start), midnight(start + Duration::weeks(1)))
}

fn month(today: NaiveDate, offset: i32) -> Option<Window> {
    let first = today.with_day(1)?;
    let start = if offset >= 0 {
        first.checked_add_months(Months::new(offset as u32))?
    } else {
        first.checked_sub_months(Months::new(offset.unsigned_abs()))?
    };
    let end = start.checked_add_months(Months::new(1))?;
    Some(Window::between(midnight(start), midnight(end)))
}

fn year(y: i32) -> Option<Window> {
    let start = NaiveDate::from_ymd_opt(y, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(y + 1, 1, 1)?;
    Some(Window::between(midnight(start), midnight(end)))
}

fn fiscal_period(
    operands: &[Value],
    config: &EngineConfig,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let period = u32::try_from(count(operands, 0)?).ok()?;
    let year = i32::try_from(count(operands, 1)?).ok()?;
    config.fiscal_calendar.period_bounds(year, period)
}

fn count(operands: &[Value], index: usize) -> Option<i64> {
    operands.get(index)?.as_i64().filter(|n| *n >= 0)
}

fn months(operands: &[Value]) -> Option<Months> {
    u32::try_from(count(operands, 0)?).ok().map(Months::new)
}

fn years(operands: &[Value]) -> Option<Months> {
    u32::try_from(count(operands, 0)?)
        .ok()?
        .checked_mul(12)
        .map(Months::new)
}

fn operand_date(operands: &[Value]) -> Option<NaiveDate> {
    as_datetime(operands.first()?).map(|t| t.date_naive())
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value.unaliased() {
        Value::DateTime(t) => Some(*t),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn check(op: ConditionOperator, operands: &[Value], t: DateTime<Utc>, config: &EngineConfig) -> bool {
        matches(op, operands, &Value::DateTime(t), now(), config)
    }

    #[test]
    fn today_yesterday_tomorrow_truncate_to_days() {
        let config = EngineConfig::default();
        assert!(check(ConditionOperator::Today, &[], at(2024, 5, 15, 0), &config));
        assert!(check(ConditionOperator::Today, &[], at(2024, 5, 15, 23), &config));
        assert!(!check(ConditionOperator::Today, &[], at(2024, 5, 16, 0), &config));
        assert!(check(ConditionOperator::Yesterday, &[], at(2024, 5, 14, 9), &config));
        assert!(check(ConditionOperator::Tomorrow, &[], at(2024, 5, 16, 9), &config));
    }

    #[test]
    fn last_x_days_calendar_vs_rolling() {
        let calendar = EngineConfig::default();
        let rolling = EngineConfig::default().with_relative_day_window(RelativeDayWindow::Rolling);
        let early = at(2024, 5, 12, 1);
        let operands = [Value::Int(3)];
        assert!(check(ConditionOperator::LastXDays, &operands, early, &calendar));
        assert!(!check(ConditionOperator::LastXDays, &operands, early, &rolling));
        assert!(!check(ConditionOperator::LastXDays, &operands, at(2024, 5, 15, 18), &calendar));
    }

    #[test]
    fn next_x_days_covers_whole_last_day() {
        let config = EngineConfig::default();
        let operands = [Value::Int(2)];
        assert!(check(ConditionOperator::NextXDays, &operands, at(2024, 5, 17, 23), &config));
        assert!(!check(ConditionOperator::NextXDays, &operands, at(2024, 5, 18, 0), &config));
        assert!(!check(ConditionOperator::NextXDays, &operands, at(2024, 5, 15, 10), &config));
    }

    #[test]
    fn older_than_uses_midnight_for_days() {
        let config = EngineConfig::default();
        let operands = [Value::Int(1)];
        assert!(check(ConditionOperator::OlderThanXDays, &operands, at(2024, 5, 13, 23), &config));
        assert!(!check(ConditionOperator::OlderThanXDays, &operands, at(2024, 5, 14, 1), &config));
        assert!(check(ConditionOperator::OlderThanXHours, &operands, at(2024, 5, 15, 13), &config));
    }

    #[test]
    fn week_respects_week_start() {
        let sunday = EngineConfig::default();
        let monday = EngineConfig::default().with_week_start(Weekday::Mon);
        let sunday_12th = at(2024, 5, 12, 10);
        assert!(check(ConditionOperator::ThisWeek, &[], sunday_12th, &sunday));
        assert!(!check(ConditionOperator::ThisWeek, &[], sunday_12th, &monday));
        assert!(check(ConditionOperator::LastWeek, &[], sunday_12th, &monday));
    }

    #[test]
    fn on_and_neighbours() {
        let config = EngineConfig::default();
        let day = [Value::from("2024-05-01")];
        assert!(check(ConditionOperator::On, &day, at(2024, 5, 1, 22), &config));
        assert!(check(ConditionOperator::NotOn, &day, at(2024, 5, 2, 0), &config));
        assert!(check(ConditionOperator::OnOrBefore, &day, at(2024, 5, 1, 23), &config));
        assert!(!check(ConditionOperator::OnOrAfter, &day, at(2024, 4, 30, 23), &config));
    }

    #[test]
    fn fiscal_operators() {
        let config = EngineConfig::default();
        let t = at(2024, 8, 1, 0);
        assert!(check(ConditionOperator::InFiscalYear, &[Value::Int(2024)], t, &config));
        assert!(check(ConditionOperator::InFiscalPeriod, &[Value::Int(3)], t, &config));
        assert!(check(
            ConditionOperator::InFiscalPeriodAndYear,
            &[Value::Int(3), Value::Int(2024)],
            t,
            &config
        ));
        assert!(check(ConditionOperator::NextFiscalPeriod, &[], t, &config));
        assert!(check(ConditionOperator::ThisFiscalYear, &[], t, &config));
        assert!(!check(ConditionOperator::LastFiscalYear, &[], t, &config));
    }

    #[test]
    fn non_dates_never_match() {
        let config = EngineConfig::default();
        assert!(!matches(ConditionOperator::Today, &[], &Value::Int(5), now(), &config));
    }
}
