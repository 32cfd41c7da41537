//! Fiscal calendar
//!
//! Maps timestamps to fiscal years and periods for the fiscal date
//! operators and the fiscal date groupings. Labels follow the platform:
//! `FY2024` for a year and `Quarter 2 FY2024` for a period.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How a fiscal year is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FiscalPeriodTemplate {
    /// One period per year
    Annually,
    /// Two semesters
    SemiAnnually,
    /// Four quarters
    #[default]
    Quarterly,
    /// Twelve months
    Monthly,
}

impl FiscalPeriodTemplate {
    /// Number of periods per fiscal year.
    pub fn periods_per_year(&self) -> u32 {
        match self {
            FiscalPeriodTemplate::Annually => 1,
            FiscalPeriodTemplate::SemiAnnually => 2,
            FiscalPeriodTemplate::Quarterly => 4,
            FiscalPeriodTemplate::Monthly => 12,
        }
    }

    fn months_per_period(&self) -> u32 {
        12 / self.periods_per_year()
    }

    fn label(&self) -> &'static str {
        match self {
            FiscalPeriodTemplate::Annually => "Period",
            FiscalPeriodTemplate::SemiAnnually => "Semester",
            FiscalPeriodTemplate::Quarterly => "Quarter",
            FiscalPeriodTemplate::Monthly => "Month",
        }
    }
}

/// Which calendar year names a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FiscalYearNaming {
    /// Year in which the fiscal year starts
    #[default]
    StartYear,
    /// Year in which the fiscal year ends
    EndYear,
}

/// Fiscal calendar definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCalendar {
    /// First month of the fiscal year (1-12)
    pub start_month: u32,
    /// First day of the fiscal year
    pub start_day: u32,
    /// Period template
    pub template: FiscalPeriodTemplate,
    /// Year naming convention
    pub naming: FiscalYearNaming,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            start_month: 1,
            start_day: 1,
            template: FiscalPeriodTemplate::Quarterly,
            naming: FiscalYearNaming::StartYear,
        }
    }
}

impl FiscalCalendar {
    /// Calendar starting on the given month and day.
    pub fn new(start_month: u32, start_day: u32) -> Self {
        Self {
            start_month: start_month.clamp(1, 12),
            start_day: start_day.clamp(1, 31),
            ..Default::default()
        }
    }

    /// Set the period template.
    pub fn with_template(mut self, template: FiscalPeriodTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the year naming.
    pub fn with_naming(mut self, naming: FiscalYearNaming) -> Self {
        self.naming = naming;
        self
    }

    fn name_offset(&self) -> i32 {
        let starts_on_new_year = self.start_month == 1 && self.start_day == 1;
        match self.naming {
            FiscalYearNaming::EndYear if !starts_on_new_year => 1,
            _ => 0,
        }
    }

    fn start_of(&self, start_year: i32) -> DateTime<Utc> {
        let date = (1..=self.start_day)
            .rev()
            .find_map(|d| NaiveDate::from_ymd_opt(start_year, self.start_month, d))
            .unwrap_or(NaiveDate::MIN);
        midnight(date)
    }

    fn start_year_of(&self, t: DateTime<Utc>) -> i32 {
        if t >= self.start_of(t.year()) {
            t.year()
        } else {
            t.year() - 1
        }
    }

    /// Named fiscal year containing `t`.
    pub fn fiscal_year(&self, t: DateTime<Utc>) -> i32 {
        self.start_year_of(t) + self.name_offset()
    }

    /// Fiscal period (1-based) containing `t`.
    pub fn period(&self, t: DateTime<Utc>) -> u32 {
        let year = self.fiscal_year(t);
        (1..=self.template.periods_per_year())
            .find(|p| {
                self.period_bounds(year, *p)
                    .map(|(_, end)| t < end)
                    .unwrap_or(false)
            })
            .unwrap_or(self.template.periods_per_year())
    }

    /// `[start, end)` of a named fiscal year.
    pub fn year_bounds(&self, year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
        let start_year = year - self.name_offset();
        (self.start_of(start_year), self.start_of(start_year + 1))
    }

    /// `[start, end)` of a period; `None` when the period is out of range.
    pub fn period_bounds(&self, year: i32, period: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if period == 0 || period > self.template.periods_per_year() {
            return None;
        }
        let (year_start, _) = self.year_bounds(year);
        let step = self.template.months_per_period();
        let start = year_start.checked_add_months(Months::new((period - 1) * step))?;
        let end = year_start.checked_add_months(Months::new(period * step))?;
        Some((start, end))
    }

    /// Move `delta` periods from `(year, period)`.
    pub fn shift_period(&self, year: i32, period: u32, delta: i32) -> (i32, u32) {
        let per_year = self.template.periods_per_year() as i32;
        let index = year * per_year + (period as i32 - 1) + delta;
        (index.div_euclid(per_year), index.rem_euclid(per_year) as u32 + 1)
    }

    /// Year label, e.g. `FY2024`.
    pub fn year_label(&self, t: DateTime<Utc>) -> String {
        format!("FY{}", self.fiscal_year(t))
    }

    /// Period label, e.g. `Quarter 1 FY2024`.
    pub fn period_label(&self, t: DateTime<Utc>) -> String {
        format!(
            "{} {} FY{}",
            self.template.label(),
            self.period(t),
            self.fiscal_year(t)
        )
    }
}

/// Midnight UTC of a date.
pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|n| Utc.from_utc_datetime(&n))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn calendar_year_quarters() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.fiscal_year(at(2024, 5, 10)), 2024);
        assert_eq!(cal.period(at(2024, 5, 10)), 2);
        assert_eq!(cal.period_label(at(2024, 12, 31)), "Quarter 4 FY2024");
        assert_eq!(cal.year_label(at(2024, 1, 1)), "FY2024");
    }

    #[test]
    fn april_start_named_by_start_year() {
        let cal = FiscalCalendar::new(4, 1);
        assert_eq!(cal.fiscal_year(at(2024, 3, 31)), 2023);
        assert_eq!(cal.fiscal_year(at(2024, 4, 1)), 2024);
        assert_eq!(cal.period(at(2024, 4, 15)), 1);
        assert_eq!(cal.period(at(2025, 1, 15)), 4);
    }

    #[test]
    fn april_start_named_by_end_year() {
        let cal = FiscalCalendar::new(4, 1).with_naming(FiscalYearNaming::EndYear);
        assert_eq!(cal.fiscal_year(at(2024, 5, 1)), 2025);
        let (start, end) = cal.year_bounds(2025);
        assert_eq!(start, midnight(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert_eq!(end, midnight(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
    }

    #[test]
    fn monthly_and_semester_labels() {
        let monthly = FiscalCalendar::default().with_template(FiscalPeriodTemplate::Monthly);
        assert_eq!(monthly.period_label(at(2024, 7, 4)), "Month 7 FY2024");
        let semi = FiscalCalendar::default().with_template(FiscalPeriodTemplate::SemiAnnually);
        assert_eq!(semi.period_label(at(2024, 7, 4)), "Semester 2 FY2024");
    }

    #[test]
    fn shift_period_wraps_years() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.shift_period(2024, 1, -1), (2023, 4));
        assert_eq!(cal.shift_period(2024, 4, 1), (2025, 1));
        assert_eq!(cal.shift_period(2024, 2, 0), (2024, 2));
    }

    #[test]
    fn out_of_range_period() {
        let cal = FiscalCalendar::default();
        assert!(cal.period_bounds(2024, 5).is_none());
        assert!(cal.period_bounds(2024, 0).is_none());
    }
}
