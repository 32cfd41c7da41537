//! Engine configuration
//!
//! Everything externally configurable about an engine instance: the clock,
//! the fiscal calendar, the full-name template, which relationship types may
//! be written directly, the relative-day window rule, the first day of the
//! week, attribute validation and the currency symbol used for formatting.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::fiscal::FiscalCalendar;

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    /// Advance the clock.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Boundary rule for `last-x-*` / `next-x-*` day-based operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelativeDayWindow {
    /// Whole days: `last-x-days` starts at midnight x days ago and
    /// `next-x-days` ends at the end of the day x days ahead.
    #[default]
    Calendar,
    /// Exactly x × 24 hours either side of now.
    Rolling,
}

/// Engine configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Current-time source
    #[serde(skip, default = "default_clock")]
    pub clock: Arc<dyn Clock>,
    /// Fiscal calendar
    pub fiscal_calendar: FiscalCalendar,
    /// `fullname` template with `{firstname}`, `{middlename}`, `{lastname}`
    pub full_name_format: String,
    /// Intersect types that may be created/deleted directly
    pub writable_relationship_types: BTreeSet<String>,
    /// Day-window boundary rule
    pub relative_day_window: RelativeDayWindow,
    /// First day of the week for week operators and groupings
    pub week_start: Weekday,
    /// Reject attributes not declared on declared types
    pub validate_attributes: bool,
    /// Currency symbol used for money formatted values
    pub currency_symbol: String,
}

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock: default_clock(),
            fiscal_calendar: FiscalCalendar::default(),
            full_name_format: "{firstname} {lastname}".to_string(),
            writable_relationship_types: BTreeSet::new(),
            relative_day_window: RelativeDayWindow::Calendar,
            week_start: Weekday::Sun,
            validate_attributes: false,
            currency_symbol: "$".to_string(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("now", &self.clock.now())
            .field("fiscal_calendar", &self.fiscal_calendar)
            .field("full_name_format", &self.full_name_format)
            .field("writable_relationship_types", &self.writable_relationship_types)
            .field("relative_day_window", &self.relative_day_window)
            .field("week_start", &self.week_start)
            .field("validate_attributes", &self.validate_attributes)
            .finish()
    }
}

impl EngineConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Freeze the clock at `now`.
    pub fn with_fixed_time(self, now: DateTime<Utc>) -> Self {
        self.with_clock(Arc::new(FixedClock::new(now)))
    }

    /// Use the given fiscal calendar.
    pub fn with_fiscal_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.fiscal_calendar = calendar;
        self
    }

    /// Use the given full-name template.
    pub fn with_full_name_format(mut self, format: impl Into<String>) -> Self {
        self.full_name_format = format.into();
        self
    }

    /// Allow direct writes to an intersect type.
    pub fn with_writable_relationship_type(mut self, logical_name: impl Into<String>) -> Self {
        self.writable_relationship_types.insert(logical_name.into());
        self
    }

    /// Use the given day-window rule.
    pub fn with_relative_day_window(mut self, window: RelativeDayWindow) -> Self {
        self.relative_day_window = window;
        self
    }

    /// Use the given first day of the week.
    pub fn with_week_start(mut self, day: Weekday) -> Self {
        self.week_start = day;
        self
    }

    /// Toggle attribute validation.
    pub fn with_attribute_validation(mut self, enabled: bool) -> Self {
        self.validate_attributes = enabled;
        self
    }

    /// Use the given currency symbol.
    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Current time from the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// True when direct writes to the intersect type are allowed.
    pub fn is_writable_relationship(&self, logical_name: &str) -> bool {
        self.writable_relationship_types.contains(logical_name)
    }

    /// Render the full name of a person from its name parts.
    pub fn format_full_name(&self, first: &str, middle: &str, last: &str) -> String {
        let rendered = self
            .full_name_format
            .replace("{firstname}", first)
            .replace("{middlename}", middle)
            .replace("{lastname}", last);
        rendered.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
