//! Time types for the basket engine.
//!
//! This module provides:
//! - `Date`: Type-safe date wrapper around chrono::NaiveDate
//! - `DayCountConvention`: Year-fraction conventions used to map the
//!   engine's date grid onto curve time
//! - `TimeStep` / `TimeUnit`: The step used to generate the engine's
//!   distribution date grid

use crate::types::error::DateError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Type-safe date wrapper around chrono::NaiveDate.
///
/// All engine inputs (as-of, settlement, maturity, default dates) are
/// expressed as `Date`. Arithmetic lives on [`TimeStep`] and year
/// fractions on [`DayCountConvention`].
///
/// # Example
///
/// ```
/// use basket_core::types::Date;
///
/// let d = Date::from_ymd(2026, 6, 30).unwrap();
/// assert_eq!(d.year(), 2026);
/// assert_eq!(format!("{}", d), "2026-06-30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date(NaiveDate);

impl Date {
    /// Construct a date from year, month, and day components.
    ///
    /// # Returns
    ///
    /// * `Ok(Date)` - A valid calendar date
    /// * `Err(DateError::InvalidDate)` - Components do not form a valid date
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Parse a date from an ISO-8601 `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Date)
            .map_err(|e| DateError::ParseError(e.to_string()))
    }

    /// Return the underlying NaiveDate.
    #[inline]
    pub fn inner(&self) -> NaiveDate {
        self.0
    }

    /// Year component.
    #[inline]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month component (1-12).
    #[inline]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day component (1-31).
    #[inline]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Signed number of calendar days from `self` to `other`.
    #[inline]
    pub fn days_until(&self, other: Date) -> i64 {
        (other.0 - self.0).num_days()
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Day count conventions for converting date pairs to year fractions.
///
/// The engine uses a single convention throughout a pricing run to map
/// its date grid onto curve time; Act/365 Fixed is the default for
/// credit curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DayCountConvention {
    /// Actual/365 Fixed: actual days divided by 365.
    #[default]
    Act365Fixed,
    /// Actual/360: actual days divided by 360.
    Act360,
}

impl DayCountConvention {
    /// Year fraction between two dates under this convention.
    ///
    /// Negative when `end` precedes `start`.
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        let days = start.days_until(end) as f64;
        match self {
            DayCountConvention::Act365Fixed => days / 365.0,
            DayCountConvention::Act360 => days / 360.0,
        }
    }
}

/// Calendar unit of a [`TimeStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Calendar days.
    Days,
    /// Calendar weeks (7 days).
    Weeks,
    /// Calendar months.
    Months,
    /// Calendar years.
    Years,
}

/// Step size used to generate the engine's distribution date grid.
///
/// # Example
///
/// ```
/// use basket_core::types::{Date, TimeStep, TimeUnit};
///
/// let step = TimeStep::new(3, TimeUnit::Months).unwrap();
/// let start = Date::from_ymd(2026, 1, 1).unwrap();
/// let next = step.advance(start);
/// assert_eq!(next, Date::from_ymd(2026, 4, 1).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStep {
    size: u32,
    unit: TimeUnit,
}

impl TimeStep {
    /// Construct a time step. The size must be positive.
    pub fn new(size: u32, unit: TimeUnit) -> Result<Self, DateError> {
        if size == 0 {
            return Err(DateError::ParseError(
                "time step size must be positive".to_string(),
            ));
        }
        Ok(Self { size, unit })
    }

    /// Step size in units.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Calendar unit.
    #[inline]
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Advance a date by one step.
    ///
    /// Month and year steps saturate on short months (Jan 31 + 1M = Feb 28/29).
    pub fn advance(&self, date: Date) -> Date {
        let d = date.inner();
        let next = match self.unit {
            TimeUnit::Days => d
                .checked_add_days(Days::new(self.size as u64))
                .unwrap_or(d),
            TimeUnit::Weeks => d
                .checked_add_days(Days::new(7 * self.size as u64))
                .unwrap_or(d),
            TimeUnit::Months => d
                .checked_add_months(Months::new(self.size))
                .unwrap_or(d),
            TimeUnit::Years => d
                .checked_add_months(Months::new(12 * self.size))
                .unwrap_or(d),
        };
        Date(next)
    }

    /// Generate the inclusive date grid from `start` to `maturity`.
    ///
    /// The grid always starts at `start` and always ends exactly at
    /// `maturity`; the final step is shortened if necessary.
    pub fn grid(&self, start: Date, maturity: Date) -> Vec<Date> {
        let mut dates = vec![start];
        let mut current = start;
        while current < maturity {
            let next = self.advance(current);
            if next <= current {
                // Degenerate step near the end of the calendar range.
                break;
            }
            current = if next < maturity { next } else { maturity };
            dates.push(current);
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ymd_valid() {
        let d = Date::from_ymd(2026, 2, 28).unwrap();
        assert_eq!(d.year(), 2026);
        assert_eq!(d.month(), 2);
        assert_eq!(d.day(), 28);
    }

    #[test]
    fn test_from_ymd_invalid() {
        let result = Date::from_ymd(2026, 2, 30);
        assert_eq!(
            result.unwrap_err(),
            DateError::InvalidDate {
                year: 2026,
                month: 2,
                day: 30
            }
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let d = Date::parse("2026-08-30").unwrap();
        assert_eq!(format!("{}", d), "2026-08-30");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Date::parse("30/08/2026").is_err());
    }

    #[test]
    fn test_ordering() {
        let a = Date::from_ymd(2026, 1, 1).unwrap();
        let b = Date::from_ymd(2026, 6, 1).unwrap();
        assert!(a < b);
        assert_eq!(a.days_until(b), 151);
        assert_eq!(b.days_until(a), -151);
    }

    #[test]
    fn test_year_fraction_act365() {
        let a = Date::from_ymd(2025, 1, 1).unwrap();
        let b = Date::from_ymd(2026, 1, 1).unwrap();
        let yf = DayCountConvention::Act365Fixed.year_fraction(a, b);
        assert!((yf - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_year_fraction_act360() {
        let a = Date::from_ymd(2026, 1, 1).unwrap();
        let b = Date::from_ymd(2026, 7, 1).unwrap();
        let yf = DayCountConvention::Act360.year_fraction(a, b);
        assert!((yf - 181.0 / 360.0).abs() < 1e-10);
    }

    #[test]
    fn test_time_step_zero_size_rejected() {
        assert!(TimeStep::new(0, TimeUnit::Months).is_err());
    }

    #[test]
    fn test_time_step_advance_months_saturates() {
        let step = TimeStep::new(1, TimeUnit::Months).unwrap();
        let d = Date::from_ymd(2026, 1, 31).unwrap();
        assert_eq!(step.advance(d), Date::from_ymd(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_grid_ends_exactly_at_maturity() {
        let step = TimeStep::new(3, TimeUnit::Months).unwrap();
        let start = Date::from_ymd(2026, 1, 1).unwrap();
        let maturity = Date::from_ymd(2026, 8, 15).unwrap();
        let grid = step.grid(start, maturity);

        assert_eq!(grid.first().copied(), Some(start));
        assert_eq!(grid.last().copied(), Some(maturity));
        for w in grid.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_grid_single_point_when_start_equals_maturity() {
        let step = TimeStep::new(1, TimeUnit::Years).unwrap();
        let d = Date::from_ymd(2026, 1, 1).unwrap();
        assert_eq!(step.grid(d, d), vec![d]);
    }
}
