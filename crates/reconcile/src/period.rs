//! Calendar period boundaries.
//!
//! Dates are compared as calendar days on the proleptic Gregorian calendar;
//! nothing here knows about time zones.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::ReconcileError;
use crate::models::{BudgetPeriod, WeekStart};

/// Inclusive bounds of the week containing `date`.
pub fn week_bounds(
    date: NaiveDate,
    week_start: WeekStart,
) -> Result<(NaiveDate, NaiveDate), ReconcileError> {
    let offset = (date.weekday().num_days_from_sunday() + 7
        - week_start.0.num_days_from_sunday())
        % 7;
    let start = date
        .checked_sub_days(Days::new(offset as u64))
        .ok_or_else(|| out_of_calendar(date))?;
    let end = start
        .checked_add_days(Days::new(6))
        .ok_or_else(|| out_of_calendar(date))?;
    Ok((start, end))
}

/// Inclusive bounds of the calendar month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate), ReconcileError> {
    let start = date.with_day(1).ok_or_else(|| out_of_calendar(date))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| out_of_calendar(date))?;
    Ok((start, end))
}

/// `YYYY-MM` for an exact calendar month, otherwise the start date.
pub fn period_key(start: NaiveDate, end: NaiveDate) -> String {
    match month_bounds(start) {
        Ok((month_start, month_end)) if month_start == start && month_end == end => {
            start.format("%Y-%m").to_string()
        }
        _ => start.format("%Y-%m-%d").to_string(),
    }
}

fn out_of_calendar(date: NaiveDate) -> ReconcileError {
    ReconcileError::InvalidPeriod(format!("{} is at the edge of the supported calendar", date))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Period {
    Week { start: NaiveDate, end: NaiveDate },
    Month { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn week_of(date: NaiveDate, week_start: WeekStart) -> Result<Self, ReconcileError> {
        let (start, end) = week_bounds(date, week_start)?;
        Ok(Period::Week { start, end })
    }

    pub fn month_of(date: NaiveDate) -> Result<Self, ReconcileError> {
        let (start, end) = month_bounds(date)?;
        Ok(Period::Month { start, end })
    }

    /// Parses a `YYYY-MM` month key.
    pub fn parse_month(key: &str) -> Result<Self, ReconcileError> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", key.trim()), "%Y-%m-%d")
            .map_err(|_| {
                ReconcileError::InvalidPeriod(format!("invalid month '{}', expected YYYY-MM", key))
            })?;
        Self::month_of(first)
    }

    pub fn for_budget(
        period: BudgetPeriod,
        date: NaiveDate,
        week_start: WeekStart,
    ) -> Result<Self, ReconcileError> {
        match period {
            BudgetPeriod::Weekly => Self::week_of(date, week_start),
            BudgetPeriod::Monthly => Self::month_of(date),
        }
    }

    pub fn start(&self) -> NaiveDate {
        match self {
            Period::Week { start, .. } | Period::Month { start, .. } => *start,
        }
    }

    pub fn end(&self) -> NaiveDate {
        match self {
            Period::Week { end, .. } | Period::Month { end, .. } => *end,
        }
    }

    pub fn key(&self) -> String {
        period_key(self.start(), self.end())
    }

    /// The period immediately before this one, of the same kind.
    pub fn previous(&self) -> Result<Self, ReconcileError> {
        let day_before = self
            .start()
            .pred_opt()
            .ok_or_else(|| out_of_calendar(self.start()))?;
        match self {
            Period::Week { start, .. } => {
                let start = start
                    .checked_sub_days(Days::new(7))
                    .ok_or_else(|| out_of_calendar(*start))?;
                Ok(Period::Week {
                    start,
                    end: day_before,
                })
            }
            Period::Month { .. } => Self::month_of(day_before),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_defaults_to_sunday_start() {
        // 2024-03-13 is a Wednesday
        let (start, end) = week_bounds(d(2024, 3, 13), WeekStart::default()).unwrap();
        assert_eq!(start, d(2024, 3, 10));
        assert_eq!(end, d(2024, 3, 16));
    }

    #[test]
    fn test_week_with_monday_start() {
        let (start, end) = week_bounds(d(2024, 3, 10), WeekStart(Weekday::Mon)).unwrap();
        assert_eq!(start, d(2024, 3, 4));
        assert_eq!(end, d(2024, 3, 10));
    }

    #[test]
    fn test_week_on_its_first_day() {
        let (start, _) = week_bounds(d(2024, 3, 10), WeekStart::default()).unwrap();
        assert_eq!(start, d(2024, 3, 10));
    }

    #[test]
    fn test_month_bounds_leap_year() {
        assert_eq!(
            month_bounds(d(2024, 2, 14)).unwrap(),
            (d(2024, 2, 1), d(2024, 2, 29))
        );
        assert_eq!(
            month_bounds(d(2023, 12, 31)).unwrap(),
            (d(2023, 12, 1), d(2023, 12, 31))
        );
    }

    #[test]
    fn test_period_keys() {
        assert_eq!(period_key(d(2024, 2, 1), d(2024, 2, 29)), "2024-02");
        assert_eq!(period_key(d(2024, 2, 4), d(2024, 2, 10)), "2024-02-04");
        assert_eq!(Period::parse_month("2024-05").unwrap().key(), "2024-05");
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        assert!(Period::parse_month("2024-13").is_err());
        assert!(Period::parse_month("May 2024").is_err());
    }

    #[test]
    fn test_previous_periods() {
        let jan = Period::parse_month("2024-01").unwrap();
        assert_eq!(jan.previous().unwrap().key(), "2023-12");

        let week = Period::week_of(d(2024, 3, 13), WeekStart::default()).unwrap();
        let prev = week.previous().unwrap();
        assert_eq!(prev.start(), d(2024, 3, 3));
        assert_eq!(prev.end(), d(2024, 3, 9));
    }
}
