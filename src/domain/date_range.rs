//! Calendar date window used to bound the mailbox query.

use chrono::{Days, NaiveDate};
use std::fmt;

/// Half-open interval `[start, end)` of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day included in the window.
    pub start: NaiveDate,
    /// First day after the window.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// The window ending at `today` and reaching back `days` days.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today)
    }

    /// The window ending today (local time).
    pub fn ending_today(days: u32) -> Self {
        Self::last_days(chrono::Local::now().date_naive(), days)
    }

    #[cfg(test)]
    fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Renders the window in Gmail search syntax.
    pub fn to_query(&self) -> String {
        format!(
            "after:{} before:{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn last_seven_days_crosses_month_boundary() {
        let range = DateRange::last_days(date(2024, 3, 4), 7);
        assert_eq!(range.start, date(2024, 2, 26));
        assert_eq!(range.end, date(2024, 3, 4));
    }

    #[test]
    fn range_is_half_open() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 8));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 7)));
        assert!(!range.contains(date(2024, 1, 8)));
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let range = DateRange::new(date(2024, 1, 8), date(2024, 1, 1));
        assert_eq!(range.start, date(2024, 1, 1));
        assert_eq!(range.end, date(2024, 1, 8));
    }

    #[test]
    fn query_uses_iso_dates() {
        let range = DateRange::last_days(date(2024, 5, 15), 7);
        assert_eq!(range.to_query(), "after:2024-05-08 before:2024-05-15");
    }
}
