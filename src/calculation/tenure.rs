//! Service tenure arithmetic.

use chrono::{Datelike, NaiveDate};

/// Full calendar months from `from` to `to`.
///
/// A month counts once the same day-of-month is reached; a partial month
/// does not count. Returns 0 when `to` precedes `from`.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::full_months_between;
/// use chrono::NaiveDate;
///
/// let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
/// assert_eq!(full_months_between(d(2025, 1, 15), d(2025, 5, 14)), 3);
/// assert_eq!(full_months_between(d(2025, 1, 15), d(2025, 5, 15)), 4);
/// ```
pub fn full_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Full years from `from` to `to`.
pub fn full_years_between(from: NaiveDate, to: NaiveDate) -> u32 {
    full_months_between(from, to) / 12
}

/// Calendar months from `from` to `to`, ignoring the day of month.
///
/// Used where a rule is evaluated per month (e.g. anniversary-month checks).
pub fn calendar_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_years_on_anniversary() {
        assert_eq!(full_years_between(date(2015, 6, 1), date(2025, 6, 1)), 10);
        assert_eq!(full_years_between(date(2015, 6, 1), date(2025, 5, 31)), 9);
    }

    #[test]
    fn test_reversed_dates_yield_zero() {
        assert_eq!(full_months_between(date(2025, 6, 1), date(2025, 1, 1)), 0);
        assert_eq!(calendar_months_between(date(2025, 6, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn test_calendar_months_ignore_day() {
        assert_eq!(calendar_months_between(date(2022, 3, 20), date(2025, 3, 1)), 36);
        assert_eq!(full_months_between(date(2022, 3, 20), date(2025, 3, 1)), 35);
    }

    #[test]
    fn test_same_day_is_zero() {
        assert_eq!(full_months_between(date(2025, 1, 1), date(2025, 1, 1)), 0);
    }
}
