//! Salary proration for partial payroll periods.
//!
//! This module provides functions for crediting only the days an employee
//! was actually in service when an appointment or separation falls inside a
//! payroll period.
//!
//! ## Formula
//!
//! ```text
//! effective_start = max(period_start, appointment_date)
//! effective_end   = min(period_end, separation_date or period_end)
//! prorated_days   = min(standard_days, days(effective_start ..= effective_end))
//! prorated_salary = daily_rate x prorated_days
//! ```
//!
//! Days are counted on the configured [`DayBasis`]; `standard_days` is the
//! count for the full period on the same basis.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::config::DayBasis;
use crate::models::{AdjustmentReason, AuditStep};

use super::rounding::round_currency;

/// Counts the days in `start..=end` on the given basis.
///
/// Returns 0 when `start` is after `end`.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::count_days;
/// use payroll_engine::config::DayBasis;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(); // Monday
/// let end = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
/// assert_eq!(count_days(start, end, DayBasis::Calendar), 15);
/// assert_eq!(count_days(start, end, DayBasis::Weekdays), 11);
/// ```
pub fn count_days(start: NaiveDate, end: NaiveDate, basis: DayBasis) -> u32 {
    if start > end {
        return 0;
    }
    match basis {
        DayBasis::Calendar => ((end - start).num_days() + 1) as u32,
        DayBasis::Weekdays => start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32,
    }
}

/// The result of a proration, including the audit step.
#[derive(Debug, Clone)]
pub struct ProrationResult {
    /// Days in the full period on the configured basis.
    pub standard_days: u32,
    /// Days the employee was in service.
    pub prorated_days: u32,
    /// Daily rate × prorated days.
    pub prorated_salary: Decimal,
    /// Why the period was or was not prorated.
    pub reason: AdjustmentReason,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

impl ProrationResult {
    /// Returns true if fewer than the standard days were credited.
    pub fn is_prorated(&self) -> bool {
        self.reason != AdjustmentReason::FullPeriod
    }
}

/// Prorates a salary over the days an employee was in service in a period.
///
/// # Arguments
///
/// * `daily_rate` - The employee's daily rate
/// * `appointment_date` - First day of service
/// * `separation_date` - Last day of service, if separated
/// * `period_start` - First day of the period (inclusive)
/// * `period_end` - Last day of the period (inclusive)
/// * `basis` - How days are counted
/// * `step_number` - The step number for audit trail sequencing
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_proration;
/// use payroll_engine::config::DayBasis;
/// use payroll_engine::models::AdjustmentReason;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let d = |day| NaiveDate::from_ymd_opt(2025, 9, day).unwrap();
/// let result = calculate_proration(
///     Decimal::from(1000), d(10), None, d(1), d(15), DayBasis::Calendar, 1,
/// );
/// assert_eq!(result.prorated_days, 6);
/// assert_eq!(result.prorated_salary, Decimal::from(6000));
/// assert_eq!(result.reason, AdjustmentReason::NewHire);
/// ```
pub fn calculate_proration(
    daily_rate: Decimal,
    appointment_date: NaiveDate,
    separation_date: Option<NaiveDate>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    basis: DayBasis,
    step_number: u32,
) -> ProrationResult {
    let standard_days = count_days(period_start, period_end, basis);

    let effective_start = period_start.max(appointment_date);
    let effective_end = separation_date.map_or(period_end, |s| period_end.min(s));

    let hired_inside = appointment_date > period_start;
    let separated_inside = separation_date.is_some_and(|s| s < period_end);

    let reason = if effective_start > effective_end {
        AdjustmentReason::OutsidePeriod
    } else {
        match (hired_inside, separated_inside) {
            (false, false) => AdjustmentReason::FullPeriod,
            (true, false) => AdjustmentReason::NewHire,
            (false, true) => AdjustmentReason::Separated,
            (true, true) => AdjustmentReason::NewHireAndSeparated,
        }
    };

    let prorated_days = standard_days.min(count_days(effective_start, effective_end, basis));
    let prorated_salary = round_currency(daily_rate * Decimal::from(prorated_days));

    let audit_step = AuditStep {
        step_number,
        rule_id: "proration".to_string(),
        rule_name: "Salary Proration".to_string(),
        reference: "payroll policy: partial period".to_string(),
        input: serde_json::json!({
            "daily_rate": daily_rate.to_string(),
            "appointment_date": appointment_date.to_string(),
            "separation_date": separation_date.map(|d| d.to_string()),
            "period_start": period_start.to_string(),
            "period_end": period_end.to_string()
        }),
        output: serde_json::json!({
            "standard_days": standard_days,
            "prorated_days": prorated_days,
            "prorated_salary": prorated_salary.to_string(),
            "reason": reason.as_str()
        }),
        reasoning: format!(
            "{} of {} days in service ({}): ₱{} x {} = ₱{}",
            prorated_days,
            standard_days,
            reason.as_str(),
            daily_rate.normalize(),
            prorated_days,
            prorated_salary
        ),
    };

    ProrationResult {
        standard_days,
        prorated_days,
        prorated_salary,
        reason,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sep(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    fn rate() -> Decimal {
        Decimal::from(1000)
    }

    #[test]
    fn test_appointed_mid_period_counts_inclusive_days() {
        let result = calculate_proration(
            rate(),
            sep(10),
            None,
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );

        assert_eq!(result.standard_days, 15);
        assert_eq!(result.prorated_days, 6);
        assert_eq!(result.prorated_salary, Decimal::from(6000));
        assert_eq!(result.reason, AdjustmentReason::NewHire);
        assert!(result.is_prorated());
    }

    #[test]
    fn test_full_period_when_appointed_before_start() {
        let appointed = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        let result = calculate_proration(
            rate(),
            appointed,
            None,
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );

        assert_eq!(result.prorated_days, 15);
        assert_eq!(result.reason, AdjustmentReason::FullPeriod);
        assert!(!result.is_prorated());
    }

    #[test]
    fn test_appointed_on_first_day_is_full_period() {
        let result = calculate_proration(
            rate(),
            sep(1),
            None,
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );
        assert_eq!(result.prorated_days, 15);
        assert_eq!(result.reason, AdjustmentReason::FullPeriod);
    }

    #[test]
    fn test_separated_mid_period() {
        let appointed = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        let result = calculate_proration(
            rate(),
            appointed,
            Some(sep(5)),
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );

        assert_eq!(result.prorated_days, 5);
        assert_eq!(result.reason, AdjustmentReason::Separated);
    }

    #[test]
    fn test_hired_and_separated_inside_period() {
        let result = calculate_proration(
            rate(),
            sep(3),
            Some(sep(7)),
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );

        assert_eq!(result.prorated_days, 5);
        assert_eq!(result.reason, AdjustmentReason::NewHireAndSeparated);
    }

    #[test]
    fn test_separated_before_period_yields_zero() {
        let appointed = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        let separated = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let result = calculate_proration(
            rate(),
            appointed,
            Some(separated),
            sep(1),
            sep(15),
            DayBasis::Calendar,
            1,
        );

        assert_eq!(result.prorated_days, 0);
        assert_eq!(result.prorated_salary, Decimal::ZERO);
        assert_eq!(result.reason, AdjustmentReason::OutsidePeriod);
    }

    #[test]
    fn test_weekday_basis_skips_weekends() {
        // 2025-09-10 is a Wednesday: 10, 11, 12, 15 are weekdays
        let result = calculate_proration(
            rate(),
            sep(10),
            None,
            sep(1),
            sep(15),
            DayBasis::Weekdays,
            1,
        );

        assert_eq!(result.standard_days, 11);
        assert_eq!(result.prorated_days, 4);
        assert_eq!(result.prorated_salary, Decimal::from(4000));
    }

    #[test]
    fn test_count_days_reversed_range() {
        assert_eq!(count_days(sep(15), sep(1), DayBasis::Calendar), 0);
        assert_eq!(count_days(sep(15), sep(1), DayBasis::Weekdays), 0);
    }

    #[test]
    fn test_audit_step_records_reason() {
        let result = calculate_proration(
            rate(),
            sep(10),
            None,
            sep(1),
            sep(15),
            DayBasis::Calendar,
            3,
        );

        assert_eq!(result.audit_step.step_number, 3);
        assert_eq!(result.audit_step.rule_id, "proration");
        assert_eq!(result.audit_step.output["reason"].as_str().unwrap(), "new_hire");
        assert_eq!(result.audit_step.output["prorated_days"].as_u64().unwrap(), 6);
    }
}
