//! Payroll period model and its status lifecycle.
//!
//! This module contains the [`PayrollPeriod`] type, the half-month pay cycle
//! for which pay is computed and issued, and [`PeriodStatus`], whose
//! transition table is the single source of truth for which operations are
//! legal on a period.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Lifecycle status of a payroll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Created, not yet opened for attendance.
    Draft,
    /// Accepting attendance imports.
    Open,
    /// Payroll generated; items are being reviewed.
    Processing,
    /// Operator has acknowledged a clean generation run.
    Completed,
    /// Every item approved; amounts are frozen.
    Finalized,
    /// Every item paid.
    Paid,
    /// Terminal, read-only.
    Locked,
}

impl PeriodStatus {
    /// Returns the string representation of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Finalized => "finalized",
            Self::Paid => "paid",
            Self::Locked => "locked",
        }
    }

    /// Returns true while attendance may be imported and payroll generated.
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Open)
    }

    /// Returns true while payroll items may be approved or recalculated.
    pub const fn is_reviewable(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }

    /// Returns true if no transition leaves this status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Validates that a transition from this status to `to` is permitted.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Conflict` naming both statuses if the transition
    /// is not in the lifecycle table.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PeriodStatus;
    ///
    /// assert!(PeriodStatus::Open.validate_transition(PeriodStatus::Processing).is_ok());
    /// assert!(PeriodStatus::Locked.validate_transition(PeriodStatus::Processing).is_err());
    /// ```
    pub fn validate_transition(&self, to: Self) -> EngineResult<()> {
        if self.is_terminal() {
            return Err(EngineError::Conflict {
                message: format!(
                    "payroll period is {} and cannot move to {}",
                    self.as_str(),
                    to.as_str()
                ),
                details: vec!["period is locked".to_string()],
            });
        }

        let valid = match self {
            Self::Draft => matches!(to, Self::Open | Self::Processing),
            Self::Open => matches!(to, Self::Processing),
            Self::Processing => matches!(to, Self::Completed | Self::Finalized),
            Self::Completed => matches!(to, Self::Finalized),
            Self::Finalized => matches!(to, Self::Paid | Self::Processing),
            Self::Paid => matches!(to, Self::Locked | Self::Processing),
            Self::Locked => false,
        };

        if valid {
            Ok(())
        } else {
            Err(EngineError::conflict(format!(
                "payroll period cannot move from {} to {}",
                self.as_str(),
                to.as_str()
            )))
        }
    }
}

/// Identity of a payroll period: the half-month it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// 1 for days 1-15, 2 for day 16 to month end.
    pub period_number: u8,
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}/{}", self.year, self.month, self.period_number)
    }
}

/// Aggregate totals across all payroll items of a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Number of payroll items.
    pub employee_count: u32,
    /// Sum of basic pay.
    pub total_basic_pay: Decimal,
    /// Sum of allowances.
    pub total_allowances: Decimal,
    /// Sum of gross pay.
    pub total_gross_pay: Decimal,
    /// Sum of all deductions.
    pub total_deductions: Decimal,
    /// Sum of net pay.
    pub total_net_pay: Decimal,
}

/// A half-month pay cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// Unique identifier.
    pub id: Uuid,
    /// Year, month and half-month number.
    pub key: PeriodKey,
    /// First day covered (inclusive).
    pub start_date: NaiveDate,
    /// Last day covered (inclusive).
    pub end_date: NaiveDate,
    /// Date pay is released.
    pub pay_date: NaiveDate,
    /// Current lifecycle status.
    pub status: PeriodStatus,
    /// Aggregate totals, recomputed after every generation run.
    pub totals: PeriodTotals,
    /// When the period was created.
    pub created_at: DateTime<Utc>,
    /// When the period was last modified.
    pub updated_at: DateTime<Utc>,
}

impl PayrollPeriod {
    /// Creates a Draft period for a standard half-month.
    ///
    /// Period 1 covers days 1-15, period 2 covers day 16 to the last day of
    /// the month. The pay date defaults to the period's end date.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for an invalid month or period
    /// number.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PayrollPeriod;
    /// use chrono::NaiveDate;
    ///
    /// let period = PayrollPeriod::half_month(2025, 2, 2, None).unwrap();
    /// assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2025, 2, 16).unwrap());
    /// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    /// ```
    pub fn half_month(
        year: i32,
        month: u32,
        period_number: u8,
        pay_date: Option<NaiveDate>,
    ) -> EngineResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EngineError::validation("month", format!("{}-{} is not a valid month", year, month))
        })?;

        let (start_date, end_date) = match period_number {
            1 => (first, first.with_day(15).unwrap_or(first)),
            2 => {
                let start = first.with_day(16).unwrap_or(first);
                (start, last_day_of_month(first))
            }
            other => {
                return Err(EngineError::validation(
                    "period_number",
                    format!("must be 1 or 2, got {}", other),
                ));
            }
        };

        Self::with_dates(
            PeriodKey {
                year,
                month,
                period_number,
            },
            start_date,
            end_date,
            pay_date.unwrap_or(end_date),
        )
    }

    /// Creates a Draft period with explicit dates.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` unless `start_date < end_date`.
    pub fn with_dates(
        key: PeriodKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
        pay_date: NaiveDate,
    ) -> EngineResult<Self> {
        if start_date >= end_date {
            return Err(EngineError::validation(
                "date range",
                format!("start {} must be before end {}", start_date, end_date),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            key,
            start_date,
            end_date,
            pay_date,
            status: PeriodStatus::Draft,
            totals: PeriodTotals::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Checks if a given date falls within this period (inclusive).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Number of calendar days covered by the period.
    pub fn calendar_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_half_covers_days_1_to_15() {
        let period = PayrollPeriod::half_month(2025, 9, 1, None).unwrap();
        assert_eq!(period.start_date, date(2025, 9, 1));
        assert_eq!(period.end_date, date(2025, 9, 15));
        assert_eq!(period.pay_date, date(2025, 9, 15));
        assert_eq!(period.status, PeriodStatus::Draft);
        assert_eq!(period.calendar_days(), 15);
    }

    #[test]
    fn test_second_half_runs_to_month_end() {
        let period = PayrollPeriod::half_month(2025, 12, 2, Some(date(2025, 12, 29))).unwrap();
        assert_eq!(period.start_date, date(2025, 12, 16));
        assert_eq!(period.end_date, date(2025, 12, 31));
        assert_eq!(period.pay_date, date(2025, 12, 29));
    }

    #[test]
    fn test_leap_year_february() {
        let period = PayrollPeriod::half_month(2024, 2, 2, None).unwrap();
        assert_eq!(period.end_date, date(2024, 2, 29));
    }

    #[test]
    fn test_invalid_period_number_rejected() {
        let result = PayrollPeriod::half_month(2025, 9, 3, None);
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_invalid_month_rejected() {
        let result = PayrollPeriod::half_month(2025, 13, 1, None);
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_start_must_precede_end() {
        let key = PeriodKey {
            year: 2025,
            month: 9,
            period_number: 1,
        };
        let result = PayrollPeriod::with_dates(
            key,
            date(2025, 9, 15),
            date(2025, 9, 15),
            date(2025, 9, 15),
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_contains_date_bounds() {
        let period = PayrollPeriod::half_month(2025, 9, 1, None).unwrap();
        assert!(period.contains_date(period.start_date));
        assert!(period.contains_date(period.end_date));
        assert!(!period.contains_date(date(2025, 9, 16)));
        assert!(!period.contains_date(date(2025, 8, 31)));
    }

    #[test]
    fn test_forward_lifecycle_is_valid() {
        let path = [
            PeriodStatus::Draft,
            PeriodStatus::Open,
            PeriodStatus::Processing,
            PeriodStatus::Completed,
            PeriodStatus::Finalized,
            PeriodStatus::Paid,
            PeriodStatus::Locked,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].validate_transition(pair[1]).is_ok(),
                "{:?} -> {:?} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_reopen_allowed_from_finalized_and_paid_only() {
        assert!(PeriodStatus::Finalized.validate_transition(PeriodStatus::Processing).is_ok());
        assert!(PeriodStatus::Paid.validate_transition(PeriodStatus::Processing).is_ok());
        assert!(PeriodStatus::Completed.validate_transition(PeriodStatus::Processing).is_err());
    }

    #[test]
    fn test_locked_is_terminal() {
        let result = PeriodStatus::Locked.validate_transition(PeriodStatus::Processing);
        match result {
            Err(EngineError::Conflict { message, details }) => {
                assert!(message.contains("locked"));
                assert_eq!(details, vec!["period is locked".to_string()]);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_skipping_finalize_is_rejected() {
        assert!(PeriodStatus::Processing.validate_transition(PeriodStatus::Paid).is_err());
        assert!(PeriodStatus::Open.validate_transition(PeriodStatus::Finalized).is_err());
    }

    #[test]
    fn test_editable_statuses() {
        assert!(PeriodStatus::Draft.is_editable());
        assert!(PeriodStatus::Open.is_editable());
        assert!(!PeriodStatus::Processing.is_editable());
        assert!(!PeriodStatus::Locked.is_editable());
    }

    #[test]
    fn test_period_key_display() {
        let key = PeriodKey {
            year: 2025,
            month: 9,
            period_number: 1,
        };
        assert_eq!(key.to_string(), "2025-09/1");
    }
}
