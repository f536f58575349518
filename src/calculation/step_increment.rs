//! Step increment eligibility.
//!
//! An employee moves up one salary step when all of the following hold:
//! - the current step is below the policy maximum,
//! - at least `interval_years` full years have passed since the last
//!   increment (or the appointment, if there was none),
//! - the evaluation month is the anniversary month of that date.
//!
//! Years are counted in calendar months so that any day within the
//! anniversary month qualifies.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::StepIncrementPolicy;
use crate::models::{AuditStep, Employee};

use super::tenure::calendar_months_between;

/// Why an employee is not eligible for a step increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum StepIneligibility {
    /// Already at the top step.
    MaxStepReached {
        /// Current step.
        current_step: u8,
        /// Highest step.
        max_step: u8,
    },
    /// Not enough years since the last increment.
    InsufficientService {
        /// Full years served in the current step.
        years_in_step: u32,
        /// Years required.
        required_years: u32,
    },
    /// Eligible by tenure but not in the anniversary month.
    NotAnniversaryMonth {
        /// Month of the anniversary (1-12).
        anniversary_month: u32,
        /// Month evaluated (1-12).
        evaluation_month: u32,
    },
    /// The employee is separated.
    NotInService,
}

impl StepIneligibility {
    /// Returns the reason code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MaxStepReached { .. } => "max_step_reached",
            Self::InsufficientService { .. } => "insufficient_service",
            Self::NotAnniversaryMonth { .. } => "not_anniversary_month",
            Self::NotInService => "not_in_service",
        }
    }
}

/// The result of a step increment evaluation.
#[derive(Debug, Clone)]
pub struct StepIncrementEligibility {
    /// Step before the increment.
    pub current_step: u8,
    /// Step after the increment, when eligible.
    pub next_step: Option<u8>,
    /// Full years served in the current step.
    pub years_in_step: u32,
    /// Why the employee is ineligible, if so.
    pub reason: Option<StepIneligibility>,
    /// The audit step recording this evaluation.
    pub audit_step: AuditStep,
}

impl StepIncrementEligibility {
    /// Returns true if the employee is due an increment.
    pub fn is_eligible(&self) -> bool {
        self.reason.is_none()
    }
}

/// Evaluates whether an employee is due a step increment in the month of
/// `evaluation_date`.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::evaluate_step_increment;
/// use payroll_engine::config::StepIncrementPolicy;
/// use payroll_engine::models::{Employee, EmploymentStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let employee = Employee {
///     id: "emp_001".to_string(),
///     name: "Maria Santos".to_string(),
///     monthly_salary: Decimal::from(22000),
///     daily_rate: Decimal::from(1000),
///     highest_monthly_salary: None,
///     appointment_date: NaiveDate::from_ymd_opt(2022, 3, 20).unwrap(),
///     separation_date: None,
///     employment_status: EmploymentStatus::Active,
///     step_increment: 1,
///     last_step_increment_date: None,
/// };
/// let policy = StepIncrementPolicy { max_step: 8, interval_years: 3 };
///
/// let on = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let result = evaluate_step_increment(&employee, on, &policy, 1);
/// assert!(result.is_eligible());
/// assert_eq!(result.next_step, Some(2));
/// ```
pub fn evaluate_step_increment(
    employee: &Employee,
    evaluation_date: NaiveDate,
    policy: &StepIncrementPolicy,
    step_number: u32,
) -> StepIncrementEligibility {
    let anchor = employee.step_anchor_date();
    let years_in_step = calendar_months_between(anchor, evaluation_date) / 12;
    let current_step = employee.step_increment;

    let reason = if employee.employment_status.is_separated() {
        Some(StepIneligibility::NotInService)
    } else if current_step >= policy.max_step {
        Some(StepIneligibility::MaxStepReached {
            current_step,
            max_step: policy.max_step,
        })
    } else if years_in_step < policy.interval_years {
        Some(StepIneligibility::InsufficientService {
            years_in_step,
            required_years: policy.interval_years,
        })
    } else if anchor.month() != evaluation_date.month() {
        Some(StepIneligibility::NotAnniversaryMonth {
            anniversary_month: anchor.month(),
            evaluation_month: evaluation_date.month(),
        })
    } else {
        None
    };

    let next_step = reason.is_none().then(|| current_step + 1);

    let reasoning = match &reason {
        None => format!(
            "{} years in step {} as of {}: increment to step {}",
            years_in_step,
            current_step,
            evaluation_date,
            current_step + 1
        ),
        Some(r) => format!("Not eligible for step increment: {}", r.code()),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "step_increment".to_string(),
        rule_name: "Step Increment Eligibility".to_string(),
        reference: "CSC-DBM JC No. 1 s. 1990".to_string(),
        input: serde_json::json!({
            "employee_id": employee.id,
            "current_step": current_step,
            "anchor_date": anchor.to_string(),
            "evaluation_date": evaluation_date.to_string()
        }),
        output: serde_json::json!({
            "eligible": reason.is_none(),
            "years_in_step": years_in_step,
            "reason": reason.as_ref().map(|r| r.code())
        }),
        reasoning,
    };

    StepIncrementEligibility {
        current_step,
        next_step,
        years_in_step,
        reason,
        audit_step,
    }
}
