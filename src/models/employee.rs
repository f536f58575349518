//! Employee model and related types.
//!
//! This module defines the Employee struct and EmploymentStatus enum as
//! returned by the employee directory.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents the employment status of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    /// Currently employed and on the payroll.
    Active,
    /// Employed but on extended leave; still on the payroll.
    OnLeave,
    /// Voluntarily separated.
    Resigned,
    /// Separated by retirement.
    Retired,
    /// Involuntarily separated.
    Terminated,
}

impl EmploymentStatus {
    /// Returns the string representation of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnLeave => "on_leave",
            Self::Resigned => "resigned",
            Self::Retired => "retired",
            Self::Terminated => "terminated",
        }
    }

    /// Returns true if the employee is no longer in service.
    pub const fn is_separated(&self) -> bool {
        matches!(self, Self::Resigned | Self::Retired | Self::Terminated)
    }
}

/// Represents an employee as known to the employee directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current basic monthly salary.
    pub monthly_salary: Decimal,
    /// Daily rate used for attendance-based pay.
    pub daily_rate: Decimal,
    /// Highest monthly salary ever received, used for terminal leave.
    #[serde(default)]
    pub highest_monthly_salary: Option<Decimal>,
    /// Date of original appointment.
    pub appointment_date: NaiveDate,
    /// Date of separation, if separated.
    #[serde(default)]
    pub separation_date: Option<NaiveDate>,
    /// Current employment status.
    pub employment_status: EmploymentStatus,
    /// Current salary step (1-based).
    pub step_increment: u8,
    /// Date of the last step increment, if any.
    #[serde(default)]
    pub last_step_increment_date: Option<NaiveDate>,
}

impl Employee {
    /// Returns true if the employee should appear on a payroll run.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::{Employee, EmploymentStatus};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     name: "Maria Santos".to_string(),
    ///     monthly_salary: Decimal::new(22000, 0),
    ///     daily_rate: Decimal::new(1000, 0),
    ///     highest_monthly_salary: None,
    ///     appointment_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
    ///     separation_date: None,
    ///     employment_status: EmploymentStatus::Active,
    ///     step_increment: 1,
    ///     last_step_increment_date: None,
    /// };
    /// assert!(employee.is_on_payroll());
    /// ```
    pub fn is_on_payroll(&self) -> bool {
        matches!(
            self.employment_status,
            EmploymentStatus::Active | EmploymentStatus::OnLeave
        )
    }

    /// Returns true if the employee is owed pay for any day of `start..=end`.
    ///
    /// Employees on payroll qualify once appointed. Separated employees
    /// qualify when they left on or after `start`, so a resignation in the
    /// middle of a period still yields a prorated item.
    pub fn is_payable_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if self.appointment_date > end {
            return false;
        }
        if self.is_on_payroll() {
            return true;
        }
        self.separation_date.is_some_and(|left| left >= start)
    }

    /// The date from which service tenure is counted for step increments.
    pub fn step_anchor_date(&self) -> NaiveDate {
        self.last_step_increment_date
            .unwrap_or(self.appointment_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_employee(status: EmploymentStatus) -> Employee {
        Employee {
            id: "emp_001".to_string(),
            name: "Maria Santos".to_string(),
            monthly_salary: Decimal::new(22000, 0),
            daily_rate: Decimal::new(1000, 0),
            highest_monthly_salary: None,
            appointment_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            separation_date: None,
            employment_status: status,
            step_increment: 1,
            last_step_increment_date: None,
        }
    }

    #[test]
    fn test_deserialize_employee_with_optional_fields_omitted() {
        let json = r#"{
            "id": "emp_002",
            "name": "Jose Rizal",
            "monthly_salary": "35000.00",
            "daily_rate": "1590.91",
            "appointment_date": "2015-06-01",
            "employment_status": "active",
            "step_increment": 3
        }"#;

        let employee: Employee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.id, "emp_002");
        assert_eq!(employee.monthly_salary, Decimal::new(3500000, 2));
        assert_eq!(employee.highest_monthly_salary, None);
        assert_eq!(employee.separation_date, None);
        assert_eq!(employee.step_increment, 3);
    }

    #[test]
    fn test_separated_statuses() {
        assert!(EmploymentStatus::Resigned.is_separated());
        assert!(EmploymentStatus::Retired.is_separated());
        assert!(EmploymentStatus::Terminated.is_separated());
        assert!(!EmploymentStatus::Active.is_separated());
        assert!(!EmploymentStatus::OnLeave.is_separated());
    }

    #[test]
    fn test_on_payroll_excludes_separated() {
        assert!(create_test_employee(EmploymentStatus::Active).is_on_payroll());
        assert!(create_test_employee(EmploymentStatus::OnLeave).is_on_payroll());
        assert!(!create_test_employee(EmploymentStatus::Retired).is_on_payroll());
    }

    #[test]
    fn test_separated_mid_period_is_payable() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let mut employee = create_test_employee(EmploymentStatus::Resigned);
        employee.separation_date = Some(NaiveDate::from_ymd_opt(2025, 9, 10).unwrap());
        assert!(employee.is_payable_during(start, end));

        employee.separation_date = Some(NaiveDate::from_ymd_opt(2025, 8, 31).unwrap());
        assert!(!employee.is_payable_during(start, end));

        employee.separation_date = None;
        assert!(!employee.is_payable_during(start, end));
    }

    #[test]
    fn test_not_payable_before_appointment() {
        let mut employee = create_test_employee(EmploymentStatus::Active);
        employee.appointment_date = NaiveDate::from_ymd_opt(2025, 9, 16).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert!(!employee.is_payable_during(start, end));
        assert!(employee.is_payable_during(start, end.succ_opt().unwrap()));
    }

    #[test]
    fn test_step_anchor_prefers_last_increment() {
        let mut employee = create_test_employee(EmploymentStatus::Active);
        assert_eq!(employee.step_anchor_date(), employee.appointment_date);

        let last = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        employee.last_step_increment_date = Some(last);
        assert_eq!(employee.step_anchor_date(), last);
    }

    #[test]
    fn test_employment_status_serialization() {
        assert_eq!(
            serde_json::to_string(&EmploymentStatus::OnLeave).unwrap(),
            "\"on_leave\""
        );
        assert_eq!(EmploymentStatus::Terminated.as_str(), "terminated");
    }
}
