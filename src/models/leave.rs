//! Leave types and balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A kind of leave (vacation, sick, special privilege, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    /// Short code (e.g. "VL").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Whether unused days may be converted to cash.
    pub is_monetizable: bool,
}

/// An employee's balance of one leave type for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeLeaveBalance {
    /// The employee.
    pub employee_id: String,
    /// Leave type code.
    pub leave_type: String,
    /// Balance year.
    pub year: i32,
    /// Days earned.
    pub earned_days: Decimal,
    /// Days used or monetized.
    pub used_days: Decimal,
    /// Days remaining.
    pub current_balance: Decimal,
}

impl EmployeeLeaveBalance {
    /// Creates a balance with nothing used.
    pub fn new(employee_id: &str, leave_type: &str, year: i32, earned_days: Decimal) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            leave_type: leave_type.to_string(),
            year,
            earned_days,
            used_days: Decimal::ZERO,
            current_balance: earned_days,
        }
    }

    /// Moves `days` from the balance to used days.
    ///
    /// Never takes more than the balance; returns the days actually taken.
    pub fn consume(&mut self, days: Decimal) -> Decimal {
        let taken = days.min(self.current_balance).max(Decimal::ZERO);
        self.used_days += taken;
        self.current_balance -= taken;
        taken
    }
}

/// Sums the current balance over monetizable leave types only.
///
/// Balances whose leave type is unknown or non-monetizable are ignored.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{monetizable_balance, EmployeeLeaveBalance, LeaveType};
/// use rust_decimal::Decimal;
///
/// let types = vec![
///     LeaveType { code: "VL".into(), name: "Vacation".into(), is_monetizable: true },
///     LeaveType { code: "ML".into(), name: "Maternity".into(), is_monetizable: false },
/// ];
/// let balances = vec![
///     EmployeeLeaveBalance::new("emp_001", "VL", 2025, Decimal::new(5, 0)),
///     EmployeeLeaveBalance::new("emp_001", "ML", 2025, Decimal::new(100, 0)),
/// ];
/// assert_eq!(monetizable_balance(&balances, &types), Decimal::new(5, 0));
/// ```
pub fn monetizable_balance(balances: &[EmployeeLeaveBalance], types: &[LeaveType]) -> Decimal {
    balances
        .iter()
        .filter(|b| {
            types
                .iter()
                .any(|t| t.code == b.leave_type && t.is_monetizable)
        })
        .map(|b| b.current_balance)
        .sum()
}
