//! Payroll item models for the Payroll Engine.
//!
//! This module contains the [`PayrollItem`] type, one employee's pay for one
//! period, together with its component lines and the audit trace explaining
//! how every amount was reached.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a single payroll item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollItemStatus {
    /// Produced by the generation pipeline, awaiting approval.
    Calculated,
    /// Approved by an operator.
    Processed,
    /// Frozen by period finalization.
    Finalized,
    /// Released to the employee.
    Paid,
}

impl PayrollItemStatus {
    /// Returns the string representation of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Calculated => "calculated",
            Self::Processed => "processed",
            Self::Finalized => "finalized",
            Self::Paid => "paid",
        }
    }

    /// Returns true once the item's amounts may no longer be replaced.
    pub const fn is_frozen(&self) -> bool {
        matches!(self, Self::Finalized | Self::Paid)
    }
}

/// Why basic pay was or was not prorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Employed for the whole period.
    FullPeriod,
    /// Appointed after the period started.
    NewHire,
    /// Separated before the period ended.
    Separated,
    /// Appointed and separated inside the same period.
    NewHireAndSeparated,
    /// Not in service on any day of the period.
    OutsidePeriod,
}

impl AdjustmentReason {
    /// Returns the string representation of the reason.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullPeriod => "full_period",
            Self::NewHire => "new_hire",
            Self::Separated => "separated",
            Self::NewHireAndSeparated => "new_hire_and_separated",
            Self::OutsidePeriod => "outside_period",
        }
    }
}

/// Where the amount of a pay component came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentSource {
    /// The configured default amount.
    Default,
    /// An employee-specific override.
    Override,
    /// A statutory contribution or tax.
    Statutory,
}

/// A single allowance or deduction line on a payroll item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponent {
    /// Component code (e.g. "pera", "gsis").
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Amount for the period.
    pub amount: Decimal,
    /// Where the amount came from.
    pub source: ComponentSource,
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Reference to the regulation or policy behind this rule.
    pub reference: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// One employee's pay for one payroll period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollItem {
    /// Unique identifier.
    pub id: Uuid,
    /// The period this item belongs to.
    pub period_id: Uuid,
    /// The employee paid.
    pub employee_id: String,
    /// Working days credited from attendance.
    pub working_days: Decimal,
    /// Days actually paid after proration.
    pub paid_days: Decimal,
    /// Daily rate used.
    pub daily_rate: Decimal,
    /// Proration tag for auditability.
    pub adjustment_reason: AdjustmentReason,
    /// Daily rate × paid days.
    pub basic_pay: Decimal,
    /// Allowance lines.
    pub allowances: Vec<PayComponent>,
    /// Deduction lines, statutory first.
    pub deductions: Vec<PayComponent>,
    /// Basic pay plus allowances.
    pub gross_pay: Decimal,
    /// Sum of deduction lines.
    pub total_deductions: Decimal,
    /// Gross pay less deductions.
    pub net_pay: Decimal,
    /// Current status.
    pub status: PayrollItemStatus,
    /// How every amount was reached.
    pub audit_trace: Vec<AuditStep>,
    /// When the amounts were calculated.
    pub calculated_at: DateTime<Utc>,
    /// When the item was last modified.
    pub updated_at: DateTime<Utc>,
}

impl PayrollItem {
    /// Sum of allowance lines.
    pub fn total_allowances(&self) -> Decimal {
        self.allowances.iter().map(|a| a.amount).sum()
    }

    /// Looks up a deduction line by code.
    pub fn deduction(&self, code: &str) -> Option<&PayComponent> {
        self.deductions.iter().find(|d| d.code == code)
    }

    /// Looks up an allowance line by code.
    pub fn allowance(&self, code: &str) -> Option<&PayComponent> {
        self.allowances.iter().find(|a| a.code == code)
    }
}
