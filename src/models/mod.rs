//! Core data models for the Payroll Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod benefit;
mod employee;
mod leave;
mod pay_override;
mod payroll_item;
mod payroll_period;

pub use attendance::{
    AttendanceImportBatch, AttendanceRecord, AttendanceRow, ImportOutcome, ReimportWarning,
};
pub use benefit::{BenefitCycle, BenefitItem, BenefitType, CompensationBenefit, CycleStatus};
pub use employee::{Employee, EmploymentStatus};
pub use leave::{EmployeeLeaveBalance, LeaveType, monetizable_balance};
pub use pay_override::{OverrideIndex, OverrideKey, OverrideKind, PayOverride, index_overrides};
pub use payroll_item::{
    AdjustmentReason, AuditStep, ComponentSource, PayComponent, PayrollItem, PayrollItemStatus,
};
pub use payroll_period::{PayrollPeriod, PeriodKey, PeriodStatus, PeriodTotals};
