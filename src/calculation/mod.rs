//! Calculation logic for the Payroll Engine.
//!
//! This module contains the pure calculation functions: statutory
//! contributions and withholding tax, salary proration for partial periods,
//! step increment eligibility, service tenure, and the benefit formulas.
//! Every calculation records an [`AuditStep`](crate::models::AuditStep).

mod benefit_formulas;
mod proration;
mod rounding;
mod statutory;
mod step_increment;
mod tenure;

pub use benefit_formulas::{
    BenefitCalculation, BenefitInputs, benefit_tax, calculate_benefit, calculate_bonus,
    calculate_gsis_payout, calculate_loyalty_award, calculate_monetization,
    calculate_terminal_leave, daily_rate_from_monthly,
};
pub use proration::{ProrationResult, calculate_proration, count_days};
pub use rounding::round_currency;
pub use statutory::{
    GsisContribution, PhilHealthContribution, StatutoryDeductions, calculate_statutory_deductions,
    gsis_contribution, pagibig_contribution, philhealth_contribution, withholding_tax,
};
pub use step_increment::{StepIncrementEligibility, StepIneligibility, evaluate_step_increment};
pub use tenure::{calendar_months_between, full_months_between, full_years_between};
