//! Statutory deduction calculation functionality.
//!
//! This module provides pure functions mapping a salary to the mandatory
//! government deductions: GSIS, Pag-IBIG, PhilHealth, and progressive
//! withholding tax.
//!
//! ## Rules
//!
//! - Every amount is rounded to centavos and is never negative.
//! - A salary of zero or less yields zero for every deduction.
//! - Withholding tax applies to the salary less the three contributions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, GsisRates, PagIbigRates, PhilHealthRates, TaxBracket};
use crate::models::AuditStep;

use super::rounding::round_currency;

/// GSIS contribution split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsisContribution {
    /// Personal share, deducted from pay.
    pub employee_share: Decimal,
    /// Government share, reported only.
    pub government_share: Decimal,
}

/// PhilHealth premium split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhilHealthContribution {
    /// Full monthly premium.
    pub total_premium: Decimal,
    /// Employee half, deducted from pay.
    pub employee_share: Decimal,
}

/// Computes the GSIS contribution for a salary.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::gsis_contribution;
/// use payroll_engine::config::GsisRates;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rates = GsisRates {
///     employee_rate: Decimal::from_str("0.09").unwrap(),
///     government_rate: Decimal::from_str("0.12").unwrap(),
/// };
/// let gsis = gsis_contribution(Decimal::from(10000), &rates);
/// assert_eq!(gsis.employee_share, Decimal::from_str("900.00").unwrap());
/// assert_eq!(gsis.government_share, Decimal::from_str("1200.00").unwrap());
/// ```
pub fn gsis_contribution(salary: Decimal, rates: &GsisRates) -> GsisContribution {
    if salary <= Decimal::ZERO {
        return GsisContribution {
            employee_share: Decimal::ZERO,
            government_share: Decimal::ZERO,
        };
    }
    GsisContribution {
        employee_share: round_currency(salary * rates.employee_rate),
        government_share: round_currency(salary * rates.government_rate),
    }
}

/// Computes the Pag-IBIG employee contribution for a salary.
///
/// Salaries at or below the low-income threshold pay the lower rate; the
/// result is capped at the maximum contribution.
pub fn pagibig_contribution(salary: Decimal, rates: &PagIbigRates) -> Decimal {
    if salary <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rate = if salary <= rates.low_income_threshold {
        rates.low_income_rate
    } else {
        rates.standard_rate
    };
    round_currency((salary * rate).min(rates.max_contribution))
}

/// Computes the PhilHealth premium for a salary.
///
/// The salary is clamped into `[salary_floor, salary_ceiling]` before the
/// premium rate is applied, so the bottom and top bands pay fixed premiums.
pub fn philhealth_contribution(salary: Decimal, rates: &PhilHealthRates) -> PhilHealthContribution {
    if salary <= Decimal::ZERO {
        return PhilHealthContribution {
            total_premium: Decimal::ZERO,
            employee_share: Decimal::ZERO,
        };
    }
    let base = salary.clamp(rates.salary_floor, rates.salary_ceiling);
    let total_premium = round_currency(base * rates.premium_rate);
    PhilHealthContribution {
        total_premium,
        employee_share: round_currency(total_premium * rates.employee_share),
    }
}

/// Computes withholding tax over taxable income using progressive brackets.
///
/// The applicable bracket is the one with the highest lower bound not
/// exceeding `taxable_income`; tax is its base tax plus the marginal rate on
/// the excess. `brackets` must be sorted ascending.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::withholding_tax;
/// use payroll_engine::config::TaxBracket;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let d = |s: &str| Decimal::from_str(s).unwrap();
/// let brackets = vec![
///     TaxBracket { lower_bound: d("0"), base_tax: d("0"), marginal_rate: d("0") },
///     TaxBracket { lower_bound: d("20833"), base_tax: d("0"), marginal_rate: d("0.15") },
///     TaxBracket { lower_bound: d("33333"), base_tax: d("1875"), marginal_rate: d("0.20") },
/// ];
/// assert_eq!(withholding_tax(d("20000"), &brackets), d("0"));
/// assert_eq!(withholding_tax(d("44050"), &brackets), d("4018.40"));
/// ```
pub fn withholding_tax(taxable_income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    if taxable_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    brackets
        .iter()
        .rfind(|b| b.lower_bound <= taxable_income)
        .map(|b| round_currency(b.base_tax + (taxable_income - b.lower_bound) * b.marginal_rate))
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}

/// All statutory deductions for one salary, with their audit steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatutoryDeductions {
    /// GSIS split.
    pub gsis: GsisContribution,
    /// Pag-IBIG employee contribution.
    pub pagibig: Decimal,
    /// PhilHealth split.
    pub philhealth: PhilHealthContribution,
    /// Salary less the three employee contributions, floored at zero.
    pub taxable_income: Decimal,
    /// Withholding tax on `taxable_income`.
    pub withholding_tax: Decimal,
    /// Sum of everything deducted from the employee.
    pub total_employee_deductions: Decimal,
    /// One step per deduction.
    pub audit_steps: Vec<AuditStep>,
}

/// Computes every statutory deduction for a salary.
///
/// # Arguments
///
/// * `salary` - The salary the deductions are based on
/// * `config` - Engine configuration holding rates and the tax table
/// * `step_number_start` - The first audit step number to use
///
/// # Examples
///
/// ```no_run
/// use payroll_engine::calculation::calculate_statutory_deductions;
/// use payroll_engine::config::ConfigLoader;
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/ph_2025").unwrap();
/// let deductions = calculate_statutory_deductions(Decimal::from(10000), loader.config(), 1);
/// assert_eq!(deductions.total_employee_deductions, Decimal::new(135000, 2));
/// ```
pub fn calculate_statutory_deductions(
    salary: Decimal,
    config: &EngineConfig,
    step_number_start: u32,
) -> StatutoryDeductions {
    let statutory = config.statutory();
    let gsis = gsis_contribution(salary, &statutory.gsis);
    let pagibig = pagibig_contribution(salary, &statutory.pagibig);
    let philhealth = philhealth_contribution(salary, &statutory.philhealth);

    let contributions = gsis.employee_share + pagibig + philhealth.employee_share;
    let taxable_income = (salary - contributions).max(Decimal::ZERO);
    let tax = withholding_tax(taxable_income, &config.withholding_tax().brackets);

    let mut step_number = step_number_start;
    let mut next_step = || {
        let n = step_number;
        step_number += 1;
        n
    };

    let audit_steps = vec![
        AuditStep {
            step_number: next_step(),
            rule_id: "gsis_contribution".to_string(),
            rule_name: "GSIS Contribution".to_string(),
            reference: "RA 8291".to_string(),
            input: serde_json::json!({
                "salary": salary.to_string(),
                "employee_rate": statutory.gsis.employee_rate.to_string(),
                "government_rate": statutory.gsis.government_rate.to_string()
            }),
            output: serde_json::json!({
                "employee_share": gsis.employee_share.to_string(),
                "government_share": gsis.government_share.to_string()
            }),
            reasoning: format!(
                "₱{} x {} = ₱{} personal share (government share ₱{} not deducted)",
                salary.normalize(),
                statutory.gsis.employee_rate.normalize(),
                gsis.employee_share,
                gsis.government_share
            ),
        },
        AuditStep {
            step_number: next_step(),
            rule_id: "pagibig_contribution".to_string(),
            rule_name: "Pag-IBIG Contribution".to_string(),
            reference: "RA 9679".to_string(),
            input: serde_json::json!({
                "salary": salary.to_string(),
                "max_contribution": statutory.pagibig.max_contribution.to_string()
            }),
            output: serde_json::json!({
                "employee_share": pagibig.to_string(),
                "capped": pagibig == statutory.pagibig.max_contribution
            }),
            reasoning: format!(
                "Pag-IBIG ₱{} (capped at ₱{})",
                pagibig, statutory.pagibig.max_contribution
            ),
        },
        AuditStep {
            step_number: next_step(),
            rule_id: "philhealth_contribution".to_string(),
            rule_name: "PhilHealth Premium".to_string(),
            reference: "RA 11223".to_string(),
            input: serde_json::json!({
                "salary": salary.to_string(),
                "salary_floor": statutory.philhealth.salary_floor.to_string(),
                "salary_ceiling": statutory.philhealth.salary_ceiling.to_string()
            }),
            output: serde_json::json!({
                "total_premium": philhealth.total_premium.to_string(),
                "employee_share": philhealth.employee_share.to_string()
            }),
            reasoning: format!(
                "Premium ₱{} of which employee pays ₱{}",
                philhealth.total_premium, philhealth.employee_share
            ),
        },
        AuditStep {
            step_number: next_step(),
            rule_id: "withholding_tax".to_string(),
            rule_name: "Withholding Tax".to_string(),
            reference: "RA 10963".to_string(),
            input: serde_json::json!({
                "salary": salary.to_string(),
                "contributions": contributions.to_string(),
                "taxable_income": taxable_income.to_string()
            }),
            output: serde_json::json!({
                "withholding_tax": tax.to_string()
            }),
            reasoning: format!(
                "Tax on taxable income ₱{} = ₱{}",
                taxable_income.normalize(),
                tax
            ),
        },
    ];

    StatutoryDeductions {
        gsis,
        pagibig,
        philhealth,
        taxable_income,
        withholding_tax: tax,
        total_employee_deductions: contributions + tax,
        audit_steps,
    }
}
