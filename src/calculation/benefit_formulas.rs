//! Benefit formulas.
//!
//! Each formula checks its eligibility rule, computes a gross amount,
//! applies the benefit tax and returns a [`BenefitCalculation`] with an
//! audit step. Ineligibility is reported as
//! [`EngineError::CalculationError`] so that batch callers can record it per
//! employee.
//!
//! | Benefit | Formula |
//! |---------|---------|
//! | Performance / mid-year / year-end bonus | rate × monthly salary |
//! | GSIS payout | monthly salary × rate × tier multiplier |
//! | Terminal leave | balance × daily rate (highest salary) × factor |
//! | Leave monetization | min(requested, balance) × daily rate |
//! | Loyalty award | base amount × (1 + extra milestones) |

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{BenefitTaxRule, BenefitsConfig, BonusRule, EngineConfig, GsisPayoutRule};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BenefitType, Employee};

use super::rounding::round_currency;
use super::tenure::{full_months_between, full_years_between};

/// The outcome of a benefit formula.
#[derive(Debug, Clone)]
pub struct BenefitCalculation {
    /// The employee the benefit was computed for.
    pub employee_id: String,
    /// The benefit computed.
    pub benefit_type: BenefitType,
    /// Amount before tax.
    pub gross_amount: Decimal,
    /// Benefit tax withheld.
    pub tax_amount: Decimal,
    /// Amount after tax.
    pub net_amount: Decimal,
    /// Leave days converted, for leave-based benefits.
    pub days: Option<Decimal>,
    /// Eligibility notes.
    pub notes: String,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Inputs that vary per calculation rather than per employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenefitInputs {
    /// Date the benefit is evaluated on.
    pub as_of: NaiveDate,
    /// Date at which service is measured for bonus eligibility.
    pub cutoff_date: NaiveDate,
    /// Monetizable leave balance for leave-based benefits.
    pub monetizable_days: Decimal,
    /// Days requested for monetization; `None` requests the full balance.
    pub requested_days: Option<Decimal>,
}

impl BenefitInputs {
    /// Inputs for a non-leave benefit evaluated and cut off on one date.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            as_of: date,
            cutoff_date: date,
            monetizable_days: Decimal::ZERO,
            requested_days: None,
        }
    }
}

/// Converts a monthly salary to a daily rate.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::daily_rate_from_monthly;
/// use rust_decimal::Decimal;
///
/// let daily = daily_rate_from_monthly(Decimal::from(22000), Decimal::from(22));
/// assert_eq!(daily, Decimal::from(1000));
/// ```
pub fn daily_rate_from_monthly(
    monthly_salary: Decimal,
    working_days_per_month: Decimal,
) -> Decimal {
    if working_days_per_month <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_currency(monthly_salary / working_days_per_month)
}

/// Tax on the portion of `amount` above the exemption ceiling.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::benefit_tax;
/// use payroll_engine::config::BenefitTaxRule;
/// use rust_decimal::Decimal;
///
/// let rule = BenefitTaxRule {
///     exemption_ceiling: Decimal::from(90000),
///     rate: Decimal::new(20, 2),
/// };
/// assert_eq!(benefit_tax(Decimal::from(50000), &rule), Decimal::ZERO);
/// assert_eq!(benefit_tax(Decimal::from(100000), &rule), Decimal::from(2000));
/// ```
pub fn benefit_tax(amount: Decimal, rule: &BenefitTaxRule) -> Decimal {
    let excess = (amount - rule.exemption_ceiling).max(Decimal::ZERO);
    round_currency(excess * rule.rate)
}

fn bonus_rule(config: &BenefitsConfig, benefit_type: BenefitType) -> EngineResult<&BonusRule> {
    match benefit_type {
        BenefitType::PerformanceBonus => Ok(&config.performance_bonus),
        BenefitType::MidYearBonus => Ok(&config.mid_year_bonus),
        BenefitType::YearEndBonus => Ok(&config.year_end_bonus),
        other => Err(EngineError::validation(
            "benefit_type",
            format!("{} is not a bonus", other.as_str()),
        )),
    }
}

#[allow(clippy::too_many_arguments)]
fn finish(
    employee: &Employee,
    benefit_type: BenefitType,
    gross_amount: Decimal,
    taxed: bool,
    tax_rule: &BenefitTaxRule,
    days: Option<Decimal>,
    notes: String,
    input: serde_json::Value,
) -> BenefitCalculation {
    let gross_amount = round_currency(gross_amount);
    let tax_amount = if taxed {
        benefit_tax(gross_amount, tax_rule)
    } else {
        Decimal::ZERO
    };
    let net_amount = gross_amount - tax_amount;

    let audit_step = AuditStep {
        step_number: 1,
        rule_id: benefit_type.as_str().to_string(),
        rule_name: format!("Benefit: {}", benefit_type.as_str()),
        reference: "benefits policy".to_string(),
        input,
        output: serde_json::json!({
            "gross_amount": gross_amount.to_string(),
            "tax_amount": tax_amount.to_string(),
            "net_amount": net_amount.to_string(),
            "days": days.map(|d| d.to_string())
        }),
        reasoning: notes.clone(),
    };

    BenefitCalculation {
        employee_id: employee.id.clone(),
        benefit_type,
        gross_amount,
        tax_amount,
        net_amount,
        days,
        notes,
        audit_step,
    }
}

/// Computes a performance, mid-year or year-end bonus.
///
/// The employee must be on payroll and have served at least the rule's
/// minimum full months by `cutoff_date`.
pub fn calculate_bonus(
    employee: &Employee,
    benefit_type: BenefitType,
    cutoff_date: NaiveDate,
    config: &BenefitsConfig,
) -> EngineResult<BenefitCalculation> {
    let rule = bonus_rule(config, benefit_type)?;

    if !employee.is_on_payroll() {
        return Err(EngineError::calculation(format!(
            "employee {} is {} and not eligible for {}",
            employee.id,
            employee.employment_status.as_str(),
            benefit_type.as_str()
        )));
    }

    let months = full_months_between(employee.appointment_date, cutoff_date);
    if months < rule.min_service_months {
        return Err(EngineError::calculation(format!(
            "employee {} has {} months of service at {}; {} required",
            employee.id, months, cutoff_date, rule.min_service_months
        )));
    }

    let gross = employee.monthly_salary * rule.rate;
    let notes = format!(
        "{} months of service: {} x {} monthly salary",
        months,
        rule.rate.normalize(),
        employee.monthly_salary
    );

    Ok(finish(
        employee,
        benefit_type,
        gross,
        true,
        &config.tax,
        None,
        notes,
        serde_json::json!({
            "monthly_salary": employee.monthly_salary.to_string(),
            "rate": rule.rate.to_string(),
            "service_months": months,
            "cutoff_date": cutoff_date.to_string()
        }),
    ))
}

fn gsis_multiplier(rule: &GsisPayoutRule, years: u32) -> Option<Decimal> {
    rule.tiers
        .iter()
        .rfind(|tier| tier.min_years <= years)
        .map(|tier| tier.multiplier)
}

/// Computes the GSIS retirement payout.
///
/// Service runs from appointment to separation, or to `as_of` for employees
/// still in service. Service below the lowest tier is an error.
pub fn calculate_gsis_payout(
    employee: &Employee,
    as_of: NaiveDate,
    config: &BenefitsConfig,
) -> EngineResult<BenefitCalculation> {
    let rule = &config.gsis_payout;
    let service_end = employee.separation_date.unwrap_or(as_of);
    let years = full_years_between(employee.appointment_date, service_end);

    let multiplier = gsis_multiplier(rule, years).ok_or_else(|| {
        EngineError::calculation(format!(
            "employee {} has {} years of service; below the lowest GSIS payout tier",
            employee.id, years
        ))
    })?;

    let gross = employee.monthly_salary * rule.rate * multiplier;
    let notes = format!(
        "{} years of service: {} x {} x {}",
        years,
        employee.monthly_salary,
        rule.rate.normalize(),
        multiplier.normalize()
    );

    Ok(finish(
        employee,
        BenefitType::GsisPayout,
        gross,
        false,
        &config.tax,
        None,
        notes,
        serde_json::json!({
            "monthly_salary": employee.monthly_salary.to_string(),
            "rate": rule.rate.to_string(),
            "service_years": years,
            "multiplier": multiplier.to_string()
        }),
    ))
}

/// Computes the terminal leave benefit.
///
/// Only separated employees qualify. The daily rate is derived from the
/// highest monthly salary.
pub fn calculate_terminal_leave(
    employee: &Employee,
    monetizable_days: Decimal,
    config: &EngineConfig,
) -> EngineResult<BenefitCalculation> {
    if !employee.employment_status.is_separated() {
        return Err(EngineError::calculation(format!(
            "employee {} is {}; terminal leave requires separation",
            employee.id,
            employee.employment_status.as_str()
        )));
    }

    let highest = employee.highest_monthly_salary.ok_or_else(|| {
        EngineError::calculation(format!(
            "employee {} has no highest monthly salary on record",
            employee.id
        ))
    })?;

    if monetizable_days <= Decimal::ZERO {
        return Err(EngineError::calculation(format!(
            "employee {} has no monetizable leave balance",
            employee.id
        )));
    }

    let benefits = config.benefits();
    let daily_rate = daily_rate_from_monthly(highest, config.payroll().working_days_per_month);
    let factor = benefits.terminal_leave.constant_factor;
    let gross = monetizable_days * daily_rate * factor;
    let notes = format!(
        "{} days x {} daily rate x {}",
        monetizable_days.normalize(),
        daily_rate,
        factor.normalize()
    );

    Ok(finish(
        employee,
        BenefitType::TerminalLeave,
        gross,
        false,
        &benefits.tax,
        Some(monetizable_days),
        notes,
        serde_json::json!({
            "highest_monthly_salary": highest.to_string(),
            "daily_rate": daily_rate.to_string(),
            "monetizable_days": monetizable_days.to_string(),
            "constant_factor": factor.to_string()
        }),
    ))
}

/// Computes a leave monetization.
///
/// Converts `min(requested, balance)` days at the daily rate of the current
/// salary. `requested_days` of `None` converts the whole balance.
pub fn calculate_monetization(
    employee: &Employee,
    monetizable_days: Decimal,
    requested_days: Option<Decimal>,
    config: &EngineConfig,
) -> EngineResult<BenefitCalculation> {
    if let Some(requested) = requested_days
        && requested <= Decimal::ZERO
    {
        return Err(EngineError::validation(
            "requested_days",
            "must be greater than zero",
        ));
    }

    let days = requested_days.map_or(monetizable_days, |r| r.min(monetizable_days));
    if days <= Decimal::ZERO {
        return Err(EngineError::calculation(format!(
            "employee {} has no monetizable leave balance",
            employee.id
        )));
    }

    let daily_rate = daily_rate_from_monthly(
        employee.monthly_salary,
        config.payroll().working_days_per_month,
    );
    let gross = days * daily_rate;
    let notes = format!(
        "{} of {} monetizable days x {} daily rate",
        days.normalize(),
        monetizable_days.normalize(),
        daily_rate
    );

    Ok(finish(
        employee,
        BenefitType::LeaveMonetization,
        gross,
        false,
        &config.benefits().tax,
        Some(days),
        notes,
        serde_json::json!({
            "monthly_salary": employee.monthly_salary.to_string(),
            "daily_rate": daily_rate.to_string(),
            "monetizable_days": monetizable_days.to_string(),
            "requested_days": requested_days.map(|d| d.to_string())
        }),
    ))
}

/// Computes the loyalty award.
///
/// The multiplier is 1 at the minimum years and grows by one for every
/// further milestone completed.
pub fn calculate_loyalty_award(
    employee: &Employee,
    as_of: NaiveDate,
    config: &BenefitsConfig,
) -> EngineResult<BenefitCalculation> {
    let rule = &config.loyalty_award;
    let years = full_years_between(employee.appointment_date, as_of);

    if years < rule.minimum_years {
        return Err(EngineError::calculation(format!(
            "employee {} has {} years of service; loyalty award requires {}",
            employee.id, years, rule.minimum_years
        )));
    }

    let milestones = 1 + (years - rule.minimum_years) / rule.milestone_years;
    let gross = rule.base_amount * Decimal::from(milestones);
    let notes = format!(
        "{} years of service: {} x {}",
        years, rule.base_amount, milestones
    );

    Ok(finish(
        employee,
        BenefitType::LoyaltyAward,
        gross,
        true,
        &config.tax,
        None,
        notes,
        serde_json::json!({
            "service_years": years,
            "base_amount": rule.base_amount.to_string(),
            "multiplier": milestones
        }),
    ))
}

/// Dispatches to the formula for `benefit_type`.
pub fn calculate_benefit(
    employee: &Employee,
    benefit_type: BenefitType,
    inputs: &BenefitInputs,
    config: &EngineConfig,
) -> EngineResult<BenefitCalculation> {
    let benefits = config.benefits();
    match benefit_type {
        BenefitType::PerformanceBonus | BenefitType::MidYearBonus | BenefitType::YearEndBonus => {
            calculate_bonus(employee, benefit_type, inputs.cutoff_date, benefits)
        }
        BenefitType::GsisPayout => calculate_gsis_payout(employee, inputs.as_of, benefits),
        BenefitType::TerminalLeave => {
            calculate_terminal_leave(employee, inputs.monetizable_days, config)
        }
        BenefitType::LeaveMonetization => calculate_monetization(
            employee,
            inputs.monetizable_days,
            inputs.requested_days,
            config,
        ),
        BenefitType::LoyaltyAward => calculate_loyalty_award(employee, inputs.as_of, benefits),
    }
}
