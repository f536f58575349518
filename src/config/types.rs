//! Configuration types for payroll computation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GSIS contribution rates, expressed as fractions of monthly salary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GsisRates {
    /// Personal share withheld from the employee (e.g. 0.09).
    pub employee_rate: Decimal,
    /// Government (employer) share, reported but never deducted (e.g. 0.12).
    pub government_rate: Decimal,
}

/// Pag-IBIG (HDMF) contribution rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagIbigRates {
    /// Salaries at or below this amount use `low_income_rate`.
    pub low_income_threshold: Decimal,
    /// Rate applied at or below the threshold.
    pub low_income_rate: Decimal,
    /// Rate applied above the threshold.
    pub standard_rate: Decimal,
    /// Ceiling on the employee contribution.
    pub max_contribution: Decimal,
}

/// PhilHealth premium table.
///
/// The premium is `premium_rate` applied to the salary clamped to
/// `[salary_floor, salary_ceiling]`, so the floor and ceiling bands pay a
/// fixed premium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhilHealthRates {
    /// Premium rate applied to the clamped salary.
    pub premium_rate: Decimal,
    /// Salary below which the floor premium applies.
    pub salary_floor: Decimal,
    /// Salary above which the ceiling premium applies.
    pub salary_ceiling: Decimal,
    /// Fraction of the premium paid by the employee.
    pub employee_share: Decimal,
}

/// Statutory contribution configuration from statutory.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatutoryConfig {
    /// GSIS rates.
    pub gsis: GsisRates,
    /// Pag-IBIG rates.
    pub pagibig: PagIbigRates,
    /// PhilHealth premium table.
    pub philhealth: PhilHealthRates,
}

/// One bracket of the progressive withholding tax table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Taxable income at which this bracket starts.
    pub lower_bound: Decimal,
    /// Tax due on income up to `lower_bound`.
    pub base_tax: Decimal,
    /// Rate applied to income in excess of `lower_bound`.
    pub marginal_rate: Decimal,
}

/// Withholding tax configuration from withholding_tax.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithholdingTaxConfig {
    /// Brackets sorted by `lower_bound` ascending.
    pub brackets: Vec<TaxBracket>,
}

/// How days inside a date range are counted for proration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBasis {
    /// Every calendar day counts.
    Calendar,
    /// Only Monday to Friday count.
    Weekdays,
}

/// A default allowance or deduction applied when no override is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponentDefault {
    /// Component code (e.g. "pera").
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Amount per payroll period.
    pub amount: Decimal,
}

/// Step increment policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepIncrementPolicy {
    /// Highest salary step; employees at this step are never eligible.
    pub max_step: u8,
    /// Full years required between increments.
    pub interval_years: u32,
}

/// Payroll policy from payroll.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollPolicy {
    /// Day counting basis for proration.
    pub day_basis: DayBasis,
    /// Divisor converting a monthly salary to a daily rate.
    pub working_days_per_month: Decimal,
    /// Allowances paid each period unless overridden.
    #[serde(default)]
    pub default_allowances: Vec<PayComponentDefault>,
    /// Non-statutory deductions taken each period unless overridden.
    #[serde(default)]
    pub default_deductions: Vec<PayComponentDefault>,
    /// Step increment policy.
    pub step_increment: StepIncrementPolicy,
}

/// A bonus paid as a fraction of monthly salary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusRule {
    /// Fraction of monthly salary paid.
    pub rate: Decimal,
    /// Full months of service required at the cutoff date.
    pub min_service_months: u32,
}

/// A service-based multiplier tier for the GSIS payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsisPayoutTier {
    /// Minimum full years of service for this tier.
    pub min_years: u32,
    /// Number of monthly salaries paid.
    pub multiplier: Decimal,
}

/// GSIS retirement payout rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GsisPayoutRule {
    /// Fraction of monthly salary per multiplier unit.
    pub rate: Decimal,
    /// Tiers sorted by `min_years` ascending.
    pub tiers: Vec<GsisPayoutTier>,
}

/// Terminal leave benefit rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalLeaveRule {
    /// Constant factor applied to balance × daily rate.
    pub constant_factor: Decimal,
}

/// Loyalty award rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAwardRule {
    /// Amount paid at the first milestone.
    pub base_amount: Decimal,
    /// Years of service required for any award.
    pub minimum_years: u32,
    /// Each additional block of this many years adds one multiplier unit.
    pub milestone_years: u32,
}

/// Tax treatment of benefit payouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitTaxRule {
    /// Amount of a payout that is exempt from tax.
    pub exemption_ceiling: Decimal,
    /// Flat rate applied above the ceiling.
    pub rate: Decimal,
}

/// Benefit rules from benefits.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitsConfig {
    /// Performance-based bonus.
    pub performance_bonus: BonusRule,
    /// Mid-year bonus.
    pub mid_year_bonus: BonusRule,
    /// Year-end bonus.
    pub year_end_bonus: BonusRule,
    /// GSIS retirement payout.
    pub gsis_payout: GsisPayoutRule,
    /// Terminal leave benefit.
    pub terminal_leave: TerminalLeaveRule,
    /// Loyalty award.
    pub loyalty_award: LoyaltyAwardRule,
    /// Benefit tax.
    pub tax: BenefitTaxRule,
}

/// The complete engine configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    statutory: StatutoryConfig,
    withholding_tax: WithholdingTaxConfig,
    payroll: PayrollPolicy,
    benefits: BenefitsConfig,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    ///
    /// Tax brackets and GSIS payout tiers are sorted ascending.
    pub fn new(
        statutory: StatutoryConfig,
        withholding_tax: WithholdingTaxConfig,
        payroll: PayrollPolicy,
        benefits: BenefitsConfig,
    ) -> Self {
        let mut withholding_tax = withholding_tax;
        withholding_tax
            .brackets
            .sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
        let mut benefits = benefits;
        benefits
            .gsis_payout
            .tiers
            .sort_by(|a, b| a.min_years.cmp(&b.min_years));
        Self {
            statutory,
            withholding_tax,
            payroll,
            benefits,
        }
    }

    /// Returns the statutory contribution rates.
    pub fn statutory(&self) -> &StatutoryConfig {
        &self.statutory
    }

    /// Returns the withholding tax table.
    pub fn withholding_tax(&self) -> &WithholdingTaxConfig {
        &self.withholding_tax
    }

    /// Returns the payroll policy.
    pub fn payroll(&self) -> &PayrollPolicy {
        &self.payroll
    }

    /// Returns the benefit rules.
    pub fn benefits(&self) -> &BenefitsConfig {
        &self.benefits
    }

    /// Returns a copy of this configuration with a different payroll policy.
    pub fn with_payroll_policy(mut self, payroll: PayrollPolicy) -> Self {
        self.payroll = payroll;
        self
    }

    /// Checks the semantic rules serde cannot express.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let brackets = &self.withholding_tax.brackets;
        match brackets.first() {
            None => return Err("withholding tax table has no brackets".to_string()),
            Some(first) if !first.lower_bound.is_zero() => {
                return Err("first withholding tax bracket must start at 0".to_string());
            }
            Some(_) => {}
        }
        if brackets
            .windows(2)
            .any(|w| w[0].lower_bound == w[1].lower_bound)
        {
            return Err("withholding tax brackets must have distinct lower bounds".to_string());
        }

        let rates = [
            ("gsis.employee_rate", self.statutory.gsis.employee_rate),
            ("gsis.government_rate", self.statutory.gsis.government_rate),
            ("pagibig.low_income_rate", self.statutory.pagibig.low_income_rate),
            ("pagibig.standard_rate", self.statutory.pagibig.standard_rate),
            ("pagibig.max_contribution", self.statutory.pagibig.max_contribution),
            ("philhealth.premium_rate", self.statutory.philhealth.premium_rate),
            ("philhealth.employee_share", self.statutory.philhealth.employee_share),
            ("benefits.tax.rate", self.benefits.tax.rate),
        ];
        if let Some((name, _)) = rates.iter().find(|(_, value)| value.is_sign_negative()) {
            return Err(format!("{} must not be negative", name));
        }

        if self.statutory.philhealth.salary_floor > self.statutory.philhealth.salary_ceiling {
            return Err("philhealth.salary_floor exceeds salary_ceiling".to_string());
        }
        if self.payroll.working_days_per_month <= Decimal::ZERO {
            return Err("payroll.working_days_per_month must be positive".to_string());
        }
        if self.benefits.loyalty_award.milestone_years == 0 {
            return Err("loyalty_award.milestone_years must be positive".to_string());
        }
        Ok(())
    }
}
