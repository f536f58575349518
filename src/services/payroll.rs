//! Payroll generation.
//!
//! Generation runs once per period. It claims the period by moving it to
//! Processing with a compare-and-set, then computes one item per employee
//! owed pay for the period inside a single transaction. Each employee runs
//! in its own savepoint: an employee whose item cannot be computed is
//! reported in the [`GenerationSummary`] and the run continues with the next
//! employee.

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::{
    StepIncrementEligibility, calculate_proration, calculate_statutory_deductions,
    evaluate_step_increment, round_currency,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::events::EngineEvent;
use crate::models::{
    AuditStep, ComponentSource, Employee, OverrideIndex, OverrideKind, PayComponent, PayrollItem,
    PayrollItemStatus, PayrollPeriod, PeriodStatus, PeriodTotals,
};
use crate::persistence::Tables;

use super::overrides::resolve_components;
use super::{EmployeeFailure, EngineContext};

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// The period generated.
    pub period_id: Uuid,
    /// Items written.
    pub processed_count: u32,
    /// Employees that failed.
    pub failed_count: u32,
    /// Why each failed employee failed.
    pub failures: Vec<EmployeeFailure>,
    /// Net pay over the items written.
    pub total_net_pay: Decimal,
    /// Wall-clock duration of the run in microseconds.
    pub duration_us: u64,
}

/// Generates and recalculates payroll items.
#[derive(Debug, Clone)]
pub struct PayrollPipeline {
    ctx: EngineContext,
}

impl PayrollPipeline {
    /// Creates the pipeline.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Generates payroll for a period.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the period does not exist
    /// - `Conflict` if the period is not Draft or Open, has no attendance,
    ///   or another generation claimed it first
    /// - `Persistence` if the store fails mid-run
    ///
    /// Per-employee failures do not fail the run; they are listed in the
    /// summary.
    pub async fn generate(&self, period_id: Uuid) -> EngineResult<GenerationSummary> {
        let started = Instant::now();

        let (period, from) = self
            .ctx
            .db()
            .transaction(|t| {
                let period = t.period(period_id)?;
                if !period.status.is_editable() {
                    return Err(EngineError::Conflict {
                        message: format!(
                            "payroll period {} is {}; generation needs a draft or open period",
                            period.key,
                            period.status.as_str()
                        ),
                        details: vec![format!("status: {}", period.status.as_str())],
                    });
                }
                if t.active_batch(period_id)?.is_none() {
                    return Err(EngineError::Conflict {
                        message: "cannot process payroll without attendance data".to_string(),
                        details: vec![format!("period: {}", period.key)],
                    });
                }
                let from = t.compare_and_set_status(
                    period_id,
                    &[PeriodStatus::Draft, PeriodStatus::Open],
                    PeriodStatus::Processing,
                )?;
                Ok((period, from))
            })
            .await?;

        tracing::info!(
            period_id = %period_id,
            period = %period.key,
            "payroll generation started"
        );
        self.ctx.emit(EngineEvent::PeriodTransitioned {
            period_id,
            from,
            to: PeriodStatus::Processing,
            reason: None,
        });

        let config = self.ctx.config();
        let (processed_count, total_net_pay, failures) = self
            .ctx
            .db()
            .transaction(|t| {
                let employees = t.payroll_employees(period.start_date, period.end_date)?;
                let mut processed_count = 0u32;
                let mut total_net_pay = Decimal::ZERO;
                let mut failures = Vec::new();

                for employee in &employees {
                    let result = t.savepoint(|t| {
                        let item = compute_item(t, &period, employee, config)?;
                        t.upsert_item(&item)?;
                        Ok(item)
                    });

                    match result {
                        Ok(item) => {
                            tracing::debug!(
                                period_id = %period_id,
                                employee_id = %employee.id,
                                basic_pay = %item.basic_pay,
                                net_pay = %item.net_pay,
                                "payroll item calculated"
                            );
                            processed_count += 1;
                            total_net_pay += item.net_pay;
                        }
                        Err(e) if e.kind() == ErrorKind::Persistence => return Err(e),
                        Err(e) => {
                            tracing::warn!(
                                period_id = %period_id,
                                employee_id = %employee.id,
                                error = %e,
                                "payroll item failed"
                            );
                            failures.push(EmployeeFailure::new(&employee.id, &e));
                        }
                    }
                }

                recompute_totals(t, period_id)?;
                Ok((processed_count, total_net_pay, failures))
            })
            .await?;

        let summary = GenerationSummary {
            period_id,
            processed_count,
            failed_count: failures.len() as u32,
            failures,
            total_net_pay,
            duration_us: started.elapsed().as_micros() as u64,
        };

        tracing::info!(
            period_id = %period_id,
            processed_count = summary.processed_count,
            failed_count = summary.failed_count,
            total_net_pay = %summary.total_net_pay,
            duration_us = summary.duration_us,
            "payroll generation completed"
        );
        self.ctx.emit(EngineEvent::PayrollGenerated {
            period_id,
            processed_count: summary.processed_count,
            failed_count: summary.failed_count,
            total_net_pay: summary.total_net_pay,
        });

        Ok(summary)
    }

    /// Recomputes one employee's item while the period is under review.
    ///
    /// # Errors
    ///
    /// - `Conflict` unless the period is Processing or Completed, or if the
    ///   existing item is finalized or paid
    /// - any error from computing the item
    pub async fn recalculate_employee(
        &self,
        period_id: Uuid,
        employee_id: &str,
    ) -> EngineResult<PayrollItem> {
        let config = self.ctx.config();
        let item = self
            .ctx
            .db()
            .transaction(|t| {
                let period = t.period(period_id)?;
                if !period.status.is_reviewable() {
                    return Err(EngineError::Conflict {
                        message: format!(
                            "payroll period {} is {}; items are recalculated during review",
                            period.key,
                            period.status.as_str()
                        ),
                        details: vec![format!("status: {}", period.status.as_str())],
                    });
                }
                let employee = t.employee(employee_id)?;
                let item = compute_item(t, &period, &employee, config)?;
                t.upsert_item(&item)?;
                recompute_totals(t, period_id)?;
                Ok(item)
            })
            .await?;

        tracing::info!(
            period_id = %period_id,
            employee_id = %employee_id,
            net_pay = %item.net_pay,
            "payroll item recalculated"
        );
        Ok(item)
    }

    /// Items of a period, ordered by employee id.
    pub async fn items(&self, period_id: Uuid) -> EngineResult<Vec<PayrollItem>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                t.items_for_period(period_id)
            })
            .await
    }

    /// One employee's item in a period.
    pub async fn item(&self, period_id: Uuid, employee_id: &str) -> EngineResult<PayrollItem> {
        self.ctx
            .db()
            .read(|t| {
                t.item(period_id, employee_id)?
                    .ok_or_else(|| EngineError::not_found("payroll item", employee_id))
            })
            .await
    }

    /// Evaluates step increment eligibility for every employee on payroll.
    pub async fn evaluate_step_increments(
        &self,
        evaluation_date: NaiveDate,
    ) -> EngineResult<Vec<(String, StepIncrementEligibility)>> {
        let policy = &self.ctx.config().payroll().step_increment;
        let employees = self.ctx.db().active_employees().await?;
        Ok(employees
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    evaluate_step_increment(e, evaluation_date, policy, 1),
                )
            })
            .collect())
    }
}

/// Reads one employee's attendance and overrides and computes the item.
fn compute_item(
    tables: &Tables<'_>,
    period: &PayrollPeriod,
    employee: &Employee,
    config: &EngineConfig,
) -> EngineResult<PayrollItem> {
    let working_days = tables.working_days(period.id, &employee.id)?;
    let overrides = tables.overrides_during(&employee.id, period.start_date, period.end_date)?;
    build_payroll_item(period, employee, working_days, &overrides, config)
}

/// Computes one employee's payroll item for a period.
///
/// `working_days` of `None` means the employee had no attendance record;
/// the item is still produced with zero working days.
///
/// # Errors
///
/// - `Validation` if the employee's daily rate is not positive
/// - `CalculationError` if deductions exceed gross pay
pub fn build_payroll_item(
    period: &PayrollPeriod,
    employee: &Employee,
    working_days: Option<Decimal>,
    overrides: &OverrideIndex,
    config: &EngineConfig,
) -> EngineResult<PayrollItem> {
    if employee.daily_rate <= Decimal::ZERO {
        return Err(EngineError::validation(
            "daily_rate",
            format!("employee {} has daily rate {}", employee.id, employee.daily_rate),
        ));
    }

    let policy = config.payroll();
    let mut trace: Vec<AuditStep> = Vec::new();

    let record_found = working_days.is_some();
    let working_days = working_days.unwrap_or(Decimal::ZERO);
    trace.push(AuditStep {
        step_number: 1,
        rule_id: "attendance".to_string(),
        rule_name: "Attendance".to_string(),
        reference: "active attendance batch".to_string(),
        input: serde_json::json!({
            "employee_id": employee.id,
            "period": period.key.to_string()
        }),
        output: serde_json::json!({
            "record_found": record_found,
            "working_days": working_days.to_string()
        }),
        reasoning: if record_found {
            format!("{} working days imported", working_days.normalize())
        } else {
            "No attendance record: zero working days".to_string()
        },
    });

    let proration = calculate_proration(
        employee.daily_rate,
        employee.appointment_date,
        employee.separation_date,
        period.start_date,
        period.end_date,
        policy.day_basis,
        2,
    );
    let paid_days = if proration.is_prorated() {
        working_days.min(Decimal::from(proration.prorated_days))
    } else {
        working_days
    };
    let basic_pay = round_currency(employee.daily_rate * paid_days);
    trace.push(proration.audit_step.clone());

    trace.push(AuditStep {
        step_number: 3,
        rule_id: "basic_pay".to_string(),
        rule_name: "Basic Pay".to_string(),
        reference: "daily rate x paid days".to_string(),
        input: serde_json::json!({
            "daily_rate": employee.daily_rate.to_string(),
            "working_days": working_days.to_string(),
            "prorated_days": proration.prorated_days,
            "adjustment_reason": proration.reason.as_str()
        }),
        output: serde_json::json!({
            "paid_days": paid_days.to_string(),
            "basic_pay": basic_pay.to_string()
        }),
        reasoning: format!(
            "₱{} x {} days = ₱{}",
            employee.daily_rate.normalize(),
            paid_days.normalize(),
            basic_pay
        ),
    });

    let allowances = resolve_components(
        &policy.default_allowances,
        overrides,
        &employee.id,
        OverrideKind::Allowance,
    );
    let configured_deductions = resolve_components(
        &policy.default_deductions,
        overrides,
        &employee.id,
        OverrideKind::Deduction,
    );
    trace.push(AuditStep {
        step_number: 4,
        rule_id: "pay_components".to_string(),
        rule_name: "Allowances and Deductions".to_string(),
        reference: "payroll policy defaults and employee overrides".to_string(),
        input: serde_json::json!({
            "override_count": overrides.len()
        }),
        output: serde_json::json!({
            "allowances": component_summary(&allowances),
            "deductions": component_summary(&configured_deductions)
        }),
        reasoning: format!(
            "{} allowance and {} deduction lines resolved",
            allowances.len(),
            configured_deductions.len()
        ),
    });

    let statutory = calculate_statutory_deductions(basic_pay, config, 5);
    let next_step = 5 + statutory.audit_steps.len() as u32;
    trace.extend(statutory.audit_steps.iter().cloned());

    let mut deductions = vec![
        statutory_line("gsis", "GSIS personal share", statutory.gsis.employee_share),
        statutory_line("pagibig", "Pag-IBIG contribution", statutory.pagibig),
        statutory_line("philhealth", "PhilHealth premium", statutory.philhealth.employee_share),
        statutory_line("withholding_tax", "Withholding tax", statutory.withholding_tax),
    ];
    deductions.extend(configured_deductions);

    let total_allowances: Decimal = allowances.iter().map(|a| a.amount).sum();
    let gross_pay = basic_pay + total_allowances;
    let total_deductions: Decimal = deductions.iter().map(|d| d.amount).sum();
    let net_pay = gross_pay - total_deductions;

    if net_pay < Decimal::ZERO {
        return Err(EngineError::calculation(format!(
            "deductions {} exceed gross pay {} for employee {}",
            total_deductions, gross_pay, employee.id
        )));
    }

    trace.push(AuditStep {
        step_number: next_step,
        rule_id: "net_pay".to_string(),
        rule_name: "Net Pay".to_string(),
        reference: "gross pay less deductions".to_string(),
        input: serde_json::json!({
            "basic_pay": basic_pay.to_string(),
            "total_allowances": total_allowances.to_string(),
            "total_deductions": total_deductions.to_string()
        }),
        output: serde_json::json!({
            "gross_pay": gross_pay.to_string(),
            "net_pay": net_pay.to_string()
        }),
        reasoning: format!("₱{} - ₱{} = ₱{}", gross_pay, total_deductions, net_pay),
    });

    let now = Utc::now();
    Ok(PayrollItem {
        id: Uuid::new_v4(),
        period_id: period.id,
        employee_id: employee.id.clone(),
        working_days,
        paid_days,
        daily_rate: employee.daily_rate,
        adjustment_reason: proration.reason,
        basic_pay,
        allowances,
        deductions,
        gross_pay,
        total_deductions,
        net_pay,
        status: PayrollItemStatus::Calculated,
        audit_trace: trace,
        calculated_at: now,
        updated_at: now,
    })
}

fn statutory_line(code: &str, description: &str, amount: Decimal) -> PayComponent {
    PayComponent {
        code: code.to_string(),
        description: description.to_string(),
        amount,
        source: ComponentSource::Statutory,
    }
}

fn component_summary(lines: &[PayComponent]) -> serde_json::Value {
    lines
        .iter()
        .map(|l| {
            serde_json::json!({
                "code": l.code,
                "amount": l.amount.to_string(),
                "source": l.source
            })
        })
        .collect()
}

/// Recomputes and stores the aggregate totals of a period.
pub(crate) fn recompute_totals(
    tables: &mut Tables<'_>,
    period_id: Uuid,
) -> EngineResult<PeriodTotals> {
    let totals = tables
        .items_for_period(period_id)?
        .into_iter()
        .fold(PeriodTotals::default(), |mut acc, item| {
            acc.employee_count += 1;
            acc.total_basic_pay += item.basic_pay;
            acc.total_allowances += item.total_allowances();
            acc.total_gross_pay += item.gross_pay;
            acc.total_deductions += item.total_deductions;
            acc.total_net_pay += item.net_pay;
            acc
        });

    let mut period = tables.period(period_id)?;
    period.totals = totals.clone();
    period.updated_at = Utc::now();
    tables.update_period(&period)?;
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::{AdjustmentReason, EmploymentStatus, PayOverride, index_overrides};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> EngineConfig {
        ConfigLoader::load("./config/ph_2025").unwrap().into_config()
    }

    fn create_employee(appointed: NaiveDate) -> Employee {
        Employee {
            id: "emp_001".to_string(),
            name: "Maria Santos".to_string(),
            monthly_salary: dec("22000"),
            daily_rate: dec("1000"),
            highest_monthly_salary: None,
            appointment_date: appointed,
            separation_date: None,
            employment_status: EmploymentStatus::Active,
            step_increment: 1,
            last_step_increment_date: None,
        }
    }

    fn period() -> PayrollPeriod {
        PayrollPeriod::half_month(2025, 9, 1, None).unwrap()
    }

    #[test]
    fn test_full_period_item() {
        let item = build_payroll_item(
            &period(),
            &create_employee(date(2020, 1, 1)),
            Some(dec("10")),
            &OverrideIndex::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(item.basic_pay, dec("10000.00"));
        assert_eq!(item.allowance("pera").unwrap().amount, dec("1000.00"));
        assert_eq!(item.gross_pay, dec("11000.00"));
        assert_eq!(item.deduction("gsis").unwrap().amount, dec("900.00"));
        assert_eq!(item.deduction("pagibig").unwrap().amount, dec("200.00"));
        assert_eq!(item.deduction("philhealth").unwrap().amount, dec("250.00"));
        assert_eq!(item.deduction("withholding_tax").unwrap().amount, dec("0.00"));
        assert_eq!(item.total_deductions, dec("1350.00"));
        assert_eq!(item.net_pay, dec("9650.00"));
        assert_eq!(item.status, PayrollItemStatus::Calculated);
        assert_eq!(item.adjustment_reason, AdjustmentReason::FullPeriod);
    }

    #[test]
    fn test_new_hire_paid_days_capped_by_proration() {
        let item = build_payroll_item(
            &period(),
            &create_employee(date(2025, 9, 10)),
            Some(dec("10")),
            &OverrideIndex::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(item.paid_days, dec("6"));
        assert_eq!(item.basic_pay, dec("6000.00"));
        assert_eq!(item.adjustment_reason, AdjustmentReason::NewHire);
    }

    #[test]
    fn test_missing_attendance_yields_zero_basic_pay() {
        let item = build_payroll_item(
            &period(),
            &create_employee(date(2020, 1, 1)),
            None,
            &OverrideIndex::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(item.working_days, Decimal::ZERO);
        assert_eq!(item.basic_pay, Decimal::ZERO);
        assert_eq!(item.audit_trace[0].output["record_found"], false);
    }

    #[test]
    fn test_deduction_override_larger_than_gross_fails() {
        let loan = PayOverride {
            id: Uuid::new_v4(),
            employee_id: "emp_001".to_string(),
            kind: OverrideKind::Deduction,
            code: "salary_loan".to_string(),
            amount: dec("50000"),
            effective_date: date(2025, 1, 1),
            end_date: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let result = build_payroll_item(
            &period(),
            &create_employee(date(2020, 1, 1)),
            Some(dec("10")),
            &index_overrides(vec![loan], date(2025, 9, 1), date(2025, 9, 15)),
            &config(),
        );

        assert!(matches!(result, Err(EngineError::CalculationError { .. })));
    }

    #[test]
    fn test_non_positive_daily_rate_rejected() {
        let mut employee = create_employee(date(2020, 1, 1));
        employee.daily_rate = Decimal::ZERO;
        let result = build_payroll_item(
            &period(),
            &employee,
            Some(dec("10")),
            &OverrideIndex::new(),
            &config(),
        );

        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_audit_trace_is_numbered_in_order() {
        let item = build_payroll_item(
            &period(),
            &create_employee(date(2020, 1, 1)),
            Some(dec("10")),
            &OverrideIndex::new(),
            &config(),
        )
        .unwrap();

        let numbers: Vec<u32> = item.audit_trace.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<u32>>());
        assert_eq!(item.audit_trace.last().unwrap().rule_id, "net_pay");
    }

    #[test]
    fn test_reasoning_quotes_amounts_in_pesos() {
        let item = build_payroll_item(
            &period(),
            &create_employee(date(2025, 9, 10)),
            Some(dec("10")),
            &OverrideIndex::new(),
            &config(),
        )
        .unwrap();

        for step in &item.audit_trace {
            assert!(!step.reasoning.contains('$'), "{}: {}", step.rule_id, step.reasoning);
        }
        let net = item.audit_trace.last().unwrap();
        assert!(net.reasoning.starts_with('₱'));
    }
}
