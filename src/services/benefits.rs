//! Benefit cycles and one-off payouts.
//!
//! Cycle-based benefits (bonuses, GSIS payout, loyalty award) produce one
//! [`BenefitItem`] per employee in a [`BenefitCycle`]. Leave-based benefits
//! (terminal leave, leave monetization) and individually granted loyalty
//! awards are one-off payouts recorded in the compensation ledger.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::calculation::{BenefitCalculation, BenefitInputs, calculate_benefit};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::events::EngineEvent;
use crate::models::{
    BenefitCycle, BenefitItem, BenefitType, CompensationBenefit, CycleStatus, Employee,
};
use crate::persistence::Tables;

use super::{BatchOutcome, EmployeeFailure, EngineContext};

/// Request to create a benefit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycle {
    /// The benefit computed in the cycle.
    pub benefit_type: BenefitType,
    /// Benefit year.
    pub year: i32,
    /// Date on which salary and status are evaluated.
    pub applicable_date: NaiveDate,
    /// Date the benefit is paid.
    pub payment_date: NaiveDate,
    /// Date at which service is measured for eligibility.
    pub cutoff_date: NaiveDate,
}

/// Outcome of running a cycle over every employee on payroll.
#[derive(Debug, Clone)]
pub struct CycleRunSummary {
    /// The cycle.
    pub cycle_id: Uuid,
    /// Items written, eligible or not.
    pub created: Vec<BenefitItem>,
    /// Employees that already had an item.
    pub skipped: Vec<String>,
    /// Employees that could not be processed.
    pub failures: Vec<EmployeeFailure>,
    /// Net amount over the eligible items written.
    pub total_net_amount: Decimal,
}

/// Runs benefit cycles and one-off payouts.
#[derive(Debug, Clone)]
pub struct BenefitsService {
    ctx: EngineContext,
}

impl BenefitsService {
    /// Creates the service.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Creates a Draft cycle.
    ///
    /// Leave-based benefits are one-off payouts and cannot be run as cycles.
    pub async fn create_cycle(&self, request: NewCycle) -> EngineResult<BenefitCycle> {
        if matches!(
            request.benefit_type,
            BenefitType::TerminalLeave | BenefitType::LeaveMonetization
        ) {
            return Err(EngineError::validation(
                "benefit_type",
                format!(
                    "{} is processed per employee, not in cycles",
                    request.benefit_type.as_str()
                ),
            ));
        }
        if request.payment_date < request.applicable_date {
            return Err(EngineError::validation(
                "payment_date",
                format!(
                    "{} is before applicable date {}",
                    request.payment_date, request.applicable_date
                ),
            ));
        }

        let cycle = BenefitCycle {
            id: Uuid::new_v4(),
            benefit_type: request.benefit_type,
            year: request.year,
            applicable_date: request.applicable_date,
            payment_date: request.payment_date,
            cutoff_date: request.cutoff_date,
            status: CycleStatus::Draft,
            created_at: Utc::now(),
        };
        let created = cycle.clone();
        self.ctx
            .db()
            .transaction(move |t| t.insert_cycle(&cycle))
            .await?;

        tracing::info!(
            cycle_id = %created.id,
            benefit_type = created.benefit_type.as_str(),
            year = created.year,
            "benefit cycle created"
        );
        Ok(created)
    }

    /// Looks up a cycle.
    pub async fn cycle(&self, cycle_id: Uuid) -> EngineResult<BenefitCycle> {
        self.ctx.db().read(|t| t.cycle(cycle_id)).await
    }

    /// Items of a cycle, ordered by employee id.
    pub async fn cycle_items(&self, cycle_id: Uuid) -> EngineResult<Vec<BenefitItem>> {
        self.ctx
            .db()
            .read(|t| {
                t.cycle(cycle_id)?;
                t.benefit_items(cycle_id)
            })
            .await
    }

    /// Computes and stores one employee's item in a cycle.
    ///
    /// An employee who fails the eligibility rule still gets an item, with
    /// zero amounts and `is_eligible` false.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the cycle no longer accepts items or the employee
    ///   already has an item in it
    /// - `NotFound` for an unknown cycle or employee
    pub async fn calculate_item(
        &self,
        cycle_id: Uuid,
        employee_id: &str,
    ) -> EngineResult<BenefitItem> {
        let config = self.ctx.config();
        let item = self
            .ctx
            .db()
            .transaction(|t| {
                let mut cycle = t.cycle(cycle_id)?;
                ensure_accepts_items(&cycle)?;
                let employee = t.employee(employee_id)?;
                let item = cycle_item(t, &cycle, &employee, config)?;
                t.insert_benefit_item(&item)?;
                if cycle.status == CycleStatus::Draft {
                    cycle.status = CycleStatus::Calculated;
                    t.update_cycle(&cycle)?;
                }
                Ok(item)
            })
            .await?;

        self.item_created(&item);
        Ok(item)
    }

    /// Computes items for every employee on payroll without an item yet.
    ///
    /// Each employee is written in its own transaction; a failure is
    /// recorded and the run continues.
    pub async fn run_cycle(&self, cycle_id: Uuid) -> EngineResult<CycleRunSummary> {
        let cycle = self.cycle(cycle_id).await?;
        ensure_accepts_items(&cycle)?;

        let employees = self.ctx.db().active_employees().await?;
        let mut summary = CycleRunSummary {
            cycle_id,
            created: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            total_net_amount: Decimal::ZERO,
        };

        for employee in &employees {
            let already = self
                .ctx
                .db()
                .read(|t| t.has_benefit_item(cycle_id, &employee.id))
                .await?;
            if already {
                summary.skipped.push(employee.id.clone());
                continue;
            }

            match self.calculate_item(cycle_id, &employee.id).await {
                Ok(item) => {
                    if item.is_eligible {
                        summary.total_net_amount += item.net_amount;
                    }
                    summary.created.push(item);
                }
                Err(e) if e.kind() == ErrorKind::Persistence => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        cycle_id = %cycle_id,
                        employee_id = %employee.id,
                        error = %e,
                        "benefit item failed"
                    );
                    summary.failures.push(EmployeeFailure::new(&employee.id, &e));
                }
            }
        }

        tracing::info!(
            cycle_id = %cycle_id,
            created = summary.created.len(),
            skipped = summary.skipped.len(),
            failed = summary.failures.len(),
            total_net_amount = %summary.total_net_amount,
            "benefit cycle run completed"
        );
        Ok(summary)
    }

    /// Approves a Calculated cycle; no further items may be added.
    pub async fn approve_cycle(&self, cycle_id: Uuid) -> EngineResult<BenefitCycle> {
        self.advance_cycle(cycle_id, CycleStatus::Calculated, CycleStatus::Approved)
            .await
    }

    /// Releases an Approved cycle for payment.
    pub async fn release_cycle(&self, cycle_id: Uuid) -> EngineResult<BenefitCycle> {
        self.advance_cycle(cycle_id, CycleStatus::Approved, CycleStatus::Released)
            .await
    }

    /// Computes a benefit for several employees without storing anything.
    ///
    /// Every employee gets an outcome; one failure does not stop the rest.
    /// Leave balances are read for the year of `as_of`.
    ///
    /// # Errors
    ///
    /// Only `Persistence`, if the store is unavailable.
    pub async fn bulk_calculate(
        &self,
        benefit_type: BenefitType,
        employee_ids: &[String],
        as_of: NaiveDate,
    ) -> EngineResult<Vec<BatchOutcome<BenefitCalculation>>> {
        let config = self.ctx.config();
        let mut outcomes = Vec::with_capacity(employee_ids.len());

        for employee_id in employee_ids {
            let result = self
                .ctx
                .db()
                .read(|t| {
                    let employee = t.employee(employee_id)?;
                    let inputs = BenefitInputs {
                        monetizable_days: t.monetizable_balance(employee_id, as_of.year())?,
                        ..BenefitInputs::on(as_of)
                    };
                    calculate_benefit(&employee, benefit_type, &inputs, config)
                })
                .await;

            match result {
                Ok(value) => outcomes.push(BatchOutcome::Succeeded {
                    employee_id: employee_id.clone(),
                    value,
                }),
                Err(e) if e.kind() == ErrorKind::Persistence => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        employee_id = %employee_id,
                        benefit_type = benefit_type.as_str(),
                        error = %e,
                        "benefit calculation failed"
                    );
                    outcomes.push(BatchOutcome::Failed(EmployeeFailure::new(employee_id, &e)));
                }
            }
        }

        tracing::info!(
            benefit_type = benefit_type.as_str(),
            requested = employee_ids.len(),
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            "bulk benefit calculation completed"
        );
        Ok(outcomes)
    }

    /// Pays a separated employee's terminal leave benefit.
    ///
    /// Uses the monetizable balances for the year of `as_of` and draws them
    /// down to zero together with the ledger write.
    pub async fn process_terminal_leave(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
        processed_by: &str,
    ) -> EngineResult<CompensationBenefit> {
        let config = self.ctx.config();
        let entry = self
            .ctx
            .db()
            .transaction(|t| {
                let employee = t.employee(employee_id)?;
                let year = as_of.year();
                let balance = t.monetizable_balance(employee_id, year)?;
                let inputs = BenefitInputs {
                    monetizable_days: balance,
                    ..BenefitInputs::on(as_of)
                };
                let calc =
                    calculate_benefit(&employee, BenefitType::TerminalLeave, &inputs, config)?;
                t.consume_monetizable(employee_id, year, balance)?;
                record_compensation(t, calc, processed_by)
            })
            .await?;

        self.compensation_processed(&entry);
        Ok(entry)
    }

    /// Converts leave days to cash.
    ///
    /// Pays `min(requested, balance)` days, or the whole monetizable balance
    /// when `requested_days` is `None`. The balance decrement and the ledger
    /// entry are written together or not at all.
    pub async fn monetize_leave(
        &self,
        employee_id: &str,
        requested_days: Option<Decimal>,
        as_of: NaiveDate,
        processed_by: &str,
    ) -> EngineResult<CompensationBenefit> {
        let config = self.ctx.config();
        let entry = self
            .ctx
            .db()
            .transaction(|t| {
                let employee = t.employee(employee_id)?;
                let year = as_of.year();
                let inputs = BenefitInputs {
                    monetizable_days: t.monetizable_balance(employee_id, year)?,
                    requested_days,
                    ..BenefitInputs::on(as_of)
                };
                let calc =
                    calculate_benefit(&employee, BenefitType::LeaveMonetization, &inputs, config)?;
                let days = calc.days.unwrap_or(Decimal::ZERO);
                t.consume_monetizable(employee_id, year, days)?;
                record_compensation(t, calc, processed_by)
            })
            .await?;

        self.compensation_processed(&entry);
        Ok(entry)
    }

    /// Grants the loyalty award to one employee.
    pub async fn grant_loyalty_award(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
        processed_by: &str,
    ) -> EngineResult<CompensationBenefit> {
        let config = self.ctx.config();
        let entry = self
            .ctx
            .db()
            .transaction(|t| {
                let employee = t.employee(employee_id)?;
                let calc = calculate_benefit(
                    &employee,
                    BenefitType::LoyaltyAward,
                    &BenefitInputs::on(as_of),
                    config,
                )?;
                record_compensation(t, calc, processed_by)
            })
            .await?;

        self.compensation_processed(&entry);
        Ok(entry)
    }

    /// Ledger entries of one employee, oldest first.
    pub async fn compensation_history(
        &self,
        employee_id: &str,
    ) -> EngineResult<Vec<CompensationBenefit>> {
        self.ctx
            .db()
            .read(|t| t.compensation_for(employee_id))
            .await
    }

    async fn advance_cycle(
        &self,
        cycle_id: Uuid,
        from: CycleStatus,
        to: CycleStatus,
    ) -> EngineResult<BenefitCycle> {
        let cycle = self
            .ctx
            .db()
            .transaction(|t| {
                let has_items = !t.benefit_items(cycle_id)?.is_empty();
                let mut cycle = t.cycle(cycle_id)?;
                if cycle.status != from {
                    return Err(EngineError::Conflict {
                        message: format!(
                            "benefit cycle is {}; expected {}",
                            cycle.status.as_str(),
                            from.as_str()
                        ),
                        details: vec![format!("status: {}", cycle.status.as_str())],
                    });
                }
                if !has_items {
                    return Err(EngineError::conflict("benefit cycle has no items"));
                }
                cycle.status = to;
                t.update_cycle(&cycle)?;
                Ok(cycle)
            })
            .await?;

        tracing::info!(
            cycle_id = %cycle_id,
            from = from.as_str(),
            to = to.as_str(),
            "benefit cycle transitioned"
        );
        Ok(cycle)
    }

    fn item_created(&self, item: &BenefitItem) {
        tracing::debug!(
            cycle_id = %item.cycle_id,
            employee_id = %item.employee_id,
            is_eligible = item.is_eligible,
            net_amount = %item.net_amount,
            "benefit item created"
        );
        self.ctx.emit(EngineEvent::BenefitItemCreated {
            cycle_id: item.cycle_id,
            employee_id: item.employee_id.clone(),
            is_eligible: item.is_eligible,
        });
    }

    fn compensation_processed(&self, entry: &CompensationBenefit) {
        tracing::info!(
            employee_id = %entry.employee_id,
            benefit_type = entry.benefit_type.as_str(),
            amount = %entry.amount,
            tax_amount = %entry.tax_amount,
            "compensation processed"
        );
        self.ctx.emit(EngineEvent::CompensationProcessed {
            employee_id: entry.employee_id.clone(),
            benefit_type: entry.benefit_type,
            amount: entry.amount,
        });
    }
}

fn ensure_accepts_items(cycle: &BenefitCycle) -> EngineResult<()> {
    if cycle.status.accepts_items() {
        return Ok(());
    }
    Err(EngineError::Conflict {
        message: format!(
            "benefit cycle is {} and no longer accepts items",
            cycle.status.as_str()
        ),
        details: vec![format!("status: {}", cycle.status.as_str())],
    })
}

fn cycle_item(
    tables: &Tables<'_>,
    cycle: &BenefitCycle,
    employee: &Employee,
    config: &EngineConfig,
) -> EngineResult<BenefitItem> {
    if tables.has_benefit_item(cycle.id, &employee.id)? {
        return Err(EngineError::Conflict {
            message: format!(
                "benefit item for {} already exists in this cycle",
                employee.id
            ),
            details: vec![cycle.id.to_string()],
        });
    }

    let inputs = BenefitInputs {
        as_of: cycle.applicable_date,
        cutoff_date: cycle.cutoff_date,
        monetizable_days: Decimal::ZERO,
        requested_days: None,
    };

    let (calculated_amount, tax_amount, net_amount, is_eligible, notes) =
        match calculate_benefit(employee, cycle.benefit_type, &inputs, config) {
            Ok(calc) => (calc.gross_amount, calc.tax_amount, calc.net_amount, true, calc.notes),
            Err(EngineError::CalculationError { message }) => {
                (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, false, message)
            }
            Err(e) => return Err(e),
        };

    Ok(BenefitItem {
        id: Uuid::new_v4(),
        cycle_id: cycle.id,
        employee_id: employee.id.clone(),
        calculated_amount,
        tax_amount,
        net_amount,
        is_eligible,
        eligibility_notes: notes,
        created_at: Utc::now(),
    })
}

fn record_compensation(
    tables: &mut Tables<'_>,
    calc: BenefitCalculation,
    processed_by: &str,
) -> EngineResult<CompensationBenefit> {
    let entry = CompensationBenefit {
        id: Uuid::new_v4(),
        employee_id: calc.employee_id,
        benefit_type: calc.benefit_type,
        amount: calc.gross_amount,
        tax_amount: calc.tax_amount,
        days: calc.days,
        processed_by: processed_by.to_string(),
        processed_at: Utc::now(),
        notes: calc.notes,
    };
    tables.insert_compensation(&entry)?;
    Ok(entry)
}
