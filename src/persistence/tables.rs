//! Row-level access to the store and the constraints it enforces.
//!
//! A [`Tables`] borrows the connection of an open read or transaction. The
//! unique indexes in the schema are the final guard; the checks here run
//! first so a conflict names the rows that block it.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Params, params};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceImportBatch, AttendanceRecord, BenefitCycle, BenefitItem, CompensationBenefit,
    Employee, EmployeeLeaveBalance, EmploymentStatus, LeaveType, OverrideIndex, OverrideKey,
    PayOverride, PayrollItem, PayrollPeriod, PeriodKey, PeriodStatus, PeriodTotals,
    index_overrides, monetizable_balance,
};

/// Typed queries and writes over one connection or transaction.
pub struct Tables<'c> {
    conn: &'c Connection,
}

fn encode<T: Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string(value).map_err(|e| EngineError::Persistence {
        message: format!("failed to encode row: {}", e),
    })
}

fn decode<T: DeserializeOwned>(data: &str) -> EngineResult<T> {
    serde_json::from_str(data).map_err(|e| EngineError::Persistence {
        message: format!("failed to decode row: {}", e),
    })
}

impl<'c> Tables<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Decodes the `data` column of every row the query returns.
    fn query_all<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl Params,
    ) -> EngineResult<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        rows.map(|data| decode(&data?)).collect()
    }

    /// Decodes the `data` column of the first row, if any.
    fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl Params,
    ) -> EngineResult<Option<T>> {
        let data: Option<String> = self
            .conn
            .query_row(sql, params, |row| row.get(0))
            .optional()?;
        data.map(|d| decode(&d)).transpose()
    }

    fn exists(&self, sql: &str, params: impl Params) -> EngineResult<bool> {
        Ok(self.conn.query_row(sql, params, |row| row.get(0))?)
    }

    /// Runs `f` inside a savepoint.
    ///
    /// If `f` fails, its writes are undone while the surrounding
    /// transaction stays open.
    pub fn savepoint<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.conn.execute_batch("SAVEPOINT unit")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("RELEASE unit")?;
                Ok(value)
            }
            Err(e) => {
                self.conn.execute_batch("ROLLBACK TO unit; RELEASE unit")?;
                Err(e)
            }
        }
    }

    // Employees

    /// Inserts or replaces an employee record.
    pub fn upsert_employee(&mut self, employee: Employee) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO employees
                 (id, employment_status, appointment_date, separation_date, data)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 employment_status = excluded.employment_status,
                 appointment_date = excluded.appointment_date,
                 separation_date = excluded.separation_date,
                 data = excluded.data",
            params![
                employee.id,
                employee.employment_status.as_str(),
                employee.appointment_date.to_string(),
                employee.separation_date.map(|d| d.to_string()),
                encode(&employee)?,
            ],
        )?;
        Ok(())
    }

    /// Looks up an employee.
    pub fn employee(&self, id: &str) -> EngineResult<Employee> {
        self.query_one("SELECT data FROM employees WHERE id = ?1", params![id])?
            .ok_or_else(|| EngineError::not_found("employee", id))
    }

    /// Returns true if the employee exists.
    pub fn has_employee(&self, id: &str) -> EngineResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1)",
            params![id],
        )
    }

    /// Employees on payroll (active or on leave), ordered by id.
    pub fn active_employees(&self) -> EngineResult<Vec<Employee>> {
        self.query_all(
            "SELECT data FROM employees WHERE employment_status IN (?1, ?2) ORDER BY id",
            params![
                EmploymentStatus::Active.as_str(),
                EmploymentStatus::OnLeave.as_str()
            ],
        )
    }

    /// Employees owed pay for some day of `start..=end`, ordered by id.
    ///
    /// Includes employees separated on or after `start`.
    pub fn payroll_employees(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<Employee>> {
        let candidates: Vec<Employee> = self.query_all(
            "SELECT data FROM employees
             WHERE appointment_date <= ?1
               AND (separation_date IS NULL
                    OR separation_date >= ?2
                    OR employment_status IN (?3, ?4))
             ORDER BY id",
            params![
                end.to_string(),
                start.to_string(),
                EmploymentStatus::Active.as_str(),
                EmploymentStatus::OnLeave.as_str()
            ],
        )?;
        Ok(candidates
            .into_iter()
            .filter(|e| e.is_payable_during(start, end))
            .collect())
    }

    // Payroll periods

    /// Inserts a new period and returns it as stored.
    ///
    /// The date range must be non-empty and the (year, month, period number)
    /// key unused. The period is always stored as Draft with zero totals.
    pub fn insert_period(&mut self, mut period: PayrollPeriod) -> EngineResult<PayrollPeriod> {
        if period.start_date >= period.end_date {
            return Err(EngineError::validation(
                "date range",
                format!(
                    "start {} must be before end {}",
                    period.start_date, period.end_date
                ),
            ));
        }
        if let Some(existing) = self.period_by_key(period.key)? {
            return Err(EngineError::Conflict {
                message: format!("payroll period {} already exists", period.key),
                details: vec![existing.id.to_string()],
            });
        }

        period.status = PeriodStatus::Draft;
        period.totals = PeriodTotals::default();
        self.conn.execute(
            "INSERT INTO payroll_periods
                 (id, year, month, period_number, start_date, end_date, status, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                period.id.to_string(),
                period.key.year,
                period.key.month,
                period.key.period_number,
                period.start_date.to_string(),
                period.end_date.to_string(),
                period.status.as_str(),
                encode(&period)?,
            ],
        )?;
        Ok(period)
    }

    /// Looks up a period.
    pub fn period(&self, id: Uuid) -> EngineResult<PayrollPeriod> {
        self.query_one(
            "SELECT data FROM payroll_periods WHERE id = ?1",
            params![id.to_string()],
        )?
        .ok_or_else(|| EngineError::not_found("payroll period", id))
    }

    /// Writes back a period read from this store.
    pub fn update_period(&mut self, period: &PayrollPeriod) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE payroll_periods SET status = ?2, data = ?3 WHERE id = ?1",
            params![period.id.to_string(), period.status.as_str(), encode(period)?],
        )?;
        if changed == 0 {
            return Err(EngineError::not_found("payroll period", period.id));
        }
        Ok(())
    }

    /// Looks up a period by its half-month key.
    pub fn period_by_key(&self, key: PeriodKey) -> EngineResult<Option<PayrollPeriod>> {
        self.query_one(
            "SELECT data FROM payroll_periods
             WHERE year = ?1 AND month = ?2 AND period_number = ?3",
            params![key.year, key.month, key.period_number],
        )
    }

    /// All periods, ordered by key.
    pub fn periods(&self) -> EngineResult<Vec<PayrollPeriod>> {
        self.query_all(
            "SELECT data FROM payroll_periods ORDER BY year, month, period_number",
            [],
        )
    }

    /// Moves a period to `to` if its current status is one of `expected`.
    ///
    /// Returns the previous status. The write is conditional on the status
    /// read, so of two concurrent callers expecting the same status only one
    /// succeeds.
    pub fn compare_and_set_status(
        &mut self,
        id: Uuid,
        expected: &[PeriodStatus],
        to: PeriodStatus,
    ) -> EngineResult<PeriodStatus> {
        let mut period = self.period(id)?;
        let from = period.status;
        if !expected.contains(&from) {
            let allowed: Vec<_> = expected.iter().map(PeriodStatus::as_str).collect();
            return Err(EngineError::Conflict {
                message: format!(
                    "payroll period {} is {}; expected {}",
                    period.key,
                    from.as_str(),
                    allowed.join(" or ")
                ),
                details: vec![format!("status: {}", from.as_str())],
            });
        }
        from.validate_transition(to)?;

        period.status = to;
        period.updated_at = Utc::now();
        let changed = self.conn.execute(
            "UPDATE payroll_periods SET status = ?2, data = ?3 WHERE id = ?1 AND status = ?4",
            params![id.to_string(), to.as_str(), encode(&period)?, from.as_str()],
        )?;
        if changed == 0 {
            return Err(EngineError::Conflict {
                message: format!("payroll period {} changed status concurrently", period.key),
                details: vec![format!("status: {}", from.as_str())],
            });
        }
        Ok(from)
    }

    // Attendance

    /// The active attendance batch of a period.
    pub fn active_batch(&self, period_id: Uuid) -> EngineResult<Option<AttendanceImportBatch>> {
        self.query_one(
            "SELECT data FROM attendance_batches WHERE period_id = ?1 AND is_active = 1",
            params![period_id.to_string()],
        )
    }

    /// Every batch imported for a period, oldest first.
    pub fn batch_history(&self, period_id: Uuid) -> EngineResult<Vec<AttendanceImportBatch>> {
        self.query_all(
            "SELECT data FROM attendance_batches WHERE period_id = ?1 ORDER BY seq",
            params![period_id.to_string()],
        )
    }

    /// Stores a batch and its records.
    ///
    /// Fails if the period already has an active batch; supersede it with
    /// [`Tables::deactivate_batch`] first.
    pub fn insert_batch(
        &mut self,
        batch: &AttendanceImportBatch,
        records: &[AttendanceRecord],
    ) -> EngineResult<()> {
        if batch.is_active
            && let Some(active) = self.active_batch(batch.period_id)?
        {
            return Err(EngineError::Conflict {
                message: "period already has an active attendance batch".to_string(),
                details: vec![active.id.to_string()],
            });
        }

        self.conn.execute(
            "INSERT INTO attendance_batches (id, period_id, is_active, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                batch.id.to_string(),
                batch.period_id.to_string(),
                batch.is_active,
                encode(batch)?,
            ],
        )?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO attendance_records (batch_id, employee_id, data) VALUES (?1, ?2, ?3)",
        )?;
        for record in records {
            stmt.execute(params![
                batch.id.to_string(),
                record.employee_id,
                encode(record)?,
            ])?;
        }
        Ok(())
    }

    /// Marks a batch as superseded.
    pub fn deactivate_batch(&mut self, batch_id: Uuid) -> EngineResult<()> {
        let mut batch: AttendanceImportBatch = self
            .query_one(
                "SELECT data FROM attendance_batches WHERE id = ?1",
                params![batch_id.to_string()],
            )?
            .ok_or_else(|| EngineError::not_found("attendance batch", batch_id))?;
        batch.is_active = false;
        self.conn.execute(
            "UPDATE attendance_batches SET is_active = 0, data = ?2 WHERE id = ?1",
            params![batch_id.to_string(), encode(&batch)?],
        )?;
        Ok(())
    }

    /// Records of a batch, in import order.
    pub fn records(&self, batch_id: Uuid) -> EngineResult<Vec<AttendanceRecord>> {
        self.query_all(
            "SELECT data FROM attendance_records WHERE batch_id = ?1 ORDER BY rowid",
            params![batch_id.to_string()],
        )
    }

    /// Working days of one employee in the period's active batch.
    pub fn working_days(
        &self,
        period_id: Uuid,
        employee_id: &str,
    ) -> EngineResult<Option<Decimal>> {
        let record: Option<AttendanceRecord> = self.query_one(
            "SELECT r.data FROM attendance_records r
             JOIN attendance_batches b ON b.id = r.batch_id
             WHERE b.period_id = ?1 AND b.is_active = 1 AND r.employee_id = ?2",
            params![period_id.to_string(), employee_id],
        )?;
        Ok(record.map(|r| r.working_days))
    }

    // Payroll items

    /// Items of a period, ordered by employee id.
    pub fn items_for_period(&self, period_id: Uuid) -> EngineResult<Vec<PayrollItem>> {
        self.query_all(
            "SELECT data FROM payroll_items WHERE period_id = ?1 ORDER BY employee_id",
            params![period_id.to_string()],
        )
    }

    /// One employee's item in a period.
    pub fn item(&self, period_id: Uuid, employee_id: &str) -> EngineResult<Option<PayrollItem>> {
        self.query_one(
            "SELECT data FROM payroll_items WHERE period_id = ?1 AND employee_id = ?2",
            params![period_id.to_string(), employee_id],
        )
    }

    /// Writes an item, replacing any previous item for the same employee.
    ///
    /// A previous item that is finalized or paid is never replaced.
    pub fn upsert_item(&mut self, item: &PayrollItem) -> EngineResult<()> {
        if let Some(existing) = self.item(item.period_id, &item.employee_id)?
            && existing.status.is_frozen()
        {
            return Err(EngineError::Conflict {
                message: format!(
                    "payroll item for {} is {} and cannot be replaced",
                    existing.employee_id,
                    existing.status.as_str()
                ),
                details: vec![existing.id.to_string()],
            });
        }
        self.conn.execute(
            "INSERT INTO payroll_items (id, period_id, employee_id, status, data)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(period_id, employee_id) DO UPDATE SET
                 id = excluded.id,
                 status = excluded.status,
                 data = excluded.data",
            params![
                item.id.to_string(),
                item.period_id.to_string(),
                item.employee_id,
                item.status.as_str(),
                encode(item)?,
            ],
        )?;
        Ok(())
    }

    /// Writes back the status and contents of an existing item.
    pub fn update_item(&mut self, item: &PayrollItem) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE payroll_items SET status = ?3, data = ?4
             WHERE period_id = ?1 AND employee_id = ?2",
            params![
                item.period_id.to_string(),
                item.employee_id,
                item.status.as_str(),
                encode(item)?,
            ],
        )?;
        if changed == 0 {
            return Err(EngineError::not_found("payroll item", &item.employee_id));
        }
        Ok(())
    }

    // Overrides

    /// Active overrides stored under one key, oldest first.
    fn active_overrides_by_key(&self, key: &OverrideKey) -> EngineResult<Vec<PayOverride>> {
        self.query_all(
            "SELECT data FROM pay_overrides
             WHERE employee_id = ?1 AND kind = ?2 AND code = ?3 AND is_active = 1
             ORDER BY seq",
            params![key.employee_id, key.kind.as_str(), key.code],
        )
    }

    /// Stores an override.
    ///
    /// Fails if another active override with the same key covers any of the
    /// same days.
    pub fn insert_override(&mut self, pay_override: &PayOverride) -> EngineResult<()> {
        let key = pay_override.key();
        if pay_override.is_active {
            let clashes: Vec<String> = self
                .active_overrides_by_key(&key)?
                .iter()
                .filter(|o| o.overlaps(pay_override))
                .map(|o| o.id.to_string())
                .collect();
            if !clashes.is_empty() {
                return Err(EngineError::Conflict {
                    message: format!(
                        "an active override for {} {} overlaps this date range",
                        key.employee_id, key.code
                    ),
                    details: clashes,
                });
            }
        }

        self.conn.execute(
            "INSERT INTO pay_overrides
                 (id, employee_id, kind, code, effective_date, is_active, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                pay_override.id.to_string(),
                key.employee_id,
                key.kind.as_str(),
                key.code,
                pay_override.effective_date.to_string(),
                pay_override.is_active,
                encode(pay_override)?,
            ],
        )?;
        Ok(())
    }

    /// Deactivates an override; returns it.
    pub fn deactivate_override(&mut self, id: Uuid) -> EngineResult<PayOverride> {
        let mut found: PayOverride = self
            .query_one(
                "SELECT data FROM pay_overrides WHERE id = ?1",
                params![id.to_string()],
            )?
            .ok_or_else(|| EngineError::not_found("pay override", id))?;
        found.is_active = false;
        self.conn.execute(
            "UPDATE pay_overrides SET is_active = 0, data = ?2 WHERE id = ?1",
            params![id.to_string(), encode(&found)?],
        )?;
        Ok(found)
    }

    /// Active overrides of one employee that apply on `date`.
    pub fn overrides_on(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Vec<PayOverride>> {
        let candidates: Vec<PayOverride> = self.query_all(
            "SELECT data FROM pay_overrides
             WHERE employee_id = ?1 AND is_active = 1 AND effective_date <= ?2
             ORDER BY seq",
            params![employee_id, date.to_string()],
        )?;
        Ok(candidates.into_iter().filter(|o| o.applies_on(date)).collect())
    }

    /// The override in force for each of one employee's keys during
    /// `start..=end`.
    pub fn overrides_during(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<OverrideIndex> {
        let candidates: Vec<PayOverride> = self.query_all(
            "SELECT data FROM pay_overrides
             WHERE employee_id = ?1 AND is_active = 1 AND effective_date <= ?2
             ORDER BY seq",
            params![employee_id, end.to_string()],
        )?;
        Ok(index_overrides(candidates, start, end))
    }

    /// Every override of one employee, active or not, oldest first.
    pub fn overrides_for(&self, employee_id: &str) -> EngineResult<Vec<PayOverride>> {
        self.query_all(
            "SELECT data FROM pay_overrides WHERE employee_id = ?1 ORDER BY seq",
            params![employee_id],
        )
    }

    // Benefit cycles

    /// Stores a cycle.
    pub fn insert_cycle(&mut self, cycle: &BenefitCycle) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO benefit_cycles (id, status, data) VALUES (?1, ?2, ?3)",
            params![cycle.id.to_string(), cycle.status.as_str(), encode(cycle)?],
        )?;
        Ok(())
    }

    /// Looks up a cycle.
    pub fn cycle(&self, id: Uuid) -> EngineResult<BenefitCycle> {
        self.query_one(
            "SELECT data FROM benefit_cycles WHERE id = ?1",
            params![id.to_string()],
        )?
        .ok_or_else(|| EngineError::not_found("benefit cycle", id))
    }

    /// Writes back a cycle read from this store.
    pub fn update_cycle(&mut self, cycle: &BenefitCycle) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE benefit_cycles SET status = ?2, data = ?3 WHERE id = ?1",
            params![cycle.id.to_string(), cycle.status.as_str(), encode(cycle)?],
        )?;
        if changed == 0 {
            return Err(EngineError::not_found("benefit cycle", cycle.id));
        }
        Ok(())
    }

    /// Stores a benefit item; one per employee per cycle.
    pub fn insert_benefit_item(&mut self, item: &BenefitItem) -> EngineResult<()> {
        let existing: Option<BenefitItem> = self.query_one(
            "SELECT data FROM benefit_items WHERE cycle_id = ?1 AND employee_id = ?2",
            params![item.cycle_id.to_string(), item.employee_id],
        )?;
        if let Some(existing) = existing {
            return Err(EngineError::Conflict {
                message: format!(
                    "benefit item for {} already exists in cycle {}",
                    item.employee_id, item.cycle_id
                ),
                details: vec![existing.id.to_string()],
            });
        }
        self.conn.execute(
            "INSERT INTO benefit_items (id, cycle_id, employee_id, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                item.id.to_string(),
                item.cycle_id.to_string(),
                item.employee_id,
                encode(item)?,
            ],
        )?;
        Ok(())
    }

    /// Returns true if the employee already has an item in the cycle.
    pub fn has_benefit_item(&self, cycle_id: Uuid, employee_id: &str) -> EngineResult<bool> {
        self.exists(
            "SELECT EXISTS(
                 SELECT 1 FROM benefit_items WHERE cycle_id = ?1 AND employee_id = ?2
             )",
            params![cycle_id.to_string(), employee_id],
        )
    }

    /// Items of a cycle, ordered by employee id.
    pub fn benefit_items(&self, cycle_id: Uuid) -> EngineResult<Vec<BenefitItem>> {
        self.query_all(
            "SELECT data FROM benefit_items WHERE cycle_id = ?1 ORDER BY employee_id",
            params![cycle_id.to_string()],
        )
    }

    // Compensation ledger

    /// Appends a processed payout to the ledger.
    pub fn insert_compensation(&mut self, entry: &CompensationBenefit) -> EngineResult<()> {
        if entry.amount <= Decimal::ZERO {
            return Err(EngineError::validation(
                "amount",
                format!(
                    "{} payout for {} must be positive, got {}",
                    entry.benefit_type.as_str(),
                    entry.employee_id,
                    entry.amount
                ),
            ));
        }
        self.conn.execute(
            "INSERT INTO compensation_benefits (id, employee_id, amount, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id.to_string(),
                entry.employee_id,
                entry.amount.to_string(),
                encode(entry)?,
            ],
        )?;
        Ok(())
    }

    /// Ledger entries of one employee, oldest first.
    pub fn compensation_for(&self, employee_id: &str) -> EngineResult<Vec<CompensationBenefit>> {
        self.query_all(
            "SELECT data FROM compensation_benefits WHERE employee_id = ?1 ORDER BY seq",
            params![employee_id],
        )
    }

    // Leave

    /// Inserts or replaces a leave type.
    pub fn upsert_leave_type(&mut self, leave_type: LeaveType) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO leave_types (code, is_monetizable, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET
                 is_monetizable = excluded.is_monetizable,
                 data = excluded.data",
            params![leave_type.code, leave_type.is_monetizable, encode(&leave_type)?],
        )?;
        Ok(())
    }

    fn leave_types(&self) -> EngineResult<Vec<LeaveType>> {
        self.query_all("SELECT data FROM leave_types ORDER BY code", [])
    }

    /// Inserts or replaces a balance, keyed by (employee, leave type, year).
    pub fn upsert_leave_balance(&mut self, balance: EmployeeLeaveBalance) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO leave_balances (employee_id, leave_type, year, data)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(employee_id, leave_type, year) DO UPDATE SET data = excluded.data",
            params![
                balance.employee_id,
                balance.leave_type,
                balance.year,
                encode(&balance)?,
            ],
        )?;
        Ok(())
    }

    /// One employee's balances for a year, ordered by leave type code.
    pub fn leave_balances(
        &self,
        employee_id: &str,
        year: i32,
    ) -> EngineResult<Vec<EmployeeLeaveBalance>> {
        self.query_all(
            "SELECT data FROM leave_balances
             WHERE employee_id = ?1 AND year = ?2
             ORDER BY leave_type",
            params![employee_id, year],
        )
    }

    /// Sum of one employee's monetizable balances for a year.
    pub fn monetizable_balance(&self, employee_id: &str, year: i32) -> EngineResult<Decimal> {
        Ok(monetizable_balance(
            &self.leave_balances(employee_id, year)?,
            &self.leave_types()?,
        ))
    }

    /// Draws `days` from one employee's monetizable balances, in leave type
    /// code order.
    ///
    /// Fails without changing anything if the balance is insufficient.
    pub fn consume_monetizable(
        &mut self,
        employee_id: &str,
        year: i32,
        days: Decimal,
    ) -> EngineResult<()> {
        let available = self.monetizable_balance(employee_id, year)?;
        if days > available {
            return Err(EngineError::validation(
                "days",
                format!(
                    "{} requested but only {} monetizable days available",
                    days, available
                ),
            ));
        }

        let balances: Vec<EmployeeLeaveBalance> = self.query_all(
            "SELECT b.data FROM leave_balances b
             JOIN leave_types t ON t.code = b.leave_type
             WHERE b.employee_id = ?1 AND b.year = ?2 AND t.is_monetizable = 1
             ORDER BY b.leave_type",
            params![employee_id, year],
        )?;

        let mut remaining = days;
        for mut balance in balances {
            if remaining <= Decimal::ZERO {
                break;
            }
            remaining -= balance.consume(remaining);
            self.upsert_leave_balance(balance)?;
        }
        Ok(())
    }
}
