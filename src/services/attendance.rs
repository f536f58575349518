//! Attendance reconciliation.
//!
//! A period holds at most one active attendance batch. The first import
//! stores its batch directly. A second import writes nothing and returns a
//! [`ReimportWarning`]; the operator then calls
//! [`AttendanceStore::confirm_reimport`] to supersede the active batch.
//! Imports are only accepted while the period is Draft or Open.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::models::{
    AttendanceImportBatch, AttendanceRecord, AttendanceRow, ImportOutcome, PayrollPeriod,
    ReimportWarning,
};
use crate::persistence::Tables;

use super::EngineContext;

/// Imports and serves attendance data.
#[derive(Debug, Clone)]
pub struct AttendanceStore {
    ctx: EngineContext,
}

impl AttendanceStore {
    /// Creates the store.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Imports a batch for a period.
    ///
    /// Returns [`ImportOutcome::ConfirmationRequired`] without writing
    /// anything if the period already has an active batch.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the period is no longer Draft or Open
    /// - `Validation` if any row is invalid; no row is stored
    pub async fn import_batch(
        &self,
        period_id: Uuid,
        rows: Vec<AttendanceRow>,
        imported_by: &str,
    ) -> EngineResult<ImportOutcome> {
        let imported_by = imported_by.to_string();
        let outcome = self
            .ctx
            .db()
            .transaction(move |t| {
                let period = t.period(period_id)?;
                ensure_importable(&period)?;
                validate_rows(&rows, &period, t)?;

                if let Some(warning) = reimport_warning(t, period_id)? {
                    return Ok(ImportOutcome::ConfirmationRequired { warning });
                }

                let (batch, records) = build_batch(period_id, &rows, imported_by);
                t.insert_batch(&batch, &records)?;
                Ok(ImportOutcome::Imported { batch })
            })
            .await?;

        match &outcome {
            ImportOutcome::Imported { batch } => {
                tracing::info!(
                    period_id = %period_id,
                    batch_id = %batch.id,
                    record_count = batch.record_count,
                    "attendance imported"
                );
                self.ctx.emit(EngineEvent::AttendanceImported {
                    period_id,
                    batch_id: batch.id,
                    record_count: batch.record_count,
                    superseded_batch_id: None,
                });
            }
            ImportOutcome::ConfirmationRequired { warning } => {
                tracing::warn!(
                    period_id = %period_id,
                    previous_batch_id = %warning.previous_batch_id,
                    payroll_items_exist = warning.payroll_items_exist,
                    "re-import requires confirmation"
                );
                self.ctx.emit(EngineEvent::ReimportWarned {
                    period_id,
                    previous_batch_id: warning.previous_batch_id,
                });
            }
        }

        Ok(outcome)
    }

    /// Describes what a re-import would supersede, or `None` if the period
    /// has no attendance yet.
    pub async fn preview_reimport(
        &self,
        period_id: Uuid,
    ) -> EngineResult<Option<ReimportWarning>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                reimport_warning(t, period_id)
            })
            .await
    }

    /// Replaces the active batch of a period in one transaction.
    ///
    /// Works like a first import when the period has no batch yet.
    pub async fn confirm_reimport(
        &self,
        period_id: Uuid,
        rows: Vec<AttendanceRow>,
        imported_by: &str,
    ) -> EngineResult<AttendanceImportBatch> {
        let imported_by = imported_by.to_string();
        let (batch, superseded) = self
            .ctx
            .db()
            .transaction(move |t| {
                let period = t.period(period_id)?;
                ensure_importable(&period)?;
                validate_rows(&rows, &period, t)?;

                let superseded = t.active_batch(period_id)?.map(|b| b.id);
                if let Some(previous) = superseded {
                    t.deactivate_batch(previous)?;
                }

                let (batch, records) = build_batch(period_id, &rows, imported_by);
                t.insert_batch(&batch, &records)?;
                Ok((batch, superseded))
            })
            .await?;

        tracing::info!(
            period_id = %period_id,
            batch_id = %batch.id,
            superseded_batch_id = ?superseded,
            record_count = batch.record_count,
            "attendance re-imported"
        );
        self.ctx.emit(EngineEvent::AttendanceImported {
            period_id,
            batch_id: batch.id,
            record_count: batch.record_count,
            superseded_batch_id: superseded,
        });

        Ok(batch)
    }

    /// Working days of one employee in the active batch, or `None` if the
    /// employee has no record.
    pub async fn working_days(
        &self,
        period_id: Uuid,
        employee_id: &str,
    ) -> EngineResult<Option<Decimal>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                t.working_days(period_id, employee_id)
            })
            .await
    }

    /// The active batch of a period.
    pub async fn active_batch(
        &self,
        period_id: Uuid,
    ) -> EngineResult<Option<AttendanceImportBatch>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                t.active_batch(period_id)
            })
            .await
    }

    /// Every batch imported for a period, oldest first.
    pub async fn batch_history(
        &self,
        period_id: Uuid,
    ) -> EngineResult<Vec<AttendanceImportBatch>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                t.batch_history(period_id)
            })
            .await
    }

    /// Records of the active batch of a period.
    pub async fn active_records(&self, period_id: Uuid) -> EngineResult<Vec<AttendanceRecord>> {
        self.ctx
            .db()
            .read(|t| {
                t.period(period_id)?;
                match t.active_batch(period_id)? {
                    Some(batch) => t.records(batch.id),
                    None => Ok(Vec::new()),
                }
            })
            .await
    }
}

fn ensure_importable(period: &PayrollPeriod) -> EngineResult<()> {
    if period.status.is_editable() {
        return Ok(());
    }
    Err(EngineError::Conflict {
        message: format!(
            "payroll period {} is locked for attendance import",
            period.key
        ),
        details: vec![format!("status: {}", period.status.as_str())],
    })
}

fn validate_rows(
    rows: &[AttendanceRow],
    period: &PayrollPeriod,
    tables: &Tables<'_>,
) -> EngineResult<()> {
    if rows.is_empty() {
        return Err(EngineError::validation("rows", "attendance import contains no rows"));
    }

    let period_days = Decimal::from(period.calendar_days());
    let mut seen = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let field = |name: &str| format!("rows[{}].{}", index, name);

        if !seen.insert(row.employee_id.as_str()) {
            return Err(EngineError::validation(
                field("employee_id"),
                format!("duplicate row for employee {}", row.employee_id),
            ));
        }
        if !tables.has_employee(&row.employee_id)? {
            return Err(EngineError::validation(
                field("employee_id"),
                format!("unknown employee {}", row.employee_id),
            ));
        }
        for (name, value) in [
            ("working_days", row.working_days),
            ("leave_days", row.leave_days),
            ("overtime_hours", row.overtime_hours),
        ] {
            if value < Decimal::ZERO {
                return Err(EngineError::validation(
                    field(name),
                    format!("must not be negative, got {}", value),
                ));
            }
        }
        if row.working_days > period_days {
            return Err(EngineError::validation(
                field("working_days"),
                format!(
                    "{} exceeds the {} days in period {}",
                    row.working_days, period_days, period.key
                ),
            ));
        }
    }
    Ok(())
}

fn reimport_warning(tables: &Tables<'_>, period_id: Uuid) -> EngineResult<Option<ReimportWarning>> {
    let Some(active) = tables.active_batch(period_id)? else {
        return Ok(None);
    };
    Ok(Some(ReimportWarning {
        period_id,
        previous_batch_id: active.id,
        previous_record_count: active.record_count,
        previous_imported_at: active.imported_at,
        payroll_items_exist: !tables.items_for_period(period_id)?.is_empty(),
    }))
}

fn build_batch(
    period_id: Uuid,
    rows: &[AttendanceRow],
    imported_by: String,
) -> (AttendanceImportBatch, Vec<AttendanceRecord>) {
    let batch_id = Uuid::new_v4();
    let records: Vec<AttendanceRecord> = rows
        .iter()
        .map(|row| AttendanceRecord {
            batch_id,
            employee_id: row.employee_id.clone(),
            working_days: row.working_days,
            leave_days: row.leave_days,
            overtime_hours: row.overtime_hours,
        })
        .collect();

    let batch = AttendanceImportBatch {
        id: batch_id,
        period_id,
        imported_by,
        imported_at: Utc::now(),
        record_count: records.len() as u32,
        total_working_days: records.iter().map(|r| r.working_days).sum(),
        is_active: true,
    };
    (batch, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::events::MemorySink;
    use crate::models::{Employee, EmploymentStatus, PeriodStatus};
    use crate::persistence::Database;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn row(employee_id: &str, days: i64) -> AttendanceRow {
        AttendanceRow {
            employee_id: employee_id.to_string(),
            working_days: Decimal::from(days),
            leave_days: Decimal::ZERO,
            overtime_hours: Decimal::ZERO,
        }
    }

    async fn setup() -> (AttendanceStore, Arc<MemorySink>, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let config = ConfigLoader::load("./config/ph_2025").unwrap().into_config();
        let sink = Arc::new(MemorySink::new());
        let ctx = EngineContext::new(db.clone(), config, sink.clone());

        for id in ["emp_001", "emp_002"] {
            db.upsert_employee(Employee {
                id: id.to_string(),
                name: id.to_string(),
                monthly_salary: Decimal::from(22000),
                daily_rate: Decimal::from(1000),
                highest_monthly_salary: None,
                appointment_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                separation_date: None,
                employment_status: EmploymentStatus::Active,
                step_increment: 1,
                last_step_increment_date: None,
            })
            .await
            .unwrap();
        }

        let period = PayrollPeriod::half_month(2025, 9, 1, None).unwrap();
        let period_id = period.id;
        db.transaction(|t| t.insert_period(period)).await.unwrap();

        (AttendanceStore::new(ctx), sink, period_id)
    }

    #[tokio::test]
    async fn test_first_import_is_stored() {
        let (store, sink, period_id) = setup().await;

        let outcome = store
            .import_batch(
                period_id,
                vec![row("emp_001", 10), row("emp_002", 8)],
                "hr_admin",
            )
            .await
            .unwrap();

        let batch = outcome.batch().unwrap();
        assert_eq!(batch.record_count, 2);
        assert_eq!(batch.total_working_days, Decimal::from(18));
        assert_eq!(
            store.working_days(period_id, "emp_002").await.unwrap(),
            Some(Decimal::from(8))
        );
        assert_eq!(sink.names(), vec!["attendance_imported"]);
    }

    #[tokio::test]
    async fn test_second_import_requires_confirmation() {
        let (store, _sink, period_id) = setup().await;
        let first = store
            .import_batch(period_id, vec![row("emp_001", 10)], "hr_admin")
            .await
            .unwrap();
        let first_id = first.batch().unwrap().id;

        let second = store
            .import_batch(period_id, vec![row("emp_001", 12)], "hr_admin")
            .await
            .unwrap();

        match second {
            ImportOutcome::ConfirmationRequired { warning } => {
                assert_eq!(warning.previous_batch_id, first_id);
                assert_eq!(warning.previous_record_count, 1);
                assert!(!warning.payroll_items_exist);
            }
            other => panic!("Expected ConfirmationRequired, got {:?}", other),
        }
        assert_eq!(store.batch_history(period_id).await.unwrap().len(), 1);
        assert_eq!(
            store.working_days(period_id, "emp_001").await.unwrap(),
            Some(Decimal::from(10))
        );
    }

    #[tokio::test]
    async fn test_confirm_reimport_supersedes_active_batch() {
        let (store, _sink, period_id) = setup().await;
        store
            .import_batch(period_id, vec![row("emp_001", 10)], "hr_admin")
            .await
            .unwrap();

        let replacement = store
            .confirm_reimport(period_id, vec![row("emp_001", 12)], "hr_admin")
            .await
            .unwrap();

        let history = store.batch_history(period_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|b| b.is_active).count(), 1);
        let active = store.active_batch(period_id).await.unwrap().unwrap();
        assert_eq!(active.id, replacement.id);
        assert_eq!(
            store.working_days(period_id, "emp_001").await.unwrap(),
            Some(Decimal::from(12))
        );
    }

    #[tokio::test]
    async fn test_invalid_row_rejects_whole_batch() {
        let (store, _sink, period_id) = setup().await;

        let result = store
            .import_batch(
                period_id,
                vec![row("emp_001", 10), row("emp_404", 5)],
                "hr_admin",
            )
            .await;

        match result {
            Err(EngineError::Validation { field, .. }) => {
                assert_eq!(field, "rows[1].employee_id");
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert!(store.active_batch(period_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_and_out_of_range_rows_rejected() {
        let (store, _sink, period_id) = setup().await;

        let duplicate = store
            .import_batch(
                period_id,
                vec![row("emp_001", 10), row("emp_001", 5)],
                "hr_admin",
            )
            .await;
        assert!(matches!(duplicate, Err(EngineError::Validation { .. })));

        let too_many = store
            .import_batch(period_id, vec![row("emp_001", 16)], "hr_admin")
            .await;
        assert!(matches!(too_many, Err(EngineError::Validation { .. })));

        let negative = store
            .import_batch(period_id, vec![row("emp_001", -1)], "hr_admin")
            .await;
        assert!(matches!(negative, Err(EngineError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_import_refused_after_processing_starts() {
        let (store, _sink, period_id) = setup().await;
        store
            .ctx
            .db()
            .transaction(|t| {
                t.compare_and_set_status(
                    period_id,
                    &[PeriodStatus::Draft],
                    PeriodStatus::Processing,
                )
            })
            .await
            .unwrap();

        let result = store
            .import_batch(period_id, vec![row("emp_001", 10)], "hr_admin")
            .await;

        match result {
            Err(EngineError::Conflict { message, details }) => {
                assert!(message.contains("locked"));
                assert_eq!(details, vec!["status: processing".to_string()]);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preview_without_batch_is_none() {
        let (store, _sink, period_id) = setup().await;
        assert!(store.preview_reimport(period_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_employee_has_no_working_days() {
        let (store, _sink, period_id) = setup().await;
        store
            .import_batch(period_id, vec![row("emp_001", 10)], "hr_admin")
            .await
            .unwrap();

        assert_eq!(store.working_days(period_id, "emp_002").await.unwrap(), None);
    }
}
