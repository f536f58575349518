//! Payroll period lifecycle.
//!
//! ```text
//! Draft -> Open -> Processing -> Completed -> Finalized -> Paid -> Locked
//!                       ^                         |          |
//!                       +-------- reopen ---------+----------+
//! ```
//!
//! Generation (Draft/Open -> Processing) lives in
//! [`PayrollPipeline`](super::PayrollPipeline). Every transition here checks
//! the current status and its item preconditions inside one transaction,
//! then emits [`EngineEvent::PeriodTransitioned`].

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::models::{PayrollItem, PayrollItemStatus, PayrollPeriod, PeriodStatus};
use crate::persistence::Tables;

use super::EngineContext;

/// Drives payroll periods through their lifecycle.
#[derive(Debug, Clone)]
pub struct PeriodStateMachine {
    ctx: EngineContext,
}

impl PeriodStateMachine {
    /// Creates the state machine.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Creates a Draft half-month period.
    ///
    /// # Errors
    ///
    /// - `Validation` for an invalid month or period number
    /// - `Conflict` if the period already exists
    pub async fn create_period(
        &self,
        year: i32,
        month: u32,
        period_number: u8,
        pay_date: Option<NaiveDate>,
    ) -> EngineResult<PayrollPeriod> {
        let period = PayrollPeriod::half_month(year, month, period_number, pay_date)?;
        self.insert(period).await
    }

    /// Stores a period built by the caller, e.g. with custom dates.
    ///
    /// The period is stored as Draft with zero totals whatever status and
    /// totals it carries.
    ///
    /// # Errors
    ///
    /// - `Validation` if the start date is not before the end date
    /// - `Conflict` if a period with the same key already exists
    pub async fn insert(&self, period: PayrollPeriod) -> EngineResult<PayrollPeriod> {
        let created = self
            .ctx
            .db()
            .transaction(move |t| t.insert_period(period))
            .await?;
        tracing::info!(
            period_id = %created.id,
            period = %created.key,
            "payroll period created"
        );
        Ok(created)
    }

    /// Looks up a period.
    pub async fn period(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.ctx.db().read(|t| t.period(period_id)).await
    }

    /// All periods, ordered by year, month and half.
    pub async fn periods(&self) -> EngineResult<Vec<PayrollPeriod>> {
        self.ctx
            .db()
            .read(|t| t.periods())
            .await
    }

    /// Opens a Draft period.
    pub async fn open(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.transition(period_id, &[PeriodStatus::Draft], PeriodStatus::Open, None, |_| Ok(()))
            .await
    }

    /// Approves Calculated items, moving them to Processed.
    ///
    /// With `employee_ids` of `None` every Calculated item is approved.
    /// Returns the number of items approved.
    pub async fn approve_items(
        &self,
        period_id: Uuid,
        employee_ids: Option<&[String]>,
    ) -> EngineResult<u32> {
        let approved = self
            .ctx
            .db()
            .transaction(|t| {
                let period = t.period(period_id)?;
                if !period.status.is_reviewable() {
                    return Err(status_conflict(&period, "approve items"));
                }
                if let Some(ids) = employee_ids {
                    for id in ids {
                        if t.item(period_id, id)?.is_none() {
                            return Err(EngineError::not_found("payroll item", id));
                        }
                    }
                }

                let now = Utc::now();
                let mut approved = 0u32;
                for mut item in t.items_for_period(period_id)? {
                    let selected = employee_ids.is_none_or(|ids| ids.contains(&item.employee_id));
                    if selected && item.status == PayrollItemStatus::Calculated {
                        item.status = PayrollItemStatus::Processed;
                        item.updated_at = now;
                        t.update_item(&item)?;
                        approved += 1;
                    }
                }
                Ok(approved)
            })
            .await?;

        tracing::info!(period_id = %period_id, approved, "payroll items approved");
        Ok(approved)
    }

    /// Marks a Processing period as Completed.
    ///
    /// Requires at least one item and an item for every employee owed pay
    /// for the period, including those separated during it.
    pub async fn complete(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.transition(
            period_id,
            &[PeriodStatus::Processing],
            PeriodStatus::Completed,
            None,
            |t| {
                let items = t.items_for_period(period_id)?;
                if items.is_empty() {
                    return Err(EngineError::Conflict {
                        message: "payroll period has no payroll items".to_string(),
                        details: Vec::new(),
                    });
                }
                let period = t.period(period_id)?;
                let missing: Vec<String> = t
                    .payroll_employees(period.start_date, period.end_date)?
                    .into_iter()
                    .filter(|e| !items.iter().any(|i| i.employee_id == e.id))
                    .map(|e| e.id)
                    .collect();
                if !missing.is_empty() {
                    return Err(EngineError::Conflict {
                        message: format!("{} employees have no payroll item", missing.len()),
                        details: missing,
                    });
                }
                Ok(())
            },
        )
        .await
    }

    /// Finalizes a Processing or Completed period.
    ///
    /// Every item must be approved; the items become Finalized.
    ///
    /// # Errors
    ///
    /// `Conflict` listing the employees whose items are still Calculated.
    pub async fn finalize(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.transition(
            period_id,
            &[PeriodStatus::Processing, PeriodStatus::Completed],
            PeriodStatus::Finalized,
            None,
            |t| {
                let items = t.items_for_period(period_id)?;
                if items.is_empty() {
                    return Err(EngineError::Conflict {
                        message: "payroll period has no payroll items".to_string(),
                        details: Vec::new(),
                    });
                }
                let blocking: Vec<String> = items
                    .iter()
                    .filter(|i| i.status == PayrollItemStatus::Calculated)
                    .map(|i| i.employee_id.clone())
                    .collect();
                if !blocking.is_empty() {
                    return Err(EngineError::Conflict {
                        message: format!("{} payroll items not yet approved", blocking.len()),
                        details: blocking,
                    });
                }

                set_item_status(t, items, PayrollItemStatus::Finalized)
            },
        )
        .await
    }

    /// Marks a Finalized period and all its items as Paid.
    pub async fn mark_paid(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.transition(
            period_id,
            &[PeriodStatus::Finalized],
            PeriodStatus::Paid,
            None,
            |t| {
                let items = t.items_for_period(period_id)?;
                set_item_status(t, items, PayrollItemStatus::Paid)
            },
        )
        .await
    }

    /// Marks one Finalized item as Paid.
    ///
    /// When it is the last unpaid item the period moves to Paid. Returns the
    /// period's status afterwards.
    pub async fn mark_item_paid(
        &self,
        period_id: Uuid,
        employee_id: &str,
    ) -> EngineResult<PeriodStatus> {
        let advanced = self
            .ctx
            .db()
            .transaction(|t| {
                let period = t.period(period_id)?;
                if period.status != PeriodStatus::Finalized {
                    return Err(status_conflict(&period, "pay items"));
                }

                let mut item = t
                    .item(period_id, employee_id)?
                    .ok_or_else(|| EngineError::not_found("payroll item", employee_id))?;
                if item.status != PayrollItemStatus::Finalized {
                    return Err(EngineError::Conflict {
                        message: format!(
                            "payroll item for {} is {}; only finalized items can be paid",
                            employee_id,
                            item.status.as_str()
                        ),
                        details: vec![item.id.to_string()],
                    });
                }
                item.status = PayrollItemStatus::Paid;
                item.updated_at = Utc::now();
                t.update_item(&item)?;

                let all_paid = t
                    .items_for_period(period_id)?
                    .iter()
                    .all(|i| i.status == PayrollItemStatus::Paid);
                if all_paid {
                    t.compare_and_set_status(
                        period_id,
                        &[PeriodStatus::Finalized],
                        PeriodStatus::Paid,
                    )?;
                }
                Ok(all_paid)
            })
            .await?;

        tracing::info!(
            period_id = %period_id,
            employee_id = %employee_id,
            "payroll item paid"
        );
        if advanced {
            tracing::info!(
                period_id = %period_id,
                from = "finalized",
                to = "paid",
                "payroll period transitioned"
            );
            self.ctx.emit(EngineEvent::PeriodTransitioned {
                period_id,
                from: PeriodStatus::Finalized,
                to: PeriodStatus::Paid,
                reason: None,
            });
            Ok(PeriodStatus::Paid)
        } else {
            Ok(PeriodStatus::Finalized)
        }
    }

    /// Reopens a Finalized or Paid period for correction.
    ///
    /// Items revert to Processed. A reason is mandatory. Locked periods can
    /// never be reopened.
    pub async fn reopen(&self, period_id: Uuid, reason: &str) -> EngineResult<PayrollPeriod> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::validation(
                "reason",
                "reopening a period requires a reason",
            ));
        }

        let reopened = self
            .transition(
                period_id,
                &[PeriodStatus::Finalized, PeriodStatus::Paid],
                PeriodStatus::Processing,
                Some(reason),
                |t| {
                    let items = t.items_for_period(period_id)?;
                    set_item_status(t, items, PayrollItemStatus::Processed)
                },
            )
            .await?;

        tracing::warn!(period_id = %period_id, reason = %reason, "payroll period reopened");
        Ok(reopened)
    }

    /// Locks a Paid period permanently.
    pub async fn lock(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        self.transition(period_id, &[PeriodStatus::Paid], PeriodStatus::Locked, None, |_| Ok(()))
            .await
    }

    async fn transition<F>(
        &self,
        period_id: Uuid,
        expected: &[PeriodStatus],
        to: PeriodStatus,
        reason: Option<&str>,
        apply: F,
    ) -> EngineResult<PayrollPeriod>
    where
        F: FnOnce(&mut Tables<'_>) -> EngineResult<()>,
    {
        let result = self
            .ctx
            .db()
            .transaction(|t| {
                let current = t.period(period_id)?.status;
                current.validate_transition(to)?;
                apply(t)?;
                let from = t.compare_and_set_status(period_id, expected, to)?;
                Ok((from, t.period(period_id)?))
            })
            .await;

        match result {
            Ok((from, period)) => {
                tracing::info!(
                    period_id = %period_id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "payroll period transitioned"
                );
                self.ctx.emit(EngineEvent::PeriodTransitioned {
                    period_id,
                    from,
                    to,
                    reason: reason.map(str::to_string),
                });
                Ok(period)
            }
            Err(e) => {
                tracing::warn!(
                    period_id = %period_id,
                    to = to.as_str(),
                    error = %e,
                    "payroll period transition rejected"
                );
                Err(e)
            }
        }
    }
}

fn set_item_status(
    tables: &mut Tables<'_>,
    items: Vec<PayrollItem>,
    status: PayrollItemStatus,
) -> EngineResult<()> {
    let now = Utc::now();
    for mut item in items {
        item.status = status;
        item.updated_at = now;
        tables.update_item(&item)?;
    }
    Ok(())
}

fn status_conflict(period: &PayrollPeriod, action: &str) -> EngineError {
    EngineError::Conflict {
        message: format!(
            "cannot {} while payroll period {} is {}",
            action,
            period.key,
            period.status.as_str()
        ),
        details: vec![format!("status: {}", period.status.as_str())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::events::MemorySink;
    use crate::persistence::Database;
    use std::sync::Arc;

    async fn setup() -> (PeriodStateMachine, Arc<MemorySink>) {
        let config = ConfigLoader::load("./config/ph_2025").unwrap().into_config();
        let sink = Arc::new(MemorySink::new());
        let ctx = EngineContext::new(Database::open_in_memory().unwrap(), config, sink.clone());
        (PeriodStateMachine::new(ctx), sink)
    }

    #[tokio::test]
    async fn test_create_and_open() {
        let (machine, sink) = setup().await;
        let period = machine.create_period(2025, 9, 1, None).await.unwrap();
        assert_eq!(period.status, PeriodStatus::Draft);

        let opened = machine.open(period.id).await.unwrap();
        assert_eq!(opened.status, PeriodStatus::Open);
        assert_eq!(sink.names(), vec!["period_transitioned"]);
    }

    #[tokio::test]
    async fn test_duplicate_period_rejected() {
        let (machine, _sink) = setup().await;
        machine.create_period(2025, 9, 2, None).await.unwrap();

        let duplicate = machine.create_period(2025, 9, 2, None).await;
        assert!(matches!(duplicate, Err(EngineError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_open_twice_is_conflict() {
        let (machine, _sink) = setup().await;
        let period = machine.create_period(2025, 9, 1, None).await.unwrap();
        machine.open(period.id).await.unwrap();

        assert!(matches!(
            machine.open(period.id).await,
            Err(EngineError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_finalize_without_items_is_conflict() {
        let (machine, _sink) = setup().await;
        let period = machine.create_period(2025, 9, 1, None).await.unwrap();
        machine
            .ctx
            .db()
            .transaction(|t| {
                t.compare_and_set_status(
                    period.id,
                    &[PeriodStatus::Draft],
                    PeriodStatus::Processing,
                )
            })
            .await
            .unwrap();

        match machine.finalize(period.id).await {
            Err(EngineError::Conflict { message, .. }) => {
                assert!(message.contains("no payroll items"));
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        let stored = machine.period(period.id).await.unwrap();
        assert_eq!(stored.status, PeriodStatus::Processing);
    }

    #[tokio::test]
    async fn test_reopen_requires_reason() {
        let (machine, _sink) = setup().await;
        let period = machine.create_period(2025, 9, 1, None).await.unwrap();

        let result = machine.reopen(period.id, "   ").await;
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_lock_requires_paid() {
        let (machine, _sink) = setup().await;
        let period = machine.create_period(2025, 9, 1, None).await.unwrap();

        assert!(matches!(
            machine.lock(period.id).await,
            Err(EngineError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_period_not_found() {
        let (machine, _sink) = setup().await;
        assert!(matches!(
            machine.open(Uuid::new_v4()).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_reversed_dates() {
        let (machine, _sink) = setup().await;
        let mut period = PayrollPeriod::half_month(2025, 9, 1, None).unwrap();
        period.end_date = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();

        match machine.insert(period).await {
            Err(EngineError::Validation { field, .. }) => assert_eq!(field, "date range"),
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert!(machine.periods().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_stores_caller_period_as_draft() {
        let (machine, _sink) = setup().await;
        let mut period = PayrollPeriod::half_month(2025, 9, 2, None).unwrap();
        period.status = PeriodStatus::Paid;
        period.totals.employee_count = 3;

        let created = machine.insert(period).await.unwrap();
        let stored = machine.period(created.id).await.unwrap();

        assert_eq!(created.status, PeriodStatus::Draft);
        assert_eq!(stored.status, PeriodStatus::Draft);
        assert_eq!(stored.totals.employee_count, 0);
    }
}
