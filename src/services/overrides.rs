//! Per-employee allowance and deduction overrides.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::PayComponentDefault;
use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::models::{
    ComponentSource, OverrideIndex, OverrideKey, OverrideKind, PayComponent, PayOverride,
};

use super::EngineContext;

/// Request to create an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOverride {
    /// The employee.
    pub employee_id: String,
    /// Allowance or deduction.
    pub kind: OverrideKind,
    /// Component code.
    pub code: String,
    /// Amount per payroll period.
    pub amount: Decimal,
    /// First day the override applies.
    pub effective_date: NaiveDate,
    /// Last day the override applies; open-ended when `None`.
    pub end_date: Option<NaiveDate>,
}

/// Creates, deactivates and looks up overrides.
#[derive(Debug, Clone)]
pub struct OverrideRegistry {
    ctx: EngineContext,
}

impl OverrideRegistry {
    /// Creates the registry.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Creates an active override.
    ///
    /// # Errors
    ///
    /// - `Validation` for a negative amount, an empty code, or an end date
    ///   before the effective date
    /// - `NotFound` if the employee does not exist
    /// - `Conflict` if an active override with the same employee, kind and
    ///   code overlaps the date range
    pub async fn create(&self, request: NewOverride) -> EngineResult<PayOverride> {
        if request.code.trim().is_empty() {
            return Err(EngineError::validation("code", "must not be empty"));
        }
        if request.amount < Decimal::ZERO {
            return Err(EngineError::validation(
                "amount",
                format!("must not be negative, got {}", request.amount),
            ));
        }
        if let Some(end) = request.end_date
            && end < request.effective_date
        {
            return Err(EngineError::validation(
                "end_date",
                format!("{} is before effective date {}", end, request.effective_date),
            ));
        }

        let pay_override = PayOverride {
            id: Uuid::new_v4(),
            employee_id: request.employee_id,
            kind: request.kind,
            code: request.code,
            amount: request.amount,
            effective_date: request.effective_date,
            end_date: request.end_date,
            is_active: true,
            created_at: Utc::now(),
        };

        let created = pay_override.clone();
        self.ctx
            .db()
            .transaction(move |t| {
                t.employee(&pay_override.employee_id)?;
                t.insert_override(&pay_override)
            })
            .await?;

        tracing::info!(
            override_id = %created.id,
            employee_id = %created.employee_id,
            code = %created.code,
            amount = %created.amount,
            "override created"
        );
        self.ctx.emit(EngineEvent::OverrideCreated {
            override_id: created.id,
            employee_id: created.employee_id.clone(),
            kind: created.kind,
            code: created.code.clone(),
        });
        Ok(created)
    }

    /// Deactivates an override.
    pub async fn deactivate(&self, id: Uuid) -> EngineResult<PayOverride> {
        let deactivated = self
            .ctx
            .db()
            .transaction(|t| t.deactivate_override(id))
            .await?;
        tracing::info!(override_id = %id, "override deactivated");
        Ok(deactivated)
    }

    /// Active overrides of an employee that apply on `date`.
    pub async fn active_on(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Vec<PayOverride>> {
        self.ctx
            .db()
            .read(|t| t.overrides_on(employee_id, date))
            .await
    }

    /// Every override of an employee, active or not.
    pub async fn history(&self, employee_id: &str) -> EngineResult<Vec<PayOverride>> {
        self.ctx
            .db()
            .read(|t| t.overrides_for(employee_id))
            .await
    }
}

/// Resolves one employee's pay components of one kind for a period.
///
/// `overrides` holds the overrides in force during the period (see
/// [`index_overrides`](crate::models::index_overrides)). Each default is
/// replaced by the override stored under its key; overrides whose code has
/// no default are appended in code order.
///
/// # Examples
///
/// ```
/// use payroll_engine::config::PayComponentDefault;
/// use payroll_engine::models::{ComponentSource, OverrideIndex, OverrideKind};
/// use payroll_engine::services::resolve_components;
/// use rust_decimal::Decimal;
///
/// let defaults = vec![PayComponentDefault {
///     code: "pera".to_string(),
///     description: "PERA".to_string(),
///     amount: Decimal::from(1000),
/// }];
///
/// let lines = resolve_components(
///     &defaults,
///     &OverrideIndex::new(),
///     "emp_001",
///     OverrideKind::Allowance,
/// );
/// assert_eq!(lines[0].amount, Decimal::from(1000));
/// assert_eq!(lines[0].source, ComponentSource::Default);
/// ```
pub fn resolve_components(
    defaults: &[PayComponentDefault],
    overrides: &OverrideIndex,
    employee_id: &str,
    kind: OverrideKind,
) -> Vec<PayComponent> {
    let key = |code: &str| OverrideKey {
        employee_id: employee_id.to_string(),
        kind,
        code: code.to_string(),
    };

    let mut lines: Vec<PayComponent> = defaults
        .iter()
        .map(|d| match overrides.get(&key(&d.code)) {
            Some(o) => PayComponent {
                code: d.code.clone(),
                description: d.description.clone(),
                amount: o.amount,
                source: ComponentSource::Override,
            },
            None => PayComponent {
                code: d.code.clone(),
                description: d.description.clone(),
                amount: d.amount,
                source: ComponentSource::Default,
            },
        })
        .collect();

    let extras = overrides.iter().filter(|(k, _)| {
        k.employee_id == employee_id
            && k.kind == kind
            && !defaults.iter().any(|d| d.code == k.code)
    });
    for (k, o) in extras {
        lines.push(PayComponent {
            code: k.code.clone(),
            description: k.code.clone(),
            amount: o.amount,
            source: ComponentSource::Override,
        });
    }
    lines
}
