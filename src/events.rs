//! Domain events and the sinks that receive them.
//!
//! Services emit an [`EngineEvent`] after every state change that an
//! operator or auditor may care about. The host decides what to do with
//! them by choosing an [`EventSink`]: [`TracingSink`] logs them,
//! [`MemorySink`] records them for inspection.

use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BenefitType, OverrideKind, PeriodStatus};

/// Something that happened inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A payroll period changed status.
    PeriodTransitioned {
        /// The period.
        period_id: Uuid,
        /// Status before the transition.
        from: PeriodStatus,
        /// Status after the transition.
        to: PeriodStatus,
        /// Operator-supplied reason, required for reopening.
        reason: Option<String>,
    },
    /// An attendance batch became active.
    AttendanceImported {
        /// The period.
        period_id: Uuid,
        /// The new active batch.
        batch_id: Uuid,
        /// Records in the batch.
        record_count: u32,
        /// The batch it replaced, on re-import.
        superseded_batch_id: Option<Uuid>,
    },
    /// A re-import was held back pending confirmation.
    ReimportWarned {
        /// The period.
        period_id: Uuid,
        /// The batch that would be superseded.
        previous_batch_id: Uuid,
    },
    /// A payroll generation run finished.
    PayrollGenerated {
        /// The period.
        period_id: Uuid,
        /// Items written.
        processed_count: u32,
        /// Employees that failed.
        failed_count: u32,
        /// Net pay over the written items.
        total_net_pay: Decimal,
    },
    /// A benefit item was written to a cycle.
    BenefitItemCreated {
        /// The cycle.
        cycle_id: Uuid,
        /// The employee.
        employee_id: String,
        /// Whether the employee qualified.
        is_eligible: bool,
    },
    /// A one-off benefit payout was recorded in the ledger.
    CompensationProcessed {
        /// The employee.
        employee_id: String,
        /// The benefit paid.
        benefit_type: BenefitType,
        /// Gross amount.
        amount: Decimal,
    },
    /// A pay override was created.
    OverrideCreated {
        /// The override.
        override_id: Uuid,
        /// The employee.
        employee_id: String,
        /// Allowance or deduction.
        kind: OverrideKind,
        /// Component code.
        code: String,
    },
}

impl EngineEvent {
    /// Short name of the event, matching its serialized tag.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PeriodTransitioned { .. } => "period_transitioned",
            Self::AttendanceImported { .. } => "attendance_imported",
            Self::ReimportWarned { .. } => "reimport_warned",
            Self::PayrollGenerated { .. } => "payroll_generated",
            Self::BenefitItemCreated { .. } => "benefit_item_created",
            Self::CompensationProcessed { .. } => "compensation_processed",
            Self::OverrideCreated { .. } => "override_created",
        }
    }
}

/// Receives engine events.
///
/// Implementations must not block; they are called while a service
/// operation is in progress.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: EngineEvent);
}

/// Logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(event = event.name(), %payload, "engine event"),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "failed to serialize event"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events received so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the names of the events received so far, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(EngineEvent::name)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
