//! Engine services.
//!
//! Each service wraps an [`EngineContext`] and exposes the async operations
//! of one part of the engine:
//!
//! - [`AttendanceStore`] imports attendance batches
//! - [`OverrideRegistry`] manages per-employee pay overrides
//! - [`PayrollPipeline`] generates and recalculates payroll items
//! - [`PeriodStateMachine`] drives payroll periods through their lifecycle
//! - [`BenefitsService`] runs benefit cycles and one-off payouts

mod attendance;
mod benefits;
mod overrides;
mod payroll;
mod period;

pub use attendance::AttendanceStore;
pub use benefits::{BenefitsService, CycleRunSummary, NewCycle};
pub use overrides::{NewOverride, OverrideRegistry, resolve_components};
pub use payroll::{GenerationSummary, PayrollPipeline, build_payroll_item};
pub use period::PeriodStateMachine;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind};
use crate::events::{EngineEvent, EventSink, TracingSink};
use crate::persistence::Database;

/// Shared state handed to every service.
#[derive(Clone)]
pub struct EngineContext {
    db: Database,
    config: Arc<EngineConfig>,
    events: Arc<dyn EventSink>,
}

impl EngineContext {
    /// Creates a context from its parts.
    pub fn new(db: Database, config: EngineConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            events,
        }
    }

    /// Creates a context that logs events through `tracing`.
    pub fn with_tracing(db: Database, config: EngineConfig) -> Self {
        Self::new(db, config, Arc::new(TracingSink))
    }

    /// The database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

/// Why one employee in a batch could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFailure {
    /// The employee.
    pub employee_id: String,
    /// Category of the error.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub reason: String,
}

impl EmployeeFailure {
    /// Builds a failure report from an error.
    pub fn new(employee_id: impl Into<String>, error: &EngineError) -> Self {
        Self {
            employee_id: employee_id.into(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// The result of processing one employee in a batch.
#[derive(Debug, Clone)]
pub enum BatchOutcome<T> {
    /// The employee was processed.
    Succeeded {
        /// The employee.
        employee_id: String,
        /// What was produced.
        value: T,
    },
    /// The employee failed; the batch continued.
    Failed(EmployeeFailure),
}

impl<T> BatchOutcome<T> {
    /// The employee this outcome is for.
    pub fn employee_id(&self) -> &str {
        match self {
            Self::Succeeded { employee_id, .. } => employee_id,
            Self::Failed(failure) => &failure.employee_id,
        }
    }

    /// Returns true if the employee was processed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// The produced value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&EmployeeFailure> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_error_kind() {
        let error = EngineError::calculation("below the lowest GSIS payout tier");
        let failure = EmployeeFailure::new("emp_007", &error);

        assert_eq!(failure.kind, ErrorKind::Calculation);
        assert!(failure.reason.contains("lowest GSIS payout tier"));
    }

    #[test]
    fn test_batch_outcome_accessors() {
        let ok: BatchOutcome<u32> = BatchOutcome::Succeeded {
            employee_id: "emp_001".to_string(),
            value: 7,
        };
        let missing = EngineError::not_found("employee", "emp_002");
        let failed: BatchOutcome<u32> =
            BatchOutcome::Failed(EmployeeFailure::new("emp_002", &missing));

        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&7));
        assert_eq!(failed.employee_id(), "emp_002");
        assert_eq!(failed.failure().unwrap().kind, ErrorKind::NotFound);
    }
}
