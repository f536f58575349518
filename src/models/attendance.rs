//! Attendance import models.
//!
//! An attendance import arrives as normalized [`AttendanceRow`]s; the store
//! persists them as [`AttendanceRecord`]s owned by an
//! [`AttendanceImportBatch`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized attendance row as produced by the import source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRow {
    /// The employee the row belongs to.
    pub employee_id: String,
    /// Days worked in the period.
    pub working_days: Decimal,
    /// Days on leave in the period.
    #[serde(default)]
    pub leave_days: Decimal,
    /// Overtime hours in the period.
    #[serde(default)]
    pub overtime_hours: Decimal,
}

/// A persisted attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The batch that owns this record.
    pub batch_id: Uuid,
    /// The employee the record belongs to.
    pub employee_id: String,
    /// Days worked in the period.
    pub working_days: Decimal,
    /// Days on leave in the period.
    pub leave_days: Decimal,
    /// Overtime hours in the period.
    pub overtime_hours: Decimal,
}

/// One attendance import for a payroll period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceImportBatch {
    /// Unique identifier.
    pub id: Uuid,
    /// The period the batch was imported for.
    pub period_id: Uuid,
    /// Who performed the import.
    pub imported_by: String,
    /// When the import happened.
    pub imported_at: DateTime<Utc>,
    /// Number of records in the batch.
    pub record_count: u32,
    /// Sum of working days over all records.
    pub total_working_days: Decimal,
    /// False once superseded by a later import.
    pub is_active: bool,
}

/// Returned instead of overwriting when a period already has attendance.
///
/// The caller must call `confirm_reimport` to supersede the previous batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReimportWarning {
    /// The period concerned.
    pub period_id: Uuid,
    /// The batch that would be superseded.
    pub previous_batch_id: Uuid,
    /// Number of records in the superseded batch.
    pub previous_record_count: u32,
    /// When the superseded batch was imported.
    pub previous_imported_at: DateTime<Utc>,
    /// True if payroll items already exist for the period.
    pub payroll_items_exist: bool,
}

/// The result of an attendance import request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// The batch was stored and is now active.
    Imported {
        /// The stored batch.
        batch: AttendanceImportBatch,
    },
    /// Nothing was written; confirmation is required.
    ConfirmationRequired {
        /// What would be superseded.
        warning: ReimportWarning,
    },
}

impl ImportOutcome {
    /// Returns the stored batch, if the import went through.
    pub fn batch(&self) -> Option<&AttendanceImportBatch> {
        match self {
            Self::Imported { batch } => Some(batch),
            Self::ConfirmationRequired { .. } => None,
        }
    }
}
