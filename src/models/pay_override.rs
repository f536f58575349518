//! Employee-specific allowance and deduction overrides.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an override replaces an allowance or a deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    /// Replaces a default allowance (or adds a new one).
    Allowance,
    /// Replaces a default deduction (or adds a new one).
    Deduction,
}

impl OverrideKind {
    /// Returns the string representation of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allowance => "allowance",
            Self::Deduction => "deduction",
        }
    }
}

/// Lookup key for overrides: at most one active override per key covers any
/// given date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverrideKey {
    /// The employee.
    pub employee_id: String,
    /// Allowance or deduction.
    pub kind: OverrideKind,
    /// Component code.
    pub code: String,
}

/// An employee-specific amount superseding the default for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayOverride {
    /// Unique identifier.
    pub id: Uuid,
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
    /// False once deactivated.
    pub is_active: bool,
    /// When the override was created.
    pub created_at: DateTime<Utc>,
}

impl PayOverride {
    /// Returns the lookup key of this override.
    pub fn key(&self) -> OverrideKey {
        OverrideKey {
            employee_id: self.employee_id.clone(),
            kind: self.kind,
            code: self.code.clone(),
        }
    }

    /// Returns true if the override is active on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && date >= self.effective_date
            && self.end_date.is_none_or(|end| date <= end)
    }

    /// Returns true if the override is active on any day of `start..=end`.
    pub fn applies_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= end
            && self.end_date.is_none_or(|last| last >= start)
    }

    /// Returns true if the date ranges of `self` and `other` share a day.
    pub fn overlaps(&self, other: &PayOverride) -> bool {
        let self_end = self.end_date.unwrap_or(NaiveDate::MAX);
        let other_end = other.end_date.unwrap_or(NaiveDate::MAX);
        self.effective_date <= other_end && other.effective_date <= self_end
    }
}

/// The override in force for each key during one payroll period.
pub type OverrideIndex = BTreeMap<OverrideKey, PayOverride>;

/// Indexes the overrides that apply during `start..=end` by their key.
///
/// When several active overrides of the same key apply, the one with the
/// latest effective date wins.
pub fn index_overrides(
    overrides: impl IntoIterator<Item = PayOverride>,
    start: NaiveDate,
    end: NaiveDate,
) -> OverrideIndex {
    let mut index = OverrideIndex::new();
    for o in overrides.into_iter().filter(|o| o.applies_during(start, end)) {
        match index.get(&o.key()) {
            Some(current) if current.effective_date > o.effective_date => {}
            _ => {
                index.insert(o.key(), o);
            }
        }
    }
    index
}
