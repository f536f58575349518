//! Benefit cycle, benefit item, and compensation ledger models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// The kinds of benefit the engine can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    /// Performance-based bonus.
    PerformanceBonus,
    /// Mid-year bonus.
    MidYearBonus,
    /// Year-end bonus.
    YearEndBonus,
    /// GSIS retirement payout.
    GsisPayout,
    /// Terminal leave benefit.
    TerminalLeave,
    /// Leave monetization.
    LeaveMonetization,
    /// Loyalty award.
    LoyaltyAward,
}

impl BenefitType {
    /// Returns the string representation of the benefit type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PerformanceBonus => "performance_bonus",
            Self::MidYearBonus => "mid_year_bonus",
            Self::YearEndBonus => "year_end_bonus",
            Self::GsisPayout => "gsis_payout",
            Self::TerminalLeave => "terminal_leave",
            Self::LeaveMonetization => "leave_monetization",
            Self::LoyaltyAward => "loyalty_award",
        }
    }

    /// Returns true for benefits paid as a salary-based bonus.
    pub const fn is_bonus(&self) -> bool {
        matches!(
            self,
            Self::PerformanceBonus | Self::MidYearBonus | Self::YearEndBonus
        )
    }
}

impl std::str::FromStr for BenefitType {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        match s {
            "performance_bonus" => Ok(Self::PerformanceBonus),
            "mid_year_bonus" => Ok(Self::MidYearBonus),
            "year_end_bonus" => Ok(Self::YearEndBonus),
            "gsis_payout" => Ok(Self::GsisPayout),
            "terminal_leave" => Ok(Self::TerminalLeave),
            "leave_monetization" => Ok(Self::LeaveMonetization),
            "loyalty_award" => Ok(Self::LoyaltyAward),
            other => Err(EngineError::not_found("benefit type", other)),
        }
    }
}

/// Lifecycle status of a benefit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Created; items may be calculated.
    Draft,
    /// At least one calculation run completed; items may still be added.
    Calculated,
    /// Approved; no further items.
    Approved,
    /// Paid out.
    Released,
}

impl CycleStatus {
    /// Returns the string representation of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Calculated => "calculated",
            Self::Approved => "approved",
            Self::Released => "released",
        }
    }

    /// Returns true while items may be added to the cycle.
    pub const fn accepts_items(&self) -> bool {
        matches!(self, Self::Draft | Self::Calculated)
    }
}

/// A scheduled benefit run producing one item per employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitCycle {
    /// Unique identifier.
    pub id: Uuid,
    /// The benefit computed in this cycle.
    pub benefit_type: BenefitType,
    /// Benefit year.
    pub year: i32,
    /// Date on which salary and status are evaluated.
    pub applicable_date: NaiveDate,
    /// Date the benefit is paid.
    pub payment_date: NaiveDate,
    /// Date at which service is measured for eligibility.
    pub cutoff_date: NaiveDate,
    /// Current status.
    pub status: CycleStatus,
    /// When the cycle was created.
    pub created_at: DateTime<Utc>,
}

/// One employee's benefit within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitItem {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning cycle.
    pub cycle_id: Uuid,
    /// The employee.
    pub employee_id: String,
    /// Gross amount.
    pub calculated_amount: Decimal,
    /// Tax withheld.
    pub tax_amount: Decimal,
    /// Amount released.
    pub net_amount: Decimal,
    /// Whether the employee met the eligibility rule.
    pub is_eligible: bool,
    /// Why the employee was or was not eligible.
    pub eligibility_notes: String,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

/// A processed one-off benefit payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationBenefit {
    /// Unique identifier.
    pub id: Uuid,
    /// The employee paid.
    pub employee_id: String,
    /// The benefit paid.
    pub benefit_type: BenefitType,
    /// Gross amount.
    pub amount: Decimal,
    /// Tax withheld.
    pub tax_amount: Decimal,
    /// Leave days converted, for leave-based benefits.
    pub days: Option<Decimal>,
    /// Who processed the payout.
    pub processed_by: String,
    /// When the payout was processed.
    pub processed_at: DateTime<Utc>,
    /// Free-form notes.
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_benefit_type_parses_its_own_string() {
        let all = [
            BenefitType::PerformanceBonus,
            BenefitType::MidYearBonus,
            BenefitType::YearEndBonus,
            BenefitType::GsisPayout,
            BenefitType::TerminalLeave,
            BenefitType::LeaveMonetization,
            BenefitType::LoyaltyAward,
        ];
        for benefit_type in all {
            assert_eq!(BenefitType::from_str(benefit_type.as_str()).unwrap(), benefit_type);
        }
    }

    #[test]
    fn test_unknown_benefit_type_is_not_found() {
        match BenefitType::from_str("hazard_pay") {
            Err(EngineError::NotFound { entity, id }) => {
                assert_eq!(entity, "benefit type");
                assert_eq!(id, "hazard_pay");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_bonus_types() {
        assert!(BenefitType::MidYearBonus.is_bonus());
        assert!(!BenefitType::TerminalLeave.is_bonus());
    }

    #[test]
    fn test_cycle_accepts_items_until_approved() {
        assert!(CycleStatus::Draft.accepts_items());
        assert!(CycleStatus::Calculated.accepts_items());
        assert!(!CycleStatus::Approved.accepts_items());
        assert!(!CycleStatus::Released.accepts_items());
    }
}
