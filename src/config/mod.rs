//! Configuration loading and management for the Payroll Engine.
//!
//! This module provides functionality to load statutory rates, the
//! withholding tax table, payroll policy, and benefit rules from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/ph_2025").unwrap();
//! println!("Tax brackets: {}", config.config().withholding_tax().brackets.len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BenefitTaxRule, BenefitsConfig, BonusRule, DayBasis, EngineConfig, GsisPayoutRule,
    GsisPayoutTier, GsisRates, LoyaltyAwardRule, PagIbigRates, PayComponentDefault,
    PayrollPolicy, PhilHealthRates, StatutoryConfig, StepIncrementPolicy, TaxBracket,
    TerminalLeaveRule, WithholdingTaxConfig,
};
