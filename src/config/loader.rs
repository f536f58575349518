//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! configurations from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{
    BenefitsConfig, EngineConfig, PayComponentDefault, PayrollPolicy, StatutoryConfig,
    WithholdingTaxConfig,
};

/// Loads and provides access to engine configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to query statutory rates, payroll policy, and
/// benefit rules.
///
/// # Directory Structure
///
/// ```text
/// config/ph_2025/
/// ├── statutory.yaml        # GSIS, Pag-IBIG, PhilHealth rates
/// ├── withholding_tax.yaml  # Progressive tax brackets
/// ├── payroll.yaml          # Day basis, default allowances, step policy
/// └── benefits.yaml         # Bonus, payout and award rules
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/ph_2025").unwrap();
/// println!("GSIS rate: {}", loader.config().statutory().gsis.employee_rate);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing (`ConfigNotFound`)
    /// - Any file contains invalid YAML or fails validation (`ConfigParseError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let statutory = Self::load_yaml::<StatutoryConfig>(&path.join("statutory.yaml"))?;
        let withholding_tax =
            Self::load_yaml::<WithholdingTaxConfig>(&path.join("withholding_tax.yaml"))?;
        let payroll = Self::load_yaml::<PayrollPolicy>(&path.join("payroll.yaml"))?;
        let benefits = Self::load_yaml::<BenefitsConfig>(&path.join("benefits.yaml"))?;

        let config = EngineConfig::new(statutory, withholding_tax, payroll, benefits);
        config
            .validate()
            .map_err(|message| EngineError::ConfigParseError {
                path: path.display().to_string(),
                message,
            })?;

        Ok(Self { config })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> EngineConfig {
        self.config
    }

    /// Gets a default allowance by its code.
    pub fn default_allowance(&self, code: &str) -> EngineResult<&PayComponentDefault> {
        self.config
            .payroll()
            .default_allowances
            .iter()
            .find(|a| a.code == code)
            .ok_or_else(|| EngineError::not_found("default allowance", code))
    }
}
