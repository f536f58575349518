//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while computing payroll and
//! benefits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the Payroll Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/statutory.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/statutory.yaml");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed or failed validation.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Input was malformed or missing.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The field or input that was invalid.
        field: String,
        /// A description of what made the input invalid.
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "payroll period").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The operation conflicts with the current state of the data.
    ///
    /// `details` names the specific blocking conditions (e.g. the payroll
    /// items that are not yet approved).
    #[error("Conflict: {message}")]
    Conflict {
        /// A description of the conflict.
        message: String,
        /// The blocking conditions, if any.
        details: Vec<String>,
    },

    /// A calculation could not be performed, usually because an eligibility
    /// rule was not met.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },

    /// The store failed; any open transaction was rolled back.
    #[error("Persistence error: {message}")]
    Persistence {
        /// A description of the storage failure.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::NotFound`] error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`EngineError::Conflict`] error without details.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Shorthand for a [`EngineError::CalculationError`].
    pub fn calculation(message: impl Into<String>) -> Self {
        Self::CalculationError {
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. } | Self::ConfigParseError { .. } => ErrorKind::Config,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::CalculationError { .. } => ErrorKind::Calculation,
            Self::Persistence { .. } => ErrorKind::Persistence,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    /// Constraint violations become [`EngineError::Conflict`]; everything
    /// else is a storage failure.
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict {
                    message: message.unwrap_or_else(|| failure.to_string()),
                    details: Vec::new(),
                }
            }
            other => Self::Persistence {
                message: other.to_string(),
            },
        }
    }
}

/// Category tag for an [`EngineError`], used in per-entity batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Configuration could not be loaded.
    Config,
    /// Malformed or missing input.
    Validation,
    /// Unknown entity.
    NotFound,
    /// Illegal transition or uniqueness violation.
    Conflict,
    /// Eligibility not met or calculation impossible.
    Calculation,
    /// Storage failure.
    Persistence,
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_validation_displays_field_and_message() {
        let error = EngineError::validation("working_days", "must not be negative");
        assert_eq!(
            error.to_string(),
            "Invalid working_days: must not be negative"
        );
    }

    #[test]
    fn test_not_found_displays_entity_and_id() {
        let error = EngineError::not_found("employee", "emp_404");
        assert_eq!(error.to_string(), "employee not found: emp_404");
    }

    #[test]
    fn test_conflict_carries_details() {
        let error = EngineError::Conflict {
            message: "2 payroll items not yet approved".to_string(),
            details: vec!["emp_001".to_string(), "emp_002".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Conflict: 2 payroll items not yet approved"
        );
        match error {
            EngineError::Conflict { details, .. } => assert_eq!(details.len(), 2),
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_calculation_error_displays_message() {
        let error = EngineError::calculation("fewer than 10 years of service");
        assert_eq!(
            error.to_string(),
            "Calculation error: fewer than 10 years of service"
        );
    }

    #[test]
    fn test_kind_maps_each_variant() {
        assert_eq!(EngineError::validation("x", "y").kind(), ErrorKind::Validation);
        assert_eq!(EngineError::not_found("employee", "1").kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::conflict("locked").kind(), ErrorKind::Conflict);
        assert_eq!(EngineError::calculation("no").kind(), ErrorKind::Calculation);
        assert_eq!(
            EngineError::Persistence {
                message: "closed".to_string()
            }
            .kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::not_found("payroll period", "p1"))
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (code TEXT PRIMARY KEY); INSERT INTO t VALUES ('pera');")
            .unwrap();
        let err: EngineError = conn
            .execute("INSERT INTO t VALUES ('pera')", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_other_sqlite_errors_map_to_persistence() {
        let err: EngineError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
