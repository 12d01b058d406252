//! Error types for the engine pipeline
//!
//! Errors are split by where they surface: capability tables that cannot be
//! turned into an engine, caller input that fails delimiter/modifier checks,
//! and faults raised by an engine while it runs. Pattern compilation
//! failures are not errors at this level; they are [`PatternError`] values
//! carried inside results (see [`crate::result`]).
//!
//! [`PatternError`]: crate::result::PatternError

use thiserror::Error;

use crate::capabilities::DelimiterPair;
use crate::result::PatternId;

/// Problems with an engine capability table. Fatal at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Allowed modifiers must be ASCII letters
    #[error("all {label} must be alphabetical characters. {chars} {verb} not valid")]
    NonAlphabeticModifier {
        /// "flags" or "modifiers"
        label: &'static str,
        /// Offending characters, already human formatted
        chars: String,
        /// "is" or "are"
        verb: &'static str,
    },

    /// The table's own defaults do not pass its own validation
    #[error("engine `{engine}` has invalid defaults: {source}")]
    InvalidDefaults {
        /// Engine identifier
        engine: String,
        /// The validation failure
        #[source]
        source: ValidationError,
    },

    /// No engine with this id is registered
    #[error("unknown engine `{0}`")]
    UnknownEngine(String),

    /// The requested dialect cannot run in this build
    #[error("engine `{engine}` needs the `{dialect}` dialect, which is not available in this build")]
    UnsupportedDialect {
        /// Engine identifier
        engine: String,
        /// Dialect name
        dialect: &'static str,
    },

    /// A local engine was requested for a remote-only table, or vice versa
    #[error("engine `{0}` cannot be opened with this access mode")]
    AccessMismatch(String),

    /// The capability table could not be read
    #[error("invalid engine table: {0}")]
    Table(String),
}

/// Caller-supplied delimiters or modifiers that the engine does not accept.
///
/// Both variants carry a usable fallback so callers that only want a safe
/// value can still proceed; receiving this error is nevertheless an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The opening delimiter is not allowed
    #[error("{message}")]
    Delimiter {
        /// The offending character
        invalid: char,
        /// Human readable explanation
        message: String,
        /// The engine's default pair
        fallback: DelimiterPair,
    },

    /// One or more modifiers are not allowed
    #[error("{message}")]
    Modifier {
        /// Each offending character, once, in first-seen order
        invalid: Vec<char>,
        /// Human readable explanation
        message: String,
        /// Input with invalid and duplicate characters removed
        cleaned: String,
    },
}

impl ValidationError {
    /// The characters that caused the failure
    pub fn invalid_items(&self) -> Vec<char> {
        match self {
            ValidationError::Delimiter { invalid, .. } => vec![*invalid],
            ValidationError::Modifier { invalid, .. } => invalid.clone(),
        }
    }

    /// Field name used in diagnostics
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Delimiter { .. } => "delimiters",
            ValidationError::Modifier { .. } => "modifiers",
        }
    }
}

/// Failure of an engine operation as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Capability table problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A pattern that compiled could not be executed
    #[error("execution of pattern {regex_id} failed: {message}")]
    Execution {
        /// Pattern that faulted
        regex_id: PatternId,
        /// Engine message
        message: String,
    },

    /// The remote engine could not be reached or answered garbage
    #[error("remote engine `{engine}` failed: {message}")]
    Remote {
        /// Engine identifier
        engine: String,
        /// What went wrong
        message: String,
    },

    /// `last_error` was called while no error is pending
    #[error("last pattern was valid; no error is pending for pattern {0}")]
    NoPendingError(PatternId),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NonAlphabeticModifier {
            label: "flags",
            chars: "\"1\"".to_string(),
            verb: "is",
        };
        assert_eq!(
            err.to_string(),
            "all flags must be alphabetical characters. \"1\" is not valid"
        );
    }

    #[test]
    fn test_validation_error_items() {
        let err = ValidationError::Modifier {
            invalid: vec!['q', 'z'],
            message: "bad".to_string(),
            cleaned: "i".to_string(),
        };
        assert_eq!(err.invalid_items(), vec!['q', 'z']);
        assert_eq!(err.field(), "modifiers");
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn test_engine_error_from_config() {
        let err: EngineError = ConfigError::UnknownEngine("perl".to_string()).into();
        assert_eq!(err.to_string(), "unknown engine `perl`");
    }

    #[test]
    fn test_no_pending_error_display() {
        let err = EngineError::NoPendingError(7);
        assert!(err.to_string().contains("pattern 7"));
    }
}
