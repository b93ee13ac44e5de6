//! Error types for cuefire.
//!
//! All errors in cuefire are strongly typed using thiserror.
//! Boolean queries (`Mask::accepts`, `EventMatcher::is_fired_by`) never
//! produce errors; only mutation and construction do.

use thiserror::Error;

use crate::registry::MatcherId;
use crate::replay::ReplayState;
use crate::translator::Identifier;

/// Validation errors raised eagerly on construction or mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Item of type {item_type} cannot be translated to an identifier")]
    Untranslatable {
        item_type: &'static str,
    },

    #[error("Identifier {identifier} is out of range [{min}, {max}]")]
    IdentifierOutOfRange {
        identifier: Identifier,
        min: Identifier,
        max: Identifier,
    },

    #[error("Invalid identifier range [{min}, {max}]")]
    InvalidIdentifierRange {
        min: Identifier,
        max: Identifier,
    },

    #[error("Translator domain cannot be empty")]
    EmptyDomain,

    #[error("Duplicate domain value at index {index}")]
    DuplicateDomainValue {
        index: usize,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },
}

/// Errors found while validating the registered matcher graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Matcher not registered: {id}")]
    UnknownMatcher {
        id: MatcherId,
    },

    #[error("Matcher {matcher} references an unregistered matcher: {reference}")]
    UnregisteredReference {
        matcher: MatcherId,
        reference: String,
    },

    #[error("Reference cycle detected: {}", format_cycle(.cycle))]
    CyclicReference {
        cycle: Vec<MatcherId>,
    },

    #[error("Matcher {matcher} is not fired by its reference {reference}")]
    InconsistentReference {
        matcher: MatcherId,
        reference: MatcherId,
    },

    #[error("Matcher {matcher} is not fired by its own event")]
    ReflexivityViolated {
        matcher: MatcherId,
    },
}

fn format_cycle(cycle: &[MatcherId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised by the replay driver when its lifecycle is misused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Cannot {operation} while replay is {state}")]
    InvalidState {
        operation: &'static str,
        state: ReplayState,
    },
}

/// Top-level error type for cuefire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CueError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CueError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a replay lifecycle error.
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replay(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for cuefire operations.
pub type CueResult<T> = Result<T, CueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_out_of_range() {
        let err = ValidationError::IdentifierOutOfRange {
            identifier: 12,
            min: 0,
            max: 7,
        };
        let msg = format!("{err}");
        assert!(msg.contains("12"));
        assert!(msg.contains("[0, 7]"));
    }

    #[test]
    fn test_validation_error_untranslatable() {
        let err = ValidationError::Untranslatable { item_type: "u32" };
        let msg = format!("{err}");
        assert!(msg.contains("u32"));
        assert!(msg.contains("cannot be translated"));
    }

    #[test]
    fn test_configuration_error_cycle_formats_path() {
        let err = ConfigurationError::CyclicReference {
            cycle: vec![MatcherId::new(0), MatcherId::new(2), MatcherId::new(0)],
        };
        let msg = format!("{err}");
        assert!(msg.contains("#0 -> #2 -> #0"));
    }

    #[test]
    fn test_replay_error_mentions_state() {
        let err = ReplayError::InvalidState {
            operation: "feed",
            state: ReplayState::Idle,
        };
        let msg = format!("{err}");
        assert!(msg.contains("feed"));
        assert!(msg.contains("idle"));
    }

    #[test]
    fn test_cue_error_from_validation() {
        let err: CueError = ValidationError::EmptyDomain.into();
        assert!(err.is_validation());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_cue_error_from_configuration() {
        let err: CueError = ConfigurationError::UnknownMatcher {
            id: MatcherId::new(3),
        }
        .into();
        assert!(err.is_configuration());
        assert!(!err.is_replay());
    }

    #[test]
    fn test_cue_error_internal() {
        let err = CueError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
