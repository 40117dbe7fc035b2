//! Error types for the game simulation.
//!
//! Every public mutator in the core returns [`Result`]. An `Err` always means
//! the call was rejected before any state changed. Errors fall into three
//! groups:
//!
//! - **Validation** - a submitted entity or argument is malformed or out of range.
//! - **Lookup** - the call names an identifier, relation or pending action that
//!   does not exist.
//! - **Tick faults** - an update pass failed mid-tick. These are never returned
//!   by a mutator; the engine converts them into a
//!   [`TickFault`](crate::snapshot::TickFault).

use thiserror::Error;

use crate::snapshot::SystemKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// An identifier or other required string was empty.
    #[error("{entity} has an empty {field}")]
    EmptyIdentifier {
        /// Entity kind being validated.
        entity: &'static str,
        /// Name of the empty field.
        field: &'static str,
    },

    /// A numeric field was NaN or infinite.
    #[error("{entity}.{field} is not a finite number")]
    NonFinite {
        /// Entity kind being validated.
        entity: &'static str,
        /// Name of the offending field.
        field: String,
    },

    /// A numeric field fell outside its permitted range.
    #[error("{entity}.{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Entity kind being validated.
        entity: &'static str,
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// An identifier is already registered.
    #[error("{kind} '{id}' already exists")]
    DuplicateId {
        /// Entity kind.
        kind: &'static str,
        /// The duplicated identifier.
        id: String,
    },

    /// A string did not name any known action, policy or metric.
    #[error("unknown {kind} '{name}'")]
    UnknownName {
        /// What the name was expected to identify.
        kind: &'static str,
        /// The unrecognised name.
        name: String,
    },

    /// A relation was requested between a nation and itself.
    #[error("nation '{nation}' cannot hold a relation with itself")]
    SelfRelation {
        /// The nation named on both sides.
        nation: String,
    },

    /// Invalid entity reference.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// No diplomatic relation is registered for the pair.
    #[error("no diplomatic relation between '{a}' and '{b}'")]
    RelationNotFound {
        /// First nation.
        a: String,
        /// Second nation.
        b: String,
    },

    /// Research prerequisite not met.
    #[error("research requirement not met: field '{field}' requires '{requirement}'")]
    RequirementNotMet {
        /// Field being started.
        field: String,
        /// Prerequisite field that is incomplete or missing.
        requirement: String,
    },

    /// A diplomatic action is not permitted given the current relation.
    #[error("{action} rejected: relation is {status} with trust {trust:.1}")]
    ActionRejected {
        /// Action kind.
        action: &'static str,
        /// Current relation status.
        status: &'static str,
        /// Current trust.
        trust: f64,
    },

    /// Insufficient resources.
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResource {
        /// Resource metric name.
        resource: &'static str,
        /// Amount required.
        required: f64,
        /// Amount available.
        available: f64,
    },

    /// No facility is able to host the request.
    #[error("facility capacity exceeded for project '{project}': requested {requested}")]
    CapacityExceeded {
        /// Project identifier.
        project: String,
        /// Requested researcher count.
        requested: u32,
    },

    /// An update pass failed during a tick.
    #[error("{system} update failed: {message}")]
    SystemFault {
        /// Subsystem whose update pass failed.
        system: SystemKind,
        /// Human-readable description.
        message: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },
}

impl GameError {
    /// Whether this error reports a malformed or out-of-range input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyIdentifier { .. }
                | Self::NonFinite { .. }
                | Self::OutOfRange { .. }
                | Self::DuplicateId { .. }
                | Self::UnknownName { .. }
                | Self::SelfRelation { .. }
        )
    }

    /// Whether this error reports an unknown identifier or relation.
    #[must_use]
    pub const fn is_lookup(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::RelationNotFound { .. })
    }
}

/// Field checks shared by the subsystem validators.
pub(crate) mod check {
    use super::{GameError, Result};

    pub fn non_empty(entity: &'static str, field: &'static str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(GameError::EmptyIdentifier { entity, field });
        }
        Ok(())
    }

    pub fn finite(entity: &'static str, field: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(GameError::NonFinite {
                entity,
                field: field.to_string(),
            });
        }
        Ok(())
    }

    pub fn in_range(
        entity: &'static str,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<()> {
        finite(entity, field, value)?;
        if value < min || value > max {
            return Err(GameError::OutOfRange {
                entity,
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Finite and not negative.
    pub fn non_negative(entity: &'static str, field: &'static str, value: f64) -> Result<()> {
        in_range(entity, field, value, 0.0, f64::MAX)
    }

    /// Finite and strictly positive.
    pub fn positive(entity: &'static str, field: &'static str, value: f64) -> Result<()> {
        finite(entity, field, value)?;
        if value <= 0.0 {
            return Err(GameError::OutOfRange {
                entity,
                field,
                value,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        Ok(())
    }

    pub fn all_finite<'a, I>(entity: &'static str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (key, value) in values {
            finite(entity, key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let validation = GameError::EmptyIdentifier {
            entity: "segment",
            field: "id",
        };
        assert!(validation.is_validation());
        assert!(!validation.is_lookup());

        let lookup = GameError::NotFound {
            kind: "project",
            id: "p1".into(),
        };
        assert!(lookup.is_lookup());
        assert!(!lookup.is_validation());
    }

    #[test]
    fn test_range_check() {
        assert!(check::in_range("facility", "level", 5.0, 1.0, 10.0).is_ok());
        assert!(check::in_range("facility", "level", 11.0, 1.0, 10.0).is_err());
        assert!(matches!(
            check::in_range("facility", "level", f64::NAN, 1.0, 10.0),
            Err(GameError::NonFinite { .. })
        ));
        assert!(check::positive("event", "duration", 0.0).is_err());
        assert!(check::non_negative("policy", "cost", 0.0).is_ok());
    }

    #[test]
    fn test_self_relation_is_validation() {
        let err = GameError::SelfRelation {
            nation: "aurora".into(),
        };
        assert!(err.is_validation());
        assert!(!err.is_lookup());
    }

    #[test]
    fn test_display() {
        let err = GameError::RelationNotFound {
            a: "aurora".into(),
            b: "borealis".into(),
        };
        assert_eq!(
            err.to_string(),
            "no diplomatic relation between 'aurora' and 'borealis'"
        );
    }
}
