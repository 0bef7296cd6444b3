//! Error taxonomy for model construction and simulation.
//!
//! Construction errors ([`Error::UnknownEntity`], [`Error::UnknownParameter`],
//! [`Error::InvalidRule`], [`Error::InvalidParameter`], [`Error::DuplicateName`])
//! are permanent: the model must be fixed before retrying. Simulation errors
//! ([`Error::NegativeRate`], [`Error::NegativePopulation`]) indicate an internal
//! inconsistency and abort only the run that raised them.

use thiserror::Error;

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or simulating a reaction network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A declaration references an entity type that was never declared
    /// (or was declared after the reference).
    #[error("{context}: unknown entity '{entity}'")]
    UnknownEntity {
        /// Offending rule, initial condition or observable.
        context: String,
        /// Name that failed to resolve.
        entity: String,
    },

    /// A declaration references a parameter that was never declared
    /// (or was declared after the reference).
    #[error("{context}: unknown parameter '{parameter}'")]
    UnknownParameter {
        /// Offending rule or initial condition.
        context: String,
        /// Name that failed to resolve.
        parameter: String,
    },

    /// Rule is structurally invalid (empty reactant side, zero multiplicity).
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// Parameter value is unusable in the role it is bound to.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The same name was declared twice within one namespace.
    #[error("duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    /// A rate law evaluated to a negative (or NaN) value.
    #[error("channel '{channel}' produced negative rate {rate}")]
    NegativeRate { channel: String, rate: f64 },

    /// Firing a channel would drive a population below zero.
    #[error("channel '{channel}' would drive population of '{entity}' below zero")]
    NegativePopulation { channel: String, entity: String },

    /// Simulation settings are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The adaptive ODE solver gave up.
    #[error("integration failed at t={time}: {message}")]
    Integration { time: f64, message: String },
}

impl Error {
    /// True for errors detected while building the model or network.
    ///
    /// These are never worth retrying without changing the model.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownEntity { .. }
                | Error::UnknownParameter { .. }
                | Error::InvalidRule { .. }
                | Error::InvalidParameter { .. }
                | Error::DuplicateName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offender() {
        let err = Error::UnknownEntity {
            context: "rule 'division'".to_string(),
            entity: "Stem".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("division"));
        assert!(msg.contains("Stem"));

        let err = Error::NegativePopulation {
            channel: "decay".to_string(),
            entity: "A".to_string(),
        };
        assert!(err.to_string().contains("decay"));
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn test_model_error_classification() {
        assert!(Error::InvalidRule {
            rule: "r".into(),
            reason: "empty".into()
        }
        .is_model_error());
        assert!(Error::DuplicateName {
            kind: "entity",
            name: "A".into()
        }
        .is_model_error());
        assert!(!Error::NegativeRate {
            channel: "c".into(),
            rate: -1.0
        }
        .is_model_error());
        assert!(!Error::InvalidConfig("t_max".into()).is_model_error());
    }
}
