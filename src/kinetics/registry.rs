//! Entity types and named parameters.
//!
//! The registry is the name → value resolver shared by network generation,
//! initial conditions and observables. It is assembled by
//! [`ModelBuilder`](super::model::ModelBuilder) and is immutable afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Index of an entity type inside a [`Registry`] (declaration order).
pub type EntityId = usize;

/// A named population class (e.g. a cell type). Carries no internal state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    name: String,
}

impl EntityType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Immutable `(name, value)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

impl Parameter {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    /// Value as a rate constant: finite and non-negative.
    pub fn as_rate(&self) -> Result<f64> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(Error::InvalidParameter {
                name: self.name.clone(),
                reason: format!("rate constant must be finite and >= 0, got {}", self.value),
            });
        }
        Ok(self.value)
    }

    /// Value as an initial amount: finite and non-negative.
    pub fn as_amount(&self) -> Result<f64> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(Error::InvalidParameter {
                name: self.name.clone(),
                reason: format!("initial amount must be finite and >= 0, got {}", self.value),
            });
        }
        Ok(self.value)
    }

    /// Value as an integer molecule/cell count.
    pub fn as_count(&self) -> Result<u64> {
        let amount = self.as_amount()?;
        if amount.fract() != 0.0 || amount > u64::MAX as f64 {
            return Err(Error::InvalidParameter {
                name: self.name.clone(),
                reason: format!("initial count must be a whole number, got {amount}"),
            });
        }
        Ok(amount as u64)
    }
}

/// Declared entity types and parameters, indexed by name.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entities: Vec<EntityType>,
    entity_index: HashMap<String, EntityId>,
    parameters: Vec<Parameter>,
    parameter_index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type. Names are unique.
    pub fn add_entity(&mut self, name: &str) -> Result<EntityId> {
        if self.entity_index.contains_key(name) {
            return Err(Error::DuplicateName {
                kind: "entity",
                name: name.to_string(),
            });
        }
        let id = self.entities.len();
        self.entities.push(EntityType::new(name));
        self.entity_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a parameter. Values must be finite; role-specific checks
    /// (sign, integrality) happen where the parameter is bound.
    pub fn add_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        if self.parameter_index.contains_key(name) {
            return Err(Error::DuplicateName {
                kind: "parameter",
                name: name.to_string(),
            });
        }
        if !value.is_finite() {
            return Err(Error::InvalidParameter {
                name: name.to_string(),
                reason: format!("value must be finite, got {value}"),
            });
        }
        self.parameter_index
            .insert(name.to_string(), self.parameters.len());
        self.parameters.push(Parameter::new(name, value));
        Ok(())
    }

    #[inline]
    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.entity_index.get(name).copied()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameter_index.get(name).map(|&i| &self.parameters[i])
    }

    /// Resolve an entity name, attributing failure to `context`.
    pub fn resolve_entity(&self, context: &str, name: &str) -> Result<EntityId> {
        self.entity_id(name).ok_or_else(|| Error::UnknownEntity {
            context: context.to_string(),
            entity: name.to_string(),
        })
    }

    /// Resolve a parameter name, attributing failure to `context`.
    pub fn resolve_parameter(&self, context: &str, name: &str) -> Result<&Parameter> {
        self.parameter(name).ok_or_else(|| Error::UnknownParameter {
            context: context.to_string(),
            parameter: name.to_string(),
        })
    }

    pub fn entities(&self) -> &[EntityType] {
        &self.entities
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn n_entities(&self) -> usize {
        self.entities.len()
    }

    /// Entity names in declaration (index) order.
    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_follow_declaration_order() {
        let mut registry = Registry::new();
        assert_eq!(registry.add_entity("A").unwrap(), 0);
        assert_eq!(registry.add_entity("B").unwrap(), 1);
        assert_eq!(registry.entity_id("B"), Some(1));
        assert_eq!(registry.entity_id("C"), None);
        assert_eq!(registry.entity_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut registry = Registry::new();
        registry.add_entity("A").unwrap();
        assert!(matches!(
            registry.add_entity("A"),
            Err(Error::DuplicateName { kind: "entity", .. })
        ));
        registry.add_parameter("k", 1.0).unwrap();
        assert!(matches!(
            registry.add_parameter("k", 2.0),
            Err(Error::DuplicateName { kind: "parameter", .. })
        ));
    }

    #[test]
    fn test_non_finite_parameter_rejected() {
        let mut registry = Registry::new();
        assert!(registry.add_parameter("k", f64::NAN).is_err());
        assert!(registry.add_parameter("k", f64::INFINITY).is_err());
        assert!(registry.parameter("k").is_none());
    }

    #[test]
    fn test_parameter_roles() {
        assert_eq!(Parameter::new("k", 0.5).as_rate().unwrap(), 0.5);
        assert!(Parameter::new("k", -0.1).as_rate().is_err());
        assert_eq!(Parameter::new("n", 200.0).as_count().unwrap(), 200);
        assert!(Parameter::new("n", 2.5).as_count().is_err());
        assert_eq!(Parameter::new("n", 2.5).as_amount().unwrap(), 2.5);
        assert!(Parameter::new("n", -1.0).as_amount().is_err());
    }

    #[test]
    fn test_resolution_errors_carry_context() {
        let registry = Registry::new();
        let err = registry.resolve_entity("rule 'r1'", "X").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownEntity {
                context: "rule 'r1'".to_string(),
                entity: "X".to_string()
            }
        );
        let err = registry.resolve_parameter("rule 'r1'", "k").unwrap_err();
        assert!(matches!(err, Error::UnknownParameter { .. }));
    }
}
