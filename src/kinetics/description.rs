//! Plain-data model description.
//!
//! Mirrors a declarative model script: entity names, parameter bindings,
//! initial conditions, rules with reactant/product lists (a repeated name is a
//! multiplicity) and observables. Converts into a [`Model`] through
//! [`ModelBuilder`], declaring sections in that order.

use serde::{Deserialize, Serialize};

use super::model::{Model, ModelBuilder};
use super::rule::{RateLaw, Rule};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialSpec {
    pub entity: String,
    pub parameter: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub reactants: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    pub rate: String,
    #[serde(default)]
    pub rate_law: RateLaw,
}

impl RuleSpec {
    pub fn to_rule(&self) -> Rule {
        let reactants: Vec<&str> = self.reactants.iter().map(String::as_str).collect();
        let products: Vec<&str> = self.products.iter().map(String::as_str).collect();
        let mut rule = Rule::new(&self.name, &reactants, &products, &self.rate);
        rule.rate_law = self.rate_law;
        rule
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservableSpec {
    pub name: String,
    pub members: Vec<String>,
}

/// A whole model as data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub entities: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub initials: Vec<InitialSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub observables: Vec<ObservableSpec>,
}

impl ModelDescription {
    /// Declarations in section order.
    pub fn to_builder(&self) -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        for name in &self.entities {
            builder = builder.entity(name);
        }
        for p in &self.parameters {
            builder = builder.parameter(&p.name, p.value);
        }
        for i in &self.initials {
            builder = builder.initial(&i.entity, &i.parameter);
        }
        for r in &self.rules {
            builder = builder.rule(r.to_rule());
        }
        for o in &self.observables {
            let members: Vec<&str> = o.members.iter().map(String::as_str).collect();
            builder = builder.observable(&o.name, &members);
        }
        builder
    }

    pub fn build(&self) -> Result<Model> {
        self.to_builder().build()
    }
}

impl TryFrom<&ModelDescription> for Model {
    type Error = Error;

    fn try_from(description: &ModelDescription) -> Result<Self> {
        description.build()
    }
}
