//! Observables: named sums over entity populations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::registry::{EntityId, Registry};
use super::state::{Count, State};
use crate::error::Result;

/// A named aggregate over a set of entity types. Read-only view over state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observable {
    pub name: String,
    /// Member entities, deduplicated and sorted.
    pub members: Vec<EntityId>,
}

impl Observable {
    /// Resolve member names against the registry.
    pub fn resolve(registry: &Registry, name: &str, members: &[String]) -> Result<Self> {
        let context = format!("observable '{name}'");
        let mut ids = members
            .iter()
            .map(|m| registry.resolve_entity(&context, m))
            .collect::<Result<Vec<_>>>()?;
        ids.sort_unstable();
        ids.dedup();
        Ok(Self {
            name: name.to_string(),
            members: ids,
        })
    }

    /// Current value in `state`.
    pub fn value<C: Count>(&self, state: &State<C>) -> f64 {
        self.members.iter().map(|&id| state.get(id).as_f64()).sum()
    }
}

/// Evaluate every observable on `state`.
pub fn evaluate_observables<C: Count>(
    state: &State<C>,
    observables: &[Observable],
) -> BTreeMap<String, f64> {
    observables
        .iter()
        .map(|o| (o.name.clone(), o.value(state)))
        .collect()
}
