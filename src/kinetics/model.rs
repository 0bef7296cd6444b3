//! Model assembly: ordered declarations replayed into an immutable model.
//!
//! A [`ModelBuilder`] records entity, parameter, initial-condition, rule and
//! observable declarations in the order they are made. [`ModelBuilder::build`]
//! replays them against a fresh [`Registry`], so a reference to a name that is
//! only declared later fails exactly like a reference to an undeclared name.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use super::ensemble::{simulate_ensemble, EnsembleConfig, EnsembleResult};
use super::gillespie::{simulate_stochastic, StochasticConfig};
use super::network::{build_network, Network};
use super::observable::{evaluate_observables, Observable};
use super::ode::{simulate_deterministic, DeterministicConfig};
use super::registry::{EntityId, Parameter, Registry};
use super::rule::{Rule, RuleSet};
use super::state::{AmountState, Count, CountState, State};
use super::trajectory::Trajectory;
use crate::error::{Error, Result};

/// Which driver advances the state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimulationMethod {
    /// Exact discrete-event simulation (Gillespie direct method).
    #[default]
    Stochastic,
    /// Mean-field ODE integration.
    Deterministic,
}

impl FromStr for SimulationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ssa" | "stochastic" | "gillespie" => Ok(Self::Stochastic),
            "ode" | "deterministic" => Ok(Self::Deterministic),
            other => Err(Error::InvalidConfig(format!(
                "unknown simulation method '{other}' (expected 'ssa' or 'ode')"
            ))),
        }
    }
}

impl fmt::Display for SimulationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stochastic => write!(f, "ssa"),
            Self::Deterministic => write!(f, "ode"),
        }
    }
}

#[derive(Clone, Debug)]
enum Declaration {
    Entity(String),
    Parameter(String, f64),
    Initial { entity: String, parameter: String },
    Rule(Rule),
    Observable { name: String, members: Vec<String> },
}

/// Accumulates declarations; nothing is validated until [`build`](Self::build).
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    declarations: Vec<Declaration>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, name: &str) -> Self {
        self.declarations.push(Declaration::Entity(name.to_string()));
        self
    }

    pub fn parameter(mut self, name: &str, value: f64) -> Self {
        self.declarations
            .push(Declaration::Parameter(name.to_string(), value));
        self
    }

    /// Bind the starting population of `entity` to `parameter`.
    pub fn initial(mut self, entity: &str, parameter: &str) -> Self {
        self.declarations.push(Declaration::Initial {
            entity: entity.to_string(),
            parameter: parameter.to_string(),
        });
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.declarations.push(Declaration::Rule(rule));
        self
    }

    pub fn observable(mut self, name: &str, members: &[&str]) -> Self {
        self.declarations.push(Declaration::Observable {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    /// Replay every declaration and generate the reaction network.
    pub fn build(self) -> Result<Model> {
        let mut registry = Registry::new();
        let mut initials: Vec<(EntityId, Parameter)> = Vec::new();
        let mut rules = Vec::new();
        let mut rule_names = HashSet::new();
        let mut observables: Vec<Observable> = Vec::new();

        for declaration in self.declarations {
            match declaration {
                Declaration::Entity(name) => {
                    registry.add_entity(&name)?;
                }
                Declaration::Parameter(name, value) => {
                    registry.add_parameter(&name, value)?;
                }
                Declaration::Initial { entity, parameter } => {
                    let context = format!("initial condition of '{entity}'");
                    let id = registry.resolve_entity(&context, &entity)?;
                    let param = registry.resolve_parameter(&context, &parameter)?.clone();
                    param.as_amount()?;
                    if initials.iter().any(|(e, _)| *e == id) {
                        return Err(Error::DuplicateName {
                            kind: "initial condition",
                            name: entity,
                        });
                    }
                    initials.push((id, param));
                }
                Declaration::Rule(rule) => {
                    if !rule_names.insert(rule.name.clone()) {
                        return Err(Error::DuplicateName {
                            kind: "rule",
                            name: rule.name,
                        });
                    }
                    check_references(&registry, &rule)?;
                    rules.push(rule);
                }
                Declaration::Observable { name, members } => {
                    if observables.iter().any(|o| o.name == name) {
                        return Err(Error::DuplicateName {
                            kind: "observable",
                            name,
                        });
                    }
                    observables.push(Observable::resolve(&registry, &name, &members)?);
                }
            }
        }

        let network = build_network(&registry, &RuleSet::new(rules))?;
        debug!(
            entities = registry.n_entities(),
            parameters = registry.parameters().len(),
            observables = observables.len(),
            "model built"
        );

        Ok(Model {
            registry,
            network,
            observables,
            initials,
        })
    }
}

/// Entity and rate references of `rule` must already be declared.
fn check_references(registry: &Registry, rule: &Rule) -> Result<()> {
    let context = format!("rule '{}'", rule.name);
    for entity in rule.entities() {
        registry.resolve_entity(&context, entity)?;
    }
    registry.resolve_parameter(&context, &rule.rate)?;
    Ok(())
}

/// A validated model: registry, generated network, observables and initial
/// conditions. Immutable; safe to share across threads.
#[derive(Clone, Debug)]
pub struct Model {
    registry: Registry,
    network: Network,
    observables: Vec<Observable>,
    initials: Vec<(EntityId, Parameter)>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Integer starting populations; entities without an initial condition
    /// start at 0.
    pub fn initial_counts(&self) -> Result<CountState> {
        let mut state = CountState::zeros(self.registry.n_entities());
        for (id, param) in &self.initials {
            let count = param.as_count().map_err(|e| {
                warn!(parameter = %param.name, value = param.value, "fractional initial count");
                e
            })?;
            state.counts_mut()[*id] = count;
        }
        Ok(state)
    }

    /// Real-valued starting amounts for deterministic runs.
    pub fn initial_amounts(&self) -> Result<AmountState> {
        let mut state = AmountState::zeros(self.registry.n_entities());
        for (id, param) in &self.initials {
            state.counts_mut()[*id] = param.as_amount()?;
        }
        Ok(state)
    }

    /// Observable values of an arbitrary state.
    pub fn observe<C: Count>(&self, state: &State<C>) -> BTreeMap<String, f64> {
        evaluate_observables(state, &self.observables)
    }

    /// Run one simulation with either driver.
    ///
    /// Deterministic runs need a `sample_interval`; stochastic runs without
    /// one record every event.
    pub fn simulate(
        &self,
        method: SimulationMethod,
        t_max: f64,
        sample_interval: Option<f64>,
        seed: u64,
    ) -> Result<Trajectory> {
        match method {
            SimulationMethod::Stochastic => self.simulate_stochastic(&StochasticConfig {
                t_max,
                sample_interval,
                seed,
            }),
            SimulationMethod::Deterministic => {
                let sample_interval = sample_interval.ok_or_else(|| {
                    Error::InvalidConfig("deterministic runs need a sample_interval".into())
                })?;
                self.simulate_deterministic(&DeterministicConfig {
                    t_max,
                    sample_interval,
                    ..DeterministicConfig::default()
                })
            }
        }
    }

    pub fn simulate_stochastic(&self, config: &StochasticConfig) -> Result<Trajectory> {
        let initial = self.initial_counts()?;
        simulate_stochastic(&self.network, &self.observables, &initial, config)
    }

    pub fn simulate_deterministic(&self, config: &DeterministicConfig) -> Result<Trajectory> {
        let initial = self.initial_amounts()?;
        simulate_deterministic(&self.network, &self.observables, &initial, config)
    }

    pub fn simulate_ensemble(&self, config: &EnsembleConfig) -> Result<EnsembleResult> {
        let initial = self.initial_counts()?;
        simulate_ensemble(&self.network, &self.observables, &initial, config)
    }
}
