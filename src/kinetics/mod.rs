//! Rule-based mass-action kinetics.
//!
//! This module provides:
//! - Registry: named entity types and parameters
//! - Rule / RuleSet: declarative transformations
//! - Network: reaction channels generated from rules
//! - Propensity evaluation (stochastic) and flux evaluation (ODE)
//! - GillespieSimulator: exact stochastic simulation
//! - OdeSimulator: adaptive mean-field integration
//! - Parallel ensembles with mean/std summaries
//! - ModelBuilder / ModelDescription: model assembly from declarations or data

pub mod registry;
pub mod rule;
pub mod network;
pub mod propensity;
pub mod state;
pub mod observable;
pub mod trajectory;
pub mod gillespie;
pub mod ode;
pub mod ensemble;
pub mod model;
pub mod description;

pub use registry::{EntityId, EntityType, Parameter, Registry};
pub use rule::{Multiset, RateLaw, Rule, RuleSet};
pub use network::{build_network, Network, ReactionChannel};
pub use propensity::{binomial, flux, propensities, propensity};
pub use state::{AmountState, Count, CountState, State};
pub use observable::{evaluate_observables, Observable};
pub use trajectory::{NumericalWarning, Sample, Termination, Trajectory};
pub use gillespie::{simulate_stochastic, GillespieSimulator, StochasticConfig};
pub use ode::{simulate_deterministic, DeterministicConfig, OdeSimulator};
pub use ensemble::{simulate_ensemble, EnsembleConfig, EnsembleResult, EnsembleSummary};
pub use model::{Model, ModelBuilder, SimulationMethod};
pub use description::{InitialSpec, ModelDescription, ObservableSpec, ParameterSpec, RuleSpec};
