//! Rule-based kinetic simulation.
//!
//! Entity types, rate parameters and transformation rules are expanded into a
//! reaction network, which is then simulated either exactly (Gillespie direct
//! method) or in the mean-field limit (adaptive ODE integration). Parallel
//! ensembles of stochastic runs are driven with Rayon.
//!
//! ```
//! use rulesim::{Model, Rule, SimulationMethod};
//!
//! let model = Model::builder()
//!     .entity("Stem")
//!     .parameter("Stem_0", 20.0)
//!     .parameter("k_div", 0.1)
//!     .initial("Stem", "Stem_0")
//!     .rule(Rule::new("division", &["Stem"], &["Stem", "Stem"], "k_div"))
//!     .observable("Stem", &["Stem"])
//!     .build()?;
//!
//! let trajectory = model.simulate(SimulationMethod::Stochastic, 10.0, Some(1.0), 42)?;
//! assert_eq!(trajectory.times().len(), 11);
//! # Ok::<(), rulesim::Error>(())
//! ```

pub mod error;
pub mod kinetics;
pub mod models;

#[cfg(feature = "python")]
mod python;

pub use error::{Error, Result};
pub use kinetics::{
    build_network, evaluate_observables, simulate_deterministic, simulate_ensemble,
    simulate_stochastic, AmountState, CountState, DeterministicConfig, EnsembleConfig,
    EnsembleResult, EnsembleSummary, Model, ModelBuilder, ModelDescription, Network,
    NumericalWarning, Observable, ReactionChannel, Registry, Rule, RuleSet, Sample,
    SimulationMethod, StochasticConfig, Termination, Trajectory,
};
