//! Parallel ensembles of stochastic realizations.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::gillespie::{GillespieSimulator, StochasticConfig};
use super::network::Network;
use super::observable::Observable;
use super::state::CountState;
use super::trajectory::{sample_grid, Trajectory};
use crate::error::{Error, Result};

/// Configuration for an ensemble of stochastic runs.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleConfig {
    /// Number of independent realizations.
    pub runs: usize,
    /// Run `i` is seeded with `base_seed + i` (wrapping).
    pub base_seed: u64,
    /// Per-run settings; its `seed` field is ignored.
    pub stochastic: StochasticConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            runs: 100,
            base_seed: 0,
            stochastic: StochasticConfig {
                sample_interval: Some(1.0),
                ..StochasticConfig::default()
            },
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(Error::InvalidConfig("ensemble needs at least one run".into()));
        }
        self.stochastic.validate()
    }

    /// Seed of run `index`.
    pub fn seed_for(&self, index: usize) -> u64 {
        self.base_seed.wrapping_add(index as u64)
    }
}

/// Outcome of every run, in run order.
#[derive(Clone, Debug)]
pub struct EnsembleResult {
    pub runs: Vec<Result<Trajectory>>,
    t_max: f64,
    sample_interval: Option<f64>,
    observables: Vec<String>,
}

/// Per-time mean and standard deviation over successful runs.
#[derive(Clone, Debug)]
pub struct EnsembleSummary {
    pub times: Vec<f64>,
    /// Column labels, sorted.
    pub observables: Vec<String>,
    /// Shape (times, observables).
    pub mean: Array2<f64>,
    /// Population standard deviation, same shape as `mean`.
    pub std_dev: Array2<f64>,
    pub n_runs: usize,
}

impl EnsembleSummary {
    /// Column of `mean` for one observable.
    pub fn mean_of(&self, observable: &str) -> Option<Vec<f64>> {
        let j = self.observables.iter().position(|o| o == observable)?;
        Some(self.mean.column(j).to_vec())
    }
}

impl EnsembleResult {
    pub fn successes(&self) -> impl Iterator<Item = &Trajectory> {
        self.runs.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn n_failed(&self) -> usize {
        self.runs.iter().filter(|r| r.is_err()).count()
    }

    /// Mean and standard deviation on the sampling grid.
    ///
    /// Absorbed runs contribute their final state after absorption. Cancelled
    /// runs only contribute up to the point where they stopped.
    pub fn summary(&self) -> Result<EnsembleSummary> {
        let dt = self.sample_interval.ok_or_else(|| {
            Error::InvalidConfig("ensemble summary requires a sample_interval".into())
        })?;
        let times = sample_grid(self.t_max, dt);
        let n_obs = self.observables.len();

        let mut sum = Array2::<f64>::zeros((times.len(), n_obs));
        let mut sum_sq = Array2::<f64>::zeros((times.len(), n_obs));
        let mut counts = Array2::<f64>::zeros((times.len(), n_obs));
        let mut n_runs = 0;

        for traj in self.successes() {
            n_runs += 1;
            for (i, &t) in times.iter().enumerate() {
                for (j, name) in self.observables.iter().enumerate() {
                    if let Some(v) = traj.value_at(name, t) {
                        sum[[i, j]] += v;
                        sum_sq[[i, j]] += v * v;
                        counts[[i, j]] += 1.0;
                    }
                }
            }
        }
        if n_runs == 0 {
            return Err(Error::InvalidConfig("no successful runs to summarize".into()));
        }

        let mut mean = Array2::<f64>::from_elem((times.len(), n_obs), f64::NAN);
        let mut std_dev = Array2::<f64>::from_elem((times.len(), n_obs), f64::NAN);
        for ((idx, &n), m) in counts.indexed_iter().zip(mean.iter_mut()) {
            if n > 0.0 {
                *m = sum[idx] / n;
            }
        }
        for ((idx, &n), s) in counts.indexed_iter().zip(std_dev.iter_mut()) {
            if n > 0.0 {
                let mu = sum[idx] / n;
                // guard against tiny negative variance from cancellation
                *s = (sum_sq[idx] / n - mu * mu).max(0.0).sqrt();
            }
        }

        Ok(EnsembleSummary {
            times,
            observables: self.observables.clone(),
            mean,
            std_dev,
            n_runs,
        })
    }
}

/// Run `config.runs` independent realizations in parallel.
///
/// The network and observables are shared read-only across workers; each run
/// owns its state and RNG stream.
#[instrument(skip_all, fields(runs = config.runs, base_seed = config.base_seed))]
pub fn simulate_ensemble(
    network: &Network,
    observables: &[Observable],
    initial: &CountState,
    config: &EnsembleConfig,
) -> Result<EnsembleResult> {
    config.validate()?;
    debug!(channels = network.n_channels(), "dispatching ensemble");

    let runs: Vec<Result<Trajectory>> = (0..config.runs)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_for(i);
            let run_config = StochasticConfig {
                seed,
                ..config.stochastic.clone()
            };
            let mut rng = StdRng::seed_from_u64(seed);
            GillespieSimulator::new(network, observables, run_config).simulate(initial, &mut rng)
        })
        .collect();

    let mut names: Vec<String> = observables.iter().map(|o| o.name.clone()).collect();
    names.sort();
    names.dedup();

    let result = EnsembleResult {
        runs,
        t_max: config.stochastic.t_max,
        sample_interval: config.stochastic.sample_interval,
        observables: names,
    };
    let failed = result.n_failed();
    if failed > 0 {
        warn!(failed, "some ensemble runs failed");
    }
    info!(runs = config.runs, failed, "ensemble finished");
    Ok(result)
}
