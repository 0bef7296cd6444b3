//! Gillespie direct-method simulator for the reaction-channel CTMC.
//!
//! Each step:
//! 1. Compute propensities a_j(x) and their total R
//! 2. R == 0 → absorbing state, stop
//! 3. Draw waiting time τ ~ Exp(R)
//! 4. Pick channel j with probability a_j / R
//! 5. Apply the channel's stoichiometric delta atomically
//!
//! The run is strictly sequential. Parallelism lives one level up, across
//! independent realizations (see [`ensemble`](super::ensemble)).

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, trace};

use super::network::Network;
use super::observable::{evaluate_observables, Observable};
use super::propensity::propensities;
use super::state::CountState;
use super::trajectory::{check_grid_size, sample_grid, Sample, Termination, Trajectory};
use crate::error::{Error, Result};

/// Configuration for stochastic simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct StochasticConfig {
    /// Simulation horizon.
    pub t_max: f64,
    /// Grid spacing for sampling. `None` records every event.
    pub sample_interval: Option<f64>,
    /// RNG seed.
    pub seed: u64,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            t_max: 100.0,
            sample_interval: None,
            seed: 0,
        }
    }
}

impl StochasticConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.t_max.is_finite() || self.t_max < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "t_max must be finite and >= 0, got {}",
                self.t_max
            )));
        }
        if let Some(dt) = self.sample_interval {
            if !dt.is_finite() || dt <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "sample_interval must be finite and > 0, got {dt}"
                )));
            }
            check_grid_size(self.t_max, dt)?;
        }
        Ok(())
    }
}

/// Gillespie simulator bound to one network and its observables.
pub struct GillespieSimulator<'a> {
    network: &'a Network,
    observables: &'a [Observable],
    config: StochasticConfig,
}

impl<'a> GillespieSimulator<'a> {
    pub fn new(
        network: &'a Network,
        observables: &'a [Observable],
        config: StochasticConfig,
    ) -> Self {
        Self {
            network,
            observables,
            config,
        }
    }

    pub fn config(&self) -> &StochasticConfig {
        &self.config
    }

    /// Run one realization with the caller's RNG stream.
    pub fn simulate(&self, initial: &CountState, rng: &mut StdRng) -> Result<Trajectory> {
        self.run(initial, rng, None)
    }

    /// Like [`simulate`](Self::simulate), but polls `cancel` at every event
    /// boundary and returns the partial trajectory once it is set.
    pub fn simulate_with_cancel(
        &self,
        initial: &CountState,
        rng: &mut StdRng,
        cancel: &AtomicBool,
    ) -> Result<Trajectory> {
        self.run(initial, rng, Some(cancel))
    }

    fn run(
        &self,
        initial: &CountState,
        rng: &mut StdRng,
        cancel: Option<&AtomicBool>,
    ) -> Result<Trajectory> {
        self.config.validate()?;
        if initial.len() != self.network.n_entities() {
            return Err(Error::InvalidConfig(format!(
                "initial state has {} entries, network has {} entities",
                initial.len(),
                self.network.n_entities()
            )));
        }

        let t_max = self.config.t_max;
        let grid = self.config.sample_interval.map(|dt| sample_grid(t_max, dt));
        let mut next_sample = 0usize;

        let mut state = initial.clone();
        let mut t = 0.0;
        let mut samples = Vec::new();
        let mut rates = Vec::with_capacity(self.network.n_channels());
        let mut n_events: u64 = 0;

        if grid.is_none() {
            samples.push(self.sample(0.0, &state));
        }

        let termination = loop {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                self.fill_grid(&grid, &mut next_sample, |g| g <= t, &state, &mut samples);
                break Termination::Cancelled { time: t };
            }

            let total = propensities(self.network, &state, &mut rates)?;
            if total <= 0.0 {
                self.fill_grid(&grid, &mut next_sample, |g| g <= t, &state, &mut samples);
                break Termination::Absorbed { time: t };
            }

            // 1 - U lies in (0, 1], so the log is finite
            let u: f64 = rng.gen();
            let tau = -(1.0 - u).ln() / total;
            let t_next = t + tau;

            // grid points before the next event see the current state
            self.fill_grid(&grid, &mut next_sample, |g| g < t_next, &state, &mut samples);

            if t_next > t_max {
                if grid.is_none() && t < t_max {
                    samples.push(self.sample(t_max, &state));
                }
                break Termination::Horizon;
            }

            let selected = select_channel(&rates, rng.gen::<f64>() * total);
            self.fire(selected, &mut state)?;
            t = t_next;
            n_events += 1;
            trace!(t, channel = %self.network.channels()[selected].name, "event");

            if grid.is_none() {
                samples.push(self.sample(t, &state));
            }
        };

        info!(
            events = n_events,
            population = state.total(),
            ?termination,
            "stochastic run finished"
        );

        Ok(Trajectory {
            samples,
            termination,
            warnings: Vec::new(),
        })
    }

    /// Apply channel `idx` to `state`, all-or-nothing.
    fn fire(&self, idx: usize, state: &mut CountState) -> Result<()> {
        let channel = &self.network.channels()[idx];
        for &(entity, d) in &channel.delta {
            if d < 0 && state.get(entity) < d.unsigned_abs() {
                return Err(Error::NegativePopulation {
                    channel: channel.name.clone(),
                    entity: self.network.entity_name(entity).to_string(),
                });
            }
        }
        let counts = state.counts_mut();
        for &(entity, d) in &channel.delta {
            if d < 0 {
                counts[entity] -= d.unsigned_abs();
            } else {
                counts[entity] += d as u64;
            }
        }
        Ok(())
    }

    fn sample(&self, time: f64, state: &CountState) -> Sample {
        Sample {
            time,
            values: evaluate_observables(state, self.observables),
        }
    }

    fn fill_grid(
        &self,
        grid: &Option<Vec<f64>>,
        next: &mut usize,
        due: impl Fn(f64) -> bool,
        state: &CountState,
        samples: &mut Vec<Sample>,
    ) {
        let Some(grid) = grid else {
            return;
        };
        while *next < grid.len() && due(grid[*next]) {
            samples.push(self.sample(grid[*next], state));
            *next += 1;
        }
    }
}

/// Direct-method selection: first channel whose cumulative propensity
/// exceeds `r`, with `r` uniform in `[0, R)`.
fn select_channel(rates: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (j, &a) in rates.iter().enumerate() {
        cumulative += a;
        if r < cumulative {
            return j;
        }
    }
    // rounding pushed r past the last partial sum
    rates.iter().rposition(|&a| a > 0.0).unwrap_or(0)
}

/// Run one stochastic realization seeded from `config.seed`.
#[instrument(skip_all, fields(t_max = config.t_max, seed = config.seed))]
pub fn simulate_stochastic(
    network: &Network,
    observables: &[Observable],
    initial: &CountState,
    config: &StochasticConfig,
) -> Result<Trajectory> {
    debug!(channels = network.n_channels(), "starting stochastic run");
    let mut rng = StdRng::seed_from_u64(config.seed);
    GillespieSimulator::new(network, observables, config.clone()).simulate(initial, &mut rng)
}
