//! Deterministic mass-action integration.
//!
//! Right-hand side:
//!     dy_i/dt = Σ_c (products_c,i − reactants_c,i) × v_c(y)
//!
//! Integrated with an adaptive Dormand–Prince 5(4) stepper, one segment per
//! sample interval. Pure mass action with non-negative constants keeps the
//! exact solution non-negative; solver overshoot below zero at a sample point
//! is clamped, logged and recorded as a [`NumericalWarning`].

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DVector;
use ode_solvers::dopri5::Dopri5;
use ode_solvers::System;
use tracing::{debug, info, instrument, warn};

use super::network::Network;
use super::observable::{evaluate_observables, Observable};
use super::propensity::{flux, mass_action_flux};
use super::state::AmountState;
use super::trajectory::{
    check_grid_size, sample_grid, NumericalWarning, Sample, Termination, Trajectory,
};
use crate::error::{Error, Result};

type Vector = DVector<f64>;

/// Configuration for deterministic simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct DeterministicConfig {
    /// Integration horizon.
    pub t_max: f64,
    /// Spacing of reported samples.
    pub sample_interval: f64,
    /// Relative tolerance of the adaptive stepper.
    pub rtol: f64,
    /// Absolute tolerance of the adaptive stepper.
    pub atol: f64,
}

impl Default for DeterministicConfig {
    fn default() -> Self {
        Self {
            t_max: 100.0,
            sample_interval: 1.0,
            rtol: 1e-6,
            atol: 1e-9,
        }
    }
}

impl DeterministicConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.t_max.is_finite() || self.t_max < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "t_max must be finite and >= 0, got {}",
                self.t_max
            )));
        }
        if !self.sample_interval.is_finite() || self.sample_interval <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_interval must be finite and > 0, got {}",
                self.sample_interval
            )));
        }
        check_grid_size(self.t_max, self.sample_interval)?;
        for (name, tol) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and > 0, got {tol}"
                )));
            }
        }
        Ok(())
    }
}

/// Mass-action vector field over a network.
struct MassActionSystem<'a> {
    network: &'a Network,
}

impl System<f64, Vector> for MassActionSystem<'_> {
    fn system(&self, _t: f64, y: &Vector, dy: &mut Vector) {
        dy.fill(0.0);
        let y = y.as_slice();
        for channel in self.network.channels() {
            let v = mass_action_flux(channel, y);
            if v == 0.0 {
                continue;
            }
            for &(entity, d) in &channel.delta {
                dy[entity] += d as f64 * v;
            }
        }
    }
}

/// Deterministic simulator bound to one network and its observables.
pub struct OdeSimulator<'a> {
    network: &'a Network,
    observables: &'a [Observable],
    config: DeterministicConfig,
}

impl<'a> OdeSimulator<'a> {
    pub fn new(
        network: &'a Network,
        observables: &'a [Observable],
        config: DeterministicConfig,
    ) -> Self {
        Self {
            network,
            observables,
            config,
        }
    }

    pub fn simulate(&self, initial: &AmountState) -> Result<Trajectory> {
        self.run(initial, None)
    }

    /// Polls `cancel` between sample segments.
    pub fn simulate_with_cancel(
        &self,
        initial: &AmountState,
        cancel: &AtomicBool,
    ) -> Result<Trajectory> {
        self.run(initial, Some(cancel))
    }

    fn run(&self, initial: &AmountState, cancel: Option<&AtomicBool>) -> Result<Trajectory> {
        self.config.validate()?;
        if initial.len() != self.network.n_entities() {
            return Err(Error::InvalidConfig(format!(
                "initial state has {} entries, network has {} entities",
                initial.len(),
                self.network.n_entities()
            )));
        }
        if let Some(i) = initial.counts().iter().position(|&y| !y.is_finite() || y < 0.0) {
            return Err(Error::InvalidConfig(format!(
                "initial amount of '{}' must be finite and >= 0",
                self.network.entity_name(i)
            )));
        }

        let grid = sample_grid(self.config.t_max, self.config.sample_interval);
        let mut warnings = Vec::new();
        let mut y = initial.clone();
        let mut samples = vec![self.sample(grid[0], &y)];
        let mut total_steps = 0u32;

        // no channel carries flux, so the initial state is a fixed point
        let absorbed = self.total_flux(initial.counts())? == 0.0;
        let (mut termination, segments) = if absorbed {
            (Termination::Absorbed { time: grid[0] }, &grid[..1])
        } else {
            (Termination::Horizon, &grid[..])
        };

        for window in segments.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                termination = Termination::Cancelled { time: t0 };
                break;
            }

            let (y1, steps) = self.integrate_segment(&y, t0, t1)?;
            total_steps += steps;
            y = self.clamp(y1, t1, &mut warnings);
            samples.push(self.sample(t1, &y));
        }

        info!(
            samples = samples.len(),
            steps = total_steps,
            warnings = warnings.len(),
            ?termination,
            "deterministic run finished"
        );

        Ok(Trajectory {
            samples,
            termination,
            warnings,
        })
    }

    fn total_flux(&self, y: &[f64]) -> Result<f64> {
        self.network
            .channels()
            .iter()
            .try_fold(0.0, |acc, channel| Ok(acc + flux(channel, y)?))
    }

    /// Integrate from `t0` to `t1`, returning the end state and accepted steps.
    fn integrate_segment(&self, y: &AmountState, t0: f64, t1: f64) -> Result<(Vec<f64>, u32)> {
        let system = MassActionSystem {
            network: self.network,
        };
        let y0 = Vector::from_column_slice(y.counts());
        // dx = 0 reports every accepted step; the last one lands on t1
        let mut stepper = Dopri5::new(system, t0, t1, 0.0, y0, self.config.rtol, self.config.atol);
        let stats = stepper.integrate().map_err(|e| Error::Integration {
            time: t0,
            message: e.to_string(),
        })?;
        let end = stepper.y_out().last().ok_or_else(|| Error::Integration {
            time: t0,
            message: "solver produced no output".to_string(),
        })?;
        Ok((end.iter().copied().collect(), stats.accepted_steps))
    }

    fn clamp(&self, mut y: Vec<f64>, t: f64, warnings: &mut Vec<NumericalWarning>) -> AmountState {
        for (i, yi) in y.iter_mut().enumerate() {
            if *yi < 0.0 {
                let warning = NumericalWarning {
                    time: t,
                    entity: self.network.entity_name(i).to_string(),
                    value: *yi,
                };
                warn!(%warning, "negative amount clamped");
                warnings.push(warning);
                *yi = 0.0;
            }
        }
        AmountState::new(y)
    }

    fn sample(&self, time: f64, state: &AmountState) -> Sample {
        Sample {
            time,
            values: evaluate_observables(state, self.observables),
        }
    }
}

/// Integrate the mean-field equations to `config.t_max`.
#[instrument(skip_all, fields(t_max = config.t_max, dt = config.sample_interval))]
pub fn simulate_deterministic(
    network: &Network,
    observables: &[Observable],
    initial: &AmountState,
    config: &DeterministicConfig,
) -> Result<Trajectory> {
    debug!(channels = network.n_channels(), "starting deterministic run");
    OdeSimulator::new(network, observables, config.clone()).simulate(initial)
}
