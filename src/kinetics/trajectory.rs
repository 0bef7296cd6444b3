//! Simulation output: time-ordered observable samples.
//!
//! Serialized layout is a plain list of `{time, values}` records plus the
//! termination marker and any numerical warnings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest sample grid a single run may request.
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// Observable values at one time point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub values: BTreeMap<String, f64>,
}

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Simulation time reached the configured horizon.
    Horizon,
    /// Total propensity hit zero; the state is frozen from `time` on.
    Absorbed { time: f64 },
    /// Cancelled at an event/step boundary; samples after `time` are missing.
    Cancelled { time: f64 },
}

/// Deterministic-mode overshoot below zero that was clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericalWarning {
    pub time: f64,
    pub entity: String,
    /// Value before clamping.
    pub value: f64,
}

impl std::fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "t={:.6}: '{}' overshot to {:.3e}, clamped to 0",
            self.time, self.entity, self.value
        )
    }
}

/// Output of a single run. Owned by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub samples: Vec<Sample>,
    pub termination: Termination,
    #[serde(default)]
    pub warnings: Vec<NumericalWarning>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when the run was cut short by cancellation.
    pub fn is_truncated(&self) -> bool {
        matches!(self.termination, Termination::Cancelled { .. })
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Values of one observable across all samples, or `None` if unknown.
    pub fn series(&self, observable: &str) -> Option<Vec<f64>> {
        self.samples
            .iter()
            .map(|s| s.values.get(observable).copied())
            .collect()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Stepwise-constant lookup: value from the latest sample at or before `t`.
    ///
    /// Past the final sample the value is only defined for absorbed runs.
    pub fn value_at(&self, observable: &str, t: f64) -> Option<f64> {
        let idx = self.samples.partition_point(|s| s.time <= t);
        if idx == 0 {
            return None;
        }
        let sample = &self.samples[idx - 1];
        let past_end = idx == self.samples.len() && sample.time < t;
        if past_end && !matches!(self.termination, Termination::Absorbed { .. }) {
            return None;
        }
        sample.values.get(observable).copied()
    }
}

/// Reject grids that would hold more than [`MAX_GRID_POINTS`] samples.
pub(crate) fn check_grid_size(t_max: f64, interval: f64) -> Result<()> {
    let points = (t_max / interval).floor() + 2.0;
    if points > MAX_GRID_POINTS as f64 {
        return Err(Error::InvalidConfig(format!(
            "t_max {t_max} with sample_interval {interval} needs {points:.0} grid points, \
             limit is {MAX_GRID_POINTS}"
        )));
    }
    Ok(())
}

/// Sample times `0, dt, 2dt, …` up to and including `t_max`.
pub(crate) fn sample_grid(t_max: f64, interval: f64) -> Vec<f64> {
    let n = (t_max / interval + 1e-9).floor() as usize;
    let mut grid: Vec<f64> = (0..=n)
        .map(|k| (k as f64 * interval).min(t_max))
        .collect();
    if let Some(&last) = grid.last() {
        if t_max - last > interval * 1e-9 {
            grid.push(t_max);
        }
    }
    grid
}
