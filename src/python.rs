//! Python bindings (`python` feature).

use numpy::{PyArray1, PyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3::wrap_pyfunction;

use crate::error::Error;
use crate::kinetics::{
    EnsembleConfig, InitialSpec, ModelDescription, ObservableSpec, ParameterSpec, RuleSpec,
    SimulationMethod, StochasticConfig, Termination,
};

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Assemble a model description from Python containers.
///
/// Dict arguments are read in insertion order, which is also declaration order.
fn description(
    entities: Vec<String>,
    parameters: &PyDict,
    initials: &PyDict,
    rules: Vec<(String, Vec<String>, Vec<String>, String)>,
    observables: &PyDict,
) -> PyResult<ModelDescription> {
    let parameters = parameters
        .iter()
        .map(|(k, v)| {
            Ok(ParameterSpec {
                name: k.extract()?,
                value: v.extract()?,
            })
        })
        .collect::<PyResult<Vec<_>>>()?;
    let initials = initials
        .iter()
        .map(|(k, v)| {
            Ok(InitialSpec {
                entity: k.extract()?,
                parameter: v.extract()?,
            })
        })
        .collect::<PyResult<Vec<_>>>()?;
    let rules = rules
        .into_iter()
        .map(|(name, reactants, products, rate)| RuleSpec {
            name,
            reactants,
            products,
            rate,
            rate_law: Default::default(),
        })
        .collect();
    let observables = observables
        .iter()
        .map(|(k, v)| {
            Ok(ObservableSpec {
                name: k.extract()?,
                members: v.extract()?,
            })
        })
        .collect::<PyResult<Vec<_>>>()?;

    Ok(ModelDescription {
        entities,
        parameters,
        initials,
        rules,
        observables,
    })
}

/// Run one simulation of a rule-based model.
///
/// # Arguments
/// * `entities` - Entity type names
/// * `parameters` - Dict of parameter name -> value
/// * `initials` - Dict of entity name -> initial-count parameter name
/// * `rules` - List of (name, reactants, products, rate parameter) tuples
/// * `observables` - Dict of observable name -> list of member entities
/// * `t_max` - Simulation horizon
/// * `sample_interval` - Grid spacing (None records every event; ssa only)
/// * `method` - "ssa" or "ode"
/// * `seed` - RNG seed (ssa only)
///
/// # Returns
/// * Dict with "time", one array per observable, and "termination"
#[pyfunction]
#[pyo3(signature = (entities, parameters, initials, rules, observables, t_max, sample_interval=None, method="ssa", seed=0))]
fn simulate<'py>(
    py: Python<'py>,
    entities: Vec<String>,
    parameters: &PyDict,
    initials: &PyDict,
    rules: Vec<(String, Vec<String>, Vec<String>, String)>,
    observables: &PyDict,
    t_max: f64,
    sample_interval: Option<f64>,
    method: &str,
    seed: u64,
) -> PyResult<&'py PyDict> {
    let method: SimulationMethod = method.parse().map_err(to_py_err)?;
    let model = description(entities, parameters, initials, rules, observables)?
        .build()
        .map_err(to_py_err)?;

    let trajectory = py
        .allow_threads(|| model.simulate(method, t_max, sample_interval, seed))
        .map_err(to_py_err)?;

    let dict = PyDict::new(py);
    dict.set_item("time", PyArray1::from_vec(py, trajectory.times()))?;
    for obs in model.observables() {
        let series = trajectory.series(&obs.name).unwrap_or_default();
        dict.set_item(&obs.name, PyArray1::from_vec(py, series))?;
    }
    let termination = match trajectory.termination {
        Termination::Horizon => "horizon",
        Termination::Absorbed { .. } => "absorbed",
        Termination::Cancelled { .. } => "cancelled",
    };
    dict.set_item("termination", termination)?;
    Ok(dict)
}

/// Mean and standard deviation over parallel stochastic realizations.
///
/// # Returns
/// * Tuple of (times, observable names, mean, std), with 2-D arrays shaped
///   (n_times, n_observables)
#[pyfunction]
#[pyo3(signature = (entities, parameters, initials, rules, observables, t_max, sample_interval, runs, base_seed=0))]
fn ensemble_mean<'py>(
    py: Python<'py>,
    entities: Vec<String>,
    parameters: &PyDict,
    initials: &PyDict,
    rules: Vec<(String, Vec<String>, Vec<String>, String)>,
    observables: &PyDict,
    t_max: f64,
    sample_interval: f64,
    runs: usize,
    base_seed: u64,
) -> PyResult<(
    &'py PyArray1<f64>,
    Vec<String>,
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
)> {
    let model = description(entities, parameters, initials, rules, observables)?
        .build()
        .map_err(to_py_err)?;
    let config = EnsembleConfig {
        runs,
        base_seed,
        stochastic: StochasticConfig {
            t_max,
            sample_interval: Some(sample_interval),
            seed: base_seed,
        },
    };

    let summary = py
        .allow_threads(|| model.simulate_ensemble(&config)?.summary())
        .map_err(to_py_err)?;

    Ok((
        PyArray1::from_vec(py, summary.times),
        summary.observables,
        PyArray2::from_owned_array(py, summary.mean),
        PyArray2::from_owned_array(py, summary.std_dev),
    ))
}

#[pymodule]
fn rulesim(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate, m)?)?;
    m.add_function(wrap_pyfunction!(ensemble_mean, m)?)?;
    Ok(())
}
