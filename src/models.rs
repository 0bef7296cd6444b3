//! Reference models.

use crate::error::Result;
use crate::kinetics::{Model, Rule};

/// Common division rate of every lineage, per hour.
pub const HEPATIC_DIVISION_RATE: f64 = 1.0 / 24.0;

/// Liver progenitor lineage: hepatoblasts divide symmetrically or give rise
/// to hepatocytes and cholangiocytes, which then expand on their own.
///
/// Starts from 200 hepatoblasts. All six rules run at
/// [`HEPATIC_DIVISION_RATE`].
pub fn hepatic_lineage() -> Result<Model> {
    hepatic_lineage_with_rate(HEPATIC_DIVISION_RATE)
}

/// [`hepatic_lineage`] with every rate replaced by `rate`.
pub fn hepatic_lineage_with_rate(rate: f64) -> Result<Model> {
    Model::builder()
        .entity("Hepatoblast")
        .entity("Hepatocyte")
        .entity("Cholangiocyte")
        .parameter("Hepatoblast_0", 200.0)
        .parameter("Hepatocyte_0", 0.0)
        .parameter("Cholangiocyte_0", 0.0)
        .parameter("hepatoblast_division_rate", rate)
        .parameter("hepatocyte_division_rate", rate)
        .parameter("cholangiocyte_division_rate", rate)
        .parameter("hepatoblast_bipotent_division_rate", rate)
        .parameter("hepatoblast_unipotent_hepatocyte_division_rate", rate)
        .parameter("hepatoblast_unipotent_cholangiocyte_division_rate", rate)
        .initial("Hepatoblast", "Hepatoblast_0")
        .initial("Hepatocyte", "Hepatocyte_0")
        .initial("Cholangiocyte", "Cholangiocyte_0")
        .rule(Rule::new(
            "Hepatoblast_symmetric_division",
            &["Hepatoblast"],
            &["Hepatoblast", "Hepatoblast"],
            "hepatoblast_division_rate",
        ))
        .rule(Rule::new(
            "Hepatocyte_division",
            &["Hepatocyte"],
            &["Hepatocyte", "Hepatocyte"],
            "hepatocyte_division_rate",
        ))
        .rule(Rule::new(
            "Cholangiocyte_division",
            &["Cholangiocyte"],
            &["Cholangiocyte", "Cholangiocyte"],
            "cholangiocyte_division_rate",
        ))
        .rule(Rule::new(
            "Hepatoblast_bipotent_division",
            &["Hepatoblast"],
            &["Hepatocyte", "Cholangiocyte"],
            "hepatoblast_bipotent_division_rate",
        ))
        .rule(Rule::new(
            "Hepatoblast_unipotent_hepatocyte_division",
            &["Hepatoblast"],
            &["Hepatocyte", "Hepatocyte"],
            "hepatoblast_unipotent_hepatocyte_division_rate",
        ))
        .rule(Rule::new(
            "Hepatoblast_unipotent_cholangiocyte_division",
            &["Hepatoblast"],
            &["Cholangiocyte", "Cholangiocyte"],
            "hepatoblast_unipotent_cholangiocyte_division_rate",
        ))
        .observable("Hepatoblasts", &["Hepatoblast"])
        .observable("Hepatocytes", &["Hepatocyte"])
        .observable("Cholangiocytes", &["Cholangiocyte"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::{
        evaluate_observables, DeterministicConfig, EnsembleConfig,
        SimulationMethod, StochasticConfig, Termination,
    };

    fn total(values: &std::collections::BTreeMap<String, f64>) -> f64 {
        values["Hepatoblasts"] + values["Hepatocytes"] + values["Cholangiocytes"]
    }

    #[test]
    fn test_network_shape() {
        let model = hepatic_lineage().unwrap();
        let network = model.network();
        assert_eq!(network.n_entities(), 3);
        assert_eq!(network.n_channels(), 6);
        // every rule is a division: one cell in, two out
        for channel in network.channels() {
            assert_eq!(channel.reactants.iter().sum::<u32>(), 1);
            assert_eq!(channel.products.iter().sum::<u32>(), 2);
            assert_eq!(channel.rate_constant, HEPATIC_DIVISION_RATE);
        }
        assert_eq!(
            network.channels()[3].name,
            "Hepatoblast_bipotent_division"
        );
    }

    #[test]
    fn test_stochastic_run_to_240() {
        let model = hepatic_lineage().unwrap();
        let config = StochasticConfig {
            t_max: 240.0,
            sample_interval: Some(10.0),
            seed: 2024,
        };
        let traj = model.simulate_stochastic(&config).unwrap();
        assert_eq!(traj.termination, Termination::Horizon);
        assert_eq!(traj.len(), 25);

        let mut previous_mature = -1.0;
        for sample in &traj.samples {
            assert!(total(&sample.values) >= 200.0);
            let mature = sample.values["Hepatocytes"] + sample.values["Cholangiocytes"];
            assert!(mature >= previous_mature);
            previous_mature = mature;
        }
        let first = &traj.samples[0].values;
        let last = &traj.last().unwrap().values;
        assert_eq!(first["Hepatocytes"] + first["Cholangiocytes"], 0.0);
        assert!(last["Hepatocytes"] > 0.0);
        assert!(last["Cholangiocytes"] > 0.0);
    }

    #[test]
    fn test_total_grows_by_one_per_event() {
        let model = hepatic_lineage().unwrap();
        let config = StochasticConfig {
            t_max: 5.0,
            sample_interval: None,
            seed: 11,
        };
        let traj = model.simulate_stochastic(&config).unwrap();
        let totals: Vec<f64> = traj.samples.iter().map(|s| total(&s.values)).collect();
        // event samples add exactly one cell; the closing horizon sample adds none
        for (i, pair) in totals.windows(2).enumerate() {
            let growth = pair[1] - pair[0];
            let closing = i + 2 == totals.len();
            assert!(growth == 1.0 || (closing && growth == 0.0));
        }
    }

    #[test]
    fn test_zero_rates_give_single_point() {
        let model = hepatic_lineage_with_rate(0.0).unwrap();
        for interval in [None, Some(24.0)] {
            let traj = model
                .simulate(SimulationMethod::Stochastic, 240.0, interval, 1)
                .unwrap();
            assert_eq!(traj.len(), 1);
            assert_eq!(traj.termination, Termination::Absorbed { time: 0.0 });
            assert_eq!(traj.samples[0].values["Hepatoblasts"], 200.0);
        }
        let traj = model
            .simulate(SimulationMethod::Deterministic, 240.0, Some(24.0), 1)
            .unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!(traj.termination, Termination::Absorbed { time: 0.0 });
    }

    #[test]
    fn test_initial_observables_round_trip() {
        let model = hepatic_lineage().unwrap();
        assert_eq!(model.network().entities(), model.registry().entity_names());

        let initial = model.initial_counts().unwrap();
        let values = evaluate_observables(&initial, model.observables());
        assert_eq!(values["Hepatoblasts"], 200.0);
        assert_eq!(values["Hepatocytes"], 0.0);
        assert_eq!(values["Cholangiocytes"], 0.0);

        let traj = model
            .simulate(SimulationMethod::Stochastic, 10.0, Some(1.0), 5)
            .unwrap();
        assert_eq!(traj.samples[0].values, values);
    }

    #[test]
    fn test_deterministic_mean_field() {
        let model = hepatic_lineage().unwrap();
        let traj = model
            .simulate_deterministic(&DeterministicConfig {
                t_max: 48.0,
                sample_interval: 12.0,
                ..DeterministicConfig::default()
            })
            .unwrap();
        let k = HEPATIC_DIVISION_RATE;
        for s in &traj.samples {
            // dHb/dt = (k - 3k) Hb,  d(total)/dt = k * total
            let hb = 200.0 * (-2.0 * k * s.time).exp();
            let all = 200.0 * (k * s.time).exp();
            assert!((s.values["Hepatoblasts"] - hb).abs() < 1e-2);
            assert!((total(&s.values) - all).abs() < 1e-2);
            // symmetric lineages stay balanced
            assert!((s.values["Hepatocytes"] - s.values["Cholangiocytes"]).abs() < 1e-6);
        }
        assert!(traj.warnings.is_empty());
    }

    #[test]
    fn test_ensemble_mean_matches_ode() {
        let model = hepatic_lineage().unwrap();
        let ensemble = model
            .simulate_ensemble(&EnsembleConfig {
                runs: 64,
                base_seed: 100,
                stochastic: StochasticConfig {
                    t_max: 24.0,
                    sample_interval: Some(6.0),
                    seed: 0,
                },
            })
            .unwrap();
        let summary = ensemble.summary().unwrap();
        let ode = model
            .simulate_deterministic(&DeterministicConfig {
                t_max: 24.0,
                sample_interval: 6.0,
                ..DeterministicConfig::default()
            })
            .unwrap();
        let mean_hb = summary.mean_of("Hepatoblasts").unwrap();
        for (i, s) in ode.samples.iter().enumerate() {
            let expected = s.values["Hepatoblasts"];
            // binomial spread of 200 cells, averaged over 64 runs
            assert!(
                (mean_hb[i] - expected).abs() < 5.0,
                "t={}: {} vs {expected}",
                s.time,
                mean_hb[i]
            );
        }
    }
}
