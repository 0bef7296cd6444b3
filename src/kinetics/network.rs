//! Network generation: rules → concrete reaction channels.
//!
//! One channel per rule, in rule declaration order. Rules with identical
//! stoichiometry stay separate channels; their rates add independently.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::registry::{EntityId, Registry};
use super::rule::{RateLaw, Rule, RuleSet};
use crate::error::{Error, Result};

/// A simulatable transition derived from one rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionChannel {
    /// Name of the originating rule.
    pub name: String,
    /// Index of the originating rule in its rule set.
    pub rule_index: usize,
    /// Reactant stoichiometry, indexed by entity.
    pub reactants: Vec<u32>,
    /// Product stoichiometry, indexed by entity.
    pub products: Vec<u32>,
    pub rate_parameter: String,
    pub rate_constant: f64,
    pub rate_law: RateLaw,
    /// Rate-law exponents: `(entity, multiplicity)` for every consumed entity.
    pub exponents: Vec<(EntityId, u32)>,
    /// Net state change on firing: `(entity, products - reactants)`, zeros dropped.
    pub delta: Vec<(EntityId, i64)>,
}

impl ReactionChannel {
    /// Net stoichiometric change of `entity` per firing.
    pub fn net(&self, entity: EntityId) -> i64 {
        self.products[entity] as i64 - self.reactants[entity] as i64
    }
}

/// Immutable channel table shared read-only by every run of one model.
///
/// Only [`build_network`] and validated deserialization construct one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNetwork")]
pub struct Network {
    entities: Vec<String>,
    channels: Vec<ReactionChannel>,
}

#[derive(Deserialize)]
struct RawNetwork {
    entities: Vec<String>,
    channels: Vec<ReactionChannel>,
}

impl TryFrom<RawNetwork> for Network {
    type Error = Error;

    fn try_from(raw: RawNetwork) -> Result<Self> {
        let n = raw.entities.len();
        for channel in &raw.channels {
            check_channel(channel, n)?;
        }
        Ok(Network {
            entities: raw.entities,
            channels: raw.channels,
        })
    }
}

/// A stored channel must be exactly what [`build_channel`] would produce
/// for an `n_entities`-wide registry.
fn check_channel(channel: &ReactionChannel, n_entities: usize) -> Result<()> {
    let invalid = |reason: String| Error::InvalidRule {
        rule: channel.name.clone(),
        reason,
    };
    if channel.reactants.len() != n_entities || channel.products.len() != n_entities {
        return Err(invalid(format!(
            "stoichiometry vectors must have {n_entities} entries"
        )));
    }
    if !channel.rate_constant.is_finite() || channel.rate_constant < 0.0 {
        return Err(Error::NegativeRate {
            channel: channel.name.clone(),
            rate: channel.rate_constant,
        });
    }
    let exponents: Vec<(EntityId, u32)> = channel
        .reactants
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > 0)
        .map(|(id, &m)| (id, m))
        .collect();
    if exponents.is_empty() {
        return Err(invalid("reactant side is empty".to_string()));
    }
    if channel.exponents != exponents {
        return Err(invalid("exponents disagree with reactants".to_string()));
    }
    let delta: Vec<(EntityId, i64)> = (0..n_entities)
        .map(|id| (id, channel.net(id)))
        .filter(|&(_, d)| d != 0)
        .collect();
    if channel.delta != delta {
        return Err(invalid("delta disagrees with stoichiometry".to_string()));
    }
    Ok(())
}

impl Network {
    pub fn channels(&self) -> &[ReactionChannel] {
        &self.channels
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn n_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, name: &str) -> Option<&ReactionChannel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Name of the entity at `id`.
    pub fn entity_name(&self, id: EntityId) -> &str {
        &self.entities[id]
    }
}

/// Expand a rule set into its reaction channels.
///
/// Validates every reference against `registry` and fails fast, naming the
/// offending rule. Pure: identical input always yields an identical,
/// identically ordered channel list.
pub fn build_network(registry: &Registry, rules: &RuleSet) -> Result<Network> {
    let n = registry.n_entities();
    let mut channels = Vec::with_capacity(rules.len());

    for (rule_index, rule) in rules.iter().enumerate() {
        let channel = build_channel(registry, rule, rule_index, n)?;
        debug!(
            channel = %channel.name,
            order = rule.order(),
            rate = channel.rate_constant,
            "channel generated"
        );
        channels.push(channel);
    }

    info!(
        entities = n,
        channels = channels.len(),
        "reaction network built"
    );

    Ok(Network {
        entities: registry.entity_names(),
        channels,
    })
}

fn build_channel(
    registry: &Registry,
    rule: &Rule,
    rule_index: usize,
    n_entities: usize,
) -> Result<ReactionChannel> {
    let context = format!("rule '{}'", rule.name);

    if rule.reactants.is_empty() {
        return Err(Error::InvalidRule {
            rule: rule.name.clone(),
            reason: "reactant side is empty".to_string(),
        });
    }
    for (entity, &m) in rule.reactants.iter().chain(rule.products.iter()) {
        if m == 0 {
            return Err(Error::InvalidRule {
                rule: rule.name.clone(),
                reason: format!("multiplicity of '{entity}' must be positive"),
            });
        }
    }

    let mut reactants = vec![0u32; n_entities];
    let mut products = vec![0u32; n_entities];
    let mut exponents = Vec::with_capacity(rule.reactants.len());

    for (entity, &m) in &rule.reactants {
        let id = registry.resolve_entity(&context, entity)?;
        reactants[id] += m;
    }
    for (entity, &m) in &rule.products {
        let id = registry.resolve_entity(&context, entity)?;
        products[id] += m;
    }

    let rate_constant = registry.resolve_parameter(&context, &rule.rate)?.as_rate()?;

    for (id, &m) in reactants.iter().enumerate() {
        if m > 0 {
            exponents.push((id, m));
        }
    }
    let delta: Vec<(EntityId, i64)> = (0..n_entities)
        .map(|id| (id, products[id] as i64 - reactants[id] as i64))
        .filter(|&(_, d)| d != 0)
        .collect();

    Ok(ReactionChannel {
        name: rule.name.clone(),
        rule_index,
        reactants,
        products,
        rate_parameter: rule.rate.clone(),
        rate_constant,
        rate_law: rule.rate_law,
        exponents,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::rule::Multiset;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.add_entity("A").unwrap();
        registry.add_entity("B").unwrap();
        registry.add_parameter("k", 0.5).unwrap();
        registry.add_parameter("k_neg", -1.0).unwrap();
        registry
    }

    #[test]
    fn test_stoichiometry_vectors() {
        let rules = RuleSet::new(vec![
            Rule::new("division", &["A"], &["A", "A"], "k"),
            Rule::new("convert", &["A", "A"], &["B"], "k"),
        ]);
        let network = build_network(&registry(), &rules).unwrap();
        assert_eq!(network.n_channels(), 2);

        let division = &network.channels()[0];
        assert_eq!(division.reactants, vec![1, 0]);
        assert_eq!(division.products, vec![2, 0]);
        assert_eq!(division.delta, vec![(0, 1)]);
        assert_eq!(division.exponents, vec![(0, 1)]);

        let convert = network.channel("convert").unwrap();
        assert_eq!(convert.exponents, vec![(0, 2)]);
        assert_eq!(convert.delta, vec![(0, -2), (1, 1)]);
        assert_eq!(convert.net(1), 1);
        assert_eq!(convert.rule_index, 1);
    }

    #[test]
    fn test_identical_stoichiometry_kept_separate() {
        let rules = RuleSet::new(vec![
            Rule::new("r1", &["A"], &["B"], "k"),
            Rule::new("r2", &["A"], &["B"], "k"),
        ]);
        let network = build_network(&registry(), &rules).unwrap();
        assert_eq!(network.n_channels(), 2);
        assert_eq!(network.channels()[0].name, "r1");
        assert_eq!(network.channels()[1].name, "r2");
    }

    #[test]
    fn test_unknown_entity_names_rule() {
        let rules = RuleSet::new(vec![Rule::new("bad", &["A"], &["Z"], "k")]);
        let err = build_network(&registry(), &rules).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownEntity {
                context: "rule 'bad'".to_string(),
                entity: "Z".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_parameter_names_rule() {
        let rules = RuleSet::new(vec![Rule::new("bad", &["A"], &["B"], "missing")]);
        let err = build_network(&registry(), &rules).unwrap_err();
        assert!(matches!(err, Error::UnknownParameter { ref context, .. } if context.contains("bad")));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let rules = RuleSet::new(vec![Rule::new("bad", &["A"], &["B"], "k_neg")]);
        let err = build_network(&registry(), &rules).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "k_neg"));
    }

    #[test]
    fn test_empty_reactants_rejected() {
        let rules = RuleSet::new(vec![Rule::new("creation", &[], &["A"], "k")]);
        let err = build_network(&registry(), &rules).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { ref rule, .. } if rule == "creation"));
    }

    #[test]
    fn test_zero_multiplicity_rejected() {
        let mut reactants = Multiset::new();
        reactants.insert("A".to_string(), 0);
        let rules = RuleSet::new(vec![Rule::from_counts(
            "zero",
            reactants,
            Multiset::new(),
            "k",
        )]);
        let err = build_network(&registry(), &rules).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { .. }));
    }

    #[test]
    fn test_deterministic_build() {
        let rules = RuleSet::new(vec![
            Rule::new("r1", &["A", "B"], &["B", "B"], "k"),
            Rule::new("r2", &["B"], &[], "k"),
            Rule::new("r3", &["A"], &["A", "A"], "k"),
        ]);
        let n1 = build_network(&registry(), &rules).unwrap();
        let n2 = build_network(&registry(), &rules).unwrap();
        assert_eq!(n1, n2);
        for (a, b) in n1.channels().iter().zip(n2.channels()) {
            assert_eq!(a.rate_constant.to_bits(), b.rate_constant.to_bits());
        }
    }

    #[test]
    fn test_serialized_network_round_trip() {
        let rules = RuleSet::new(vec![
            Rule::new("division", &["A"], &["A", "A"], "k"),
            Rule::new("decay", &["B"], &[], "k"),
        ]);
        let network = build_network(&registry(), &rules).unwrap();
        let json = serde_json::to_string(&network).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back, network);
    }

    const CHANNEL_JSON: &str = r#"{"entities":["A","B"],"channels":[{"name":"x","rule_index":0,
        "reactants":[1,0],"products":[0,0],"rate_parameter":"k","rate_constant":RATE,
        "rate_law":"MassAction","exponents":EXPONENTS,"delta":[[0,-1]]}]}"#;

    fn channel_json(rate: &str, exponents: &str) -> String {
        CHANNEL_JSON
            .replace("RATE", rate)
            .replace("EXPONENTS", exponents)
    }

    #[test]
    fn test_deserialize_checks_channels() {
        assert!(serde_json::from_str::<Network>(&channel_json("1.0", "[[0,1]]")).is_ok());

        // entity index past the registry
        assert!(serde_json::from_str::<Network>(&channel_json("1.0", "[[5,1]]")).is_err());
        // negative rate on a channel that may never fire
        assert!(serde_json::from_str::<Network>(&channel_json("-2.0", "[[0,1]]")).is_err());

        let short = r#"{"entities":["A","B"],"channels":[{"name":"x","rule_index":0,
            "reactants":[1],"products":[0],"rate_parameter":"k","rate_constant":1.0,
            "rate_law":"MassAction","exponents":[[0,1]],"delta":[[0,-1]]}]}"#;
        assert!(serde_json::from_str::<Network>(short).is_err());

        let bad_delta = channel_json("1.0", "[[0,1]]").replace("[[0,-1]]", "[[3,-1]]");
        assert!(serde_json::from_str::<Network>(&bad_delta).is_err());
    }

    #[test]
    fn test_channel_net_matches_rule() {
        let rules = RuleSet::new(vec![
            Rule::new("division", &["A"], &["A", "A"], "k"),
            Rule::new("dimerize", &["A", "A"], &["B"], "k"),
            Rule::new("decay", &["B"], &[], "k"),
        ]);
        let network = build_network(&registry(), &rules).unwrap();
        for (rule, channel) in rules.iter().zip(network.channels()) {
            let total: i64 = (0..network.n_entities()).map(|e| channel.net(e)).sum();
            assert_eq!(total, rule.net_change());
        }
    }
}
