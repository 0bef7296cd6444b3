//! Transformation rules: reactant multiset → product multiset at a named rate.
//!
//! Rules are plain records. Multisets are stored as `name -> multiplicity`
//! maps, so `["A", "A", "B"]` and `["B", "A", "A"]` describe the same side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Multiset of entity names: name -> multiplicity.
pub type Multiset = BTreeMap<String, u32>;

/// Rate law attached to a rule.
///
/// Only mass action is implemented; new kinetics get a new variant and a
/// matching arm in [`propensity`](super::propensity).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateLaw {
    /// `k × Π C(count_i, m_i)` (stochastic), `k × Π y_i^m_i / m_i!` (ODE).
    #[default]
    MassAction,
}

/// A single declarative rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub reactants: Multiset,
    pub products: Multiset,
    /// Name of the rate parameter.
    pub rate: String,
    pub rate_law: RateLaw,
}

impl Rule {
    /// Build a mass-action rule from reactant/product lists; repeated names
    /// become multiplicities.
    ///
    /// # Example
    /// ```
    /// use rulesim::Rule;
    ///
    /// let division = Rule::new("division", &["Stem"], &["Stem", "Stem"], "k_div");
    /// assert_eq!(division.products["Stem"], 2);
    /// ```
    pub fn new(name: &str, reactants: &[&str], products: &[&str], rate: &str) -> Self {
        Self::from_counts(name, count_names(reactants), count_names(products), rate)
    }

    /// Build from explicit multiplicity maps. Zero multiplicities are kept so
    /// that network generation can reject them by name.
    pub fn from_counts(name: &str, reactants: Multiset, products: Multiset, rate: &str) -> Self {
        Self {
            name: name.to_string(),
            reactants,
            products,
            rate: rate.to_string(),
            rate_law: RateLaw::MassAction,
        }
    }

    /// Total reactant copies consumed per firing (reaction order).
    pub fn order(&self) -> u32 {
        self.reactants.values().sum()
    }

    /// Net change in total population per firing.
    pub fn net_change(&self) -> i64 {
        self.products.values().map(|&m| m as i64).sum::<i64>()
            - self.reactants.values().map(|&m| m as i64).sum::<i64>()
    }

    /// Every entity name mentioned on either side.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.reactants
            .keys()
            .chain(self.products.keys())
            .map(|s| s.as_str())
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn side(ms: &Multiset) -> String {
            if ms.is_empty() {
                return "∅".to_string();
            }
            ms.iter()
                .map(|(e, &m)| if m == 1 { e.clone() } else { format!("{m}×{e}") })
                .collect::<Vec<_>>()
                .join(" + ")
        }
        write!(
            f,
            "{}: {} -> {} @ {}",
            self.name,
            side(&self.reactants),
            side(&self.products),
            self.rate
        )
    }
}

fn count_names(names: &[&str]) -> Multiset {
    let mut counts = Multiset::new();
    for name in names {
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Ordered, fixed collection of rules. Order is the channel order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiset_counts() {
        let rule = Rule::new("dimerize", &["A", "B", "A"], &["C"], "k");
        assert_eq!(rule.reactants.get("A"), Some(&2));
        assert_eq!(rule.reactants.get("B"), Some(&1));
        assert_eq!(rule.order(), 3);
        assert_eq!(rule.net_change(), -2);
    }

    #[test]
    fn test_order_insensitive_equality() {
        let r1 = Rule::new("r", &["A", "B"], &["C"], "k");
        let r2 = Rule::new("r", &["B", "A"], &["C"], "k");
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_division_grows_population() {
        let rule = Rule::new("division", &["A"], &["A", "A"], "k");
        assert_eq!(rule.net_change(), 1);
        assert_eq!(rule.entities().collect::<Vec<_>>(), vec!["A", "A"]);
    }

    #[test]
    fn test_display() {
        let rule = Rule::new("split", &["A"], &["B", "B"], "k");
        assert_eq!(rule.to_string(), "split: A -> 2×B @ k");
        let decay = Rule::new("decay", &["A"], &[], "kd");
        assert_eq!(decay.to_string(), "decay: A -> ∅ @ kd");
    }
}
