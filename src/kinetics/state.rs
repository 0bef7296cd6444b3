//! Population state vectors.
//!
//! Stochastic runs use integer counts, deterministic runs use real amounts.
//! Both are dense vectors indexed by [`EntityId`](super::registry::EntityId).

use std::fmt::Debug;

/// Scalar type a population can be counted in.
pub trait Count: Copy + Debug + PartialEq + Send + Sync + 'static {
    fn as_f64(self) -> f64;
}

impl Count for u64 {
    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Count for f64 {
    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// Population of every entity type at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct State<C: Count> {
    counts: Vec<C>,
}

/// Integer-count state for stochastic simulation.
pub type CountState = State<u64>;
/// Real-valued state for deterministic simulation.
pub type AmountState = State<f64>;

impl<C: Count> State<C> {
    pub fn new(counts: Vec<C>) -> Self {
        Self { counts }
    }

    #[inline]
    pub fn counts(&self) -> &[C] {
        &self.counts
    }

    #[inline]
    pub fn get(&self, entity: usize) -> C {
        self.counts[entity]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all populations.
    pub fn total(&self) -> f64 {
        self.counts.iter().map(|c| c.as_f64()).sum()
    }

    pub(crate) fn counts_mut(&mut self) -> &mut [C] {
        &mut self.counts
    }
}

impl CountState {
    /// Empty population over `n` entity types.
    pub fn zeros(n: usize) -> Self {
        Self::new(vec![0; n])
    }

    /// Real-valued copy (for seeding a deterministic run).
    pub fn to_amounts(&self) -> AmountState {
        State::new(self.counts.iter().map(|&c| c as f64).collect())
    }
}

impl AmountState {
    pub fn zeros(n: usize) -> Self {
        Self::new(vec![0.0; n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total() {
        let state = CountState::new(vec![200, 3, 0]);
        assert_eq!(state.total(), 203.0);
        assert_eq!(state.get(1), 3);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_to_amounts() {
        let state = CountState::new(vec![5, 0]);
        assert_eq!(state.to_amounts().counts(), &[5.0, 0.0]);
    }

    #[test]
    fn test_zeros() {
        assert_eq!(CountState::zeros(2).counts(), &[0, 0]);
        assert!(AmountState::zeros(0).is_empty());
    }
}
