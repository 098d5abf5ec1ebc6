//! The randomness capability that drives a [`Workload`](crate::Workload).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;

/// A source of uniform random values.
///
/// Workloads never reach for a global RNG. Every random decision goes through
/// this trait, so tests can substitute a scripted source and runs can be
/// replayed from a seed.
pub trait RandomSource {
    /// Returns a uniformly distributed integer in `low..=high`.
    fn int_inclusive(&mut self, low: u32, high: u32) -> u32;

    /// Returns a uniformly distributed float in `low..=high`.
    fn float_inclusive(&mut self, low: f64, high: f64) -> f64;

    /// Returns an index into `weights`, chosen proportionally to its weight.
    ///
    /// At least one of the weights must be non-zero.
    fn weighted_index(&mut self, weights: &[u32]) -> usize;
}

/// A [`RandomSource`] backed by a fast, seedable [`SmallRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    /// Creates a deterministic source from the given seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Creates a source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }
}

impl RandomSource for SeededRandom {
    fn int_inclusive(&mut self, low: u32, high: u32) -> u32 {
        self.rng.random_range(low..=high)
    }

    fn float_inclusive(&mut self, low: f64, high: f64) -> f64 {
        self.rng.random_range(low..=high)
    }

    fn weighted_index(&mut self, weights: &[u32]) -> usize {
        match WeightedIndex::<u32>::new(weights) {
            Ok(distribution) => distribution.sample(&mut self.rng),
            // all-zero weights are rejected when building the workload
            Err(_) => 0,
        }
    }
}

/// A [`RandomSource`] which replays prepared values, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedRandom {
    ints: std::collections::VecDeque<u32>,
    floats: std::collections::VecDeque<f64>,
    indices: std::collections::VecDeque<usize>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn ints(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.ints.extend(values);
        self
    }

    pub fn floats(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.floats.extend(values);
        self
    }

    pub fn indices(mut self, values: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(values);
        self
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn int_inclusive(&mut self, low: u32, high: u32) -> u32 {
        let value = self.ints.pop_front().expect("script ran out of ints");
        assert!((low..=high).contains(&value), "{value} not in {low}..={high}");
        value
    }

    fn float_inclusive(&mut self, low: f64, high: f64) -> f64 {
        let value = self.floats.pop_front().expect("script ran out of floats");
        assert!((low..=high).contains(&value), "{value} not in {low}..={high}");
        value
    }

    fn weighted_index(&mut self, weights: &[u32]) -> usize {
        let value = self.indices.pop_front().expect("script ran out of indices");
        assert!(value < weights.len());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SeededRandom::from_seed(42);
        let mut b = SeededRandom::from_seed(42);

        let a: Vec<_> = (0..32).map(|_| a.int_inclusive(1, 100)).collect();
        let b: Vec<_> = (0..32).map(|_| b.int_inclusive(1, 100)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn int_bounds_are_inclusive() {
        let mut rng = SeededRandom::from_seed(7);
        let samples: Vec<_> = (0..2_000).map(|_| rng.int_inclusive(1, 3)).collect();

        assert!(samples.iter().all(|n| (1..=3).contains(n)));
        assert!(samples.contains(&1));
        assert!(samples.contains(&3));
    }

    #[test]
    fn degenerate_ranges() {
        let mut rng = SeededRandom::from_seed(7);
        assert_eq!(rng.int_inclusive(5, 5), 5);
        assert_eq!(rng.float_inclusive(0.5, 0.5), 0.5);
    }

    #[test]
    fn zero_weights_are_never_chosen() {
        let mut rng = SeededRandom::from_seed(1);
        for _ in 0..1_000 {
            assert_eq!(rng.weighted_index(&[0, 3, 0]), 1);
        }
    }
}
