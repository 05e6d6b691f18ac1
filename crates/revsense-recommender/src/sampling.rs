//! Exploration sampling for cold-start requests without positive affinity
//!
//! With a fixed seed every draw is reproducible; without one the generator
//! is seeded from OS entropy on each draw.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use revsense_core::ProductId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    sample_size: usize,
    seed: Option<u64>,
}

impl SamplingPolicy {
    pub fn new(sample_size: usize, seed: Option<u64>) -> Self {
        Self { sample_size, seed }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Up to `sample_size` distinct products drawn uniformly from `pool`.
    ///
    /// A pool no larger than the sample is returned whole.
    pub fn sample(&self, pool: &[ProductId]) -> Vec<ProductId> {
        if pool.len() <= self.sample_size {
            return pool.to_vec();
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        pool.choose_multiple(&mut rng, self.sample_size)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(n: usize) -> Vec<ProductId> {
        (0..n)
            .map(|i| ProductId::parse(&format!("p{i:03}")).unwrap())
            .collect()
    }

    #[test]
    fn test_small_pool_returned_whole() {
        let policy = SamplingPolicy::new(10, Some(1));
        assert_eq!(policy.sample(&pool(4)), pool(4));
        assert!(policy.sample(&[]).is_empty());
    }

    #[test]
    fn test_sample_is_distinct_subset() {
        let policy = SamplingPolicy::new(20, None);
        let pool = pool(150);
        let sample = policy.sample(&pool);

        assert_eq!(sample.len(), 20);
        let unique: HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), 20);
        assert!(sample.iter().all(|p| pool.contains(p)));
    }

    #[test]
    fn test_seeded_sample_is_reproducible() {
        let pool = pool(500);
        let a = SamplingPolicy::new(100, Some(42)).sample(&pool);
        let b = SamplingPolicy::new(100, Some(42)).sample(&pool);
        assert_eq!(a, b);

        let c = SamplingPolicy::new(100, Some(43)).sample(&pool);
        assert_ne!(a, c);
    }
}
