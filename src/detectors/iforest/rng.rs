//! Seeded randomness for forest construction

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Deterministic random source used during tree construction.
///
/// Every draw goes through this wrapper, so a fixed seed yields a fixed
/// sequence of trees for a given dataset. Reproducibility is promised within
/// this implementation only, not across versions of the underlying generator.
#[derive(Debug, Clone)]
pub struct ForestRng {
    inner: Xoshiro256PlusPlus,
}

impl ForestRng {
    /// Creates a generator with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.inner.gen()
    }

    /// Uniform integer in `[0, k)`.
    pub fn index(&mut self, k: usize) -> usize {
        self.inner.gen_range(0..k)
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform permutation of `[0, n)` by Fisher-Yates shuffle.
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let j = self.index(i + 1);
            perm.swap(i, j);
        }
        perm
    }
}
