//! Random number generators.
//!
//! The smoothing optimizers draw uniform deviates and bounded integers
//! through the [`UniformSource`] trait, so tests can substitute seeded or
//! scripted sources.  The default implementation wraps the 64-bit Mersenne
//! Twister from the `rand_mt` crate.

use rand::Rng;
use rand_mt::Mt19937GenRand64;
use sfit_core::Real;

/// A source of uniform random deviates and bounded integer draws.
pub trait UniformSource {
    /// The next uniform deviate in `[0, 1)`.
    fn next_real(&mut self) -> Real;

    /// The next integer uniform on `[0, bound)`; `bound` must be positive.
    fn next_index(&mut self, bound: usize) -> usize;
}

/// A uniform pseudo-random number generator based on the Mersenne Twister
/// MT19937-64 algorithm.
pub struct MersenneTwisterUniformRng {
    rng: Mt19937GenRand64,
}

impl MersenneTwisterUniformRng {
    /// Create a new generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }
}

impl UniformSource for MersenneTwisterUniformRng {
    fn next_real(&mut self) -> Real {
        // Map u64 to [0.0, 1.0)
        let u: u64 = self.rng.next_u64();
        u as f64 / (u64::MAX as f64 + 1.0)
    }

    fn next_index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}
