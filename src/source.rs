use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::common::DEFAULT_SEED;

/// Uniform random bit generator, one bit per `u8`.
pub struct BitSource {
    rng: ChaCha8Rng,
}

impl Default for BitSource {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl BitSource {
    /// Creates a bit source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the bit stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Draws a block of `len` independent bits.
    pub fn block(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.rng.random::<bool>() as u8).collect()
    }
}

/// Number of positions where `a` and `b` differ.
pub fn count_bit_errors(a: &[u8], b: &[u8]) -> u64 {
    a.iter().zip(b).filter(|(x, y)| x != y).count() as u64
        + a.len().abs_diff(b.len()) as u64
}
