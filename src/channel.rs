use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::trace;

use crate::{
    common::{DEFAULT_SEED, MIN_NOISE_VARIANCE},
    error::{Error, Result},
};

/// Noise level of one Eb/No point.
///
/// `variance` is the total complex noise variance N0 relative to unit symbol
/// energy, so each real dimension carries `variance / 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSpec {
    /// Requested Eb/No, in dB
    pub ebno_db: f64,
    /// Es/N0 per channel symbol, in dB
    pub snr_db: f64,
    /// Complex noise variance N0
    pub variance: f64,
}

impl NoiseSpec {
    /// Derives the channel noise from Eb/No, bits per symbol and code rate.
    ///
    /// `+inf` dB is accepted and describes a noiseless channel.
    pub fn new(ebno_db: f64, bits_per_symbol: usize, code_rate: f64) -> Result<Self> {
        if ebno_db.is_nan() || ebno_db == f64::NEG_INFINITY {
            return Err(Error::InvalidEbNo(ebno_db));
        }

        let snr_db = ebno_db + 10.0 * (bits_per_symbol as f64).log10() + 10.0 * code_rate.log10();
        let variance = 10f64.powf(-snr_db / 10.0);

        Ok(Self {
            ebno_db,
            snr_db,
            variance,
        })
    }

    /// Linear Es/N0.
    pub fn snr_linear(&self) -> f64 {
        10f64.powf(self.snr_db / 10.0)
    }

    /// Noise variance used by the soft demodulator, floored so that a
    /// noiseless channel still yields finite LLRs.
    pub fn llr_variance(&self) -> f64 {
        self.variance.max(MIN_NOISE_VARIANCE)
    }

    /// Standard deviation of each real noise dimension.
    pub fn sigma(&self) -> f64 {
        (self.variance / 2.0).sqrt()
    }
}

/// Additive white Gaussian noise channel.
///
/// Owns a single running generator, so consecutive blocks see independent
/// noise while the whole sequence is reproducible from the seed. Every symbol
/// draws two normal samples whatever the noise level, which keeps the stream
/// position independent of Eb/No.
pub struct AwgnChannel {
    rng: ChaCha8Rng,
}

impl Default for AwgnChannel {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl AwgnChannel {
    /// Creates a channel whose noise stream starts from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the noise stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Adds circularly symmetric complex Gaussian noise to `symbols`.
    pub fn transmit(&mut self, symbols: &[Complex64], noise: &NoiseSpec) -> Vec<Complex64> {
        let sigma = noise.sigma();
        trace!(sigma, symbols = symbols.len(), "Adding noise");

        symbols
            .iter()
            .map(|&s| {
                let re: f64 = self.rng.sample(StandardNormal);
                let im: f64 = self.rng.sample(StandardNormal);
                s + Complex64::new(re, im) * sigma
            })
            .collect()
    }
}
