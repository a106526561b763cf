//! Monte-Carlo BER worker.

use std::ops::AddAssign;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, trace};

use crate::{
    channel::AwgnChannel,
    config::SimConfig,
    error::{Error, Result},
    layers::link::{CodedLink, Link, UncodedLink},
    source::{BitSource, count_bit_errors},
};

/// Cumulative error and bit counts of one Eb/No point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Bit errors counted so far
    pub errors: u64,
    /// Bits transmitted so far
    pub bits: u64,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.errors += other.errors;
        self.bits += other.bits;
    }
}

impl Tally {
    /// Error rate, zero when nothing was transmitted.
    pub fn ber(&self) -> f64 {
        if self.bits == 0 {
            0.0
        } else {
            self.errors as f64 / self.bits as f64
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Error budget reached
    ErrorBudget,
    /// Bit budget reached before the error budget. Not a fault, the BER is
    /// simply less precise than requested.
    BitBudget,
    /// The accumulated tally already met a budget, no block was sent
    Exhausted,
}

/// Result of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BerReport {
    /// Simulated Eb/No, in dB
    pub ebno_db: f64,
    /// `errors / bits`, zero when no bits were sent
    pub ber: f64,
    /// Bit errors counted
    pub errors: u64,
    /// Bits transmitted
    pub bits: u64,
    /// Which budget ended the run
    pub stop: StopReason,
}

impl BerReport {
    fn new(ebno_db: f64, tally: Tally, max_errs: u64) -> Self {
        Self {
            ebno_db,
            ber: tally.ber(),
            errors: tally.errors,
            bits: tally.bits,
            stop: if tally.errors >= max_errs {
                StopReason::ErrorBudget
            } else {
                StopReason::BitBudget
            },
        }
    }

    /// Pools independent runs of the same Eb/No point.
    pub fn pooled(reports: &[BerReport], max_errs: u64) -> Option<Self> {
        let ebno_db = reports.first()?.ebno_db;
        let mut tally = Tally::default();
        for report in reports {
            tally += Tally {
                errors: report.errors,
                bits: report.bits,
            };
        }

        Some(Self::new(ebno_db, tally, max_errs))
    }
}

/// Long-lived simulation context.
///
/// Owns the link, the bit source, the noise generator and the running tally.
/// Repeated runs keep adding to the tally until [`BerSimulator::reset_tally`]
/// clears it; the random streams only restart on
/// [`BerSimulator::reseed`].
pub struct BerSimulator<L: Link> {
    link: L,
    source: BitSource,
    channel: AwgnChannel,
    tally: Tally,
}

impl<L: Link> BerSimulator<L> {
    /// Creates a simulator whose bit and noise streams derive from `seed`.
    pub fn new(link: L, seed: u64) -> Self {
        let (source_seed, channel_seed) = stream_seeds(seed);

        Self {
            link,
            source: BitSource::new(source_seed),
            channel: AwgnChannel::new(channel_seed),
            tally: Tally::default(),
        }
    }

    /// The simulated link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Counts accumulated so far.
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Clears the counts. The bit and noise streams carry on.
    pub fn reset_tally(&mut self) {
        self.tally = Tally::default();
    }

    /// Restarts the bit and noise streams from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        let (source_seed, channel_seed) = stream_seeds(seed);
        self.source.reseed(source_seed);
        self.channel.reseed(channel_seed);
    }

    /// Transmits blocks until the tally holds `max_errs` errors or `max_bits`
    /// bits, whichever comes first.
    ///
    /// A zero budget returns at once. When the error budget cannot be reached
    /// (e.g. a noiseless channel), only `max_bits` bounds the run, so
    /// `u64::MAX` there is the caller's choice to run forever.
    #[instrument(skip(self))]
    pub fn run(&mut self, ebno_db: f64, max_errs: u64, max_bits: u64) -> Result<BerReport> {
        let noise = self.link.noise_spec(ebno_db)?;
        let block_size = self.link.block_size();
        if block_size == 0 {
            return Err(Error::EmptyBlock);
        }

        trace!(block_size, variance = noise.variance, "Simulation initialized");

        let within_budget = |tally: &Tally| tally.errors < max_errs && tally.bits < max_bits;
        let exhausted = self.tally.bits > 0 && !within_budget(&self.tally);

        while within_budget(&self.tally) {
            let bits = self.source.block(block_size);
            let recovered = self.link.transmit_block(&bits, &noise, &mut self.channel)?;

            let errors = count_bit_errors(&bits, &recovered);
            self.tally += Tally {
                errors,
                bits: block_size as u64,
            };
            trace!(errors, total = self.tally.errors, bits = self.tally.bits, "Block done");
        }

        let mut report = BerReport::new(ebno_db, self.tally, max_errs);
        if exhausted {
            report.stop = StopReason::Exhausted;
        }
        debug!(
            ber = report.ber,
            errors = report.errors,
            bits = report.bits,
            stop = ?report.stop,
            "Simulation stats"
        );

        Ok(report)
    }

    /// Runs every Eb/No point in order with one persistent link and random
    /// streams, clearing only the tally between points.
    ///
    /// The noise stream is not reseeded between points.
    pub fn sweep(
        &mut self,
        ebno_db: &[f64],
        max_errs: u64,
        max_bits: u64,
        mut on_point: impl FnMut(&BerReport),
    ) -> Result<Vec<BerReport>> {
        let mut reports = Vec::with_capacity(ebno_db.len());

        for &point in ebno_db {
            self.reset_tally();
            let report = self.run(point, max_errs, max_bits)?;
            info!(ebno_db = point, ber = report.ber, bits = report.bits, "Point done");

            on_point(&report);
            reports.push(report);
        }

        Ok(reports)
    }
}

/// Independent bit source and channel seeds derived from one master seed.
fn stream_seeds(seed: u64) -> (u64, u64) {
    let mut seeder = ChaCha8Rng::seed_from_u64(seed);
    (seeder.random(), seeder.random())
}

impl BerSimulator<CodedLink> {
    /// Simulator of the 2048-bit rate-1/2 coded QPSK link.
    pub fn coded(seed: u64) -> Result<Self> {
        Ok(Self::new(CodedLink::new()?, seed))
    }
}

impl BerSimulator<UncodedLink> {
    /// Simulator of the 2400-bit uncoded link described by `config`.
    pub fn uncoded(config: &SimConfig, seed: u64) -> Result<Self> {
        Ok(Self::new(
            UncodedLink::new(config.modulation, config.demod)?,
            seed,
        ))
    }
}

/// Coded entry point: rate-1/2 code, QPSK, soft-decision decoding.
pub fn simulate_coded(
    sim: &mut BerSimulator<CodedLink>,
    ebno_db: f64,
    max_errs: u64,
    max_bits: u64,
) -> Result<BerReport> {
    sim.run(ebno_db, max_errs, max_bits)
}

/// Uncoded entry point.
///
/// When `config` asks for another modulation or demodulation than the
/// simulator's link, the link is rebuilt before anything is transmitted.
/// The random streams and the tally are kept.
pub fn simulate_uncoded(
    sim: &mut BerSimulator<UncodedLink>,
    config: &SimConfig,
) -> Result<BerReport> {
    if sim.link.modulation() != config.modulation || sim.link.demod() != config.demod {
        debug!(modulation = %config.modulation, demod = %config.demod, "Rebuilding link");
        sim.link = UncodedLink::new(config.modulation, config.demod)?;
    }

    sim.run(config.ebno_db, config.max_errs, config.max_bits)
}
