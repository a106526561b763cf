//! Rate-1/2 convolutional code with a terminated trellis.
//!
//! The encoder shift register holds the last `K - 1` input bits, the newest
//! one in the most significant position. A transition from state `s` on input
//! `b` reads the register `b << (K - 1) | s` and moves to `register >> 1`.

use std::sync::Arc;

use tracing::{instrument, trace};

use crate::{
    common::{CONSTRAINT_LENGTH, GENERATOR_POLYNOMIALS, SOFT_INPUT_BITS},
    error::{Error, Result},
};

/// Accumulated path metric.
type Metric = u32;

/// One bit per trellis state, set when the odd predecessor survived.
type DecisionBitmap = u64;

/// Code descriptor shared by encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trellis {
    constraint_length: usize,
    polynomials: Vec<u32>,
}

impl Default for Trellis {
    /// Constraint length 7, generators 171 and 133 (octal).
    fn default() -> Self {
        Self::new(CONSTRAINT_LENGTH, &GENERATOR_POLYNOMIALS)
    }
}

impl Trellis {
    /// Creates a rate-1/n descriptor, n being the number of generators.
    ///
    /// The most significant of the `constraint_length` polynomial bits taps
    /// the current input.
    pub fn new(constraint_length: usize, polynomials: &[u32]) -> Self {
        assert!(
            (2..=7).contains(&constraint_length),
            "decision bitmap holds at most 64 states"
        );
        assert!(!polynomials.is_empty(), "at least one generator polynomial");

        Self {
            constraint_length,
            polynomials: polynomials.to_vec(),
        }
    }

    /// Constraint length K.
    pub fn constraint_length(&self) -> usize {
        self.constraint_length
    }

    /// Coded bits per input bit.
    pub fn outputs(&self) -> usize {
        self.polynomials.len()
    }

    /// Code rate.
    pub fn rate(&self) -> f64 {
        1.0 / self.outputs() as f64
    }

    /// Number of trellis states, `2^(K-1)`.
    pub fn num_states(&self) -> usize {
        1 << (self.constraint_length - 1)
    }

    /// Termination bits appended by the encoder.
    pub fn tail_bits(&self) -> usize {
        self.constraint_length - 1
    }

    /// Coded length of a block of `info_bits` information bits.
    pub fn coded_len(&self, info_bits: usize) -> usize {
        (info_bits + self.tail_bits()) * self.outputs()
    }

    /// Next state and coded bits for `input` leaving `state`.
    fn step(&self, state: usize, input: u8) -> (usize, impl Iterator<Item = u8> + '_) {
        let register = ((input as usize & 1) << (self.constraint_length - 1)) | state;
        let outputs = self
            .polynomials
            .iter()
            .map(move |&g| ((register as u32 & g).count_ones() & 1) as u8);

        (register >> 1, outputs)
    }
}

/// Terminated convolutional encoder.
pub struct ConvolutionalEncoder {
    trellis: Arc<Trellis>,
}

impl ConvolutionalEncoder {
    /// Creates an encoder for `trellis`.
    pub fn new(trellis: Arc<Trellis>) -> Self {
        Self { trellis }
    }

    /// Code descriptor.
    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }

    /// Encodes `bits` starting from state zero and appends the tail that
    /// drives the register back to zero.
    pub fn encode(&self, bits: &[u8]) -> Vec<u8> {
        let mut coded = Vec::with_capacity(self.trellis.coded_len(bits.len()));
        let mut state = 0;

        let tail = std::iter::repeat_n(0, self.trellis.tail_bits());
        for bit in bits.iter().copied().chain(tail) {
            let (next, outputs) = self.trellis.step(state, bit);
            coded.extend(outputs);
            state = next;
        }

        debug_assert_eq!(state, 0);
        coded
    }
}

/// Hard-output Viterbi decoder for a terminated trellis.
///
/// Input soft values span `0..levels`. Value 0 is the strongest belief in a
/// coded 0 and `levels - 1` the strongest belief in a coded 1; hypothesising
/// a 0 costs `q`, a 1 costs `levels - 1 - q`.
pub struct ViterbiDecoder {
    trellis: Arc<Trellis>,
    levels: usize,
    /// Coded outputs of every (state, input) transition
    expected: Vec<[Vec<u8>; 2]>,
}

impl ViterbiDecoder {
    /// Creates a decoder for `trellis` taking `soft_bits`-bit soft values.
    ///
    /// Soft values travel as `u8`, so at most 8 bits are accepted.
    pub fn new(trellis: Arc<Trellis>, soft_bits: u32) -> Result<Self> {
        if soft_bits == 0 || soft_bits > u8::BITS {
            return Err(Error::SoftInputWidth(soft_bits));
        }

        let expected: Vec<[Vec<u8>; 2]> = (0..trellis.num_states())
            .map(|state| [0, 1].map(|input| trellis.step(state, input).1.collect()))
            .collect();

        Ok(Self {
            trellis,
            levels: 1 << soft_bits,
            expected,
        })
    }

    /// Decoder with the default 3-bit soft input.
    pub fn with_default_width(trellis: Arc<Trellis>) -> Result<Self> {
        Self::new(trellis, SOFT_INPUT_BITS)
    }

    /// Size of the soft input alphabet.
    pub fn levels(&self) -> usize {
        self.levels
    }

    fn branch_metric(&self, received: &[u8], expected: &[u8]) -> Metric {
        let max = (self.levels - 1) as Metric;

        received
            .iter()
            .zip(expected)
            .map(|(&q, &e)| if e == 0 { q as Metric } else { max - q as Metric })
            .sum()
    }

    /// Decodes soft values into information bits, dropping the tail.
    ///
    /// Start and end state are both zero. Equal candidate metrics keep the
    /// even (lower index) predecessor.
    #[instrument(skip(self, soft))]
    pub fn decode(&self, soft: &[u8]) -> Result<Vec<u8>> {
        let n = self.trellis.outputs();
        let tail = self.trellis.tail_bits();
        if soft.len() % n != 0 || soft.len() / n < tail {
            return Err(Error::CodedLength {
                len: soft.len(),
                n,
                tail,
            });
        }
        if let Some(&value) = soft.iter().find(|&&q| q as usize >= self.levels) {
            return Err(Error::SoftValueRange {
                value,
                levels: self.levels,
            });
        }

        let num_states = self.trellis.num_states();
        let high = self.trellis.constraint_length() - 2;
        let steps = soft.len() / n;

        // Unreachable states start far above any reachable path, with room
        // left to accumulate without overflow.
        let mut metrics: Vec<Metric> = vec![Metric::MAX / 2; num_states];
        metrics[0] = 0;
        let mut next_metrics = vec![0; num_states];
        let mut decisions: Vec<DecisionBitmap> = Vec::with_capacity(steps);

        for received in soft.chunks_exact(n) {
            let mut step_decisions: DecisionBitmap = 0;

            for (state, next_metric) in next_metrics.iter_mut().enumerate() {
                let input = (state >> high) & 1;
                let predecessor_0 = (state << 1) & (num_states - 1);
                let predecessor_1 = predecessor_0 | 1;

                let metric_0 = metrics[predecessor_0]
                    + self.branch_metric(received, &self.expected[predecessor_0][input]);
                let metric_1 = metrics[predecessor_1]
                    + self.branch_metric(received, &self.expected[predecessor_1][input]);

                *next_metric = if metric_1 < metric_0 {
                    step_decisions |= 1 << state;
                    metric_1
                } else {
                    metric_0
                };
            }

            // Renormalise so the metrics never creep toward overflow.
            let floor = next_metrics.iter().copied().min().unwrap_or(0);
            for (metric, &next) in metrics.iter_mut().zip(&next_metrics) {
                *metric = next - floor;
            }
            decisions.push(step_decisions);
        }

        trace!(final_metric = metrics[0], steps, "Trellis traversed");

        // Traceback from the terminated zero state.
        let mut state = 0;
        let mut decoded = Vec::with_capacity(steps);
        for step_decisions in decisions.iter().rev() {
            decoded.push(((state >> high) & 1) as u8);
            state = ((state << 1) & (num_states - 1)) | ((step_decisions >> state) & 1) as usize;
        }
        decoded.reverse();
        decoded.truncate(steps - tail);

        Ok(decoded)
    }
}
