//! Simulation error types

use thiserror::Error;

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors reported before or while a block is processed.
///
/// None of these are transient. A simulation that hits one stops and hands
/// it to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Modulation scheme name is not one of QPSK, 16QAM, 64QAM
    #[error("unknown modulation scheme '{0}', expected one of QPSK, 16QAM, 64QAM")]
    UnknownModulation(String),

    /// Demodulation type name is not one of hard, soft
    #[error("unknown demodulation type '{0}', expected hard or soft")]
    UnknownDemod(String),

    /// Bit sequence cannot be split into whole symbols
    #[error("{len} bits cannot be split into groups of {bits_per_symbol}")]
    BitGroupLength {
        /// Length of the offending sequence
        len: usize,
        /// Bits carried per symbol
        bits_per_symbol: usize,
    },

    /// Coded sequence length does not fit the trellis
    #[error("coded length {len} is not a whole number of rate-1/{n} steps covering the {tail} tail steps")]
    CodedLength {
        /// Length of the offending sequence
        len: usize,
        /// Coded bits per trellis step
        n: usize,
        /// Termination steps
        tail: usize,
    },

    /// Soft value outside of the decoder alphabet
    #[error("soft value {value} outside of decoder alphabet 0..{levels}")]
    SoftValueRange {
        /// Offending value
        value: u8,
        /// Number of levels accepted by the decoder
        levels: usize,
    },

    /// Decoder soft input width does not fit a byte
    #[error("soft input width of {0} bits outside 1..=8")]
    SoftInputWidth(u32),

    /// Quantizer output alphabet differs from what the decoder expects
    #[error("quantizer produces {quantizer} levels but decoder expects {decoder}")]
    AlphabetMismatch {
        /// Levels produced by the quantizer
        quantizer: usize,
        /// Levels accepted by the decoder
        decoder: usize,
    },

    /// Quantizer boundaries are empty, unordered, not finite or too many for
    /// byte-sized indices
    #[error("quantizer boundaries must be finite and strictly increasing")]
    InvalidBoundaries,

    /// Scrambler slot index outside of the radio frame
    #[error("slot index {slot} out of range 0..{slots}")]
    SlotIndex {
        /// Offending slot
        slot: u32,
        /// Slots per frame
        slots: u32,
    },

    /// Link blocks carry no bits, so the stopping rule could never trigger
    #[error("link block size must be positive")]
    EmptyBlock,

    /// Eb/No is NaN or negative infinity
    #[error("Eb/No must be a number above -inf dB, got {0}")]
    InvalidEbNo(f64),
}
