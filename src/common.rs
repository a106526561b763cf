/// Information bits per block on the convolutionally coded link
pub static CODED_BLOCK_SIZE: usize = 2048;

/// Information bits per block on the uncoded, scrambled link
pub static UNCODED_BLOCK_SIZE: usize = 2400;

/// Constraint length of the convolutional code
pub const CONSTRAINT_LENGTH: usize = 7;

/// Generator polynomials of the rate-1/2 code, octal 171 and 133
pub static GENERATOR_POLYNOMIALS: [u32; 2] = [0o171, 0o133];

/// Soft input word length of the Viterbi decoder, in bits
pub static SOFT_INPUT_BITS: u32 = 3;

/// Quantizer boundary points for the coded link, before scaling by `1 / N0`
pub static LLR_BOUNDARIES: [f64; 7] = [-1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5];

/// Slot index advance between two consecutive scrambled blocks
pub static SLOT_STEP: u32 = 2;

/// Number of slots per radio frame. Slot indices wrap at this value.
pub static SLOTS_PER_FRAME: u32 = 20;

/// Radio network temporary identifier used to seed the scrambler
pub static SCRAMBLER_RNTI: u32 = 1;

/// Physical cell identity used to seed the scrambler
pub static SCRAMBLER_CELL_ID: u32 = 0;

/// Smallest noise variance used for LLR computation
pub static MIN_NOISE_VARIANCE: f64 = 1e-12;

/// Seed used when the caller does not provide one
pub static DEFAULT_SEED: u64 = 0x5eed;
