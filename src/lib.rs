//! AWGN bit-error-rate estimation for a coded QPSK link and an uncoded,
//! scrambled QAM link.

#![forbid(unsafe_code, unused_must_use)]
#![warn(clippy::all, missing_docs)]

/// Fixed link constants.
pub mod common;

/// Run-time configuration.
pub mod config;

/// Error types.
pub mod error;

/// Random bit source.
pub mod source;

/// AWGN channel model.
pub mod channel;

/// Signal processing layers.
pub mod layers;

/// Monte-Carlo BER worker.
pub mod simulation;

pub use channel::{AwgnChannel, NoiseSpec};
pub use config::{DemodType, Modulation, SimConfig};
pub use error::{Error, Result};
pub use simulation::{BerReport, BerSimulator, StopReason, Tally, simulate_coded, simulate_uncoded};
