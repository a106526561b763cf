use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::error::Error;

/// Modulation scheme of the uncoded link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Modulation {
    /// 2 bits per symbol
    #[value(name = "QPSK", alias = "qpsk")]
    Qpsk,
    /// 4 bits per symbol
    #[value(name = "16QAM", alias = "16qam")]
    Qam16,
    /// 6 bits per symbol
    #[value(name = "64QAM", alias = "64qam")]
    Qam64,
}

impl Modulation {
    /// Bits carried per symbol.
    pub fn bits_per_symbol(self) -> usize {
        match self {
            Self::Qpsk => 2,
            Self::Qam16 => 4,
            Self::Qam64 => 6,
        }
    }
}

impl FromStr for Modulation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QPSK" => Ok(Self::Qpsk),
            "16QAM" => Ok(Self::Qam16),
            "64QAM" => Ok(Self::Qam64),
            _ => Err(Error::UnknownModulation(s.to_owned())),
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Qpsk => "QPSK",
            Self::Qam16 => "16QAM",
            Self::Qam64 => "64QAM",
        })
    }
}

/// Demodulation performed on the uncoded link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DemodType {
    /// Nearest constellation point
    Hard,
    /// Sign of the log-likelihood ratio
    Soft,
}

impl FromStr for DemodType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            _ => Err(Error::UnknownDemod(s.to_owned())),
        }
    }
}

impl fmt::Display for DemodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        })
    }
}

/// Parameters of one uncoded simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Eb/No, in dB
    pub ebno_db: f64,
    /// Stop once this many bit errors were counted
    pub max_errs: u64,
    /// Stop once this many bits were transmitted
    pub max_bits: u64,
    /// Constellation used on the link
    pub modulation: Modulation,
    /// Hard or soft demodulation
    pub demod: DemodType,
}

impl SimConfig {
    /// Builds a config from textual modulation and demodulation names.
    ///
    /// Unknown names are rejected here, before any block is simulated.
    pub fn parse(
        ebno_db: f64,
        max_errs: u64,
        max_bits: u64,
        modulation: &str,
        demod: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            ebno_db,
            max_errs,
            max_bits,
            modulation: modulation.parse()?,
            demod: demod.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_parse_names() {
        assert_eq!("QPSK".parse::<Modulation>(), Ok(Modulation::Qpsk));
        assert_eq!("16qam".parse::<Modulation>(), Ok(Modulation::Qam16));
        assert_eq!("64QAM".parse::<Modulation>(), Ok(Modulation::Qam64));
        assert_eq!("Soft".parse::<DemodType>(), Ok(DemodType::Soft));
        assert_eq!("hard".parse::<DemodType>(), Ok(DemodType::Hard));

        for m in [Modulation::Qpsk, Modulation::Qam16, Modulation::Qam64] {
            assert_eq!(m.to_string().parse::<Modulation>(), Ok(m));
        }
    }

    #[test_log::test]
    fn test_unknown_names_fail() {
        assert_eq!(
            "8PSK".parse::<Modulation>(),
            Err(Error::UnknownModulation("8PSK".into()))
        );
        assert_eq!(
            SimConfig::parse(5.0, 100, 1000, "QPSK", "fuzzy"),
            Err(Error::UnknownDemod("fuzzy".into()))
        );

        let config = SimConfig::parse(5.0, 100, 1000, "64QAM", "soft").unwrap();
        assert_eq!(config.modulation, Modulation::Qam64);
        assert_eq!(config.demod, DemodType::Soft);
    }

    #[test_log::test]
    fn test_bits_per_symbol() {
        assert_eq!(Modulation::Qpsk.bits_per_symbol(), 2);
        assert_eq!(Modulation::Qam16.bits_per_symbol(), 4);
        assert_eq!(Modulation::Qam64.bits_per_symbol(), 6);
    }
}
