use std::sync::Arc;

use num_complex::Complex64;
use tracing::{debug, instrument};

use crate::{
    channel::{AwgnChannel, NoiseSpec},
    common::{CODED_BLOCK_SIZE, LLR_BOUNDARIES, SOFT_INPUT_BITS, UNCODED_BLOCK_SIZE},
    config::{DemodType, Modulation},
    error::{Error, Result},
};

use super::{
    coding::{ConvolutionalEncoder, Trellis, ViterbiDecoder},
    physical::{Constellation, llr_to_bits},
    quantizer::LlrQuantizer,
    scrambler::{Scrambler, SlotCounter},
};

/// Transmit/receive chain of one block, from source bits to recovered bits.
pub trait Link {
    /// Information bits per block.
    fn block_size(&self) -> usize;

    /// Noise level of this link at `ebno_db`.
    fn noise_spec(&self, ebno_db: f64) -> Result<NoiseSpec>;

    /// Pushes one block through the link and returns the recovered bits.
    fn transmit_block(
        &mut self,
        bits: &[u8],
        noise: &NoiseSpec,
        channel: &mut AwgnChannel,
    ) -> Result<Vec<u8>>;
}

/// Rate-1/2 convolutionally coded QPSK link with soft-decision decoding.
///
/// Demodulator LLRs are positive for bit 0, while the decoder reads larger
/// soft values as evidence for bit 1. The LLRs are therefore negated before
/// quantization.
pub struct CodedLink {
    block_size: usize,
    encoder: ConvolutionalEncoder,
    decoder: ViterbiDecoder,
    constellation: Constellation,
    boundaries: Vec<f64>,
    /// Quantizer scaled for the noise variance of the last block
    quantizer: (f64, LlrQuantizer),
}

impl CodedLink {
    /// Link with the default code, quantizer and block size.
    pub fn new() -> Result<Self> {
        Self::with_parts(Arc::new(Trellis::default()), &LLR_BOUNDARIES, SOFT_INPUT_BITS)
    }

    /// Link from an explicit code, quantizer boundaries (before scaling by
    /// `1 / N0`) and decoder soft input width.
    pub fn with_parts(trellis: Arc<Trellis>, boundaries: &[f64], soft_bits: u32) -> Result<Self> {
        let decoder = ViterbiDecoder::new(trellis.clone(), soft_bits)?;
        let quantizer = LlrQuantizer::new(boundaries.to_vec())?;
        quantizer.check_levels(decoder.levels())?;

        Ok(Self {
            block_size: CODED_BLOCK_SIZE,
            encoder: ConvolutionalEncoder::new(trellis),
            decoder,
            constellation: Constellation::new(Modulation::Qpsk),
            boundaries: boundaries.to_vec(),
            quantizer: (1.0, quantizer),
        })
    }

    /// Overrides the number of information bits per block.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    fn quantizer(&mut self, variance: f64) -> Result<&LlrQuantizer> {
        if self.quantizer.0 != variance {
            let quantizer = LlrQuantizer::scaled(&self.boundaries, 1.0 / variance)?;
            debug!(variance, boundaries = ?quantizer.boundaries(), "Rescaled quantizer");
            self.quantizer = (variance, quantizer);
        }

        Ok(&self.quantizer.1)
    }

    /// Decoder input for a received block: quantized, negated LLRs.
    pub fn soft_values(&mut self, received: &[Complex64], noise: &NoiseSpec) -> Result<Vec<u8>> {
        let variance = noise.llr_variance();
        let llrs: Vec<f64> = self
            .constellation
            .demap_soft(received, variance)
            .into_iter()
            .map(|llr| -llr)
            .collect();

        Ok(self.quantizer(variance)?.quantize(&llrs))
    }
}

impl Link for CodedLink {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn noise_spec(&self, ebno_db: f64) -> Result<NoiseSpec> {
        NoiseSpec::new(
            ebno_db,
            self.constellation.bits_per_symbol(),
            self.encoder.trellis().rate(),
        )
    }

    #[instrument(skip_all)]
    fn transmit_block(
        &mut self,
        bits: &[u8],
        noise: &NoiseSpec,
        channel: &mut AwgnChannel,
    ) -> Result<Vec<u8>> {
        let coded = self.encoder.encode(bits);
        let symbols = self.constellation.map(&coded)?;
        let received = channel.transmit(&symbols, noise);
        let soft = self.soft_values(&received, noise)?;

        self.decoder.decode(&soft)
    }
}

/// Demodulation function resolved when the link is built.
type Demodulate = fn(&Constellation, &[Complex64], &NoiseSpec) -> Vec<u8>;

fn demodulate_hard(
    constellation: &Constellation,
    received: &[Complex64],
    _: &NoiseSpec,
) -> Vec<u8> {
    constellation.demap_hard(received)
}

fn demodulate_soft(
    constellation: &Constellation,
    received: &[Complex64],
    noise: &NoiseSpec,
) -> Vec<u8> {
    llr_to_bits(&constellation.demap_soft(received, noise.llr_variance()))
}

/// Uncoded, scrambled link with a selectable constellation and demodulator.
///
/// The scrambling slot advances by two after every block and is never reset
/// implicitly, so it keeps rolling across Eb/No points.
pub struct UncodedLink {
    block_size: usize,
    constellation: Constellation,
    demod: DemodType,
    demodulate: Demodulate,
    scrambler: Scrambler,
    slots: SlotCounter,
}

impl UncodedLink {
    /// Link with the default 2400-bit block.
    pub fn new(modulation: Modulation, demod: DemodType) -> Result<Self> {
        Self::with_block_size(modulation, demod, UNCODED_BLOCK_SIZE)
    }

    /// Link with a custom block size, which must hold whole symbols.
    pub fn with_block_size(
        modulation: Modulation,
        demod: DemodType,
        block_size: usize,
    ) -> Result<Self> {
        let bits_per_symbol = modulation.bits_per_symbol();
        if block_size % bits_per_symbol != 0 {
            return Err(Error::BitGroupLength {
                len: block_size,
                bits_per_symbol,
            });
        }

        let demodulate: Demodulate = match demod {
            DemodType::Hard => demodulate_hard,
            DemodType::Soft => demodulate_soft,
        };

        Ok(Self {
            block_size,
            constellation: Constellation::new(modulation),
            demod,
            demodulate,
            scrambler: Scrambler::default(),
            slots: SlotCounter::default(),
        })
    }

    /// Modulation scheme of the link.
    pub fn modulation(&self) -> Modulation {
        self.constellation.modulation()
    }

    /// Demodulation type of the link.
    pub fn demod(&self) -> DemodType {
        self.demod
    }

    /// Slot used by the next block.
    pub fn slot(&self) -> u32 {
        self.slots.current()
    }

    /// Restarts the scrambling slot sequence at zero.
    pub fn reset_slot(&mut self) {
        self.slots.reset();
    }
}

impl Link for UncodedLink {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn noise_spec(&self, ebno_db: f64) -> Result<NoiseSpec> {
        NoiseSpec::new(ebno_db, self.constellation.bits_per_symbol(), 1.0)
    }

    #[instrument(skip_all, fields(slot = self.slots.current()))]
    fn transmit_block(
        &mut self,
        bits: &[u8],
        noise: &NoiseSpec,
        channel: &mut AwgnChannel,
    ) -> Result<Vec<u8>> {
        let slot = self.slots.current();

        let scrambled = self.scrambler.scramble(bits, slot)?;
        let symbols = self.constellation.map(&scrambled)?;
        let received = channel.transmit(&symbols, noise);
        let demodulated = (self.demodulate)(&self.constellation, &received, noise);
        let recovered = self.scrambler.descramble(&demodulated, slot)?;

        self.slots.advance();
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BitSource;

    #[test_log::test]
    fn test_coded_link_noiseless() {
        let mut link = CodedLink::new().unwrap();
        let mut channel = AwgnChannel::new(1);
        let noise = link.noise_spec(f64::INFINITY).unwrap();
        let bits = BitSource::new(2).block(link.block_size());

        assert_eq!(link.transmit_block(&bits, &noise, &mut channel).unwrap(), bits);
    }

    #[test_log::test]
    fn test_coded_link_noise_spec() {
        let link = CodedLink::new().unwrap();
        let noise = link.noise_spec(4.0).unwrap();

        // QPSK and rate 1/2 cancel out
        assert!((noise.snr_db - 4.0).abs() < 1e-12);
    }

    #[test_log::test]
    fn test_negated_llr_polarity() {
        // Noiseless QPSK: a coded 0 must quantize to the strongest "0" value
        let mut link = CodedLink::new().unwrap();
        let noise = link.noise_spec(10.0).unwrap();
        let symbols = link.constellation.map(&[0, 0, 1, 1, 0, 1]).unwrap();

        let soft = link.soft_values(&symbols, &noise).unwrap();
        assert_eq!(soft, vec![0, 0, 7, 7, 0, 7]);
    }

    #[test_log::test]
    fn test_coded_matches_hard_decisions_at_high_snr() {
        // Decoding must agree with plain hard decisions on the coded bits
        // when the channel is clean enough that those make no mistakes.
        let mut link = CodedLink::new().unwrap().with_block_size(256);
        let mut channel = AwgnChannel::new(3);
        let noise = link.noise_spec(30.0).unwrap();
        let bits = BitSource::new(4).block(256);

        let coded = link.encoder.encode(&bits);
        let symbols = link.constellation.map(&coded).unwrap();
        let received = channel.transmit(&symbols, &noise);
        assert_eq!(link.constellation.demap_hard(&received), coded);

        let soft = link.soft_values(&received, &noise).unwrap();
        assert_eq!(link.decoder.decode(&soft).unwrap(), bits);
    }

    #[test_log::test]
    fn test_coded_link_alphabet_mismatch() {
        let result = CodedLink::with_parts(Arc::new(Trellis::default()), &LLR_BOUNDARIES, 4);
        assert!(matches!(
            result,
            Err(Error::AlphabetMismatch {
                quantizer: 8,
                decoder: 16
            })
        ));
    }

    #[test_log::test]
    fn test_coded_link_rejects_wide_soft_input() {
        // 512 levels would not survive the byte-sized soft values
        let boundaries: Vec<f64> = (0..511).map(|i| i as f64 - 255.0).collect();
        let result = CodedLink::with_parts(Arc::new(Trellis::default()), &boundaries, 9);
        assert!(matches!(result, Err(Error::SoftInputWidth(9))));

        // Widest alphabet that fits still decodes a clean block
        let boundaries: Vec<f64> = (0..255).map(|i| (i as f64 - 127.0) / 64.0).collect();
        let mut link = CodedLink::with_parts(Arc::new(Trellis::default()), &boundaries, 8)
            .unwrap()
            .with_block_size(256);
        let mut channel = AwgnChannel::new(1);
        let noise = link.noise_spec(f64::INFINITY).unwrap();
        let bits = BitSource::new(7).block(256);

        assert_eq!(link.transmit_block(&bits, &noise, &mut channel).unwrap(), bits);
    }

    #[test_log::test]
    fn test_uncoded_link_noiseless() {
        for modulation in [Modulation::Qpsk, Modulation::Qam16, Modulation::Qam64] {
            for demod in [DemodType::Hard, DemodType::Soft] {
                let mut link = UncodedLink::new(modulation, demod).unwrap();
                let mut channel = AwgnChannel::new(5);
                let noise = link.noise_spec(f64::INFINITY).unwrap();
                let mut source = BitSource::new(6);

                for _ in 0..3 {
                    let bits = source.block(link.block_size());
                    let recovered = link.transmit_block(&bits, &noise, &mut channel).unwrap();
                    assert_eq!(recovered, bits, "{modulation} {demod}");
                }
                assert_eq!(link.slot(), 6);
            }
        }
    }

    #[test_log::test]
    fn test_uncoded_block_size_must_hold_symbols() {
        assert!(matches!(
            UncodedLink::with_block_size(Modulation::Qam64, DemodType::Hard, 2048),
            Err(Error::BitGroupLength { .. })
        ));
        assert!(UncodedLink::with_block_size(Modulation::Qam64, DemodType::Hard, 2400).is_ok());
    }

    #[test_log::test]
    fn test_uncoded_slot_reset() {
        let mut link = UncodedLink::new(Modulation::Qpsk, DemodType::Hard).unwrap();
        let mut channel = AwgnChannel::new(1);
        let noise = link.noise_spec(10.0).unwrap();
        let bits = vec![0; link.block_size()];

        link.transmit_block(&bits, &noise, &mut channel).unwrap();
        assert_eq!(link.slot(), 2);
        link.reset_slot();
        assert_eq!(link.slot(), 0);
    }
}
