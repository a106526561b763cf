//! Constellation mapping and demapping.
//!
//! Rectangular Gray-coded constellations with unit average energy. The first
//! bit of a group is the most significant bit of the point index; even bits
//! drive the in-phase axis and odd bits the quadrature axis.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use tracing::trace;

use crate::{
    common::MIN_NOISE_VARIANCE,
    config::Modulation,
    error::{Error, Result},
};

/// Constellation table of one modulation scheme.
#[derive(Debug, Clone)]
pub struct Constellation {
    modulation: Modulation,
    bits_per_symbol: usize,
    points: Vec<Complex64>,
}

/// Amplitude level of one axis from its Gray-coded bits, most significant
/// bit first.
fn axis_level(bits: &[u8]) -> f64 {
    let sign = |b: u8| 1.0 - 2.0 * b as f64;

    match bits {
        &[b0] => sign(b0),
        &[b0, b1] => sign(b0) * (2.0 - sign(b1)),
        &[b0, b1, b2] => sign(b0) * (4.0 - sign(b1) * (2.0 - sign(b2))),
        _ => unreachable!("unsupported axis width {}", bits.len()),
    }
}

impl Constellation {
    /// Builds the constellation table for `modulation`.
    pub fn new(modulation: Modulation) -> Self {
        let k = modulation.bits_per_symbol();
        let scale = match modulation {
            Modulation::Qpsk => FRAC_1_SQRT_2,
            Modulation::Qam16 => 1.0 / 10f64.sqrt(),
            Modulation::Qam64 => 1.0 / 42f64.sqrt(),
        };

        let points = (0..1usize << k)
            .map(|index| {
                let bits = index_to_bits(index, k);
                let i_bits: Vec<u8> = bits.iter().step_by(2).copied().collect();
                let q_bits: Vec<u8> = bits.iter().skip(1).step_by(2).copied().collect();

                Complex64::new(axis_level(&i_bits), axis_level(&q_bits)) * scale
            })
            .collect();

        Self {
            modulation,
            bits_per_symbol: k,
            points,
        }
    }

    /// Modulation scheme of this table.
    pub fn modulation(&self) -> Modulation {
        self.modulation
    }

    /// Bits carried per symbol.
    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    /// All points, indexed by their bit group.
    pub fn points(&self) -> &[Complex64] {
        &self.points
    }

    /// Maps groups of `bits_per_symbol` bits to constellation points.
    pub fn map(&self, bits: &[u8]) -> Result<Vec<Complex64>> {
        let k = self.bits_per_symbol;
        if bits.len() % k != 0 {
            return Err(Error::BitGroupLength {
                len: bits.len(),
                bits_per_symbol: k,
            });
        }

        Ok(bits
            .chunks_exact(k)
            .map(|group| {
                let index = group.iter().fold(0, |acc, &b| (acc << 1) | (b & 1) as usize);
                self.points[index]
            })
            .collect())
    }

    /// Index of the point closest to `symbol`. Ties keep the lowest index.
    fn nearest(&self, symbol: Complex64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;

        for (index, point) in self.points.iter().enumerate() {
            let dist = (symbol - point).norm_sqr();
            if dist < best_dist {
                best_dist = dist;
                best = index;
            }
        }

        best
    }

    /// Hard decision: bits of the nearest point for every symbol.
    pub fn demap_hard(&self, symbols: &[Complex64]) -> Vec<u8> {
        trace!(symbols = symbols.len(), "Hard demapping");

        symbols
            .iter()
            .flat_map(|&s| index_to_bits(self.nearest(s), self.bits_per_symbol))
            .collect()
    }

    /// Exact log-MAP LLR, `ln(P(b=0|y) / P(b=1|y))`, for every bit.
    ///
    /// `noise_variance` is the complex noise variance N0, floored at
    /// [`MIN_NOISE_VARIANCE`]. The exponentials are evaluated with
    /// log-sum-exp, so LLRs stay finite.
    pub fn demap_soft(&self, symbols: &[Complex64], noise_variance: f64) -> Vec<f64> {
        let noise_variance = noise_variance.max(MIN_NOISE_VARIANCE);
        trace!(symbols = symbols.len(), noise_variance, "Soft demapping");

        let k = self.bits_per_symbol;
        let mut metrics = vec![0.0; self.points.len()];
        let mut llrs = Vec::with_capacity(symbols.len() * k);

        for &symbol in symbols {
            for (metric, point) in metrics.iter_mut().zip(&self.points) {
                *metric = -(symbol - point).norm_sqr() / noise_variance;
            }

            for bit in 0..k {
                let mask = 1 << (k - 1 - bit);
                let zeros = log_sum_exp(metrics.iter().enumerate().filter(|(i, _)| i & mask == 0));
                let ones = log_sum_exp(metrics.iter().enumerate().filter(|(i, _)| i & mask != 0));
                llrs.push(zeros - ones);
            }
        }

        llrs
    }
}

/// `ln(Σ exp(m))` over the metrics of a point subset.
fn log_sum_exp<'a>(metrics: impl Iterator<Item = (usize, &'a f64)> + Clone) -> f64 {
    let max = metrics
        .clone()
        .map(|(_, &m)| m)
        .fold(f64::NEG_INFINITY, f64::max);

    max + metrics.map(|(_, &m)| (m - max).exp()).sum::<f64>().ln()
}

/// Splits a point index into its bit group, most significant bit first.
fn index_to_bits(index: usize, k: usize) -> Vec<u8> {
    (0..k).rev().map(|shift| ((index >> shift) & 1) as u8).collect()
}

/// Hard bit decisions from LLRs. Zero is read as bit 0.
pub fn llr_to_bits(llrs: &[f64]) -> Vec<u8> {
    llrs.iter().map(|&llr| (llr < 0.0) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Modulation; 3] = [Modulation::Qpsk, Modulation::Qam16, Modulation::Qam64];

    fn all_bit_groups(k: usize) -> Vec<u8> {
        (0..1usize << k).flat_map(|i| index_to_bits(i, k)).collect()
    }

    #[test_log::test]
    fn test_unit_average_energy() {
        for modulation in ALL {
            let constellation = Constellation::new(modulation);
            let points = constellation.points();
            assert_eq!(points.len(), 1 << modulation.bits_per_symbol());

            let energy = points.iter().map(|p| p.norm_sqr()).sum::<f64>() / points.len() as f64;
            assert!((energy - 1.0).abs() < 1e-12, "{modulation} energy {energy}");
        }
    }

    #[test_log::test]
    fn test_qpsk_points() {
        let qpsk = Constellation::new(Modulation::Qpsk);
        let s = FRAC_1_SQRT_2;

        assert_eq!(qpsk.points()[0b00], Complex64::new(s, s));
        assert_eq!(qpsk.points()[0b01], Complex64::new(s, -s));
        assert_eq!(qpsk.points()[0b10], Complex64::new(-s, s));
        assert_eq!(qpsk.points()[0b11], Complex64::new(-s, -s));
    }

    #[test_log::test]
    fn test_gray_neighbours_differ_by_one_bit() {
        for modulation in ALL {
            let constellation = Constellation::new(modulation);
            let points = constellation.points();
            let min_dist = points
                .iter()
                .enumerate()
                .flat_map(|(i, a)| points[i + 1..].iter().map(move |b| (a - b).norm()))
                .fold(f64::INFINITY, f64::min);

            for (i, a) in points.iter().enumerate() {
                for (j, b) in points.iter().enumerate() {
                    if i != j && ((a - b).norm() - min_dist).abs() < 1e-9 {
                        assert_eq!((i ^ j).count_ones(), 1, "{modulation}: {i} and {j}");
                    }
                }
            }
        }
    }

    #[test_log::test]
    fn test_hard_roundtrip() {
        for modulation in ALL {
            let constellation = Constellation::new(modulation);
            let bits = all_bit_groups(modulation.bits_per_symbol());

            let symbols = constellation.map(&bits).unwrap();
            assert_eq!(constellation.demap_hard(&symbols), bits);
        }
    }

    #[test_log::test]
    fn test_soft_signs_match_bits() {
        for modulation in ALL {
            let constellation = Constellation::new(modulation);
            let bits = all_bit_groups(modulation.bits_per_symbol());
            let symbols = constellation.map(&bits).unwrap();

            let llrs = constellation.demap_soft(&symbols, 0.1);
            assert_eq!(llrs.len(), bits.len());
            assert_eq!(llr_to_bits(&llrs), bits);
        }
    }

    #[test_log::test]
    fn test_qpsk_llr_closed_form() {
        let qpsk = Constellation::new(Modulation::Qpsk);
        let n0 = 0.4;
        let y = Complex64::new(0.3, -0.9);

        let llrs = qpsk.demap_soft(&[y], n0);
        let scale = 4.0 * FRAC_1_SQRT_2 / n0;
        assert!((llrs[0] - scale * y.re).abs() < 1e-9);
        assert!((llrs[1] - scale * y.im).abs() < 1e-9);
    }

    #[test_log::test]
    fn test_soft_stable_at_tiny_variance() {
        let constellation = Constellation::new(Modulation::Qam64);
        let symbols = vec![Complex64::new(2.0, -2.0), Complex64::new(0.0, 0.0)];

        for llr in constellation.demap_soft(&symbols, 1e-12) {
            assert!(llr.is_finite(), "llr {llr}");
        }
    }

    #[test_log::test]
    fn test_soft_floors_non_positive_variance() {
        let constellation = Constellation::new(Modulation::Qam16);
        let bits = all_bit_groups(4);
        let symbols = constellation.map(&bits).unwrap();

        for variance in [0.0, -1.0] {
            let llrs = constellation.demap_soft(&symbols, variance);
            assert!(llrs.iter().all(|llr| llr.is_finite()), "variance {variance}");
            assert_eq!(llr_to_bits(&llrs), bits);
        }
    }

    #[test_log::test]
    fn test_map_rejects_partial_group() {
        let constellation = Constellation::new(Modulation::Qam16);
        assert_eq!(
            constellation.map(&[0, 1, 1, 0, 1]),
            Err(Error::BitGroupLength {
                len: 5,
                bits_per_symbol: 4
            })
        );
    }
}
