//! Scalar quantizer mapping LLRs onto the decoder's soft input alphabet.

use crate::error::{Error, Result};

/// Unbounded scalar quantizer.
///
/// `n` strictly increasing boundary points split the real line into `n + 1`
/// intervals. A value maps to the number of boundaries it is greater than or
/// equal to, so a value sitting exactly on a boundary lands in the upper
/// interval. Values below the first boundary saturate to 0, values at or
/// above the last one to `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct LlrQuantizer {
    boundaries: Vec<f64>,
}

impl LlrQuantizer {
    /// Creates a quantizer from its boundary points.
    ///
    /// Indices are `u8`, so at most 255 boundaries are accepted.
    pub fn new(boundaries: Vec<f64>) -> Result<Self> {
        let ordered = boundaries.windows(2).all(|w| w[0] < w[1]);
        let fits = (1..=u8::MAX as usize).contains(&boundaries.len());
        if !fits || !ordered || boundaries.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidBoundaries);
        }

        Ok(Self { boundaries })
    }

    /// Quantizer whose boundaries are `base` multiplied by `scale`.
    pub fn scaled(base: &[f64], scale: f64) -> Result<Self> {
        Self::new(base.iter().map(|b| b * scale).collect())
    }

    /// Number of output indices.
    pub fn levels(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Boundary points.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Index of a single value.
    pub fn quantize_one(&self, value: f64) -> u8 {
        self.boundaries.partition_point(|&b| b <= value) as u8
    }

    /// Indices of all `values`.
    pub fn quantize(&self, values: &[f64]) -> Vec<u8> {
        values.iter().map(|&v| self.quantize_one(v)).collect()
    }

    /// Fails unless the output alphabet has exactly `levels` entries.
    pub fn check_levels(&self, levels: usize) -> Result<()> {
        if self.levels() != levels {
            return Err(Error::AlphabetMismatch {
                quantizer: self.levels(),
                decoder: levels,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LLR_BOUNDARIES;

    fn quantizer() -> LlrQuantizer {
        LlrQuantizer::new(LLR_BOUNDARIES.to_vec()).unwrap()
    }

    #[test_log::test]
    fn test_saturation() {
        let q = quantizer();
        assert_eq!(q.levels(), 8);

        assert_eq!(q.quantize_one(-1e300), 0);
        assert_eq!(q.quantize_one(-1.51), 0);
        assert_eq!(q.quantize_one(1.51), 7);
        assert_eq!(q.quantize_one(1e300), 7);
        assert_eq!(q.quantize_one(f64::INFINITY), 7);
        assert_eq!(q.quantize_one(f64::NEG_INFINITY), 0);
    }

    #[test_log::test]
    fn test_boundary_ties_go_up() {
        let q = quantizer();
        let indices = q.quantize(&LLR_BOUNDARIES);
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6, 7]);

        assert_eq!(q.quantize(&[-0.75, -0.25, 0.25, 0.75]), vec![2, 3, 4, 5]);
    }

    #[test_log::test]
    fn test_monotonic() {
        let q = quantizer();
        let values: Vec<f64> = (-40..=40).map(|i| i as f64 * 0.05).collect();
        let indices = q.quantize(&values);

        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(indices.first(), Some(&0));
        assert_eq!(indices.last(), Some(&7));
    }

    #[test_log::test]
    fn test_scaled() {
        let q = LlrQuantizer::scaled(&LLR_BOUNDARIES, 10.0).unwrap();
        assert_eq!(q.boundaries()[0], -15.0);
        assert_eq!(q.quantize_one(14.0), 6);
        assert_eq!(q.quantize_one(15.0), 7);
    }

    #[test_log::test]
    fn test_invalid_boundaries() {
        assert_eq!(LlrQuantizer::new(vec![]), Err(Error::InvalidBoundaries));
        assert_eq!(
            LlrQuantizer::new(vec![0.0, 0.0]),
            Err(Error::InvalidBoundaries)
        );
        assert_eq!(
            LlrQuantizer::new(vec![0.0, f64::NAN]),
            Err(Error::InvalidBoundaries)
        );
        assert_eq!(
            LlrQuantizer::scaled(&LLR_BOUNDARIES, f64::INFINITY),
            Err(Error::InvalidBoundaries)
        );
    }

    #[test_log::test]
    fn test_indices_fit_a_byte() {
        let boundaries = |n: usize| (0..n).map(|i| i as f64).collect::<Vec<_>>();

        let q = LlrQuantizer::new(boundaries(255)).unwrap();
        assert_eq!(q.levels(), 256);
        assert_eq!(q.quantize_one(1e9), 255);

        assert_eq!(
            LlrQuantizer::new(boundaries(256)),
            Err(Error::InvalidBoundaries)
        );
    }

    #[test_log::test]
    fn test_level_check() {
        let q = quantizer();
        assert_eq!(q.check_levels(8), Ok(()));
        assert_eq!(
            q.check_levels(16),
            Err(Error::AlphabetMismatch {
                quantizer: 8,
                decoder: 16
            })
        );
    }
}
