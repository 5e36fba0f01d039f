//! Feature reduction: magnitude spectrum → classifier input
//!
//! The classifier was trained on the first `FEATURE_SIZE` magnitude bins
//! (0 - 2 kHz at the default rate) narrowed to f32. The remaining bins are
//! dropped. This is the fixed feature-selection policy the model expects,
//! so no averaging, log scaling, or normalization happens here.

use super::try_alloc;
use crate::error::Result;

#[derive(Debug)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            values: try_alloc(size, "feature vector")?,
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy the leading bins of `magnitudes`, narrowing to f32.
    ///
    /// `magnitudes` must be at least as long as the vector.
    pub fn reduce_from(&mut self, magnitudes: &[f64]) {
        debug_assert!(magnitudes.len() >= self.values.len());
        for (dst, &src) in self.values.iter_mut().zip(magnitudes.iter()) {
            *dst = src as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_leading_bins_only() {
        let mut features = FeatureVector::new(4).unwrap();
        let magnitudes = [1.0, 2.0, 3.0, 4.0, 99.0, 99.0, 99.0, 99.0];
        features.reduce_from(&magnitudes);

        assert_eq!(features.as_slice(), &[1.0f32, 2.0, 3.0, 4.0]);
        assert_eq!(features.len(), 4);
    }

    #[test]
    fn test_narrows_precision() {
        let mut features = FeatureVector::new(1).unwrap();
        features.reduce_from(&[0.1f64, 0.0]);
        assert_eq!(features.as_slice()[0], 0.1f32);
    }

    #[test]
    fn test_overwritten_every_chunk() {
        let mut features = FeatureVector::new(3).unwrap();
        features.reduce_from(&[5.0, 5.0, 5.0, 5.0]);
        features.reduce_from(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(features.as_slice(), &[1.0f32, 2.0, 3.0]);
    }
}
