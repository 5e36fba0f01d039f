//! Build-time pipeline parameters
//!
//! The device this runs on has a fixed memory budget, so the transform size
//! and feature count are compile-time constants. `PipelineConfig` carries
//! them into the pipeline and lets tests exercise other sizes.

use crate::error::{Error, Result};

/// Sample rate the classifier was trained on (Hz)
pub const SAMPLE_RATE: u32 = 8000;

/// Samples per chunk fed to the FFT. Must be a power of two.
pub const FFT_SIZE: usize = 512;

/// Leading magnitude bins kept per chunk as classifier input
pub const FEATURE_SIZE: usize = 128;

/// Smallest byte length that can hold a canonical RIFF/WAVE header
pub const MIN_HEADER_SIZE: u64 = 44;

/// Widest sample encoding we decode (64-bit float)
pub const MAX_SAMPLE_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub feature_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            fft_size: FFT_SIZE,
            feature_size: FEATURE_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "fft_size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }
        if self.feature_size == 0 {
            return Err(Error::InvalidConfig("feature_size must be non-zero".into()));
        }
        if self.feature_size >= self.fft_size {
            return Err(Error::InvalidConfig(format!(
                "feature_size ({}) must be smaller than fft_size ({})",
                self.feature_size, self.fft_size
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be non-zero".into()));
        }
        Ok(())
    }
}
