//! Fixed-size spectral transform
//!
//! Turns one `SampleWindow` of time-domain samples into its magnitude
//! spectrum, in place. The sequence is always:
//!
//! 1. **Window** - multiply by a Hamming window to reduce spectral leakage
//!    at the chunk edges.
//! 2. **Transform** - forward FFT over the real/imaginary buffer pair.
//! 3. **Magnitude** - `sqrt(re² + im²)` written back over the real buffer.
//!    The imaginary buffer is left as scratch.
//!
//! Reordering these steps changes the numbers, so `SpectralAdapter::run`
//! is the only entry point the pipeline uses.
//!
//! # Frequency resolution
//!
//! With 512 samples at 8000 Hz each bin spans 15.625 Hz; bin `k` and bin
//! `N - k` are mirror images for real input, so only the first half carries
//! unique information.

use super::try_alloc;
use crate::error::Result;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// The pipeline's time/frequency buffer pair. Sized once, reused forever.
#[derive(Debug)]
pub struct SampleWindow {
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl SampleWindow {
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            real: try_alloc(size, "real sample buffer")?,
            imag: try_alloc(size, "imaginary sample buffer")?,
        })
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn real(&self) -> &[f64] {
        &self.real
    }

    pub fn imag(&self) -> &[f64] {
        &self.imag
    }

    pub fn parts_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.real, &mut self.imag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hamming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Window coefficient `i` of `size`
fn window_coefficient(kind: WindowKind, i: usize, size: usize) -> f64 {
    if size < 2 {
        return 1.0;
    }
    let ratio = i as f64 / (size - 1) as f64;
    match kind {
        WindowKind::Hamming => 0.54 - 0.46 * (2.0 * PI * ratio).cos(),
    }
}

/// In-place frequency transform over a `SampleWindow`.
///
/// None of these can fail: implementations own whatever scratch space they
/// need from construction onward.
pub trait FrequencyTransform {
    /// Apply `kind` to the real buffer. `Forward` multiplies by the window,
    /// `Reverse` divides it back out.
    fn windowing(&mut self, window: &mut SampleWindow, kind: WindowKind, direction: Direction);

    fn compute(&mut self, window: &mut SampleWindow, direction: Direction);

    /// Overwrite the real buffer with `|re + i·im|`
    fn complex_to_magnitude(&mut self, window: &mut SampleWindow);
}

/// rustfft-backed transform with every buffer allocated up front
pub struct RustFftTransform {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    hamming: Vec<f64>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Result<Self> {
        // Size-dependent buffers first, so an impossible size fails before planning
        let buffer = try_alloc(size, "FFT buffer")?;
        let mut hamming: Vec<f64> = try_alloc(size, "window coefficients")?;
        for (i, c) in hamming.iter_mut().enumerate() {
            *c = window_coefficient(WindowKind::Hamming, i, size);
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Ok(Self {
            forward,
            inverse,
            buffer,
            scratch: try_alloc(scratch_len, "FFT scratch")?,
            hamming,
        })
    }
}

impl FrequencyTransform for RustFftTransform {
    fn windowing(&mut self, window: &mut SampleWindow, kind: WindowKind, direction: Direction) {
        let coefficients = match kind {
            WindowKind::Hamming => &self.hamming,
        };
        let (real, _) = window.parts_mut();
        for (sample, &w) in real.iter_mut().zip(coefficients.iter()) {
            match direction {
                Direction::Forward => *sample *= w,
                Direction::Reverse => {
                    if w != 0.0 {
                        *sample /= w
                    }
                }
            }
        }
    }

    fn compute(&mut self, window: &mut SampleWindow, direction: Direction) {
        let (real, imag) = window.parts_mut();
        for ((c, &re), &im) in self.buffer.iter_mut().zip(real.iter()).zip(imag.iter()) {
            *c = Complex::new(re, im);
        }

        match direction {
            Direction::Forward => self
                .forward
                .process_with_scratch(&mut self.buffer, &mut self.scratch),
            Direction::Reverse => self
                .inverse
                .process_with_scratch(&mut self.buffer, &mut self.scratch),
        }

        // rustfft leaves the inverse unnormalized
        let scale = match direction {
            Direction::Forward => 1.0,
            Direction::Reverse => 1.0 / self.buffer.len() as f64,
        };
        for ((c, re), im) in self.buffer.iter().zip(real.iter_mut()).zip(imag.iter_mut()) {
            *re = c.re * scale;
            *im = c.im * scale;
        }
    }

    fn complex_to_magnitude(&mut self, window: &mut SampleWindow) {
        let (real, imag) = window.parts_mut();
        for (re, &im) in real.iter_mut().zip(imag.iter()) {
            *re = (*re * *re + im * im).sqrt();
        }
    }
}

/// Owns the sample window and drives the transform over it
pub struct SpectralAdapter<T: FrequencyTransform = RustFftTransform> {
    window: SampleWindow,
    engine: T,
}

impl SpectralAdapter<RustFftTransform> {
    pub fn new(fft_size: usize) -> Result<Self> {
        Self::with_engine(fft_size, RustFftTransform::new(fft_size)?)
    }
}

impl<T: FrequencyTransform> SpectralAdapter<T> {
    pub fn with_engine(fft_size: usize, engine: T) -> Result<Self> {
        Ok(Self {
            window: SampleWindow::new(fft_size)?,
            engine,
        })
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut SampleWindow {
        &mut self.window
    }

    /// Window, transform, reduce to magnitude. Call once per decoded chunk.
    pub fn run(&mut self) {
        self.engine
            .windowing(&mut self.window, WindowKind::Hamming, Direction::Forward);
        self.engine.compute(&mut self.window, Direction::Forward);
        self.engine.complex_to_magnitude(&mut self.window);
    }

    /// Magnitude spectrum after `run`
    pub fn magnitudes(&self) -> &[f64] {
        self.window.real()
    }
}
