//! Block spectra
//!
//! A block of ADC codes is converted to volts and transformed with the `microfft` complex FFT
//! (`exp(-j 2 pi k n / N)` kernel, no normalization). Bin `k` corresponds to `k * fs / N` for
//! `k < N / 2`.
use core::ops::Range;

use num_complex::Complex32;

use crate::hardware::AdcCode;

/// Spectrum scratch space for one block.
///
/// Every `compute` overwrites the complete contents, nothing carries over between blocks.
pub struct Spectrum<const N: usize> {
    bins: [Complex32; N],
    magnitude: [f32; N],
}

impl<const N: usize> Default for Spectrum<N> {
    fn default() -> Self {
        Self {
            bins: [Complex32::new(0.0, 0.0); N],
            magnitude: [0.0; N],
        }
    }
}

macro_rules! impl_compute {
    ($($n:literal => $cfft:ident),* $(,)?) => {$(
        impl Spectrum<$n> {
            /// Transform a block of raw ADC codes, scaled to volts.
            pub fn compute(&mut self, block: &[u16; $n]) {
                self.load(block);
                microfft::complex::$cfft(&mut self.bins);
                self.update_magnitude();
            }
        }
    )*};
}

impl_compute!(
    64 => cfft_64,
    128 => cfft_128,
    256 => cfft_256,
    512 => cfft_512,
    1024 => cfft_1024,
);

impl<const N: usize> Spectrum<N> {
    fn load(&mut self, block: &[u16; N]) {
        for (bin, &code) in self.bins.iter_mut().zip(block.iter()) {
            *bin = Complex32::new(f32::from(AdcCode(code)), 0.0);
        }
    }

    fn update_magnitude(&mut self) {
        for (magnitude, bin) in self.magnitude.iter_mut().zip(self.bins.iter()) {
            *magnitude = bin.norm();
        }
    }

    pub fn bins(&self) -> &[Complex32; N] {
        &self.bins
    }

    pub fn magnitude(&self) -> &[f32; N] {
        &self.magnitude
    }

    /// Phase of a bin in radians, `(-pi, pi]`.
    pub fn phase(&self, index: usize) -> f32 {
        self.bins[index].arg()
    }

    /// The bin with the largest non-zero magnitude in `range`, lowest index first on ties.
    ///
    /// The range is truncated to the block length.
    pub fn peak(&self, range: Range<usize>) -> Option<(usize, f32)> {
        let end = range.end.min(N);
        let mut best: Option<(usize, f32)> = None;
        for index in range.start..end {
            let magnitude = self.magnitude[index];
            if best.map_or(magnitude > 0.0, |(_, max)| magnitude > max) {
                best = Some((index, magnitude));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::isclose;

    #[test]
    fn dc_block() {
        let mut spectrum = Spectrum::<128>::default();
        spectrum.compute(&[2048; 128]);
        assert!(isclose(spectrum.magnitude()[0], 128.0 * 1.65, 1e-6, 0.0));
        assert!(spectrum.magnitude()[1..].iter().all(|&m| m < 1e-3));
        assert_eq!(spectrum.peak(0..64).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn single_tone() {
        // 5 cycles of a cosine, 1000 codes around mid-scale.
        let mut block = [0; 256];
        for (i, x) in block.iter_mut().enumerate() {
            let phase = 2.0 * core::f64::consts::PI * 5.0 * i as f64 / 256.0;
            *x = (2048.0 + 1000.0 * phase.cos()).round() as u16;
        }
        let mut spectrum = Spectrum::<256>::default();
        spectrum.compute(&block);

        let amplitude = 128.0 * 1000.0 * 3.3 / 4096.0;
        assert!(isclose(spectrum.magnitude()[5], amplitude, 1e-3, 0.0));
        assert!(isclose(spectrum.magnitude()[251], amplitude, 1e-3, 0.0));
        assert!(isclose(spectrum.phase(5), 0.0, 0.0, 1e-3));
        assert_eq!(spectrum.peak(1..128).map(|(i, _)| i), Some(5));
        assert!(spectrum.magnitude()[6..128].iter().all(|&m| m < 0.5));
    }

    #[test]
    fn peak_search() {
        let mut spectrum = Spectrum::<128>::default();
        spectrum.compute(&[0; 128]);
        assert_eq!(spectrum.peak(0..64), None);
        assert_eq!(spectrum.peak(10..10), None);

        let mut block = [0; 128];
        for (i, x) in block.iter_mut().enumerate() {
            *x = if (i / 8) % 2 == 0 { 1000 } else { 0 };
        }
        spectrum.compute(&block);
        // Square wave with 16 sample period: fundamental at bin 8.
        assert_eq!(spectrum.peak(1..64).map(|(i, _)| i), Some(8));
        assert_eq!(spectrum.peak(9..30).map(|(i, _)| i), Some(24));
        assert_eq!(spectrum.peak(60..1000).map(|(i, _)| i), Some(120));
    }
}
