//! Amplitude, phase and harmonic measurements
use core::f32::consts::{PI, TAU};
use core::ops::Range;

use serde::Serialize;

use super::classify::Fundamental;
use super::frequency_map::{map_fft_to_input, map_input_to_fft};
use super::spectrum::Spectrum;
use super::HarmonicComponent;
use crate::hardware::design_parameters::{ADC_FULL_SCALE, ADC_VREF};
use crate::hardware::AdcCode;

/// Time domain levels of a block in volts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Levels {
    pub vpp: f32,
    pub mean: f32,
    pub rms: f32,
}

/// Single pass peak-to-peak, mean and RMS of raw ADC codes.
pub fn levels(block: &[u16]) -> Levels {
    let Some(&first) = block.first() else {
        return Levels::default();
    };

    let (mut min, mut max) = (first, first);
    let mut m1 = 0u64;
    let mut m2 = 0u64;
    for &code in block {
        min = min.min(code);
        max = max.max(code);
        m1 += code as u64;
        m2 += (code as u64) * (code as u64);
    }

    let scale = ADC_VREF as f64 / ADC_FULL_SCALE as f64;
    let c = 1. / block.len() as f64;
    Levels {
        vpp: f32::from(AdcCode(max - min)),
        mean: (m1 as f64 * c * scale) as f32,
        rms: (libm::sqrt(m2 as f64 * c) * scale) as f32,
    }
}

/// Wrap `a - b` into `(-pi, pi]`.
pub fn phase_difference(a: f32, b: f32) -> f32 {
    let d = (a - b) % TAU;
    if d > PI {
        d - TAU
    } else if d <= -PI {
        d + TAU
    } else {
        d
    }
}

/// Spectral phase at the bin nearest to `fft_hz`.
///
/// # Returns
/// `None` if the sample rate is not positive or the bin is DC or at or above Nyquist.
pub fn spectral_phase<const N: usize>(
    spectrum: &Spectrum<N>,
    fft_hz: f32,
    sample_rate: f32,
) -> Option<f32> {
    if !(sample_rate > 0.0) || !(fft_hz >= 0.0) {
        return None;
    }
    let index = libm::roundf(fft_hz * N as f32 / sample_rate);
    if index < 1.0 || index >= (N / 2) as f32 {
        return None;
    }
    Some(spectrum.phase(index as usize))
}

/// Phase of the first rising mean crossing, `[0, 2 pi)`.
///
/// The crossing position is linearly interpolated between samples and converted to a phase
/// using the period of `frequency` (input domain) as observed at `sample_rate`.
pub fn zero_crossing_phase(block: &[u16], frequency: f32, sample_rate: f32) -> Option<f32> {
    if !(frequency > 0.0) || !(sample_rate > 0.0) || block.is_empty() {
        return None;
    }
    let scale = |code: u16| f32::from(AdcCode(code));
    let mean = levels(block).mean;

    let crossing = block.windows(2).enumerate().find_map(|(i, pair)| {
        let prev = scale(pair[0]) - mean;
        let cur = scale(pair[1]) - mean;
        (prev < 0.0 && cur >= 0.0).then(|| i as f32 + prev / (prev - cur))
    })?;

    let period = sample_rate / map_input_to_fft(frequency);
    let phase = (TAU * crossing / period) % TAU;
    Some(if phase < 0.0 { phase + TAU } else { phase })
}

/// Bin search window for the `order`th harmonic of bin `k`.
///
/// The window spans `order * k +- k / 4`, starts above bin `floor` and ends below Nyquist.
pub fn harmonic_window<const N: usize>(order: usize, k: usize, floor: usize) -> Range<usize> {
    let center = order * k;
    let end = (center + k / 4).min(N / 2 - 1) + 1;
    let start = center.saturating_sub(k / 4).max(floor + 1).min(end);
    start..end
}

/// Third and fifth harmonics of the fundamental.
///
/// Peaks below `floor` relative to the fundamental are reported as zero.
pub fn harmonics<const N: usize>(
    spectrum: &Spectrum<N>,
    fundamental: Fundamental,
    sample_rate: f32,
    floor: f32,
) -> [HarmonicComponent; 2] {
    let k = fundamental.index;
    let reference = spectrum.phase(k);

    let component = |peak: Option<(usize, f32)>| {
        peak.filter(|(_, amplitude)| *amplitude >= floor * fundamental.amplitude)
            .map(|(index, amplitude)| HarmonicComponent {
                frequency: if sample_rate > 0.0 {
                    map_fft_to_input(index as f32 * sample_rate / N as f32)
                } else {
                    0.0
                },
                amplitude,
                phase: phase_difference(spectrum.phase(index), reference),
                relative_amplitude: amplitude / fundamental.amplitude,
            })
            .unwrap_or_default()
    };

    let third = spectrum.peak(harmonic_window::<N>(3, k, k));
    // The fifth starts above the third peak, even if that was dropped below the floor.
    let floor_index = third.map_or(k, |(index, _)| index);
    let fifth = spectrum.peak(harmonic_window::<N>(5, k, floor_index));

    [component(third), component(fifth)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn levels_of_sine() {
        let block = sine_block(10.0, 1000.0, 2048.0, 0.0);
        let l = levels(&block);
        let volts = 3.3 / 4096.0;
        assert!(isclose(l.vpp, 2000.0 * volts, 1e-2, 0.0));
        assert!(isclose(l.mean, 2048.0 * volts, 1e-4, 0.0));
        let rms = libm::sqrtf(2048.0f32.powi(2) + 1000.0f32.powi(2) / 2.0) * volts;
        assert!(isclose(l.rms, rms, 1e-3, 0.0));
        assert_eq!(levels(&[]), Levels::default());
    }

    #[test]
    fn wrap() {
        assert!(isclose(phase_difference(3.0, -3.0), 6.0 - TAU, 0.0, 1e-6));
        assert!(isclose(phase_difference(-3.0, 3.0), TAU - 6.0, 0.0, 1e-6));
        assert_eq!(phase_difference(PI, 0.0), PI);
        assert!(isclose(phase_difference(-PI, 0.0), PI, 0.0, 1e-6));
        assert!(isclose(phase_difference(1.0, 0.5), 0.5, 0.0, 1e-6));
        for i in -100..100 {
            let d = phase_difference(i as f32 * 0.37, -(i as f32) * 0.11);
            assert!(d > -PI && d <= PI, "{d}");
        }
    }

    #[test]
    fn rising_crossing() {
        // sin(x - 1) crosses upwards at x = 1.
        let block = sine_block(8.0, 1000.0, 2048.0, -1.0);
        let phase = zero_crossing_phase(&block, 800.0, 102_400.0).unwrap();
        assert!(isclose(phase, 1.0, 0.0, 2e-2), "{phase}");

        assert_eq!(zero_crossing_phase(&block, 0.0, 102_400.0), None);
        assert_eq!(zero_crossing_phase(&block, 800.0, 0.0), None);
        assert_eq!(zero_crossing_phase(&[2048; 16], 800.0, 102_400.0), None);
    }

    #[test]
    fn windows_do_not_overlap() {
        const N: usize = 1024;
        for k in 1..N / 2 {
            let third = harmonic_window::<N>(3, k, k);
            assert!(third.start > k);
            assert!(third.end <= N / 2);
            // Any third harmonic peak keeps the fifth window above it.
            for peak in third.clone() {
                let fifth = harmonic_window::<N>(5, k, peak);
                assert!(fifth.start > peak);
                assert!(fifth.end <= N / 2);
            }
        }
        assert_eq!(harmonic_window::<N>(3, 8, 8), 22..27);
        assert_eq!(harmonic_window::<N>(5, 8, 24), 38..43);
    }

    #[test]
    fn phase_out_of_range() {
        let spectrum = crate::analyzer::spectrum::Spectrum::<64>::default();
        assert_eq!(spectral_phase(&spectrum, 100.0, 0.0), None);
        assert_eq!(spectral_phase(&spectrum, 500.0, 1000.0), None);
        assert_eq!(spectral_phase(&spectrum, -1.0, 1000.0), None);
        assert_eq!(spectral_phase(&spectrum, 1.0, 1000.0), None);
        assert_eq!(spectral_phase(&spectrum, 100.0, 1000.0), Some(0.0));
    }
}
