//! Waveform shape classification
//!
//! The strongest non-DC bin below Nyquist is taken as the fundamental. A block is DC when the DC
//! bin exceeds the fundamental by the configured ratio and Unknown when the fundamental is below
//! the noise floor. Otherwise the odd harmonic ratios decide between sine, square and triangle.
use core::ops::Range;

use super::frequency_map::map_fft_to_input;
use super::spectrum::Spectrum;
use super::{AnalyzerConfig, WaveformType};

/// Both odd harmonics below this ratio make a sine.
pub const SINE_HARMONIC_LIMIT: f32 = 0.05;
/// A third harmonic above this ratio makes a square wave (ideal 1/3).
pub const SQUARE_THIRD_RATIO: f32 = 1.0 / 5.0;
/// A third harmonic above this ratio makes a triangle wave (ideal 1/9).
pub const TRIANGLE_THIRD_RATIO: f32 = 1.0 / 15.0;

/// The strongest non-DC bin below Nyquist.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fundamental {
    pub index: usize,
    pub amplitude: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Classification {
    pub waveform_type: WaveformType,
    pub fundamental: Option<Fundamental>,
    /// Input-domain frequency of the fundamental in Hz, zero for DC and noise.
    pub frequency: f32,
    /// Relative amplitude of the strongest bin around the third harmonic.
    pub third_ratio: f32,
    /// Relative amplitude of the strongest bin around the fifth harmonic.
    pub fifth_ratio: f32,
}

/// Harmonic search range `[lo, hi)` clamped to `[1, N/2)`.
fn window<const N: usize>(lo: usize, hi: usize) -> Range<usize> {
    lo.max(1)..hi.min(N / 2)
}

/// Classify the waveform shape from its spectrum.
///
/// # Args
/// * `spectrum` - The spectrum of the block.
/// * `config` - Detection thresholds.
/// * `sample_rate` - ADC sample rate in Hz. Non-positive rates yield zero frequency.
pub fn classify<const N: usize>(
    spectrum: &Spectrum<N>,
    config: &AnalyzerConfig,
    sample_rate: f32,
) -> Classification {
    let mut class = Classification {
        waveform_type: WaveformType::Unknown,
        fundamental: None,
        frequency: 0.0,
        third_ratio: 0.0,
        fifth_ratio: 0.0,
    };

    let dc = spectrum.magnitude()[0];
    let peak = spectrum.peak(window::<N>(1, N / 2));

    if dc > config.dc_ratio * peak.map_or(0.0, |(_, amplitude)| amplitude) {
        class.waveform_type = WaveformType::Dc;
        return class;
    }

    let Some((index, amplitude)) =
        peak.filter(|(_, amplitude)| *amplitude >= config.noise_floor)
    else {
        return class;
    };

    class.fundamental = Some(Fundamental { index, amplitude });
    if sample_rate > 0.0 {
        class.frequency = map_fft_to_input(index as f32 * sample_rate / N as f32);
    }

    let ratio = |range: Range<usize>| {
        spectrum
            .peak(range)
            .map(|(_, magnitude)| magnitude / amplitude)
            .filter(|ratio| *ratio >= config.harmonic_floor)
            .unwrap_or(0.0)
    };
    class.third_ratio = ratio(window::<N>(2 * index, 4 * index));
    class.fifth_ratio = ratio(window::<N>(4 * index, 6 * index));

    class.waveform_type = if class.third_ratio < SINE_HARMONIC_LIMIT
        && class.fifth_ratio < SINE_HARMONIC_LIMIT
    {
        WaveformType::Sine
    } else if class.third_ratio > SQUARE_THIRD_RATIO {
        WaveformType::Square
    } else if class.third_ratio > TRIANGLE_THIRD_RATIO {
        WaveformType::Triangle
    } else {
        WaveformType::Unknown
    };

    log::debug!(
        "{} at bin {} ({:.3}, {:.3})",
        class.waveform_type,
        index,
        class.third_ratio,
        class.fifth_ratio
    );
    class
}
